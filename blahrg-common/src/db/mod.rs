//! Clip record store

pub mod clips;
pub mod init;
pub mod models;

pub use clips::ClipStore;
pub use init::*;
pub use models::*;
