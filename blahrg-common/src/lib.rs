//! # blahrg common library
//!
//! Shared code for the blahrg voice clip bot:
//! - Clip record store (SQLite)
//! - Clip registry (domain operations on the store)
//! - Configuration loading
//! - Filename slugs

pub mod config;
pub mod db;
pub mod error;
pub mod registry;
pub mod slug;

pub use error::{Error, Result};
pub use registry::ClipRegistry;
