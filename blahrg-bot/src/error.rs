//! Error types for blahrg-bot

use crate::platform::PlatformError;
use thiserror::Error;

/// Handler error
///
/// Handlers never let these escape the dispatcher: they are logged and the
/// user gets a message where one makes sense.
#[derive(Debug, Error)]
pub enum BotError {
    /// Chat platform request failed
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Clip store, registry or configuration error
    #[error("Common error: {0}")]
    Common(#[from] blahrg_common::Error),
}

/// Result type for handlers
pub type BotResult<T> = Result<T, BotError>;
