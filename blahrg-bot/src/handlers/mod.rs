//! Event handlers
//!
//! Validation and authorization failures are answered here and never
//! propagate. Platform and storage errors are returned to the dispatcher,
//! which logs them, except where a handler has a better fallback (the
//! wizard tells the user, inline replay answers with an empty list).

pub mod add_clip;
pub mod commands;
pub mod inline;
pub mod refresh;

/// Reply sent when an unauthorized principal runs a privileged command
pub const PERMISSION_DENIED: &str = "Sorry, you are not allowed to manage clips on this bot.";
