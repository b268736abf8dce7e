//! blahrg-bot library - Telegram voice clip bot
//!
//! Stores short voice clips with their Telegram file identifiers and replays
//! them on request, from commands or inline queries. Exposes the handler
//! and dispatcher layers for integration testing.

use blahrg_common::config::TomlConfig;
use blahrg_common::db::ClipStore;
use blahrg_common::ClipRegistry;
use sqlx::SqlitePool;

pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod media;
pub mod platform;
pub mod telegram;
pub mod wizard;

pub use crate::error::{BotError, BotResult};

use crate::media::MediaLibrary;
use crate::platform::UserId;
use crate::wizard::WizardSessions;

/// Everything handlers need, constructed once at startup
pub struct BotContext {
    /// Clip registry over the record store
    pub registry: ClipRegistry,
    /// Raw clip binaries
    pub media: MediaLibrary,
    /// Active add-clip wizards
    pub sessions: WizardSessions,
    /// Bootstrap configuration
    pub config: TomlConfig,
}

impl BotContext {
    pub fn new(pool: SqlitePool, config: TomlConfig) -> Self {
        Self {
            registry: ClipRegistry::new(ClipStore::new(pool)),
            media: MediaLibrary::new(config.media.path.clone()),
            sessions: WizardSessions::new(config.wizard.expiry_secs),
            config,
        }
    }

    /// Owner or whitelisted principal
    pub fn is_authorized(&self, user_id: UserId) -> bool {
        self.config.is_authorized(user_id)
    }
}
