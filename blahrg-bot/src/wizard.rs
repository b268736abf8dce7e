//! Add-clip wizard state machine
//!
//! AwaitingDescription → AwaitingClip → Complete
//!
//! Each conversation that started `/add` has one [`WizardSession`] in
//! [`WizardSessions`]. `Complete` is not stored: finishing or cancelling
//! removes the entry, so no continuation is left behind. Sessions are keyed
//! by chat and user, so in a group only the user who started the wizard
//! advances it.

use crate::platform::{ChatId, IncomingMessage, MessageContent, UserId};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Literal keyword that aborts the wizard from any step
pub const CANCEL_COMMAND: &str = "/cancel";

/// Conversation a wizard belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

impl ConversationKey {
    pub fn of(message: &IncomingMessage) -> Self {
        Self {
            chat_id: message.chat_id,
            user_id: message.sender_id,
        }
    }
}

/// Non-terminal wizard steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardStep {
    AwaitingDescription,
    /// Description accepted; waiting for the voice file
    AwaitingClip { description: String },
}

#[derive(Debug, Clone)]
pub struct WizardSession {
    pub step: WizardStep,
    pub started_at: DateTime<Utc>,
}

impl WizardSession {
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    pub fn started_at(started_at: DateTime<Utc>) -> Self {
        Self {
            step: WizardStep::AwaitingDescription,
            started_at,
        }
    }

    fn is_expired(&self, expiry: Option<Duration>, now: DateTime<Utc>) -> bool {
        expiry.is_some_and(|expiry| now - self.started_at >= expiry)
    }
}

impl Default for WizardSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Wizard-relevant reading of an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardInput {
    Cancel,
    /// Non-empty text that is not a command
    Text(String),
    Audio { file_id: String },
    /// Anything a step cannot accept (other media, commands, blank text)
    Unrecognized,
}

impl WizardInput {
    pub fn classify(content: &MessageContent) -> Self {
        match content {
            MessageContent::Text(text) => {
                let text = text.trim();
                if is_cancel(text) {
                    WizardInput::Cancel
                } else if text.is_empty() || text.starts_with('/') {
                    WizardInput::Unrecognized
                } else {
                    WizardInput::Text(text.to_string())
                }
            }
            MessageContent::Audio { file_id } => WizardInput::Audio {
                file_id: file_id.clone(),
            },
            MessageContent::Other => WizardInput::Unrecognized,
        }
    }
}

/// `/cancel`, also with a `@botname` suffix
fn is_cancel(text: &str) -> bool {
    let command = text.split_whitespace().next().unwrap_or_default();
    let command = command.split('@').next().unwrap_or_default();
    command.eq_ignore_ascii_case(CANCEL_COMMAND)
}

/// Per-conversation wizard state
///
/// The lock is only held for map lookups and updates, never across
/// platform calls.
#[derive(Debug, Default)]
pub struct WizardSessions {
    sessions: RwLock<HashMap<ConversationKey, WizardSession>>,
    expiry: Option<Duration>,
}

impl WizardSessions {
    /// `expiry_secs = None` keeps unfinished wizards forever
    pub fn new(expiry_secs: Option<u64>) -> Self {
        let expiry = expiry_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds);

        Self {
            sessions: RwLock::new(HashMap::new()),
            expiry,
        }
    }

    /// Start a wizard; returns false if one is already active for `key`
    pub async fn start(&self, key: ConversationKey) -> bool {
        self.start_at(key, Utc::now()).await
    }

    /// Start a wizard as of `started_at`, which expiry is measured from
    pub async fn start_at(&self, key: ConversationKey, started_at: DateTime<Utc>) -> bool {
        let mut sessions = self.sessions.write().await;

        if let Some(existing) = sessions.get(&key) {
            if !existing.is_expired(self.expiry, Utc::now()) {
                return false;
            }
            debug!(chat_id = key.chat_id, user_id = key.user_id, "Replacing expired wizard");
        }

        sessions.insert(key, WizardSession::started_at(started_at));
        true
    }

    /// Current step, or None when no (unexpired) wizard is active
    ///
    /// Expired sessions are removed on lookup.
    pub async fn current(&self, key: ConversationKey) -> Option<WizardStep> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&key) {
                None => return None,
                Some(session) if !session.is_expired(self.expiry, now) => {
                    return Some(session.step.clone())
                }
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().await;
        // Re-check under the write lock; the session may have been replaced
        if sessions
            .get(&key)
            .is_some_and(|s| s.is_expired(self.expiry, now))
        {
            sessions.remove(&key);
            info!(chat_id = key.chat_id, user_id = key.user_id, "Wizard expired");
            return None;
        }
        sessions.get(&key).map(|s| s.step.clone())
    }

    /// Move an active wizard to `step`; no-op if it was cancelled meanwhile
    pub async fn advance(&self, key: ConversationKey, step: WizardStep) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&key) {
            Some(session) => {
                session.step = step;
                true
            }
            None => false,
        }
    }

    /// Terminate the wizard (complete or cancelled)
    pub async fn finish(&self, key: ConversationKey) -> bool {
        self.sessions.write().await.remove(&key).is_some()
    }

    /// Drop every expired session; returns how many were removed
    pub async fn sweep_expired(&self) -> usize {
        let Some(expiry) = self.expiry else {
            return 0;
        };

        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(Some(expiry), now));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
