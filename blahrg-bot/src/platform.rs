//! Chat platform boundary
//!
//! Handlers only see the platform-neutral event model below and talk back
//! through [`ChatPlatform`]. The Telegram client implements the trait for
//! production; tests substitute a recording mock.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Conversation (chat) identifier
pub type ChatId = i64;

/// Principal (user) identifier
pub type UserId = i64;

/// Errors reported by the chat platform
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Transport failure (connection, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// The platform rejected the request
    #[error("API error {code}: {description}")]
    Api { code: i64, description: String },

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Successful response without an expected field
    #[error("Response is missing {0}")]
    MissingField(&'static str),
}

/// What an inbound message carries, as far as the bot cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    /// Voice note, audio file or audio document
    Audio { file_id: String },
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub content: MessageContent,
}

impl IncomingMessage {
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingInlineQuery {
    pub id: String,
    pub sender_id: UserId,
    pub query: String,
    /// Paging position sent back by the client; empty for the first page
    pub offset: String,
}

/// One inbound event delivered to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Message(IncomingMessage),
    InlineQuery(IncomingInlineQuery),
}

/// Voice payload for [`ChatPlatform::send_voice`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceSource {
    /// Raw bytes uploaded under `filename`
    Upload { filename: String, bytes: Vec<u8> },
    /// Previously uploaded media, by file identifier
    Cached(String),
}

/// Inline query result replaying a previously uploaded voice clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedVoiceResult {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub voice_file_id: String,
    pub title: String,
}

impl CachedVoiceResult {
    pub fn new(id: impl Into<String>, voice_file_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind: "voice",
            id: id.into(),
            voice_file_id: voice_file_id.into(),
            title: title.into(),
        }
    }
}

/// Outbound operations the bot needs from the chat platform
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Send a text message to a conversation
    async fn reply(&self, chat_id: ChatId, text: &str) -> Result<(), PlatformError>;

    /// Send a voice message; returns the platform file identifier of the sent voice
    async fn send_voice(&self, chat_id: ChatId, voice: VoiceSource) -> Result<String, PlatformError>;

    /// Resolve a file identifier to a downloadable path
    async fn get_file(&self, file_id: &str) -> Result<String, PlatformError>;

    /// Download the bytes behind a path returned by [`ChatPlatform::get_file`]
    async fn download_file(&self, file_path: &str) -> Result<Vec<u8>, PlatformError>;

    /// Answer one page of an inline query; an empty `next_offset` marks the last page
    async fn answer_inline_query(
        &self,
        query_id: &str,
        results: Vec<CachedVoiceResult>,
        next_offset: &str,
    ) -> Result<(), PlatformError>;
}
