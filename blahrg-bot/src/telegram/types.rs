//! Telegram Bot API wire types
//!
//! Only the fields the bot reads are declared; serde ignores the rest.

use crate::platform::{Event, IncomingInlineQuery, IncomingMessage, MessageContent};
use serde::Deserialize;

/// Envelope of every Bot API response
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub inline_query: Option<InlineQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub voice: Option<Voice>,
    pub audio: Option<Audio>,
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Voice {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Audio {
    pub file_id: String,
}

/// Generic file; counts as audio only with an `audio/*` MIME type
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InlineQuery {
    pub id: String,
    pub from: User,
    pub query: String,
    #[serde(default)]
    pub offset: String,
}

/// Result of getFile
#[derive(Debug, Clone, Deserialize)]
pub struct File {
    /// Relative download path, valid for at least an hour
    pub file_path: Option<String>,
}

impl Message {
    /// Platform-neutral view of the message payload
    pub fn content(&self) -> MessageContent {
        if let Some(voice) = &self.voice {
            return MessageContent::Audio {
                file_id: voice.file_id.clone(),
            };
        }
        if let Some(audio) = &self.audio {
            return MessageContent::Audio {
                file_id: audio.file_id.clone(),
            };
        }
        if let Some(document) = &self.document {
            let is_audio = document
                .mime_type
                .as_deref()
                .is_some_and(|mime| mime.starts_with("audio/"));
            if is_audio {
                return MessageContent::Audio {
                    file_id: document.file_id.clone(),
                };
            }
        }
        match &self.text {
            Some(text) => MessageContent::Text(text.clone()),
            None => MessageContent::Other,
        }
    }

    /// File identifier of the voice (or audio fallback) attached to a sent message
    pub fn sent_voice_file_id(&self) -> Option<&str> {
        self.voice
            .as_ref()
            .map(|v| v.file_id.as_str())
            .or_else(|| self.audio.as_ref().map(|a| a.file_id.as_str()))
            .or_else(|| self.document.as_ref().map(|d| d.file_id.as_str()))
    }
}

impl Update {
    /// Convert into a dispatcher event; updates the bot does not handle yield None
    pub fn into_event(self) -> Option<Event> {
        if let Some(message) = self.message {
            // Channel posts have no sender; the chat stands in for it
            let sender_id = message.from.as_ref().map_or(message.chat.id, |u| u.id);
            return Some(Event::Message(IncomingMessage {
                chat_id: message.chat.id,
                sender_id,
                content: message.content(),
            }));
        }

        self.inline_query.map(|query| {
            Event::InlineQuery(IncomingInlineQuery {
                id: query.id,
                sender_id: query.from.id,
                query: query.query,
                offset: query.offset,
            })
        })
    }
}
