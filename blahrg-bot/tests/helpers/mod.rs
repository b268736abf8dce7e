//! Shared test helpers
//!
//! `MockPlatform` records everything the bot sends and hands out
//! predictable file ids. `create_test_context` builds a `BotContext` over a
//! temporary clip store and media directory.

#![allow(dead_code)]

use async_trait::async_trait;
use blahrg_bot::platform::{
    CachedVoiceResult, ChatId, ChatPlatform, Event, IncomingInlineQuery, IncomingMessage,
    MessageContent, PlatformError, UserId, VoiceSource,
};
use blahrg_bot::BotContext;
use blahrg_common::config::TomlConfig;
use blahrg_common::db::init_database;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

pub const OWNER: UserId = 1000;
pub const FRIEND: UserId = 2000;
pub const STRANGER: UserId = 3000;

/// Bytes served for every download
pub const DOWNLOADED_AUDIO: &[u8] = b"OggS fake voice payload";

/// One inline answer the bot sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAnswer {
    pub query_id: String,
    pub results: Vec<CachedVoiceResult>,
    pub next_offset: String,
}

/// One voice message the bot sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentVoice {
    pub chat_id: ChatId,
    pub voice: VoiceSource,
    pub file_id: String,
}

#[derive(Debug, Default)]
pub struct MockPlatform {
    replies: Mutex<Vec<(ChatId, String)>>,
    voices: Mutex<Vec<SentVoice>>,
    inline_answers: Mutex<Vec<InlineAnswer>>,
    uploads: AtomicUsize,
    fail_downloads: AtomicBool,
    failing_uploads: Mutex<HashSet<String>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `download_file` call fail until reset
    pub fn set_fail_downloads(&self, fail: bool) {
        self.fail_downloads.store(fail, Ordering::SeqCst);
    }

    /// Make uploads of `filename` fail
    pub fn fail_upload_of(&self, filename: &str) {
        self.failing_uploads
            .lock()
            .unwrap()
            .insert(filename.to_string());
    }

    /// Let uploads of `filename` succeed again
    pub fn allow_upload_of(&self, filename: &str) {
        self.failing_uploads.lock().unwrap().remove(filename);
    }

    pub fn replies(&self) -> Vec<(ChatId, String)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn reply_texts(&self) -> Vec<String> {
        self.replies().into_iter().map(|(_, text)| text).collect()
    }

    pub fn last_reply(&self) -> Option<String> {
        self.reply_texts().pop()
    }

    pub fn voices(&self) -> Vec<SentVoice> {
        self.voices.lock().unwrap().clone()
    }

    pub fn inline_answers(&self) -> Vec<InlineAnswer> {
        self.inline_answers.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn reply(&self, chat_id: ChatId, text: &str) -> Result<(), PlatformError> {
        self.replies
            .lock()
            .unwrap()
            .push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_voice(&self, chat_id: ChatId, voice: VoiceSource) -> Result<String, PlatformError> {
        let file_id = match &voice {
            VoiceSource::Upload { filename, .. } => {
                if self.failing_uploads.lock().unwrap().contains(filename) {
                    return Err(PlatformError::Api {
                        code: 400,
                        description: format!("Bad Request: cannot upload {}", filename),
                    });
                }
                let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
                format!("uploaded-{}-{}", n, filename)
            }
            VoiceSource::Cached(file_id) => file_id.clone(),
        };

        self.voices.lock().unwrap().push(SentVoice {
            chat_id,
            voice,
            file_id: file_id.clone(),
        });
        Ok(file_id)
    }

    async fn get_file(&self, file_id: &str) -> Result<String, PlatformError> {
        Ok(format!("voice/{}.oga", file_id))
    }

    async fn download_file(&self, _file_path: &str) -> Result<Vec<u8>, PlatformError> {
        if self.fail_downloads.load(Ordering::SeqCst) {
            return Err(PlatformError::Network("connection reset".to_string()));
        }
        Ok(DOWNLOADED_AUDIO.to_vec())
    }

    async fn answer_inline_query(
        &self,
        query_id: &str,
        results: Vec<CachedVoiceResult>,
        next_offset: &str,
    ) -> Result<(), PlatformError> {
        self.inline_answers.lock().unwrap().push(InlineAnswer {
            query_id: query_id.to_string(),
            results,
            next_offset: next_offset.to_string(),
        });
        Ok(())
    }
}

/// Build a context over a fresh temporary store
///
/// Returns (TempDir, BotContext) - TempDir must be kept alive for duration of test
pub async fn create_test_context(expiry_secs: Option<u64>) -> (TempDir, BotContext) {
    let temp_dir = TempDir::new().unwrap();
    let media = temp_dir.path().join("media");
    let db = temp_dir.path().join("blahrg.db");

    let wizard = match expiry_secs {
        Some(secs) => format!("[wizard]\nexpiry_secs = {}\n", secs),
        None => String::new(),
    };
    let toml = format!(
        r#"
[telegram]
token = "123456:TEST"
owner = {owner}
whitelist = [{friend}]

[media]
path = "{media}"

[db]
path = "{db}"

{wizard}
"#,
        owner = OWNER,
        friend = FRIEND,
        media = media.display(),
        db = db.display(),
        wizard = wizard,
    );

    let config = TomlConfig::parse(&toml).unwrap();
    let pool = init_database(&config.db.path).await.unwrap();
    let ctx = BotContext::new(pool, config);
    ctx.media.ensure_exists().await.unwrap();

    (temp_dir, ctx)
}

pub fn text(chat_id: ChatId, sender_id: UserId, text: &str) -> Event {
    Event::Message(IncomingMessage {
        chat_id,
        sender_id,
        content: MessageContent::Text(text.to_string()),
    })
}

pub fn audio(chat_id: ChatId, sender_id: UserId, file_id: &str) -> Event {
    Event::Message(IncomingMessage {
        chat_id,
        sender_id,
        content: MessageContent::Audio {
            file_id: file_id.to_string(),
        },
    })
}

pub fn sticker(chat_id: ChatId, sender_id: UserId) -> Event {
    Event::Message(IncomingMessage {
        chat_id,
        sender_id,
        content: MessageContent::Other,
    })
}

pub fn inline_query(id: &str, sender_id: UserId, query: &str) -> Event {
    inline_query_page(id, sender_id, query, "")
}

pub fn inline_query_page(id: &str, sender_id: UserId, query: &str, offset: &str) -> Event {
    Event::InlineQuery(IncomingInlineQuery {
        id: id.to_string(),
        sender_id,
        query: query.to_string(),
        offset: offset.to_string(),
    })
}
