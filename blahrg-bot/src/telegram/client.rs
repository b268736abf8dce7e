//! Telegram Bot API client
//!
//! Thin `reqwest` wrapper: JSON bodies for ordinary calls, multipart for
//! voice uploads. Requests share one rate limiter so bursts (e.g. a large
//! `/refresh`) stay under the Bot API flood limits.

use crate::platform::{CachedVoiceResult, ChatId, ChatPlatform, PlatformError, VoiceSource};
use crate::telegram::types::{ApiResponse, File, Message, Update, User};
use async_trait::async_trait;
use blahrg_common::config::TelegramConfig;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("blahrg-bot/", env!("CARGO_PKG_VERSION"));

/// Bot API global limit is about 30 messages per second
const REQUESTS_PER_SECOND: u32 = 30;

/// Timeout for ordinary requests; long polls add the poll timeout on top
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long clients may cache inline query answers
const INLINE_CACHE_SECS: u32 = 60;

/// Telegram Bot API client
pub struct TelegramClient {
    http_client: reqwest::Client,
    /// `{api_url}/bot{token}`
    method_base: String,
    /// `{api_url}/file/bot{token}`
    file_base: String,
    rate_limiter: DefaultDirectRateLimiter,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self, PlatformError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PlatformError::Network(e.without_url().to_string()))?;

        let api_url = config.api_url.trim_end_matches('/');
        let quota = Quota::per_second(
            NonZeroU32::new(REQUESTS_PER_SECOND).unwrap_or(NonZeroU32::MIN),
        );

        Ok(Self {
            http_client,
            method_base: format!("{}/bot{}", api_url, config.token),
            file_base: format!("{}/file/bot{}", api_url, config.token),
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    /// Identity of the bot account (token check at startup)
    pub async fn get_me(&self) -> Result<User, PlatformError> {
        self.call("getMe", &json!({}), REQUEST_TIMEOUT).await
    }

    /// Long-poll for updates starting at `offset`
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, PlatformError> {
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message", "inline_query"],
        });

        self.call(
            "getUpdates",
            &body,
            REQUEST_TIMEOUT + Duration::from_secs(timeout_secs),
        )
        .await
    }

    async fn call<T, B>(&self, method: &str, body: &B, timeout: Duration) -> Result<T, PlatformError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.rate_limiter.until_ready().await;
        debug!(method, "Calling Bot API");

        let response = self
            .http_client
            .post(format!("{}/{}", self.method_base, method))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(network_error)?;

        Self::decode(response).await
    }

    async fn call_multipart<T>(&self, method: &str, form: Form) -> Result<T, PlatformError>
    where
        T: DeserializeOwned,
    {
        self.rate_limiter.until_ready().await;
        debug!(method, "Calling Bot API (multipart)");

        let response = self
            .http_client
            .post(format!("{}/{}", self.method_base, method))
            .timeout(REQUEST_TIMEOUT)
            .multipart(form)
            .send()
            .await
            .map_err(network_error)?;

        Self::decode(response).await
    }

    /// Unwrap the `{ ok, result }` envelope
    ///
    /// Error statuses still carry the envelope, so the body is decoded first
    /// and the HTTP status is only used when it is not.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PlatformError> {
        let status = response.status();
        let bytes = response.bytes().await.map_err(network_error)?;

        let envelope: ApiResponse<T> = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => return Err(PlatformError::Parse(e.to_string())),
            Err(_) => {
                return Err(PlatformError::Api {
                    code: i64::from(status.as_u16()),
                    description: status.canonical_reason().unwrap_or("unknown").to_string(),
                })
            }
        };

        if !envelope.ok {
            return Err(PlatformError::Api {
                code: envelope.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                description: envelope.description.unwrap_or_default(),
            });
        }

        envelope.result.ok_or(PlatformError::MissingField("result"))
    }
}

/// Strip the URL from transport errors; it contains the bot token
fn network_error(e: reqwest::Error) -> PlatformError {
    PlatformError::Network(e.without_url().to_string())
}

#[async_trait]
impl ChatPlatform for TelegramClient {
    async fn reply(&self, chat_id: ChatId, text: &str) -> Result<(), PlatformError> {
        let _sent: Message = self
            .call(
                "sendMessage",
                &json!({ "chat_id": chat_id, "text": text }),
                REQUEST_TIMEOUT,
            )
            .await?;
        Ok(())
    }

    async fn send_voice(&self, chat_id: ChatId, voice: VoiceSource) -> Result<String, PlatformError> {
        let sent: Message = match voice {
            VoiceSource::Upload { filename, bytes } => {
                let part = Part::bytes(bytes)
                    .file_name(filename)
                    .mime_str("audio/ogg")
                    .map_err(|e| PlatformError::Parse(e.to_string()))?;
                let form = Form::new()
                    .text("chat_id", chat_id.to_string())
                    .part("voice", part);
                self.call_multipart("sendVoice", form).await?
            }
            VoiceSource::Cached(file_id) => {
                self.call(
                    "sendVoice",
                    &json!({ "chat_id": chat_id, "voice": file_id }),
                    REQUEST_TIMEOUT,
                )
                .await?
            }
        };

        sent.sent_voice_file_id()
            .map(str::to_string)
            .ok_or(PlatformError::MissingField("voice"))
    }

    async fn get_file(&self, file_id: &str) -> Result<String, PlatformError> {
        let file: File = self
            .call("getFile", &json!({ "file_id": file_id }), REQUEST_TIMEOUT)
            .await?;

        file.file_path.ok_or(PlatformError::MissingField("file_path"))
    }

    async fn download_file(&self, file_path: &str) -> Result<Vec<u8>, PlatformError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .http_client
            .get(format!("{}/{}", self.file_base, file_path))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlatformError::Api {
                code: i64::from(status.as_u16()),
                description: format!("file download failed for {}", file_path),
            });
        }

        let bytes = response.bytes().await.map_err(network_error)?;
        Ok(bytes.to_vec())
    }

    async fn answer_inline_query(
        &self,
        query_id: &str,
        results: Vec<CachedVoiceResult>,
        next_offset: &str,
    ) -> Result<(), PlatformError> {
        let body = json!({
            "inline_query_id": query_id,
            "results": results,
            "cache_time": INLINE_CACHE_SECS,
            "next_offset": next_offset,
        });

        let _answered: bool = self.call("answerInlineQuery", &body, REQUEST_TIMEOUT).await?;
        Ok(())
    }
}
