//! `/refresh`: upload clips from the media directory
//!
//! Every `.ogg` file in the media directory whose filename has no file_id yet is
//! sent as a voice message to the requesting chat and the returned id is
//! recorded. A failing file is logged and skipped; the rest still upload.

use crate::handlers::PERMISSION_DENIED;
use crate::platform::{ChatId, ChatPlatform, IncomingMessage, VoiceSource};
use crate::{BotContext, BotResult};
use tracing::{error, info, warn};

/// Outcome of one refresh pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub uploaded: usize,
    pub already_known: usize,
    pub failed: usize,
}

impl RefreshSummary {
    pub fn message(&self) -> String {
        let mut text = format!(
            "Clips refreshed! {} new, {} already known.",
            self.uploaded, self.already_known
        );
        if self.failed > 0 {
            text.push_str(&format!(" {} failed, check the logs.", self.failed));
        }
        text
    }
}

pub async fn handle_refresh(
    ctx: &BotContext,
    platform: &dyn ChatPlatform,
    message: &IncomingMessage,
) -> BotResult<()> {
    if !ctx.is_authorized(message.sender_id) {
        warn!(
            chat_id = message.chat_id,
            user_id = message.sender_id,
            "Unauthorized /refresh"
        );
        platform.reply(message.chat_id, PERMISSION_DENIED).await?;
        return Ok(());
    }

    let summary = refresh_clips(ctx, platform, message.chat_id).await?;
    info!(
        uploaded = summary.uploaded,
        already_known = summary.already_known,
        failed = summary.failed,
        "Media directory refreshed"
    );

    platform.reply(message.chat_id, &summary.message()).await?;
    Ok(())
}

/// Upload every unknown clip to `chat_id`
///
/// Only listing the media directory is fatal; per-clip errors are counted.
pub async fn refresh_clips(
    ctx: &BotContext,
    platform: &dyn ChatPlatform,
    chat_id: ChatId,
) -> BotResult<RefreshSummary> {
    let mut summary = RefreshSummary::default();

    for filename in ctx.media.list_clips().await? {
        match upload_if_unknown(ctx, platform, chat_id, &filename).await {
            Ok(true) => summary.uploaded += 1,
            Ok(false) => summary.already_known += 1,
            Err(e) => {
                error!(filename = %filename, "Failed to upload clip: {}", e);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

async fn upload_if_unknown(
    ctx: &BotContext,
    platform: &dyn ChatPlatform,
    chat_id: ChatId,
    filename: &str,
) -> BotResult<bool> {
    if ctx.registry.get_file_id(filename).await?.is_some() {
        return Ok(false);
    }

    let bytes = ctx.media.read_clip(filename).await?;
    let file_id = platform
        .send_voice(
            chat_id,
            VoiceSource::Upload {
                filename: filename.to_string(),
                bytes,
            },
        )
        .await?;

    ctx.registry.set_file_id(filename, &file_id, None).await?;
    info!(filename, "Uploaded clip from media directory");
    Ok(true)
}
