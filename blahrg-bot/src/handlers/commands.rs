//! Simple commands: `/start`, `/help`, `/me`, `/aaah`

use crate::platform::{ChatPlatform, IncomingMessage, VoiceSource};
use crate::{BotContext, BotResult};
use tracing::debug;

pub const HELP_TEXT: &str = "blahrgbot\n\n\
    Call me from any chat when in need!\n\n\
    /aaah - send the default clip\n\
    /add - add a new clip\n\
    /cancel - abort adding a clip\n\
    /me - show your user id\n\
    /refresh - upload new clips from the media directory";

pub const DEFAULT_CLIP_MISSING: &str =
    "The default clip has not been uploaded yet. Try /refresh first.";

/// `/start` and `/help`
pub async fn handle_help(platform: &dyn ChatPlatform, message: &IncomingMessage) -> BotResult<()> {
    platform.reply(message.chat_id, HELP_TEXT).await?;
    Ok(())
}

/// `/me`: the sender's identity, for the owner/whitelist settings
pub async fn handle_me(platform: &dyn ChatPlatform, message: &IncomingMessage) -> BotResult<()> {
    platform
        .reply(message.chat_id, &message.sender_id.to_string())
        .await?;
    Ok(())
}

/// `/aaah`: replay the default clip by cached reference
pub async fn handle_default_clip(
    ctx: &BotContext,
    platform: &dyn ChatPlatform,
    message: &IncomingMessage,
) -> BotResult<()> {
    match ctx.registry.get_default_clip().await? {
        Some(file_id) => {
            debug!(chat_id = message.chat_id, "Sending default clip");
            platform
                .send_voice(message.chat_id, VoiceSource::Cached(file_id))
                .await?;
        }
        None => {
            platform.reply(message.chat_id, DEFAULT_CLIP_MISSING).await?;
        }
    }
    Ok(())
}
