//! `/add`: the add-clip wizard
//!
//! 1. `/add` (authorized principals only) starts the wizard
//! 2. AwaitingDescription: a novel text description is captured
//! 3. AwaitingClip: the audio is downloaded, stored under the description's
//!    slug, re-uploaded to get a durable file_id and recorded
//!
//! Invalid input re-prompts without changing state; `/cancel` ends the
//! wizard from either step without touching the store.

use crate::handlers::PERMISSION_DENIED;
use crate::platform::{ChatPlatform, IncomingMessage, VoiceSource};
use crate::wizard::{ConversationKey, WizardInput, WizardStep};
use crate::{BotContext, BotResult};
use blahrg_common::slug::filename_candidates;
use tracing::{debug, error, info, warn};

pub const PROMPT_DESCRIPTION: &str =
    "Send me a short description for the new clip, or /cancel to abort.";
pub const REPROMPT_DESCRIPTION: &str =
    "Please send the description as plain text, or /cancel to abort.";
pub const DUPLICATE_DESCRIPTION: &str =
    "A clip with that description already exists. Send a different description, or /cancel to abort.";
pub const PROMPT_CLIP: &str = "Got it! Now send me the voice clip, or /cancel to abort.";
pub const REPROMPT_CLIP: &str =
    "That is not a voice clip. Send a voice note or an audio file, or /cancel to abort.";
pub const CANCELLED: &str = "Cancelled. No clip was added.";
pub const NOTHING_TO_CANCEL: &str = "There is nothing to cancel.";
pub const ALREADY_ADDING: &str =
    "You are already adding a clip. Finish it or send /cancel first.";
pub const SAVE_FAILED: &str =
    "Something went wrong while saving the clip. Send it again, or /cancel to abort.";

/// Handle `/add`
pub async fn start(
    ctx: &BotContext,
    platform: &dyn ChatPlatform,
    message: &IncomingMessage,
) -> BotResult<()> {
    if !ctx.is_authorized(message.sender_id) {
        warn!(
            chat_id = message.chat_id,
            user_id = message.sender_id,
            "Unauthorized /add"
        );
        platform.reply(message.chat_id, PERMISSION_DENIED).await?;
        return Ok(());
    }

    let key = ConversationKey::of(message);
    if !ctx.sessions.start(key).await {
        platform.reply(message.chat_id, ALREADY_ADDING).await?;
        return Ok(());
    }

    info!(chat_id = key.chat_id, user_id = key.user_id, "Add-clip wizard started");
    platform.reply(message.chat_id, PROMPT_DESCRIPTION).await?;
    Ok(())
}

/// Handle `/cancel` outside of a wizard
pub async fn cancel_without_wizard(
    platform: &dyn ChatPlatform,
    message: &IncomingMessage,
) -> BotResult<()> {
    platform.reply(message.chat_id, NOTHING_TO_CANCEL).await?;
    Ok(())
}

/// Advance the wizard of `message`'s conversation, currently at `step`
pub async fn handle_step(
    ctx: &BotContext,
    platform: &dyn ChatPlatform,
    message: &IncomingMessage,
    step: WizardStep,
) -> BotResult<()> {
    let key = ConversationKey::of(message);
    let input = WizardInput::classify(&message.content);

    if input == WizardInput::Cancel {
        ctx.sessions.finish(key).await;
        info!(chat_id = key.chat_id, user_id = key.user_id, "Add-clip wizard cancelled");
        platform.reply(message.chat_id, CANCELLED).await?;
        return Ok(());
    }

    match step {
        WizardStep::AwaitingDescription => on_description(ctx, platform, key, input).await,
        WizardStep::AwaitingClip { description } => {
            on_clip(ctx, platform, key, input, description).await
        }
    }
}

async fn on_description(
    ctx: &BotContext,
    platform: &dyn ChatPlatform,
    key: ConversationKey,
    input: WizardInput,
) -> BotResult<()> {
    let WizardInput::Text(description) = input else {
        platform.reply(key.chat_id, REPROMPT_DESCRIPTION).await?;
        return Ok(());
    };

    if ctx.registry.description_exists(&description).await? {
        platform.reply(key.chat_id, DUPLICATE_DESCRIPTION).await?;
        return Ok(());
    }

    if ctx
        .sessions
        .advance(key, WizardStep::AwaitingClip { description })
        .await
    {
        platform.reply(key.chat_id, PROMPT_CLIP).await?;
    }
    Ok(())
}

async fn on_clip(
    ctx: &BotContext,
    platform: &dyn ChatPlatform,
    key: ConversationKey,
    input: WizardInput,
    description: String,
) -> BotResult<()> {
    let WizardInput::Audio { file_id } = input else {
        platform.reply(key.chat_id, REPROMPT_CLIP).await?;
        return Ok(());
    };

    match save_clip(ctx, platform, key, &file_id, &description).await {
        Ok(filename) => {
            ctx.sessions.finish(key).await;
            info!(
                chat_id = key.chat_id,
                filename = %filename,
                description = %description,
                "Clip added"
            );
            platform
                .reply(key.chat_id, &format!("Clip \"{}\" added!", description))
                .await?;
        }
        Err(e) => {
            // The wizard stays at AwaitingClip so the user can resend
            error!(
                chat_id = key.chat_id,
                description = %description,
                "Failed to save clip: {}",
                e
            );
            platform.reply(key.chat_id, SAVE_FAILED).await?;
        }
    }
    Ok(())
}

/// Download, store, re-upload and record one clip; returns its filename
///
/// The binary is removed again if the upload or the record write fails, so
/// a resend starts from the same filename.
async fn save_clip(
    ctx: &BotContext,
    platform: &dyn ChatPlatform,
    key: ConversationKey,
    file_id: &str,
    description: &str,
) -> BotResult<String> {
    let file_path = platform.get_file(file_id).await?;
    let bytes = platform.download_file(&file_path).await?;

    let filename = store_binary(ctx, description, &bytes).await?;

    if let Err(e) = upload_and_record(ctx, platform, key, &filename, bytes, description).await {
        if let Err(cleanup) = ctx.media.remove_clip(&filename).await {
            warn!(filename = %filename, "Failed to remove unsaved clip: {}", cleanup);
        }
        return Err(e);
    }

    Ok(filename)
}

/// Write the binary under the first filename free in both the store and
/// the media directory
///
/// Files already on disk (e.g. not yet refreshed) are never overwritten.
async fn store_binary(ctx: &BotContext, description: &str, bytes: &[u8]) -> BotResult<String> {
    for candidate in filename_candidates(description) {
        if ctx.registry.filename_taken(&candidate).await? {
            continue;
        }
        if ctx.media.create_clip(&candidate, bytes).await? {
            return Ok(candidate);
        }
        debug!(filename = %candidate, "Filename already used in media directory");
    }

    Err(blahrg_common::Error::Internal(format!(
        "no free filename for description {:?}",
        description
    ))
    .into())
}

async fn upload_and_record(
    ctx: &BotContext,
    platform: &dyn ChatPlatform,
    key: ConversationKey,
    filename: &str,
    bytes: Vec<u8>,
    description: &str,
) -> BotResult<()> {
    // Only the id of the bot's own upload is durable for cached replay
    let new_file_id = platform
        .send_voice(
            key.chat_id,
            VoiceSource::Upload {
                filename: filename.to_string(),
                bytes,
            },
        )
        .await?;

    ctx.registry
        .set_file_id(filename, &new_file_id, Some(description))
        .await?;
    Ok(())
}
