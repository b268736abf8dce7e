//! Integration tests for the add-clip wizard
//!
//! Drives `dispatcher::dispatch` with scripted events against a
//! `MockPlatform` and a temporary clip store.

mod helpers;

use blahrg_bot::dispatcher::dispatch;
use blahrg_bot::handlers::add_clip::{
    ALREADY_ADDING, CANCELLED, DUPLICATE_DESCRIPTION, PROMPT_CLIP, PROMPT_DESCRIPTION,
    REPROMPT_CLIP, REPROMPT_DESCRIPTION, SAVE_FAILED,
};
use blahrg_bot::handlers::PERMISSION_DENIED;
use blahrg_bot::platform::VoiceSource;
use blahrg_bot::wizard::{ConversationKey, WizardStep};
use chrono::{Duration, Utc};
use helpers::*;

const CHAT: i64 = 42;

fn key(user_id: i64) -> ConversationKey {
    ConversationKey {
        chat_id: CHAT,
        user_id,
    }
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_add_clip_end_to_end() {
    let (_dir, ctx) = create_test_context(None).await;
    let platform = MockPlatform::new();

    dispatch(&ctx, &platform, text(CHAT, OWNER, "/add")).await;
    assert_eq!(platform.last_reply().as_deref(), Some(PROMPT_DESCRIPTION));

    dispatch(&ctx, &platform, text(CHAT, OWNER, "Scream of terror")).await;
    assert_eq!(platform.last_reply().as_deref(), Some(PROMPT_CLIP));
    assert_eq!(
        ctx.sessions.current(key(OWNER)).await,
        Some(WizardStep::AwaitingClip {
            description: "Scream of terror".to_string()
        })
    );

    dispatch(&ctx, &platform, audio(CHAT, OWNER, "incoming-voice")).await;
    assert_eq!(
        platform.last_reply().as_deref(),
        Some("Clip \"Scream of terror\" added!")
    );

    // Raw bytes written under the slug
    let stored = ctx.media.read_clip("scream-of-terror.ogg").await.unwrap();
    assert_eq!(stored, DOWNLOADED_AUDIO);

    // The bot's own upload id is recorded, not the incoming one
    let voices = platform.voices();
    assert_eq!(voices.len(), 1);
    assert_eq!(voices[0].chat_id, CHAT);
    assert!(matches!(
        &voices[0].voice,
        VoiceSource::Upload { filename, bytes }
            if filename == "scream-of-terror.ogg" && bytes.as_slice() == DOWNLOADED_AUDIO
    ));

    let record = ctx
        .registry
        .store()
        .find("scream-of-terror.ogg")
        .await
        .unwrap()
        .expect("clip record should exist");
    assert_eq!(record.file_id.as_deref(), Some(voices[0].file_id.as_str()));
    assert_eq!(record.description, "Scream of terror");

    assert!(ctx.sessions.current(key(OWNER)).await.is_none());
    assert!(ctx.sessions.is_empty().await);
}

#[tokio::test]
async fn test_whitelisted_user_can_add() {
    let (_dir, ctx) = create_test_context(None).await;
    let platform = MockPlatform::new();

    dispatch(&ctx, &platform, text(CHAT, FRIEND, "/add")).await;
    dispatch(&ctx, &platform, text(CHAT, FRIEND, "Sigh")).await;
    dispatch(&ctx, &platform, audio(CHAT, FRIEND, "voice")).await;

    assert_eq!(platform.last_reply().as_deref(), Some("Clip \"Sigh\" added!"));
    assert!(ctx.registry.get_file_id("sigh.ogg").await.unwrap().is_some());
}

// ============================================================================
// Rejections and re-prompts
// ============================================================================

#[tokio::test]
async fn test_unauthorized_add_is_refused() {
    let (_dir, ctx) = create_test_context(None).await;
    let platform = MockPlatform::new();

    dispatch(&ctx, &platform, text(CHAT, STRANGER, "/add")).await;

    assert_eq!(platform.reply_texts(), vec![PERMISSION_DENIED.to_string()]);
    assert!(ctx.sessions.is_empty().await);

    // Follow-up text is not captured as a description
    dispatch(&ctx, &platform, text(CHAT, STRANGER, "Scream")).await;
    assert_eq!(platform.replies().len(), 1);
}

#[tokio::test]
async fn test_duplicate_description_reprompts() {
    let (_dir, ctx) = create_test_context(None).await;
    let platform = MockPlatform::new();

    ctx.registry
        .set_file_id("scream.ogg", "existing-id", Some("Scream"))
        .await
        .unwrap();

    dispatch(&ctx, &platform, text(CHAT, OWNER, "/add")).await;
    dispatch(&ctx, &platform, text(CHAT, OWNER, "Scream")).await;

    assert_eq!(platform.last_reply().as_deref(), Some(DUPLICATE_DESCRIPTION));
    assert_eq!(
        ctx.sessions.current(key(OWNER)).await,
        Some(WizardStep::AwaitingDescription)
    );

    // A novel description still goes through afterwards
    dispatch(&ctx, &platform, text(CHAT, OWNER, "Another scream")).await;
    assert_eq!(platform.last_reply().as_deref(), Some(PROMPT_CLIP));
}

#[tokio::test]
async fn test_invalid_input_keeps_step() {
    let (_dir, ctx) = create_test_context(None).await;
    let platform = MockPlatform::new();

    dispatch(&ctx, &platform, text(CHAT, OWNER, "/add")).await;

    // Non-text at AwaitingDescription, twice: same reply, same state
    dispatch(&ctx, &platform, sticker(CHAT, OWNER)).await;
    dispatch(&ctx, &platform, audio(CHAT, OWNER, "too-early")).await;
    assert_eq!(
        &platform.reply_texts()[1..],
        &[REPROMPT_DESCRIPTION.to_string(), REPROMPT_DESCRIPTION.to_string()]
    );
    assert_eq!(
        ctx.sessions.current(key(OWNER)).await,
        Some(WizardStep::AwaitingDescription)
    );

    dispatch(&ctx, &platform, text(CHAT, OWNER, "Gasp")).await;

    // Text at AwaitingClip re-prompts without changing the description
    dispatch(&ctx, &platform, text(CHAT, OWNER, "here it comes")).await;
    dispatch(&ctx, &platform, sticker(CHAT, OWNER)).await;
    let replies = platform.reply_texts();
    assert_eq!(&replies[replies.len() - 2..], &[REPROMPT_CLIP, REPROMPT_CLIP]);
    assert_eq!(
        ctx.sessions.current(key(OWNER)).await,
        Some(WizardStep::AwaitingClip {
            description: "Gasp".to_string()
        })
    );

    assert!(platform.voices().is_empty());
    assert_eq!(ctx.registry.store().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_second_add_is_rejected() {
    let (_dir, ctx) = create_test_context(None).await;
    let platform = MockPlatform::new();

    dispatch(&ctx, &platform, text(CHAT, OWNER, "/add")).await;
    dispatch(&ctx, &platform, text(CHAT, OWNER, "Yelp")).await;

    // While a wizard is active, /add is input to it, not a new wizard
    dispatch(&ctx, &platform, text(CHAT, OWNER, "/add")).await;
    assert_eq!(platform.last_reply().as_deref(), Some(REPROMPT_CLIP));
    assert_eq!(
        ctx.sessions.current(key(OWNER)).await,
        Some(WizardStep::AwaitingClip {
            description: "Yelp".to_string()
        })
    );

    // Direct start on the session table is refused as well
    assert!(!ctx.sessions.start(key(OWNER)).await);
    assert_eq!(ctx.sessions.len().await, 1);
}

#[tokio::test]
async fn test_already_adding_when_wizard_bypassed() {
    let (_dir, ctx) = create_test_context(None).await;
    let platform = MockPlatform::new();
    let message = blahrg_bot::platform::IncomingMessage {
        chat_id: CHAT,
        sender_id: OWNER,
        content: blahrg_bot::platform::MessageContent::Text("/add".to_string()),
    };

    blahrg_bot::handlers::add_clip::start(&ctx, &platform, &message)
        .await
        .unwrap();
    blahrg_bot::handlers::add_clip::start(&ctx, &platform, &message)
        .await
        .unwrap();

    assert_eq!(
        platform.reply_texts(),
        vec![PROMPT_DESCRIPTION.to_string(), ALREADY_ADDING.to_string()]
    );
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancel_from_awaiting_description() {
    let (_dir, ctx) = create_test_context(None).await;
    let platform = MockPlatform::new();

    dispatch(&ctx, &platform, text(CHAT, OWNER, "/add")).await;
    dispatch(&ctx, &platform, text(CHAT, OWNER, "/cancel")).await;

    assert_eq!(platform.last_reply().as_deref(), Some(CANCELLED));
    assert!(ctx.sessions.is_empty().await);

    // Later text is no longer consumed by the wizard
    dispatch(&ctx, &platform, text(CHAT, OWNER, "Scream")).await;
    assert_eq!(platform.replies().len(), 2);
}

#[tokio::test]
async fn test_cancel_from_awaiting_clip_leaves_store_untouched() {
    let (_dir, ctx) = create_test_context(None).await;
    let platform = MockPlatform::new();

    dispatch(&ctx, &platform, text(CHAT, OWNER, "/add")).await;
    dispatch(&ctx, &platform, text(CHAT, OWNER, "Howl")).await;
    dispatch(&ctx, &platform, text(CHAT, OWNER, "/cancel@blahrgbot")).await;

    assert_eq!(platform.last_reply().as_deref(), Some(CANCELLED));
    assert!(ctx.sessions.is_empty().await);
    assert_eq!(ctx.registry.store().count().await.unwrap(), 0);
    assert!(ctx.media.list_clips().await.unwrap().is_empty());

    // Audio after cancelling is ignored
    dispatch(&ctx, &platform, audio(CHAT, OWNER, "late-voice")).await;
    assert!(platform.voices().is_empty());
}

// ============================================================================
// Failures and collisions
// ============================================================================

#[tokio::test]
async fn test_download_failure_keeps_awaiting_clip() {
    let (_dir, ctx) = create_test_context(None).await;
    let platform = MockPlatform::new();

    dispatch(&ctx, &platform, text(CHAT, OWNER, "/add")).await;
    dispatch(&ctx, &platform, text(CHAT, OWNER, "Groan")).await;

    platform.set_fail_downloads(true);
    dispatch(&ctx, &platform, audio(CHAT, OWNER, "voice")).await;

    assert_eq!(platform.last_reply().as_deref(), Some(SAVE_FAILED));
    assert_eq!(
        ctx.sessions.current(key(OWNER)).await,
        Some(WizardStep::AwaitingClip {
            description: "Groan".to_string()
        })
    );
    assert_eq!(ctx.registry.store().count().await.unwrap(), 0);

    // Resending after the platform recovers completes the wizard
    platform.set_fail_downloads(false);
    dispatch(&ctx, &platform, audio(CHAT, OWNER, "voice")).await;

    assert_eq!(platform.last_reply().as_deref(), Some("Clip \"Groan\" added!"));
    assert!(ctx.registry.get_file_id("groan.ogg").await.unwrap().is_some());
}

#[tokio::test]
async fn test_slug_collision_gets_suffix() {
    let (_dir, ctx) = create_test_context(None).await;
    let platform = MockPlatform::new();

    for description in ["Hello there", "hello, there!"] {
        dispatch(&ctx, &platform, text(CHAT, OWNER, "/add")).await;
        dispatch(&ctx, &platform, text(CHAT, OWNER, description)).await;
        dispatch(&ctx, &platform, audio(CHAT, OWNER, "voice")).await;
    }

    let first = ctx.registry.store().find("hello-there.ogg").await.unwrap().unwrap();
    let second = ctx.registry.store().find("hello-there-2.ogg").await.unwrap().unwrap();
    assert_eq!(first.description, "Hello there");
    assert_eq!(second.description, "hello, there!");
    assert_ne!(first.file_id, second.file_id);

    assert_eq!(
        ctx.media.list_clips().await.unwrap(),
        vec!["hello-there-2.ogg".to_string(), "hello-there.ogg".to_string()]
    );
}

#[tokio::test]
async fn test_unrefreshed_media_file_is_not_overwritten() {
    let (_dir, ctx) = create_test_context(None).await;
    let platform = MockPlatform::new();

    // On disk but never uploaded, so the store does not know it
    assert!(ctx
        .media
        .create_clip("scream.ogg", b"dropped in by hand")
        .await
        .unwrap());

    dispatch(&ctx, &platform, text(CHAT, OWNER, "/add")).await;
    dispatch(&ctx, &platform, text(CHAT, OWNER, "Scream")).await;
    dispatch(&ctx, &platform, audio(CHAT, OWNER, "voice")).await;

    assert_eq!(platform.last_reply().as_deref(), Some("Clip \"Scream\" added!"));
    assert_eq!(
        ctx.media.read_clip("scream.ogg").await.unwrap(),
        b"dropped in by hand"
    );
    assert_eq!(
        ctx.media.read_clip("scream-2.ogg").await.unwrap(),
        DOWNLOADED_AUDIO
    );

    let record = ctx.registry.store().find("scream-2.ogg").await.unwrap().unwrap();
    assert_eq!(record.description, "Scream");
    assert!(ctx.registry.get_file_id("scream.ogg").await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_upload_leaves_no_binary_behind() {
    let (_dir, ctx) = create_test_context(None).await;
    let platform = MockPlatform::new();
    platform.fail_upload_of("groan.ogg");

    dispatch(&ctx, &platform, text(CHAT, OWNER, "/add")).await;
    dispatch(&ctx, &platform, text(CHAT, OWNER, "Groan")).await;
    dispatch(&ctx, &platform, audio(CHAT, OWNER, "voice")).await;

    assert_eq!(platform.last_reply().as_deref(), Some(SAVE_FAILED));
    assert!(ctx.media.list_clips().await.unwrap().is_empty());
    assert_eq!(ctx.registry.store().count().await.unwrap(), 0);

    // The resend reuses the same filename
    platform.allow_upload_of("groan.ogg");
    dispatch(&ctx, &platform, audio(CHAT, OWNER, "voice")).await;

    assert_eq!(platform.last_reply().as_deref(), Some("Clip \"Groan\" added!"));
    assert_eq!(ctx.media.list_clips().await.unwrap(), vec!["groan.ogg".to_string()]);
}

// ============================================================================
// Conversation isolation and expiry
// ============================================================================

#[tokio::test]
async fn test_wizards_are_isolated_per_user_and_chat() {
    let (_dir, ctx) = create_test_context(None).await;
    let platform = MockPlatform::new();

    dispatch(&ctx, &platform, text(CHAT, OWNER, "/add")).await;

    // Another group member's text does not advance the owner's wizard
    dispatch(&ctx, &platform, text(CHAT, FRIEND, "Not mine")).await;
    assert_eq!(
        ctx.sessions.current(key(OWNER)).await,
        Some(WizardStep::AwaitingDescription)
    );
    assert_eq!(platform.replies().len(), 1);

    // Same user, different chat: independent
    dispatch(&ctx, &platform, text(CHAT + 1, OWNER, "Elsewhere")).await;
    assert_eq!(platform.replies().len(), 1);

    // A second wizard in another chat runs alongside the first
    dispatch(&ctx, &platform, text(CHAT + 1, OWNER, "/add")).await;
    assert_eq!(ctx.sessions.len().await, 2);
}

#[tokio::test]
async fn test_expired_wizard_is_discarded() {
    let (_dir, ctx) = create_test_context(Some(60)).await;
    let platform = MockPlatform::new();

    assert!(
        ctx.sessions
            .start_at(key(OWNER), Utc::now() - Duration::minutes(5))
            .await
    );
    assert!(
        ctx.sessions
            .advance(
                key(OWNER),
                WizardStep::AwaitingClip {
                    description: "Stale".to_string(),
                },
            )
            .await
    );

    // Audio is no longer consumed by the stale wizard
    dispatch(&ctx, &platform, audio(CHAT, OWNER, "voice")).await;
    assert!(platform.voices().is_empty());
    assert!(ctx.sessions.is_empty().await);

    // A fresh /add is accepted
    dispatch(&ctx, &platform, text(CHAT, OWNER, "/add")).await;
    assert_eq!(platform.last_reply().as_deref(), Some(PROMPT_DESCRIPTION));
}

#[tokio::test]
async fn test_concurrent_wizards_in_different_chats() {
    let (_dir, ctx) = create_test_context(None).await;
    let ctx = std::sync::Arc::new(ctx);
    let platform = std::sync::Arc::new(MockPlatform::new());

    let mut tasks = tokio::task::JoinSet::new();
    for chat in 1..=5i64 {
        let ctx = ctx.clone();
        let platform = platform.clone();
        tasks.spawn(async move {
            dispatch(&ctx, &*platform, text(chat, OWNER, "/add")).await;
            dispatch(&ctx, &*platform, text(chat, OWNER, &format!("Clip {}", chat))).await;
            dispatch(&ctx, &*platform, audio(chat, OWNER, "voice")).await;
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }

    assert!(ctx.sessions.is_empty().await);
    assert_eq!(ctx.registry.list_all().await.unwrap().len(), 5);
    for chat in 1..=5 {
        let filename = format!("clip-{}.ogg", chat);
        assert!(ctx.registry.get_file_id(&filename).await.unwrap().is_some());
    }
}
