//! Command dispatcher and long-polling loop
//!
//! Routing order for messages:
//! 1. An active wizard for the conversation consumes the message
//!    (including `/cancel`)
//! 2. Commands
//! 3. Everything else is ignored
//!
//! Every update runs in its own task, so independent chats are served
//! concurrently. Messages from one chat are chained and handled in arrival
//! order. Handler errors are logged here and never stop the loop.

use crate::handlers::{add_clip, commands, inline, refresh};
use crate::platform::{ChatId, ChatPlatform, Event, IncomingMessage};
use crate::telegram::TelegramClient;
use crate::wizard::ConversationKey;
use crate::{BotContext, BotResult};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Delay before polling again after a failed getUpdates
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How often expired wizards are swept when expiry is configured
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Bot commands the dispatcher understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Me,
    Add,
    Cancel,
    Refresh,
    DefaultClip,
}

impl Command {
    /// Parse the leading command of a message, ignoring any `@botname` suffix
    pub fn parse(text: &str) -> Option<Self> {
        let token = text.split_whitespace().next()?;
        let name = token.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or_default();

        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "me" => Some(Command::Me),
            "add" => Some(Command::Add),
            "cancel" => Some(Command::Cancel),
            "refresh" => Some(Command::Refresh),
            "aaah" => Some(Command::DefaultClip),
            _ => None,
        }
    }
}

/// Route one event to its handler
pub async fn dispatch(ctx: &BotContext, platform: &dyn ChatPlatform, event: Event) {
    match event {
        Event::Message(message) => {
            if let Err(e) = route_message(ctx, platform, &message).await {
                error!(
                    chat_id = message.chat_id,
                    user_id = message.sender_id,
                    "Handler failed: {}",
                    e
                );
            }
        }
        Event::InlineQuery(query) => inline::handle_inline_query(ctx, platform, &query).await,
    }
}

async fn route_message(
    ctx: &BotContext,
    platform: &dyn ChatPlatform,
    message: &IncomingMessage,
) -> BotResult<()> {
    if let Some(step) = ctx.sessions.current(ConversationKey::of(message)).await {
        return add_clip::handle_step(ctx, platform, message, step).await;
    }

    let Some(command) = message.text().and_then(Command::parse) else {
        debug!(chat_id = message.chat_id, "Ignoring message outside of a command");
        return Ok(());
    };

    debug!(chat_id = message.chat_id, ?command, "Dispatching command");
    match command {
        Command::Start | Command::Help => commands::handle_help(platform, message).await,
        Command::Me => commands::handle_me(platform, message).await,
        Command::Add => add_clip::start(ctx, platform, message).await,
        Command::Cancel => add_clip::cancel_without_wizard(platform, message).await,
        Command::Refresh => refresh::handle_refresh(ctx, platform, message).await,
        Command::DefaultClip => commands::handle_default_clip(ctx, platform, message).await,
    }
}

/// Per-chat task chains
///
/// A task spawned for a chat starts its work only after the previous task
/// for that chat has finished.
#[derive(Debug, Default)]
pub struct ChatQueues {
    tails: HashMap<ChatId, JoinHandle<()>>,
}

impl ChatQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `work` behind every earlier task of `chat_id`
    pub fn spawn<F>(&mut self, chat_id: ChatId, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let previous = self.tails.remove(&chat_id);
        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                // A panicked predecessor must not block the chat
                let _ = previous.await;
            }
            work.await;
        });
        self.tails.insert(chat_id, handle);
    }

    /// Forget chats whose last task has finished
    pub fn prune(&mut self) {
        self.tails.retain(|_, handle| !handle.is_finished());
    }

    /// Number of chats with a task still pending
    pub fn len(&self) -> usize {
        self.tails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tails.is_empty()
    }
}

/// Drop updates that queued up while the bot was offline
///
/// Returns the offset of the first update to process.
pub async fn skip_pending(client: &TelegramClient) -> BotResult<i64> {
    // A negative offset returns only the newest update and forgets older ones
    let updates = client.get_updates(-1, 0).await?;
    let offset = updates
        .iter()
        .map(|u| u.update_id + 1)
        .max()
        .unwrap_or(0);

    if offset > 0 {
        info!("Skipped pending updates up to id {}", offset - 1);
    }
    Ok(offset)
}

/// Periodically remove expired wizards until shutdown
pub fn spawn_session_sweeper(ctx: Arc<BotContext>, shutdown: CancellationToken) {
    if ctx.config.wizard.expiry_secs.is_none() {
        return;
    }

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let removed = ctx.sessions.sweep_expired().await;
                    if removed > 0 {
                        info!(removed, "Expired add-clip wizards discarded");
                    }
                }
            }
        }
    });
}

/// Long-poll Telegram and dispatch updates until `shutdown` is cancelled
pub async fn run(
    ctx: Arc<BotContext>,
    client: Arc<TelegramClient>,
    shutdown: CancellationToken,
) -> BotResult<()> {
    let poll_timeout = ctx.config.telegram.poll_timeout_secs;
    let mut offset = skip_pending(&client).await?;

    spawn_session_sweeper(ctx.clone(), shutdown.clone());
    info!("Polling for updates");

    let mut queues = ChatQueues::new();

    loop {
        let result = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = client.get_updates(offset, poll_timeout) => result,
        };

        let updates = match result {
            Ok(updates) => updates,
            Err(e) => {
                warn!("getUpdates failed, retrying in {:?}: {}", POLL_RETRY_DELAY, e);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                }
                continue;
            }
        };

        queues.prune();
        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some(event) = update.into_event() else {
                continue;
            };

            // Inline queries carry no conversation state and need no ordering
            let chat_id = match &event {
                Event::Message(message) => Some(message.chat_id),
                Event::InlineQuery(_) => None,
            };

            let ctx = ctx.clone();
            let client = client.clone();
            let work = async move {
                dispatch(&ctx, &*client, event).await;
            };

            match chat_id {
                Some(chat_id) => queues.spawn(chat_id, work),
                None => {
                    tokio::spawn(work);
                }
            }
        }
    }

    info!("Polling stopped");
    Ok(())
}
