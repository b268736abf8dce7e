//! Inline replay
//!
//! Answers inline queries with the stored clips as cached voice results,
//! 50 per page (the Bot API maximum). The query's offset selects the page
//! and the answer carries the offset of the next one.
//!
//! Failures never reach the platform as errors: listing failures fall back
//! to an empty answer, answer failures are only logged.

use crate::platform::{CachedVoiceResult, ChatPlatform, IncomingInlineQuery};
use crate::BotContext;
use tracing::{debug, error};

/// Most results the Bot API accepts in one inline answer
pub const MAX_INLINE_RESULTS: usize = 50;

/// One page of inline results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlinePage {
    pub results: Vec<CachedVoiceResult>,
    /// Empty on the last page
    pub next_offset: String,
}

/// Results for the page starting at `offset`; ids are positional indices
/// over the whole clip list
///
/// An empty or unparsable offset means the first page.
pub async fn build_results(ctx: &BotContext, offset: &str) -> blahrg_common::Result<InlinePage> {
    let start = offset.trim().parse::<usize>().unwrap_or(0);
    let clips = ctx.registry.list_all().await?;
    let total = clips.len();

    let results: Vec<CachedVoiceResult> = clips
        .into_iter()
        .enumerate()
        .skip(start)
        .take(MAX_INLINE_RESULTS)
        .map(|(index, clip)| CachedVoiceResult::new(index.to_string(), clip.file_id, clip.description))
        .collect();

    let end = start.saturating_add(results.len());
    let next_offset = if end < total {
        end.to_string()
    } else {
        String::new()
    };

    Ok(InlinePage {
        results,
        next_offset,
    })
}

pub async fn handle_inline_query(
    ctx: &BotContext,
    platform: &dyn ChatPlatform,
    query: &IncomingInlineQuery,
) {
    let page = match build_results(ctx, &query.offset).await {
        Ok(page) => page,
        Err(e) => {
            error!(query_id = %query.id, "Failed to list clips for inline query: {}", e);
            InlinePage::default()
        }
    };

    debug!(
        query_id = %query.id,
        user_id = query.sender_id,
        offset = %query.offset,
        results = page.results.len(),
        "Answering inline query"
    );

    if let Err(e) = platform
        .answer_inline_query(&query.id, page.results, &page.next_offset)
        .await
    {
        error!(query_id = %query.id, "Failed to answer inline query: {}", e);
    }
}
