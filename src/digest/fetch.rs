//! Backward, cursor-paginated retrieval of one channel's messages in a window.

use super::sanitize::is_reportable;
use super::window::TimeWindow;
use crate::platform::{Channel, ChatPlatform, Message, PlatformError};
use std::time::Duration;

/// Collect the reportable messages of `channel` inside `window`, oldest first.
///
/// Pages are requested newest-first starting at the cursor for `window.end`.
/// Scanning stops at the first message older than `window.start`.
pub async fn fetch_window(
    platform: &dyn ChatPlatform,
    channel: &Channel,
    window: &TimeWindow,
    page_size: u8,
) -> Result<Vec<Message>, PlatformError> {
    let mut cursor = platform.cursor_for(window.end);
    let mut collected = Vec::new();
    let mut pages = 0usize;

    loop {
        let page = platform
            .messages_before(channel.id, cursor, page_size)
            .await?;
        pages += 1;
        if page.is_empty() {
            break;
        }

        let oldest = page.iter().map(|m| m.id).min();
        let mut exhausted = false;
        for msg in page {
            if msg.timestamp < window.start {
                exhausted = true;
                break;
            }
            if is_reportable(&msg) && window.contains(msg.timestamp) {
                collected.push(msg);
            }
        }
        if exhausted {
            break;
        }

        match oldest {
            Some(id) if id < cursor => cursor = id,
            // A page that does not move the cursor back would repeat forever.
            _ => {
                tracing::warn!(
                    "Channel #{} returned a page at or after cursor {}, stopping",
                    channel.name,
                    cursor
                );
                break;
            }
        }
    }

    collected.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
    tracing::debug!(
        "Fetched {} message(s) from #{} in {} page(s)",
        collected.len(),
        channel.name,
        pages
    );
    Ok(collected)
}

/// [`fetch_window`] bounded by a hard timeout.
pub async fn fetch_window_with_timeout(
    platform: &dyn ChatPlatform,
    channel: &Channel,
    window: &TimeWindow,
    page_size: u8,
    timeout: Duration,
) -> Result<Vec<Message>, PlatformError> {
    tokio::time::timeout(timeout, fetch_window(platform, channel, window, page_size))
        .await
        .map_err(|_| PlatformError::Timeout(timeout))?
}
