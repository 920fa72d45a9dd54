//! Sequential, rate-limited, best-effort posting.

use crate::platform::ChatPlatform;
use std::time::Duration;

/// Outcome of one dispatch: indices into the post list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: Vec<usize>,
    pub failed: Vec<usize>,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Post `posts` to `channel_id` in order, waiting `delay` between posts.
/// A failed post is logged and skipped; it is not retried.
pub async fn dispatch(
    platform: &dyn ChatPlatform,
    channel_id: u64,
    posts: &[String],
    delay: Duration,
) -> DispatchReport {
    let mut report = DispatchReport::default();

    for (index, post) in posts.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(delay).await;
        }
        match platform.post(channel_id, post).await {
            Ok(()) => report.delivered.push(index),
            Err(e) => {
                tracing::warn!("Post {}/{} failed: {}", index + 1, posts.len(), e);
                report.failed.push(index);
            }
        }
    }

    tracing::info!(
        "Delivered {}/{} post(s) to {} channel {}{}",
        report.delivered.len(),
        posts.len(),
        platform.name(),
        channel_id,
        if report.failed.is_empty() {
            String::new()
        } else {
            format!(" (failed: {:?})", report.failed)
        }
    );
    report
}
