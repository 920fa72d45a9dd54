pub mod discord;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Opaque, monotonically ordered message identifier used as a history cursor.
pub type Cursor = u64;

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Discord API error: {0}")]
    Discord(#[from] serenity::Error),
    #[error("Platform unavailable: {0}")]
    Unavailable(String),
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// A named grouping of channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub display_order: i64,
}

/// A text channel. `category_id` is `None` for channels outside any category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: u64,
    pub name: String,
    pub category_id: Option<u64>,
    pub display_order: i64,
}

/// Snapshot of a message taken at fetch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Cursor,
    pub author_name: String,
    pub is_automated: bool,
    pub timestamp: DateTime<Utc>,
    pub raw_content: String,
    pub reaction_count: u64,
}

/// Categories and text channels of one guild, in no particular order.
#[derive(Debug, Clone, Default)]
pub struct GuildLayout {
    pub categories: Vec<Category>,
    pub channels: Vec<Channel>,
}

/// Chat platform collaborator. Implement for each platform the digest reads from.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Enumerate categories and text channels with their ordering hints.
    async fn layout(&self) -> Result<GuildLayout, PlatformError>;

    /// Fetch up to `limit` messages strictly older than `before`, newest first.
    async fn messages_before(
        &self,
        channel_id: u64,
        before: Cursor,
        limit: u8,
    ) -> Result<Vec<Message>, PlatformError>;

    /// Post plain text to a channel.
    async fn post(&self, channel_id: u64, content: &str) -> Result<(), PlatformError>;

    /// Smallest cursor such that every message older than it was created before `at`.
    fn cursor_for(&self, at: DateTime<Utc>) -> Cursor;

    /// Platform name (e.g. "discord").
    fn name(&self) -> &str;
}
