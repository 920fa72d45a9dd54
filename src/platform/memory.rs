//! In-memory platform with a fake clock/ID mapping, for tests.

use super::{ChatPlatform, Cursor, GuildLayout, Message, PlatformError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// IDs are `millis * ID_SCALE + seq`, so ordering by ID is ordering by time.
const ID_SCALE: u64 = 1_000;

#[derive(Default)]
pub struct MemoryPlatform {
    pub layout: GuildLayout,
    history: HashMap<u64, Vec<Message>>,
    failing_channels: HashSet<u64>,
    failing_posts: HashSet<usize>,
    seq: Mutex<u64>,
    post_attempts: Mutex<usize>,
    pub posts: Mutex<Vec<(u64, String)>>,
    pub page_requests: Mutex<Vec<(u64, Cursor)>>,
}

impl MemoryPlatform {
    pub fn new(layout: GuildLayout) -> Self {
        Self {
            layout,
            ..Default::default()
        }
    }

    /// Add a message to a channel's history.
    pub fn push(
        &mut self,
        channel_id: u64,
        author: &str,
        automated: bool,
        at: DateTime<Utc>,
        content: &str,
    ) -> &mut Self {
        self.push_with_reactions(channel_id, author, automated, at, content, 0)
    }

    pub fn push_with_reactions(
        &mut self,
        channel_id: u64,
        author: &str,
        automated: bool,
        at: DateTime<Utc>,
        content: &str,
        reactions: u64,
    ) -> &mut Self {
        let seq = {
            let mut seq = self.seq.lock().unwrap();
            *seq += 1;
            *seq
        };
        let id = at.timestamp_millis() as u64 * ID_SCALE + seq;
        self.history.entry(channel_id).or_default().push(Message {
            id,
            author_name: author.to_string(),
            is_automated: automated,
            timestamp: at,
            raw_content: content.to_string(),
            reaction_count: reactions,
        });
        self
    }

    pub fn fail_channel(&mut self, channel_id: u64) -> &mut Self {
        self.failing_channels.insert(channel_id);
        self
    }

    /// Make the `index`-th post attempt (0-based) fail.
    pub fn fail_post(&mut self, index: usize) -> &mut Self {
        self.failing_posts.insert(index);
        self
    }

    pub fn posted(&self) -> Vec<String> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl ChatPlatform for MemoryPlatform {
    async fn layout(&self) -> Result<GuildLayout, PlatformError> {
        Ok(self.layout.clone())
    }

    async fn messages_before(
        &self,
        channel_id: u64,
        before: Cursor,
        limit: u8,
    ) -> Result<Vec<Message>, PlatformError> {
        self.page_requests.lock().unwrap().push((channel_id, before));
        if self.failing_channels.contains(&channel_id) {
            return Err(PlatformError::Unavailable(format!(
                "channel {} is down",
                channel_id
            )));
        }
        let mut older: Vec<Message> = self
            .history
            .get(&channel_id)
            .map(|msgs| msgs.iter().filter(|m| m.id < before).cloned().collect())
            .unwrap_or_default();
        older.sort_by(|a, b| b.id.cmp(&a.id));
        older.truncate(limit as usize);
        Ok(older)
    }

    async fn post(&self, channel_id: u64, content: &str) -> Result<(), PlatformError> {
        let attempt = {
            let mut attempts = self.post_attempts.lock().unwrap();
            *attempts += 1;
            *attempts - 1
        };
        if self.failing_posts.contains(&attempt) {
            return Err(PlatformError::Unavailable(format!("post {} rejected", attempt)));
        }
        self.posts
            .lock()
            .unwrap()
            .push((channel_id, content.to_string()));
        Ok(())
    }

    fn cursor_for(&self, at: DateTime<Utc>) -> Cursor {
        at.timestamp_millis() as u64 * ID_SCALE
    }

    fn name(&self) -> &str {
        "memory"
    }
}
