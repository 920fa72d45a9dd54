//! Per-category collection of channel messages in display order.

use super::fetch::fetch_window_with_timeout;
use super::window::TimeWindow;
use crate::config::DigestSettings;
use crate::platform::{Category, Channel, ChatPlatform, GuildLayout, Message};

/// Messages of one channel, oldest first. Never empty once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelReport {
    pub channel: Channel,
    pub messages: Vec<Message>,
}

/// Non-empty channel reports of one category, in channel display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryReport {
    pub category: Category,
    pub channels: Vec<ChannelReport>,
}

impl CategoryReport {
    pub fn message_count(&self) -> usize {
        self.channels.iter().map(|c| c.messages.len()).sum()
    }
}

#[derive(Debug, Default)]
pub struct Aggregation {
    pub reports: Vec<CategoryReport>,
    /// Channels whose history could not be retrieved, treated as empty.
    pub skipped_channels: Vec<String>,
}

/// Categories whose name contains `marker`, in display order.
pub fn team_categories<'a>(layout: &'a GuildLayout, marker: &str) -> Vec<&'a Category> {
    let mut categories: Vec<&Category> = layout
        .categories
        .iter()
        .filter(|c| c.name.contains(marker))
        .collect();
    categories.sort_by_key(|c| (c.display_order, c.id));
    categories
}

/// Text channels under `category_id`, in display order.
pub fn channels_in(layout: &GuildLayout, category_id: u64) -> Vec<&Channel> {
    let mut channels: Vec<&Channel> = layout
        .channels
        .iter()
        .filter(|c| c.category_id == Some(category_id))
        .collect();
    channels.sort_by_key(|c| (c.display_order, c.id));
    channels
}

/// Fetch every channel of every category sequentially and keep only the
/// non-empty results. A channel that fails to load counts as empty.
pub async fn aggregate(
    platform: &dyn ChatPlatform,
    layout: &GuildLayout,
    categories: &[&Category],
    window: &TimeWindow,
    settings: &DigestSettings,
) -> Aggregation {
    let mut aggregation = Aggregation::default();

    for category in categories {
        let mut channel_reports = Vec::new();

        for channel in channels_in(layout, category.id) {
            let messages = match fetch_window_with_timeout(
                platform,
                channel,
                window,
                settings.page_size,
                settings.fetch_timeout,
            )
            .await
            {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(
                        "Skipping #{} in {}: history retrieval failed: {}",
                        channel.name,
                        category.name,
                        e
                    );
                    aggregation.skipped_channels.push(channel.name.clone());
                    continue;
                }
            };

            if messages.is_empty() {
                continue;
            }
            channel_reports.push(ChannelReport {
                channel: channel.clone(),
                messages,
            });
        }

        if channel_reports.is_empty() {
            tracing::debug!("No activity in category {}", category.name);
            continue;
        }

        let report = CategoryReport {
            category: (*category).clone(),
            channels: channel_reports,
        };
        tracing::info!(
            "Category {}: {} message(s) in {} channel(s)",
            report.category.name,
            report.message_count(),
            report.channels.len()
        );
        aggregation.reports.push(report);
    }

    aggregation
}
