//! Text rendering of category reports.

use super::aggregate::{CategoryReport, ChannelReport};
use super::chunk::split_lines;
use super::sanitize::{escape_cell, sanitize_content};
use super::window::TimeWindow;
use chrono::TimeZone;
use std::fmt::Display;

pub const TITLE: &str = "Conversation summary";
pub const NO_ACTIVITY: &str = "No conversations were found in this period.";
const TABLE_HEADER: &str = "| Author | Time | Message | Reactions |";
const TABLE_SEPARATOR: &str = "| --- | --- | --- | --- |";

/// Rendered report: the window label plus one text section per category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub range: String,
    pub sections: Vec<String>,
}

impl RenderedReport {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn header(&self) -> String {
        format!("📋 **{}** ({})", TITLE, self.range)
    }

    /// Ordered posts: the header, then each section split to `chunk_size`.
    /// Without activity a single post carries the header and the notice.
    pub fn posts(&self, chunk_size: usize) -> Vec<String> {
        if self.is_empty() {
            return vec![format!("{}\n\n{}", self.header(), NO_ACTIVITY)];
        }
        let mut posts = vec![self.header()];
        for section in &self.sections {
            posts.extend(split_lines(section, chunk_size));
        }
        posts
    }

    /// Standalone markdown document of the whole report.
    pub fn to_document(&self) -> String {
        let mut doc = format!("# {} ({})\n\n", TITLE, self.range);
        if self.is_empty() {
            doc.push_str(NO_ACTIVITY);
            doc.push('\n');
        } else {
            for section in &self.sections {
                doc.push_str(section);
                doc.push_str("\n\n");
            }
        }
        doc
    }
}

/// `YYYY/MM/DD HH:MM – YYYY/MM/DD HH:MM` in the report time zone.
pub fn format_range<Tz>(window: &TimeWindow, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{} – {}",
        window.start.with_timezone(tz).format("%Y/%m/%d %H:%M"),
        window.end.with_timezone(tz).format("%Y/%m/%d %H:%M")
    )
}

fn render_channel<Tz>(report: &ChannelReport, tz: &Tz, content_cap: usize, lines: &mut Vec<String>)
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    lines.push(format!("### #{}", report.channel.name));
    lines.push(TABLE_HEADER.to_string());
    lines.push(TABLE_SEPARATOR.to_string());
    for msg in &report.messages {
        lines.push(format!(
            "| {} | {} | {} | {} |",
            escape_cell(&msg.author_name),
            msg.timestamp.with_timezone(tz).format("%m/%d %H:%M"),
            sanitize_content(&msg.raw_content, content_cap),
            msg.reaction_count
        ));
    }
}

/// Heading, then one sub-heading and table per channel.
pub fn render_category<Tz>(report: &CategoryReport, tz: &Tz, content_cap: usize) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut lines = vec![format!("## {}", report.category.name)];
    for channel in &report.channels {
        lines.push(String::new());
        render_channel(channel, tz, content_cap, &mut lines);
    }
    lines.join("\n")
}

pub fn render_report<Tz>(
    reports: &[CategoryReport],
    window: &TimeWindow,
    tz: &Tz,
    content_cap: usize,
) -> RenderedReport
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    RenderedReport {
        range: format_range(window, tz),
        sections: reports
            .iter()
            .map(|r| render_category(r, tz, content_cap))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::window::compute_window;
    use crate::platform::{Category, Channel, Message};
    use chrono::{DateTime, Utc};
    use chrono_tz::Asia::Tokyo;

    fn msg(id: u64, author: &str, at: DateTime<Utc>, content: &str, reactions: u64) -> Message {
        Message {
            id,
            author_name: author.into(),
            is_automated: false,
            timestamp: at,
            raw_content: content.into(),
            reaction_count: reactions,
        }
    }

    fn report() -> CategoryReport {
        let at = |h, m| Tokyo.with_ymd_and_hms(2024, 5, 2, h, m, 0).unwrap().with_timezone(&Utc);
        CategoryReport {
            category: Category {
                id: 1,
                name: "Team Alpha".into(),
                display_order: 0,
            },
            channels: vec![
                ChannelReport {
                    channel: Channel {
                        id: 11,
                        name: "general".into(),
                        category_id: Some(1),
                        display_order: 0,
                    },
                    messages: vec![
                        msg(1, "alice", at(9, 5), "good morning\nall", 2),
                        msg(2, "bob|ops", at(21, 0), "", 0),
                    ],
                },
                ChannelReport {
                    channel: Channel {
                        id: 12,
                        name: "design".into(),
                        category_id: Some(1),
                        display_order: 1,
                    },
                    messages: vec![msg(3, "carol", at(12, 30), "a | b", 5)],
                },
            ],
        }
    }

    fn window() -> TimeWindow {
        compute_window(&Tokyo.with_ymd_and_hms(2024, 5, 2, 23, 0, 0).unwrap(), 22)
    }

    #[test]
    fn test_render_category_layout() {
        let text = render_category(&report(), &Tokyo, 80);
        let expected = [
            "## Team Alpha",
            "",
            "### #general",
            "| Author | Time | Message | Reactions |",
            "| --- | --- | --- | --- |",
            "| alice | 05/02 09:05 | good morning all | 2 |",
            "| bob｜ops | 05/02 21:00 | (no text / attachment only) | 0 |",
            "",
            "### #design",
            "| Author | Time | Message | Reactions |",
            "| --- | --- | --- | --- |",
            "| carol | 05/02 12:30 | a ｜ b | 5 |",
        ]
        .join("\n");
        assert_eq!(text, expected);
    }

    #[test]
    fn test_header_shows_local_range() {
        let rendered = render_report(&[report()], &window(), &Tokyo, 80);
        assert_eq!(rendered.range, "2024/05/01 22:00 – 2024/05/02 22:00");
        assert_eq!(
            rendered.header(),
            "📋 **Conversation summary** (2024/05/01 22:00 – 2024/05/02 22:00)"
        );
    }

    #[test]
    fn test_every_row_has_four_columns() {
        let text = render_category(&report(), &Tokyo, 80);
        for line in text.lines().filter(|l| l.starts_with('|')) {
            assert_eq!(line.matches('|').count(), 5, "bad row: {}", line);
        }
    }

    #[test]
    fn test_no_activity_is_single_post() {
        let rendered = render_report(&[], &window(), &Tokyo, 80);
        let posts = rendered.posts(1900);
        assert_eq!(posts.len(), 1);
        assert!(posts[0].starts_with("📋 **Conversation summary**"));
        assert!(posts[0].ends_with(NO_ACTIVITY));
    }

    #[test]
    fn test_posts_start_with_header_then_sections() {
        let rendered = render_report(&[report(), report()], &window(), &Tokyo, 80);
        let posts = rendered.posts(1900);
        assert_eq!(posts.len(), 3);
        assert_eq!(posts[0], rendered.header());
        assert_eq!(posts[1], rendered.sections[0]);
    }

    #[test]
    fn test_long_section_is_chunked() {
        let mut big = report();
        let template = big.channels[0].messages[0].clone();
        big.channels[0].messages = (0..100)
            .map(|i| Message {
                id: i,
                raw_content: "x".repeat(80),
                ..template.clone()
            })
            .collect();
        let rendered = render_report(&[big], &window(), &Tokyo, 80);
        let posts = rendered.posts(1900);
        assert!(posts.len() > 2);
        assert!(posts.iter().all(|p| p.chars().count() <= 1900));
        assert_eq!(posts[1..].join("\n"), rendered.sections[0]);
    }

    #[test]
    fn test_document_format() {
        let rendered = render_report(&[report()], &window(), &Tokyo, 80);
        let doc = rendered.to_document();
        assert!(doc.starts_with("# Conversation summary (2024/05/01 22:00 – 2024/05/02 22:00)\n\n## Team Alpha"));

        let empty = render_report(&[], &window(), &Tokyo, 80).to_document();
        assert!(empty.ends_with(&format!("{}\n", NO_ACTIVITY)));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let a = render_report(&[report()], &window(), &Tokyo, 80);
        let b = render_report(&[report()], &window(), &Tokyo, 80);
        assert_eq!(a, b);
    }
}
