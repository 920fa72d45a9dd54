use super::{Category, Channel, ChatPlatform, Cursor, GuildLayout, Message, PlatformError};
use crate::config::DiscordConfig;
use crate::digest::DigestRunner;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::all::{
    ChannelId, ChannelType, Context, CreateMessage, EventHandler, GatewayIntents, GetMessages,
    GuildId, MessageId, Ready,
};
use std::sync::Arc;

/// Milliseconds between the Unix epoch and the first second of 2015 (Discord epoch).
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// Snowflake whose timestamp bits equal `at` and whose low bits are zero.
/// Every message created before `at` has a smaller ID.
pub fn snowflake_for(at: DateTime<Utc>) -> u64 {
    let ms = (at.timestamp_millis() - DISCORD_EPOCH_MS).max(0) as u64;
    ms << 22
}

/// Creation time encoded in a snowflake.
pub fn snowflake_time(id: u64) -> DateTime<Utc> {
    let ms = (id >> 22) as i64 + DISCORD_EPOCH_MS;
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Discord adapter backed by serenity's REST client.
pub struct DiscordPlatform {
    http: Arc<serenity::http::Http>,
    guild_id: GuildId,
}

impl DiscordPlatform {
    pub fn new(config: &DiscordConfig) -> Self {
        Self {
            http: Arc::new(serenity::http::Http::new(&config.bot_token)),
            guild_id: GuildId::new(config.guild_id),
        }
    }
}

/// The parts of a guild channel the digest cares about.
struct ChannelEntry {
    id: u64,
    kind: ChannelType,
    name: String,
    position: u16,
    parent_id: Option<u64>,
}

fn layout_from(entries: Vec<ChannelEntry>) -> GuildLayout {
    let mut layout = GuildLayout::default();
    for entry in entries {
        match entry.kind {
            ChannelType::Category => layout.categories.push(Category {
                id: entry.id,
                name: entry.name,
                display_order: i64::from(entry.position),
            }),
            ChannelType::Text => layout.channels.push(Channel {
                id: entry.id,
                name: entry.name,
                category_id: entry.parent_id,
                display_order: i64::from(entry.position),
            }),
            _ => {}
        }
    }
    layout
}

fn to_message(msg: serenity::all::Message) -> Message {
    let author_name = msg
        .author
        .global_name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| msg.author.name.clone());
    let id = msg.id.get();
    Message {
        id,
        author_name,
        is_automated: msg.author.bot,
        timestamp: snowflake_time(id),
        raw_content: msg.content,
        reaction_count: msg.reactions.iter().map(|r| r.count).sum(),
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn layout(&self) -> Result<GuildLayout, PlatformError> {
        let channels = self.guild_id.channels(self.http.as_ref()).await?;
        let entries = channels
            .into_values()
            .map(|gc| ChannelEntry {
                id: gc.id.get(),
                kind: gc.kind,
                name: gc.name,
                position: gc.position,
                parent_id: gc.parent_id.map(|p| p.get()),
            })
            .collect();
        Ok(layout_from(entries))
    }

    async fn messages_before(
        &self,
        channel_id: u64,
        before: Cursor,
        limit: u8,
    ) -> Result<Vec<Message>, PlatformError> {
        if before == 0 {
            return Ok(Vec::new());
        }
        let builder = GetMessages::new().before(MessageId::new(before)).limit(limit);
        let page = ChannelId::new(channel_id)
            .messages(self.http.as_ref(), builder)
            .await?;
        Ok(page.into_iter().map(to_message).collect())
    }

    async fn post(&self, channel_id: u64, content: &str) -> Result<(), PlatformError> {
        let builder = CreateMessage::new().content(content);
        ChannelId::new(channel_id)
            .send_message(self.http.as_ref(), builder)
            .await?;
        Ok(())
    }

    fn cursor_for(&self, at: DateTime<Utc>) -> Cursor {
        snowflake_for(at)
    }

    fn name(&self) -> &str {
        "discord"
    }
}

// ---------------------------------------------------------------------------
// Gateway: manual trigger
// ---------------------------------------------------------------------------

struct TriggerHandler {
    guild_id: GuildId,
    keyword: String,
    runner: Arc<DigestRunner>,
}

#[async_trait]
impl EventHandler for TriggerHandler {
    async fn message(&self, ctx: Context, msg: serenity::all::Message) {
        if msg.author.bot {
            return;
        }
        if msg.guild_id != Some(self.guild_id) {
            return;
        }
        if msg.content.trim() != self.keyword {
            return;
        }

        tracing::info!(
            "Manual summary requested by {} in channel {}",
            msg.author.name,
            msg.channel_id.get()
        );

        if let Err(e) = msg
            .channel_id
            .say(&ctx.http, "Generating conversation summary...")
            .await
        {
            tracing::warn!("Failed to acknowledge summary request: {}", e);
        }

        let runner = self.runner.clone();
        tokio::spawn(async move {
            runner.run_isolated("manual", Utc::now()).await;
        });
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        tracing::info!("Discord bot connected as {}", ready.user.name);
    }
}

/// Connect to the gateway and listen for the trigger keyword.
/// Spawns the client and returns immediately.
pub async fn start_gateway(
    config: &DiscordConfig,
    runner: Arc<DigestRunner>,
) -> Result<(), anyhow::Error> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = TriggerHandler {
        guild_id: GuildId::new(config.guild_id),
        keyword: config.trigger_keyword.trim().to_string(),
        runner,
    };

    let mut client = serenity::Client::builder(&config.bot_token, intents)
        .event_handler(handler)
        .await?;

    tokio::spawn(async move {
        if let Err(e) = client.start().await {
            tracing::error!("Discord client error: {}", e);
        }
    });

    tracing::info!("Discord gateway started");
    Ok(())
}
