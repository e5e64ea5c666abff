//! # Discord Forum Integration
//!
//! Implements [`ForumHost`] on top of the Discord REST API using a bot token.
//!
//! ## Features
//!
//! - **Thread replies**: renders a [`ReplyPayload`] as one embed and posts it
//!   into the forum thread
//! - **New post discovery**: polls the guild's active threads and hands out
//!   every thread not seen before
//! - **Warm start**: the first poll only records existing threads, so a
//!   restart never answers old posts again
//!
//! ## Embed Structure
//!
//! - **Title / Description**: taken from the reply payload
//! - **Color**: blue (`0x0034_98DB`) for recipes, red (`0x00E7_4C3C`) for failures
//! - **Fields**: recipe details inline, then components split over as many
//!   1024-character fields as needed, then any data warnings
//! - **Footer**: "Data from eqdb.net"
//!
//! ## Environment Configuration
//!
//! Needs `DISCORD_BOT_TOKEN`, `DISCORD_GUILD_ID` and `WATCHED_FORUM_ID`; see
//! [`crate::config`].

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{debug, error, info, warn};

use crate::config::DiscordConfig;
use crate::forum::{ForumHost, NewPost};
use crate::models::{
    ActiveThreads, DiscordEmbed, DiscordField, DiscordFooter, DiscordMessage, DiscordThread,
    ReplyKind, ReplyPayload,
};

const RECIPE_COLOR: u32 = 0x0034_98DB;
const FAILURE_COLOR: u32 = 0x00E7_4C3C;
const FIELD_VALUE_LIMIT: usize = 1024;
/// 2015-01-01T00:00:00Z, the zero point of Discord snowflake ids
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// Threads seen so far. Only lives as long as the process.
#[derive(Debug, Default)]
struct SeenThreads {
    /// Time of the first poll; threads created before it are never answered
    primed_at: Option<DateTime<Utc>>,
    ids: HashSet<u64>,
}

/// Discord bot client bound to one guild and one watched forum.
///
/// Holds a single `reqwest::Client` (and so a single connection pool) for all
/// Discord traffic. Shared between tasks behind an `Arc`.
pub struct DiscordForum {
    client: Client,
    api_base: String,
    guild_id: u64,
    watched_forum_id: u64,
    seen: Mutex<SeenThreads>,
}

impl DiscordForum {
    pub fn new(config: &DiscordConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bot {}", config.token))
            .map_err(|_| anyhow!("DISCORD_BOT_TOKEN contains invalid characters"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .user_agent(concat!(
                "DiscordBot (https://eqdb.net, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            guild_id: config.guild_id,
            watched_forum_id: config.watched_forum_id,
            seen: Mutex::new(SeenThreads::default()),
        })
    }

    /// Fetch the guild's active threads and return the ones created since the
    /// previous poll. The first poll returns nothing.
    pub async fn poll_new_posts(&self) -> Result<Vec<NewPost>> {
        let url = format!("{}/guilds/{}/threads/active", self.api_base, self.guild_id);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            bail!("Failed to list active threads: {}", response.status());
        }

        let active: ActiveThreads = response.json().await?;
        debug!("Discord reports {} active threads", active.threads.len());
        self.record_threads(active.threads, Utc::now())
    }

    fn record_threads(
        &self,
        threads: Vec<DiscordThread>,
        now: DateTime<Utc>,
    ) -> Result<Vec<NewPost>> {
        let mut seen = self
            .seen
            .lock()
            .map_err(|_| anyhow!("seen-thread set is poisoned"))?;

        let mut posts = Vec::new();
        for thread in threads {
            let Ok(thread_id) = thread.id.parse::<u64>() else {
                warn!("Skipping thread with invalid id: {}", thread.id);
                continue;
            };

            if !seen.ids.insert(thread_id) {
                continue;
            }
            let Some(primed_at) = seen.primed_at else {
                continue;
            };

            // Archived threads reappear in the active list once someone posts in them
            if created_at(thread_id).is_none_or(|created| created < primed_at) {
                debug!(thread_id, "Skipping thread created before startup");
                continue;
            }

            let Some(forum_id) = thread.parent_id.and_then(|id| id.parse().ok()) else {
                continue;
            };

            posts.push(NewPost {
                thread_id,
                forum_id,
                title: thread.name.unwrap_or_default(),
            });
        }

        if seen.primed_at.is_none() {
            info!("Recorded {} existing threads", seen.ids.len());
            seen.primed_at = Some(now);
        }

        Ok(posts)
    }
}

#[async_trait]
impl ForumHost for DiscordForum {
    fn watched_forum_id(&self) -> u64 {
        self.watched_forum_id
    }

    async fn post_reply(&self, thread_id: u64, reply: &ReplyPayload) -> Result<()> {
        let url = format!("{}/channels/{thread_id}/messages", self.api_base);
        let message = build_message(reply);

        let response = self.client.post(&url).json(&message).send().await?;
        let status = response.status();

        if status.is_success() {
            info!("Reply posted in thread {}: {}", thread_id, reply.title);
            return Ok(());
        }

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();
            warn!(thread_id, retry_after = %retry_after, "Rate limited by Discord");
        }

        let body = response.text().await.unwrap_or_default();
        error!("Failed to post reply in thread {}: {} {}", thread_id, status, body);
        bail!("Discord returned {status} for thread {thread_id}")
    }
}

/// Creation time encoded in a snowflake id
fn created_at(id: u64) -> Option<DateTime<Utc>> {
    let millis = i64::try_from(id >> 22).ok()? + DISCORD_EPOCH_MS;
    DateTime::from_timestamp_millis(millis)
}

/// Render a reply payload as a Discord message with a single embed
pub fn build_message(reply: &ReplyPayload) -> DiscordMessage {
    let mut fields: Vec<DiscordField> = reply
        .fields
        .iter()
        .map(|f| DiscordField {
            name: f.name.clone(),
            value: f.value.clone(),
            inline: f.inline,
        })
        .collect();

    if reply.kind == ReplyKind::Recipe {
        let chunks = chunk_lines(reply.components.iter().map(|c| format!("• {c}")));
        if chunks.is_empty() {
            fields.push(DiscordField {
                name: "📦 Required Components".to_string(),
                value: "No components listed".to_string(),
                inline: false,
            });
        }
        for (i, value) in chunks.into_iter().enumerate() {
            let name = if i == 0 {
                "📦 Required Components"
            } else {
                "📦 Required Components (cont.)"
            };
            fields.push(DiscordField {
                name: name.to_string(),
                value,
                inline: false,
            });
        }
    }

    for value in chunk_lines(reply.notes.iter().cloned()) {
        fields.push(DiscordField {
            name: "Notes".to_string(),
            value,
            inline: false,
        });
    }

    let color = match reply.kind {
        ReplyKind::Recipe => RECIPE_COLOR,
        ReplyKind::Failure => FAILURE_COLOR,
    };

    DiscordMessage {
        embeds: vec![DiscordEmbed {
            title: reply.title.clone(),
            description: reply.description.clone(),
            color,
            timestamp: Utc::now().to_rfc3339(),
            fields,
            footer: DiscordFooter {
                text: "Data from eqdb.net".to_string(),
            },
        }],
    }
}

/// Join lines into newline-separated chunks that each fit in one embed field
fn chunk_lines(lines: impl Iterator<Item = String>) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in lines {
        let needed = if current.is_empty() {
            line.chars().count()
        } else {
            current.chars().count() + 1 + line.chars().count()
        };

        if needed > FIELD_VALUE_LIMIT && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(&line);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
