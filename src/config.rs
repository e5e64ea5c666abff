//! Environment configuration
//!
//! Read once at startup, after `.env` has been loaded.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};

use crate::client::RetryPolicy;

const REQUIRED: [&str; 3] = ["DISCORD_BOT_TOKEN", "WATCHED_FORUM_ID", "DISCORD_GUILD_ID"];

#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub token: String,
    pub guild_id: u64,
    pub watched_forum_id: u64,
    pub api_base: String,
    /// Per-request timeout for Discord calls
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct EqdbConfig {
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord: DiscordConfig,
    pub eqdb: EqdbConfig,
    /// End-to-end limit for one post
    pub post_timeout: Duration,
    /// Cron expression (seconds first) for polling new posts
    pub poll_schedule: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let missing: Vec<&str> = REQUIRED
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            bail!(
                "Missing required environment variables: {}",
                missing.join(", ")
            );
        }

        let retry_delay = Duration::from_secs(parse_or(&get, "EQDB_RETRY_DELAY_SECS", 2)?);
        let retry = RetryPolicy {
            max_rate_limit_retries: parse_or(&get, "EQDB_MAX_RATE_LIMIT_RETRIES", 3)?,
            rate_limit_delay: retry_delay,
            failure_backoff: retry_delay,
            ..RetryPolicy::default()
        };

        Ok(Self {
            discord: DiscordConfig {
                token: get("DISCORD_BOT_TOKEN").unwrap_or_default(),
                guild_id: parse_required(&get, "DISCORD_GUILD_ID")?,
                watched_forum_id: parse_required(&get, "WATCHED_FORUM_ID")?,
                api_base: get("DISCORD_API_BASE")
                    .unwrap_or_else(|| "https://discord.com/api/v10".to_string()),
                timeout: Duration::from_secs(parse_or(&get, "DISCORD_TIMEOUT_SECS", 10)?),
            },
            eqdb: EqdbConfig {
                base_url: get("EQDB_BASE_URL").unwrap_or_else(|| "https://eqdb.net".to_string()),
                timeout: Duration::from_secs(parse_or(&get, "EQDB_TIMEOUT_SECS", 10)?),
                retry,
            },
            post_timeout: Duration::from_secs(parse_or(&get, "POST_TIMEOUT_SECS", 60)?),
            poll_schedule: get("POLL_SCHEDULE").unwrap_or_else(|| "*/30 * * * * *".to_string()),
        })
    }
}

fn parse_required<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let value = get(key).ok_or_else(|| anyhow!("{key} is not set"))?;
    value
        .parse()
        .map_err(|e| anyhow!("Invalid {key} '{value}': {e}"))
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match get(key) {
        Some(_) => parse_required(get, key),
        None => Ok(default),
    }
}
