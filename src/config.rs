use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Environment variable not set: ${0}")]
    MissingEnvVar(String),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct Config {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub digest: DigestConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

// ---------------------------------------------------------------------------
// Discord
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    /// Bot token (supports ${ENV_VAR} expansion)
    pub bot_token: String,
    /// Guild whose team categories are summarized
    pub guild_id: u64,
    /// Message content that triggers a manual run
    #[serde(default = "default_trigger_keyword")]
    pub trigger_keyword: String,
}

// ---------------------------------------------------------------------------
// Digest
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct DigestConfig {
    /// Hour of day (report time zone) at which the 24h window closes
    #[serde(default = "default_boundary_hour")]
    pub boundary_hour: u32,
    /// Categories whose name contains this token are summarized
    #[serde(default = "default_category_marker")]
    pub category_marker: String,
    /// Name of the text channel receiving the report
    #[serde(default = "default_destination_channel")]
    pub destination_channel: String,
    #[serde(default = "default_page_size")]
    pub page_size: u8,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_content_cap")]
    pub content_cap: usize,
    #[serde(default = "default_post_delay_ms")]
    pub post_delay_ms: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// IANA time zone name; the host's local zone when unset
    #[serde(default)]
    pub timezone: Option<String>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            boundary_hour: default_boundary_hour(),
            category_marker: default_category_marker(),
            destination_channel: default_destination_channel(),
            page_size: default_page_size(),
            chunk_size: default_chunk_size(),
            content_cap: default_content_cap(),
            post_delay_ms: default_post_delay_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            timezone: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cron expression (5 or 6 fields). Defaults to daily at the boundary hour.
    #[serde(default)]
    pub schedule: Option<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_trigger_keyword() -> String {
    "!summary".to_string()
}

fn default_boundary_hour() -> u32 {
    22
}

fn default_category_marker() -> String {
    "Team".to_string()
}

fn default_destination_channel() -> String {
    "conversation-summary".to_string()
}

fn default_page_size() -> u8 {
    100
}

fn default_chunk_size() -> usize {
    1900
}

fn default_content_cap() -> usize {
    80
}

fn default_post_delay_ms() -> u64 {
    500
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Validated pipeline settings
// ---------------------------------------------------------------------------

/// Settings handed to the digest pipeline. Built once from [`DigestConfig`]
/// and never read from ambient state.
#[derive(Debug, Clone)]
pub struct DigestSettings {
    pub boundary_hour: u32,
    pub category_marker: String,
    pub destination_channel: String,
    pub page_size: u8,
    pub chunk_size: usize,
    pub content_cap: usize,
    pub post_delay: Duration,
    pub fetch_timeout: Duration,
    pub timezone: Option<chrono_tz::Tz>,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            boundary_hour: default_boundary_hour(),
            category_marker: default_category_marker(),
            destination_channel: default_destination_channel(),
            page_size: default_page_size(),
            chunk_size: default_chunk_size(),
            content_cap: default_content_cap(),
            post_delay: Duration::from_millis(default_post_delay_ms()),
            fetch_timeout: Duration::from_secs(default_fetch_timeout_secs()),
            timezone: None,
        }
    }
}

impl DigestSettings {
    pub fn from_config(cfg: &DigestConfig) -> Result<Self, ConfigError> {
        if cfg.boundary_hour >= 24 {
            return Err(invalid("digest.boundary_hour", "must be between 0 and 23"));
        }
        if cfg.page_size == 0 || cfg.page_size > 100 {
            return Err(invalid("digest.page_size", "must be between 1 and 100"));
        }
        if cfg.chunk_size == 0 || cfg.chunk_size > 2000 {
            return Err(invalid("digest.chunk_size", "must be between 1 and 2000"));
        }
        if cfg.content_cap < 4 {
            return Err(invalid("digest.content_cap", "must be at least 4"));
        }
        if cfg.post_delay_ms < 500 {
            return Err(invalid("digest.post_delay_ms", "must be at least 500"));
        }
        if cfg.fetch_timeout_secs == 0 {
            return Err(invalid("digest.fetch_timeout_secs", "must be at least 1"));
        }
        if cfg.category_marker.is_empty() {
            return Err(invalid("digest.category_marker", "must not be empty"));
        }

        let timezone = match &cfg.timezone {
            Some(name) => Some(
                chrono_tz::Tz::from_str(name)
                    .map_err(|_| invalid("digest.timezone", &format!("unknown time zone '{}'", name)))?,
            ),
            None => None,
        };

        Ok(Self {
            boundary_hour: cfg.boundary_hour,
            category_marker: cfg.category_marker.clone(),
            destination_channel: cfg.destination_channel.clone(),
            page_size: cfg.page_size,
            chunk_size: cfg.chunk_size,
            content_cap: cfg.content_cap,
            post_delay: Duration::from_millis(cfg.post_delay_ms),
            fetch_timeout: Duration::from_secs(cfg.fetch_timeout_secs),
            timezone,
        })
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Expand `~` to home directory in a path string.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Expand `${VAR_NAME}` patterns in a string using environment variables.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| invalid("env expansion", &e.to_string()))?;
    let mut result = input.to_string();
    let captures: Vec<(String, String)> = re
        .captures_iter(input)
        .map(|cap| (cap[0].to_string(), cap[1].to_string()))
        .collect();
    for (full_match, var_name) in captures {
        let value = std::env::var(&var_name)
            .map_err(|_| ConfigError::MissingEnvVar(var_name.clone()))?;
        result = result.replace(&full_match, &value);
    }
    Ok(result)
}

/// Default config directory: ~/.teamdigest/
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".teamdigest")
}

/// Load config from `~/.teamdigest/config.toml` (or a custom path).
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => config_dir().join("config.toml"),
    };

    if !config_path.exists() {
        return Err(ConfigError::NotFound(config_path));
    }

    let raw = std::fs::read_to_string(&config_path)?;
    parse_config(&raw)
}

/// Parse and validate a config string (after reading from file).
pub fn parse_config(raw: &str) -> Result<Config, ConfigError> {
    let expanded = expand_env_vars(raw)?;
    let config: Config = toml::from_str(&expanded)?;
    config.digest_settings()?;
    config.schedule_expression()?;
    Ok(config)
}

impl Config {
    pub fn digest_settings(&self) -> Result<DigestSettings, ConfigError> {
        DigestSettings::from_config(&self.digest)
    }

    /// Cron expression the daily trigger fires on.
    pub fn schedule_expression(&self) -> Result<String, ConfigError> {
        let expr = match &self.scheduler.schedule {
            Some(s) => s.clone(),
            None => format!("0 {} * * *", self.digest.boundary_hour),
        };
        crate::scheduler::cron::parse_schedule(&expr)
            .map_err(|e| invalid("scheduler.schedule", &e.to_string()))?;
        Ok(expr)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
