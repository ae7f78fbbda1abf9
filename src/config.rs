use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR_SYSTEM: &str = "/etc/teqbot";
const CONFIG_DIR_FALLBACK: &str = ".config/teqbot";
const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DIRECTORY_URL: &str = "http://air.radiotime.com/Playing.ashx";
pub const DEFAULT_SLACK_API: &str = "https://slack.com/api";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub stream_url: String,
    pub probe_timeout_secs: u64,
    pub slack: SlackConfig,
    pub directory: DirectoryConfig,
    pub schedule: ScheduleConfig,
    pub markers: MarkerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SlackConfig {
    pub token: String,
    pub api_base: String,
    pub username: String,
    /// Target of the `message` command.
    pub message_channel: String,
    pub now_playing_channel: String,
    pub status_channel: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DirectoryConfig {
    pub base_url: String,
    pub station_id: String,
    pub partner_id: String,
    pub partner_key: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScheduleConfig {
    pub tick_millis: u64,
    /// Number of ticks between task runs.
    pub announce_interval: u32,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MarkerConfig {
    pub last_track: PathBuf,
    pub status: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    NowPlaying,
    StreamStatus,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stream_url: String::new(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            slack: SlackConfig::default(),
            directory: DirectoryConfig::default(),
            schedule: ScheduleConfig::default(),
            markers: MarkerConfig::default(),
        }
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: DEFAULT_SLACK_API.to_string(),
            username: "TEQ-BOT".to_string(),
            message_channel: "boondoggling".to_string(),
            now_playing_channel: "now-playing".to_string(),
            status_channel: "stream-status".to_string(),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DIRECTORY_URL.to_string(),
            station_id: String::new(),
            partner_id: String::new(),
            partner_key: String::new(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_millis: 1000,
            announce_interval: 60,
            tasks: vec![Task::NowPlaying, Task::StreamStatus],
        }
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            last_track: PathBuf::from("last_played"),
            status: PathBuf::from("stream_status"),
        }
    }
}

impl Config {
    pub fn probe_timeout(&self) -> Duration {
        // A zero timeout would disable the bound entirely.
        Duration::from_secs(self.probe_timeout_secs.max(1))
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.schedule.tick_millis)
    }

    /// Overrides file values with whatever the lookup yields. Empty values
    /// are ignored so an unset variable never blanks a configured field.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());
        if let Some(token) = get("SLACK_TOKEN") {
            self.slack.token = token;
        }
        if let Some(url) = get("STREAM_URL") {
            self.stream_url = url;
        }
        if let Some(id) = get("TUNEIN_STATION_ID") {
            self.directory.station_id = id;
        }
        if let Some(id) = get("TUNEIN_PARTNER_ID") {
            self.directory.partner_id = id;
        }
        if let Some(key) = get("TUNEIN_PARTNER_KEY") {
            self.directory.partner_key = key;
        }
    }
}

pub fn preferred_config_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR_SYSTEM).join(CONFIG_FILE)
}

pub fn fallback_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home)
        .join(CONFIG_DIR_FALLBACK)
        .join(CONFIG_FILE))
}

/// Loads the config file if one exists, then applies the process environment.
/// Missing credentials are not an error here; they fail later at the API.
pub fn load_config() -> Result<(Config, Option<PathBuf>)> {
    let (mut config, path) = load_file()?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok((config, path))
}

fn load_file() -> Result<(Config, Option<PathBuf>)> {
    let preferred = preferred_config_path();
    if preferred.exists() {
        return Ok((read_config(&preferred).context("read config")?, Some(preferred)));
    }

    if let Ok(fallback) = fallback_config_path() {
        if fallback.exists() {
            let config = read_config(&fallback).context("read fallback config")?;
            return Ok((config, Some(fallback)));
        }
    }

    Ok((Config::default(), None))
}

fn read_config(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&data).with_context(|| format!("parse {}", path.display()))
}
