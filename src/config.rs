use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use url::Url;

use crate::paths::config_file_path;

/// File-backed configuration. Runtime settings (auto-update, notifications,
/// history cap) live in the store instead.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub watch: WatchConfig,
    pub service: ServiceConfig,
    pub notifier: NotifierKind,
    pub sites: SitesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_delay_ms: u64,
    pub load_delay_ms: u64,
    pub mutation_debounce_ms: u64,
    pub click_debounce_ms: u64,
    pub navigation_delay_ms: u64,
    pub safety_poll_secs: u64,
    pub safety_poll_retry_cap: u32,
    pub max_retries: u32,
    pub retry_step_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 2000,
            load_delay_ms: 3000,
            mutation_debounce_ms: 1000,
            click_debounce_ms: 1500,
            navigation_delay_ms: 2000,
            safety_poll_secs: 10,
            safety_poll_retry_cap: 3,
            max_retries: 10,
            retry_step_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub poll_interval_ms: u64,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub attempts: usize,
    pub retry_delay_ms: u64,
    pub user_agent: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            connect_timeout_ms: 3000,
            read_timeout_ms: 8000,
            attempts: 3,
            retry_delay_ms: 500,
            user_agent: format!("anitracker/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub cleanup_interval_hours: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_hours: 24,
        }
    }
}

impl ServiceConfig {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_hours.max(1) * 3600)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    #[default]
    Desktop,
    Terminal,
    Off,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SitesConfig {
    pub known: Vec<String>,
}

impl Default for SitesConfig {
    fn default() -> Self {
        let known = [
            "animego.org",
            "animego.me",
            "jut.su",
            "anilibria.tv",
            "shikimori.one",
            "shikimori.ani",
            "aniwatch.tv",
            "anime365.org",
            "smotret-anime.online",
            "yummyanime.club",
            "animevost.org",
        ];
        Self {
            known: known.iter().map(|domain| domain.to_string()).collect(),
        }
    }
}

impl SitesConfig {
    pub fn is_anime_streaming_site(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_lowercase();
        self.known.iter().any(|domain| host.contains(domain.as_str()))
    }
}

pub fn load_config() -> Result<AppConfig> {
    match config_file_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => Ok(AppConfig::default()),
    }
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config: AppConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &AppConfig) -> Result<()> {
    if config.watch.poll_interval_ms == 0 {
        bail!("watch.poll_interval_ms must be greater than zero");
    }
    if config.engine.retry_step_ms == 0 {
        bail!("engine.retry_step_ms must be greater than zero");
    }
    Ok(())
}
