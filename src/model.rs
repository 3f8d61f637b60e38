use serde::{Deserialize, Serialize};

/// Sentinel stored in `total_episodes` when the count is not known.
pub const UNKNOWN_TOTAL: &str = "?";

/// A snapshot of the current page older than this is not shown as "current".
pub const CURRENT_ANIME_STALE_MS: i64 = 10 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeObservation {
    pub title: String,
    pub raw_title: String,
    pub season: String,
    pub episode: String,
    #[serde(default)]
    pub cover: Option<String>,
}

impl AnimeObservation {
    pub fn display_title(&self) -> &str {
        display_title(&self.raw_title, &self.title)
    }

    /// Composite key used to suppress re-emitting an unchanged page state.
    pub fn dedup_key(&self, url: &str) -> String {
        format!("{}|{}|{}|{}", self.title, self.episode, self.season, url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub title: String,
    pub raw_title: String,
    pub season: String,
    pub episode: String,
    #[serde(default)]
    pub cover: Option<String>,
    pub timestamp: i64,
    pub url: String,
    #[serde(default)]
    pub tab_id: Option<i64>,
}

impl HistoryEntry {
    pub fn observation(&self) -> AnimeObservation {
        AnimeObservation {
            title: self.title.clone(),
            raw_title: self.raw_title.clone(),
            season: self.season.clone(),
            episode: self.episode.clone(),
            cover: self.cover.clone(),
        }
    }

    pub fn display_title(&self) -> &str {
        display_title(&self.raw_title, &self.title)
    }

    pub fn dedup_key(&self) -> String {
        self.observation().dedup_key(&self.url)
    }
}

/// The latest observation with the page it came from; kept under `currentAnime`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentAnime {
    #[serde(flatten)]
    pub observation: AnimeObservation,
    pub timestamp: i64,
    pub url: String,
    #[serde(default)]
    pub tab_id: Option<i64>,
}

impl CurrentAnime {
    pub fn is_stale(&self, now_ms: i64) -> bool {
        now_ms - self.timestamp > CURRENT_ANIME_STALE_MS
    }

    pub fn share_text(&self) -> String {
        format!(
            "Anime: {}\nSeason: {}\nEpisode: {}\nLink: {}",
            self.observation.display_title(),
            self.observation.season,
            self.observation.episode,
            self.url
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrackingStatus {
    #[default]
    Watching,
    Completed,
}

impl TrackingStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Watching => "watching",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingItem {
    pub id: String,
    pub title: String,
    pub raw_title: String,
    pub season: String,
    pub current_episode: String,
    pub total_episodes: String,
    #[serde(default)]
    pub cover: Option<String>,
    pub added_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
    #[serde(default)]
    pub status: TrackingStatus,
}

impl TrackingItem {
    pub fn display_title(&self) -> &str {
        display_title(&self.raw_title, &self.title)
    }

    pub fn current_episode_number(&self) -> u32 {
        parse_leading_u32(&self.current_episode).unwrap_or(0)
    }

    /// `None` when the total is the unknown sentinel or unparseable.
    pub fn known_total(&self) -> Option<u32> {
        if self.total_episodes.trim() == UNKNOWN_TOTAL {
            return None;
        }
        parse_leading_u32(&self.total_episodes)
    }

    pub fn reaches_total(&self, episode: u32) -> bool {
        self.known_total().is_some_and(|total| episode >= total)
    }

    pub fn refresh_status(&mut self) {
        self.status = if self.reaches_total(self.current_episode_number()) {
            TrackingStatus::Completed
        } else {
            TrackingStatus::Watching
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub auto_update_progress: bool,
    pub show_notifications: bool,
    pub max_history_items: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_update_progress: true,
            show_notifications: true,
            max_history_items: 1000,
        }
    }
}

fn display_title<'a>(raw_title: &'a str, title: &'a str) -> &'a str {
    if raw_title.trim().is_empty() {
        title
    } else {
        raw_title
    }
}

/// Leading-digit integer parse: `" 12abc"` is 12, `"abc"` is `None`.
pub fn parse_leading_u32(raw: &str) -> Option<u32> {
    let trimmed = raw.trim_start();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = trimmed.chars().take_while(|ch| ch.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u32>().ok()
}

pub fn new_entry_id(now_ms: i64) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{now_ms}{}", &random[..9])
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
