use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;
use tracing::debug;

use super::page::{Page, attr, element_text, selectors};
use super::strategy::PageStrategy;
use super::text::{
    compile_patterns, extract_number_from_text, first_capture, pattern, roman_to_arabic,
};
use crate::model::parse_leading_u32;

pub(crate) const DEFAULT_SEASON: &str = "1";

const PLAUSIBLE_SEASONS: std::ops::RangeInclusive<u32> = 1..=20;

/// Patterns run against lowercased text, in decreasing order of confidence.
static TITLE_SEASON_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"(\d+)\s*сезон",
        r"сезон\s*(\d+)",
        r"(\d+)\s*сзн",
        r"сзн\s*(\d+)",
        r"season\s*(\d+)",
        r"(\d+)\s*season",
        r"\bs(\d+)",
        r"\bs\s*(\d+)",
        r"часть\s*(\d+)",
        r"part\s*(\d+)",
        r"(\d+)\s*часть",
        r"(\d+)\s*part",
        r"сезон\s*\b(i{1,3}v?i{0,3})\b",
        r"season\s*\b(i{1,3}v?i{0,3})\b",
        r"\b(i{1,3}v?i{0,3})\b\s*сезон",
        r"\b(i{1,3}v?i{0,3})\b\s*season",
        r"(\d+)\s*(?:st|nd|rd|th) season",
    ])
});

static TITLE_TEXT_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&["h1", "h2", ".anime-title", ".video-title", ".player-title"])
});

static URL_SEASON_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"season=(\d+)",
        r"\bs(\d+)",
        r"season-(\d+)",
        r"[?&]s=(\d+)",
        r"-s(\d+)-",
        r"_s(\d+)_",
    ])
});

static ACTIVE_SEASON_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[
        ".season-item.active",
        ".active [data-season]",
        "[class*=\"active\"][class*=\"season\"]",
        ".season-selector .active",
        ".season-tab.active",
    ])
});

static ACTIVE_SEASON_TEXT: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile_patterns(&[r"(?i)(?:сезон|season)\s*(\d+)", r"(\d+)"]));

static PLAYER_SEASON_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[
        "[data-season]",
        ".season-number",
        ".video-season",
        ".player-season",
        ".current-season",
        ".season-info",
    ])
});

static PLAYER_SEASON_TEXT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?i)(?:сезон|season)\s*[:\-]?\s*(\d+)"));

const ORDINAL_WORDS: &[(&[&str], &str)] = &[
    (&["первый", "первая", "first"], "1"),
    (&["второй", "вторая", "second"], "2"),
    (&["третий", "третья", "third"], "3"),
    (&["четвертый", "четвёртый", "четвертая", "четвёртая", "fourth"], "4"),
    (&["пятый", "пятая", "fifth"], "5"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeasonResolution {
    pub(crate) value: String,
    pub(crate) source: &'static str,
}

impl SeasonResolution {
    fn new(value: impl Into<String>, source: &'static str) -> Self {
        Self {
            value: value.into(),
            source,
        }
    }
}

/// Always yields a season; the source records how confident the guess is.
pub(crate) fn extract_season(page: &Page, raw_title: &str, episode: &str) -> SeasonResolution {
    if let Some(season) = season_from_title_text(page, raw_title) {
        return SeasonResolution::new(season, "title-text");
    }

    for strategy in SECONDARY_STRATEGIES {
        let Some(season) = strategy.extract(page) else {
            continue;
        };
        let season = season.trim();
        if season.is_empty() {
            continue;
        }
        if season == episode {
            debug!(
                strategy = strategy.name(),
                season, "season candidate equals episode, skipping"
            );
            continue;
        }
        return SeasonResolution::new(season, strategy.name());
    }

    if let Some(season) = season_from_ordinal_words(raw_title) {
        return SeasonResolution::new(season, "ordinal-word");
    }
    match season_from_episode_band(episode) {
        Some(season) => SeasonResolution::new(season, "episode-band"),
        None => SeasonResolution::new(DEFAULT_SEASON, "default"),
    }
}

fn season_from_title_text(page: &Page, raw_title: &str) -> Option<String> {
    let mut sources = vec![raw_title.to_string(), page.document_title()];
    sources.extend(TITLE_TEXT_SELECTORS.iter().map(|sel| page.first_text(sel)));
    scan_season_text(&sources.join(" ").to_lowercase())
}

/// First in-range season found by the ordered patterns; Roman numerals are converted.
pub(crate) fn scan_season_text(text: &str) -> Option<String> {
    TITLE_SEASON_PATTERNS.iter().find_map(|pattern| {
        pattern.captures_iter(text).find_map(|captures| {
            let found = captures.get(1)?.as_str();
            let number = if found.chars().all(|ch| matches!(ch, 'i' | 'v' | 'x')) {
                roman_to_arabic(found)?
            } else {
                found.parse::<u32>().ok()?
            };
            PLAUSIBLE_SEASONS
                .contains(&number)
                .then(|| number.to_string())
        })
    })
}

pub(crate) fn season_from_ordinal_words(raw_title: &str) -> Option<&'static str> {
    let lower = raw_title.to_lowercase();
    ORDINAL_WORDS
        .iter()
        .find(|(words, _)| words.iter().any(|word| lower.contains(word)))
        .map(|(_, season)| *season)
}

/// Long-running shows are split into seasons by fixed episode bands.
pub(crate) fn season_from_episode_band(episode: &str) -> Option<&'static str> {
    let number = parse_leading_u32(episode)?;
    Some(match number {
        0..=50 => "1",
        51..=75 => "2",
        76..=100 => "3",
        101..=125 => "4",
        126..=150 => "5",
        _ => DEFAULT_SEASON,
    })
}

struct UrlSeason;

impl PageStrategy for UrlSeason {
    fn name(&self) -> &'static str {
        "url"
    }

    fn extract(&self, page: &Page) -> Option<String> {
        let url = page.url().as_str().to_lowercase();
        URL_SEASON_PATTERNS.iter().find_map(|pattern| {
            let season = first_capture(pattern, &url)?;
            let number = season.parse::<u32>().ok()?;
            PLAUSIBLE_SEASONS.contains(&number).then_some(season)
        })
    }
}

struct ActiveSeason;

impl PageStrategy for ActiveSeason {
    fn name(&self) -> &'static str {
        "active-season"
    }

    fn extract(&self, page: &Page) -> Option<String> {
        ACTIVE_SEASON_SELECTORS.iter().find_map(|sel| {
            let element = page.select_first(sel)?;
            if let Some(season) = attr(element, "data-season") {
                return Some(season.to_string());
            }
            extract_number_from_text(&element_text(element), &ACTIVE_SEASON_TEXT)
        })
    }
}

struct PlayerSeason;

impl PageStrategy for PlayerSeason {
    fn name(&self) -> &'static str {
        "player-season"
    }

    fn extract(&self, page: &Page) -> Option<String> {
        PLAYER_SEASON_SELECTORS.iter().find_map(|sel| {
            page.select_all(sel).find_map(|element| {
                attr(element, "data-season")
                    .map(str::to_string)
                    .or_else(|| first_capture(&PLAYER_SEASON_TEXT, &element_text(element)))
            })
        })
    }
}

const SECONDARY_STRATEGIES: &[&dyn PageStrategy] = &[&UrlSeason, &ActiveSeason, &PlayerSeason];
