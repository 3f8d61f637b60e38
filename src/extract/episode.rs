use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;

use super::page::{Page, attr, element_text, selector, selectors};
use super::strategy::{PageStrategy, first_success};
use super::text::{compile_patterns, extract_number_from_text, first_capture, pattern};

pub(crate) const DEFAULT_EPISODE: &str = "1";

static PLAYER_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[
        "[data-episode]",
        ".current-episode",
        ".episode-number",
        ".video-episode",
        ".player-episode",
        ".video-player",
        ".player",
        ".plyr",
        ".jwplayer",
        ".video-js",
        ".video-info",
        ".player-info",
        ".episode-info",
    ])
});

static ACTIVE_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[
        ".episode-item.active",
        ".series-item.active",
        ".episode.active",
        ".active [data-episode]",
        ".current-episode",
        ".episode-current",
        "[class*=\"active\"][class*=\"episode\"]",
        "[class*=\"active\"][class*=\"series\"]",
        ".btn-series.active",
        ".b-seria__link.active",
    ])
});

static BREADCRUMB_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[
        ".breadcrumbs",
        ".breadcrumb",
        "[class*=\"breadcrumb\"]",
        ".path",
        ".navigation",
    ])
});

static VIDEO: LazyLock<Selector> = LazyLock::new(|| selector("video"));
static VIDEO_SOURCE: LazyLock<Selector> = LazyLock::new(|| selector("source"));
static IFRAME: LazyLock<Selector> = LazyLock::new(|| selector("iframe"));

static LABELLED_EPISODE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?i)(?:эпизод|серия|episode|ep)\s*[:\-]?\s*(\d+)")
});
static SHORT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\b(\d{1,3})\b"));
static ACTIVE_TEXT: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"(?i)(?:эпизод|серия|episode)\s*(\d+)",
        r"#?(\d+)",
        r"\b(\d{1,3})\b",
    ])
});
static URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"animego\.me/.*/(\d+)(?:\?|$|#)",
        r"[?&]episode=(\d+)",
        r"[?&]ep=(\d+)",
        r"episode-(\d+)",
        r"series-(\d+)",
        r"episode(\d+)",
        r"(?i)episode-(\d+)",
        r"(?i)ep-(\d+)",
        r"(?i)seria-(\d+)",
        r"/(\d+)(?:\?|$|#)",
        r"(?i)[?&]episode=(\d+)",
        r"(?i)[?&]ep=(\d+)",
        r"(?i)[?&]e=(\d+)",
    ])
});
static TITLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"(?i)(?:эпизод|серия|episode|ep)\s*[:\-]?\s*(\d+)",
        r"(?i)\b(?:серия|эпизод)\s*(\d+)",
        r"(?i)\bep?\s*(\d+)\b",
        r"#(\d+)\s*[-—]",
    ])
});
static BREADCRUMB_EPISODE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?i)(?:эпизод|серия|episode)\s*(\d+)")
});
static MEDIA_FILE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?i)(\d+)\.(mp4|m3u8|webm|mkv)"));
static ANY_NUMBER: LazyLock<Regex> = LazyLock::new(|| pattern(r"(\d+)"));

struct PlayerControls;

impl PageStrategy for PlayerControls {
    fn name(&self) -> &'static str {
        "player-controls"
    }

    fn extract(&self, page: &Page) -> Option<String> {
        PLAYER_SELECTORS.iter().find_map(|sel| {
            page.select_all(sel).find_map(|element| {
                if let Some(episode) = attr(element, "data-episode") {
                    return Some(episode.to_string());
                }
                let text = element_text(element);
                if let Some(episode) = first_capture(&LABELLED_EPISODE, &text) {
                    return Some(episode);
                }
                // Only short widgets; a whole player's text is full of unrelated numbers.
                if text.chars().count() < 50 {
                    return first_capture(&SHORT_NUMBER, &text);
                }
                None
            })
        })
    }
}

struct ActiveEpisode;

impl PageStrategy for ActiveEpisode {
    fn name(&self) -> &'static str {
        "active-episode"
    }

    fn extract(&self, page: &Page) -> Option<String> {
        ACTIVE_SELECTORS.iter().find_map(|sel| {
            let element = page.select_first(sel)?;
            if let Some(episode) = attr(element, "data-episode") {
                return Some(episode.to_string());
            }
            extract_number_from_text(&element_text(element), &ACTIVE_TEXT)
        })
    }
}

struct UrlEpisode;

impl PageStrategy for UrlEpisode {
    fn name(&self) -> &'static str {
        "url"
    }

    fn extract(&self, page: &Page) -> Option<String> {
        extract_number_from_text(page.url().as_str(), &URL_PATTERNS)
    }
}

struct PageTitleEpisode;

impl PageStrategy for PageTitleEpisode {
    fn name(&self) -> &'static str {
        "page-title"
    }

    fn extract(&self, page: &Page) -> Option<String> {
        extract_number_from_text(&page.document_title(), &TITLE_PATTERNS)
    }
}

struct Breadcrumbs;

impl PageStrategy for Breadcrumbs {
    fn name(&self) -> &'static str {
        "breadcrumbs"
    }

    fn extract(&self, page: &Page) -> Option<String> {
        BREADCRUMB_SELECTORS.iter().find_map(|sel| {
            let element = page.select_first(sel)?;
            first_capture(&BREADCRUMB_EPISODE, &element_text(element))
        })
    }
}

struct MediaSource;

impl PageStrategy for MediaSource {
    fn name(&self) -> &'static str {
        "media-source"
    }

    fn extract(&self, page: &Page) -> Option<String> {
        let from_video = page.select_all(&VIDEO).find_map(|video| {
            let src = attr(video, "src").or_else(|| {
                video
                    .select(&VIDEO_SOURCE)
                    .find_map(|source| attr(source, "src"))
            })?;
            first_capture(&MEDIA_FILE, src)
        });
        if from_video.is_some() {
            return from_video;
        }

        page.select_all(&IFRAME)
            .find_map(|iframe| first_capture(&ANY_NUMBER, attr(iframe, "src")?))
    }
}

const EPISODE_STRATEGIES: &[&dyn PageStrategy] = &[
    &PlayerControls,
    &ActiveEpisode,
    &UrlEpisode,
    &PageTitleEpisode,
    &Breadcrumbs,
    &MediaSource,
];

pub(crate) fn extract_episode(page: &Page) -> (String, Option<&'static str>) {
    match first_success(EPISODE_STRATEGIES, page) {
        Some(hit) => (hit.value, Some(hit.source)),
        None => (DEFAULT_EPISODE.to_string(), None),
    }
}
