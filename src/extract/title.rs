use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;

use super::page::{Page, attr, element_text, selector, selectors};
use super::strategy::{PageStrategy, first_success};
use super::text::{clean_text, compile_patterns, pattern};

/// Returned when no candidate survives the filters; callers retry later.
pub(crate) const UNKNOWN_TITLE: &str = "Unknown anime";

static TITLE_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[
        "h1",
        ".anime-title",
        ".video-title",
        ".player-title",
        "[class*=\"title\"]",
        "[class*=\"name\"]",
        ".all_anime_title",
        ".aat_ep",
        "[class*=\"anime-name\"]",
        "title",
    ])
});

static OG_TITLE: LazyLock<Selector> =
    LazyLock::new(|| selector("meta[property=\"og:title\"]"));

static WATCH_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?i)(смотреть|онлайн|hd|1080p|720p|аниме|сериал|anime|serial|скачать|download).*$")
});

static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"[—•·|\s]{2,}"));

static TITLE_CLEANUP: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"(?i)эп\.[^.]*\.[a-z]+.*$",
        r"(?i)ep\.[^.]*\.[a-z]+.*$",
        r"(?i)только что.*$",
        r"(?i)\d+\s*(мин|минут|minutes?)\s*назад.*$",
        r"(?i)\d+\s*(ч|час|часов|hours?)\s*назад.*$",
    ])
});

const BOILERPLATE_TITLES: &[&str] = &["anime", "аниме", "главная", "home", "каталог", "catalog"];

const NAVIGATION_KEYWORDS: &[&str] = &[
    "навигация",
    "navigation",
    "меню",
    "menu",
    "каталог",
    "catalog",
    "поиск",
    "search",
    "войти",
    "login",
    "регистрация",
    "register",
];

struct SelectorTitle;

impl PageStrategy for SelectorTitle {
    fn name(&self) -> &'static str {
        "title-selectors"
    }

    fn extract(&self, page: &Page) -> Option<String> {
        TITLE_SELECTORS.iter().find_map(|sel| {
            page.select_all(sel).find_map(|element| {
                let title = extract_clean_title(&clean_text(&element_text(element)))?;
                (title.chars().count() > 2 && !is_navigation_text(&title)).then_some(title)
            })
        })
    }
}

struct OpenGraphTitle;

impl PageStrategy for OpenGraphTitle {
    fn name(&self) -> &'static str {
        "og:title"
    }

    fn extract(&self, page: &Page) -> Option<String> {
        let content = attr(page.select_first(&OG_TITLE)?, "content")?;
        let title = extract_clean_title(&clean_text(content))?;
        (!is_navigation_text(&title)).then_some(title)
    }
}

const TITLE_STRATEGIES: &[&dyn PageStrategy] = &[&SelectorTitle, &OpenGraphTitle];

/// Raw display title and the strategy that produced it.
pub(crate) fn extract_title(page: &Page) -> (String, Option<&'static str>) {
    match first_success(TITLE_STRATEGIES, page) {
        Some(hit) => (hit.value, Some(hit.source)),
        None => (UNKNOWN_TITLE.to_string(), None),
    }
}

/// Cuts site boilerplate off a candidate title; `None` if nothing usable is left.
pub(crate) fn extract_clean_title(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }

    let cut = WATCH_SUFFIX.replace(text, "");
    let mut clean = SEPARATOR_RUN.replace_all(&cut, " ").trim().to_string();
    for pattern in TITLE_CLEANUP.iter() {
        clean = pattern.replace(&clean, "").into_owned();
    }
    let clean = clean.trim().to_string();

    let lower = clean.to_lowercase();
    if BOILERPLATE_TITLES.contains(&lower.as_str()) || clean.chars().count() < 3 {
        return None;
    }
    Some(clean)
}

pub(crate) fn is_navigation_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    NAVIGATION_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}
