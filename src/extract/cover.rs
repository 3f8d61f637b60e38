use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

use super::page::{Page, attr, selector, selectors};
use super::strategy::{PageStrategy, first_success};
use super::text::{first_capture, pattern};

static META_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[
        "meta[property=\"og:image\"]",
        "meta[name=\"twitter:image\"]",
        "meta[property=\"twitter:image\"]",
        "link[rel=\"image_src\"]",
    ])
});

static IMAGE_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[
        ".anime-poster img",
        ".poster img",
        ".cover img",
        ".anime-cover img",
        ".video-cover img",
        ".all_anime_title img",
        ".aat_ep img",
        "[class*=\"poster\"] img",
        "[class*=\"cover\"] img",
        ".thumbnail img",
        ".anime-thumbnail img",
    ])
});

static BACKGROUND_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[
        ".anime-poster",
        ".poster",
        ".cover",
        ".anime-cover",
        ".all_anime_title",
        ".aat_ep",
        "[class*=\"poster\"]",
        "[class*=\"cover\"]",
        ".thumbnail",
        ".anime-thumbnail",
    ])
});

static VIDEO: LazyLock<Selector> = LazyLock::new(|| selector("video"));
static IMG: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static ANIME_ELEMENTS: LazyLock<Selector> =
    LazyLock::new(|| selector("[class*=\"anime\"], [class*=\"title\"]"));

static BACKGROUND_URL: LazyLock<Regex> =
    LazyLock::new(|| pattern(r#"url\(\s*['"]?(.*?)['"]?\s*\)"#));

static IMAGE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?i)\.(jpg|jpeg|png|webp|gif|bmp)(?:\?.*)?$")
});

const IMAGE_SOURCE_ATTRS: &[&str] = &["src", "data-src", "data-original", "data-lazy-src"];
const BLOCKED_IMAGE_WORDS: &[&str] = &["icon", "logo", "avatar"];

pub(crate) fn is_valid_image_url(candidate: &str) -> bool {
    IMAGE_EXTENSION.is_match(candidate)
        && !BLOCKED_IMAGE_WORDS
            .iter()
            .any(|word| candidate.contains(word))
}

/// Resolves protocol-relative and origin-relative references against the page.
pub(crate) fn make_absolute_url(page_url: &Url, candidate: &str) -> String {
    if let Some(rest) = candidate.strip_prefix("//") {
        return format!("https://{rest}");
    }
    if candidate.starts_with("http") {
        return candidate.to_string();
    }

    let origin = page_url.origin();
    if !origin.is_tuple() {
        return page_url
            .join(candidate)
            .map(String::from)
            .unwrap_or_else(|_| candidate.to_string());
    }
    let origin = origin.ascii_serialization();
    if candidate.starts_with('/') {
        format!("{origin}{candidate}")
    } else {
        format!("{origin}/{candidate}")
    }
}

fn accept(page: &Page, candidate: &str) -> Option<String> {
    is_valid_image_url(candidate).then(|| make_absolute_url(page.url(), candidate))
}

fn image_url(page: &Page, img: ElementRef<'_>) -> Option<String> {
    let candidate = IMAGE_SOURCE_ATTRS.iter().find_map(|name| attr(img, name))?;
    accept(page, candidate)
}

fn background_url(page: &Page, element: ElementRef<'_>) -> Option<String> {
    let style = attr(element, "style")?;
    if !style.to_ascii_lowercase().contains("background") {
        return None;
    }
    let candidate = first_capture(&BACKGROUND_URL, style)?;
    accept(page, &candidate)
}

struct MetaCover;

impl PageStrategy for MetaCover {
    fn name(&self) -> &'static str {
        "meta"
    }

    fn extract(&self, page: &Page) -> Option<String> {
        META_SELECTORS.iter().find_map(|sel| {
            let element = page.select_first(sel)?;
            let candidate = attr(element, "content").or_else(|| attr(element, "href"))?;
            accept(page, candidate)
        })
    }
}

struct ImageCover;

impl PageStrategy for ImageCover {
    fn name(&self) -> &'static str {
        "poster-image"
    }

    fn extract(&self, page: &Page) -> Option<String> {
        IMAGE_SELECTORS
            .iter()
            .find_map(|sel| page.select_all(sel).find_map(|img| image_url(page, img)))
    }
}

struct BackgroundCover;

impl PageStrategy for BackgroundCover {
    fn name(&self) -> &'static str {
        "background-image"
    }

    fn extract(&self, page: &Page) -> Option<String> {
        BACKGROUND_SELECTORS.iter().find_map(|sel| {
            page.select_all(sel)
                .find_map(|element| background_url(page, element))
        })
    }
}

struct VideoPosterCover;

impl PageStrategy for VideoPosterCover {
    fn name(&self) -> &'static str {
        "video-poster"
    }

    fn extract(&self, page: &Page) -> Option<String> {
        let poster = attr(page.select_first(&VIDEO)?, "poster")?;
        accept(page, poster)
    }
}

struct AnimeElementCover;

impl PageStrategy for AnimeElementCover {
    fn name(&self) -> &'static str {
        "anime-element"
    }

    fn extract(&self, page: &Page) -> Option<String> {
        page.select_all(&ANIME_ELEMENTS).find_map(|element| {
            background_url(page, element).or_else(|| {
                let img = element.select(&IMG).next()?;
                image_url(page, img)
            })
        })
    }
}

const COVER_STRATEGIES: &[&dyn PageStrategy] = &[
    &MetaCover,
    &ImageCover,
    &BackgroundCover,
    &VideoPosterCover,
    &AnimeElementCover,
];

pub(crate) fn extract_cover(page: &Page) -> (Option<String>, Option<&'static str>) {
    match first_success(COVER_STRATEGIES, page) {
        Some(hit) => (Some(hit.value), Some(hit.source)),
        None => (None, None),
    }
}
