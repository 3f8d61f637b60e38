use std::sync::LazyLock;

use regex::Regex;

use super::text::{compile_patterns, pattern};
use super::title::UNKNOWN_TITLE;

// Episode and serial-number fragments. Season markers are left alone unless
// they come glued to an episode number.
static EPISODE_NOISE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"(?i)\s*\(\s*\d+\s*серия\s*\)",
        r"(?i)\s*\[\s*\d+\s*серия\s*\]",
        r"(?i)\s*-\s*\d+\s*серия\s*$",
        r"(?i)\s*серия\s*\d+\s*$",
        r"(?i)\s*эпизод\s*\d+\s*$",
        r"(?i)\s*серия\s*\d+",
        r"(?i)\s*эпизод\s*\d+",
        r"\s*#\d+\s*$",
        r"(?i)\s*\(\s*episode\s*\d+\s*\)",
        r"(?i)\s*\[\s*episode\s*\d+\s*\]",
        r"(?i)\s*-\s*episode\s*\d+\s*$",
        r"(?i)\s*episode\s*\d+\s*$",
        r"(?i)\s*ep\s*\d+\s*$",
        r"(?i)\s*ep\.\s*\d+\s*$",
        r"\s*\(\s*\d+\s*\)\s*$",
        r"\s*\[\s*\d+\s*\]\s*$",
        r"\s*-\s*\d+\s*$",
        r"\s*\.\s*\d+\s*$",
        r"\s*~\s*\d+\s*$",
        r"(?i)\s*\(\s*сезон\s*\d+\s*серия\s*\d+\s*\)",
        r"(?i)\s*\(\s*season\s*\d+\s*episode\s*\d+\s*\)",
        r"(?i)\s*s\d+\s*e\d+\s*$",
        r"(?i)\s*season\s*\d+\s*episode\s*\d+\s*$",
    ])
});

// Source domains, relative timestamps and truncation marks.
static SOURCE_NOISE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"(?i)\s*эп\.\s*[a-z0-9.-]+\.[a-z]+",
        r"(?i)\s*ep\.\s*[a-z0-9.-]+\.[a-z]+",
        r"(?i)\s*только что$",
        r"(?i)\s*(\d+)\s*(мин|минут|minutes?)\s*назад$",
        r"(?i)\s*(\d+)\s*(ч|час|часов|hours?)\s*назад$",
        r"(?i)\s*(\d+)\s*(д|день|дней|days?)\s*назад$",
        r"\s*\.{3,}$",
        r"\s*…$",
        r"(?i)\s*k\s*\.\s*\.\s*\.$",
        r"(?i)\s*c\s*\.\s*\.\s*\.$",
    ])
});

static TRAILING_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\s*[.,;:!?\-~]\s*$"));

const MAX_PASSES: usize = 16;

/// Strips episode/source noise from a display title for grouping. Runs to a
/// fixed point so normalizing twice gives the same result; falls back to the
/// input when stripping would leave fewer than two characters.
pub(crate) fn normalize_title(title: &str) -> String {
    if title.is_empty() || title == UNKNOWN_TITLE {
        return title.to_string();
    }

    let mut normalized = title.to_string();
    for _ in 0..MAX_PASSES {
        let next = strip_once(&normalized);
        if next == normalized {
            break;
        }
        normalized = next;
    }

    if normalized.chars().count() < 2 {
        return title.to_string();
    }
    normalized
}

fn strip_once(title: &str) -> String {
    let mut out = title.to_string();
    for pattern in EPISODE_NOISE.iter().chain(SOURCE_NOISE.iter()) {
        out = pattern.replace_all(&out, "").into_owned();
    }
    let collapsed = out.split_whitespace().collect::<Vec<_>>().join(" ");
    TRAILING_PUNCTUATION
        .replace_all(&collapsed, "")
        .trim()
        .to_string()
}

/// Lowercase comparison form: word characters (Cyrillic included) and single spaces.
pub(crate) fn normalize_for_matching(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_alphanumeric() || *ch == '_' || ch.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_english_episode_suffix_and_keeps_case() {
        assert_eq!(normalize_title("Naruto - Episode 5"), "Naruto");
        assert_eq!(normalize_title("Bleach (Episode 12)"), "Bleach");
        assert_eq!(normalize_title("Monster ep. 3"), "Monster");
        assert_eq!(normalize_title("Frieren S01E05"), "Frieren");
    }

    #[test]
    fn strips_russian_episode_fragments() {
        assert_eq!(normalize_title("Магическая битва - 5 серия"), "Магическая битва");
        assert_eq!(normalize_title("Наруто (12 серия)"), "Наруто");
        assert_eq!(normalize_title("Наруто серия 7"), "Наруто");
    }

    #[test]
    fn keeps_season_indicators() {
        assert_eq!(
            normalize_title("Attack on Titan Season 2 - Episode 5"),
            "Attack on Titan Season 2"
        );
        assert_eq!(normalize_title("Доктор Стоун 3 сезон"), "Доктор Стоун 3 сезон");
    }

    #[test]
    fn strips_sources_timestamps_and_ellipsis() {
        assert_eq!(normalize_title("One Piece эп. applers.org"), "One Piece");
        assert_eq!(normalize_title("One Piece 5 минут назад"), "One Piece");
        assert_eq!(
            normalize_title("Kaguya-sama wa Kokurasetai..."),
            "Kaguya-sama wa Kokurasetai"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in [
            "Naruto - Episode 5",
            "Show - 3 - 4",
            "Re:Zero (Season 2 Episode 4)",
            "Наруто [3 серия] - 4",
            "Gintama.",
            "12",
        ] {
            let once = normalize_title(raw);
            assert_eq!(normalize_title(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn keeps_raw_title_when_everything_would_be_stripped() {
        assert_eq!(normalize_title("Episode 5"), "Episode 5");
        assert_eq!(normalize_title(UNKNOWN_TITLE), UNKNOWN_TITLE);
        assert_eq!(normalize_title(""), "");
    }

    #[test]
    fn matching_form_lowercases_and_drops_punctuation() {
        assert_eq!(normalize_for_matching("  Re:Zero —  Season 2! "), "rezero season 2");
        assert_eq!(normalize_for_matching("Магическая Битва: 2"), "магическая битва 2");
        let once = normalize_for_matching("Kaguya-sama: Love is War");
        assert_eq!(normalize_for_matching(&once), once);
    }
}
