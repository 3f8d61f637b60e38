use regex::Regex;

pub(crate) fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First capture group of the first pattern that matches.
pub(crate) fn extract_number_from_text(text: &str, patterns: &[Regex]) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    patterns
        .iter()
        .find_map(|pattern| first_capture(pattern, text))
}

pub(crate) fn first_capture(pattern: &Regex, text: &str) -> Option<String> {
    let captures = pattern.captures(text)?;
    let group = captures.get(1)?.as_str();
    (!group.is_empty()).then(|| group.to_string())
}

/// Subtractive Roman numeral parser; `None` on any non-numeral character.
pub(crate) fn roman_to_arabic(roman: &str) -> Option<u32> {
    let values = roman
        .chars()
        .map(|ch| match ch.to_ascii_uppercase() {
            'I' => Some(1),
            'V' => Some(5),
            'X' => Some(10),
            'L' => Some(50),
            'C' => Some(100),
            'D' => Some(500),
            'M' => Some(1000),
            _ => None,
        })
        .collect::<Option<Vec<u32>>>()?;
    if values.is_empty() {
        return None;
    }

    let mut total: i64 = 0;
    for (idx, current) in values.iter().enumerate() {
        match values.get(idx + 1) {
            Some(next) if current < next => total -= i64::from(*current),
            _ => total += i64::from(*current),
        }
    }
    u32::try_from(total).ok()
}

pub(crate) fn pattern(source: &str) -> Regex {
    Regex::new(source).unwrap_or_else(|err| panic!("invalid built-in pattern {source:?}: {err}"))
}

pub(crate) fn compile_patterns(sources: &[&str]) -> Vec<Regex> {
    sources.iter().map(|source| pattern(source)).collect()
}
