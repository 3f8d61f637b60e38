use chrono::{DateTime, Duration, Local, TimeZone};
use url::Url;

use crate::model::{TrackingItem, UNKNOWN_TOTAL};

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}

/// Human-friendly age of a millisecond timestamp relative to `now`.
pub(crate) fn format_relative_time(timestamp_ms: i64, now: DateTime<Local>) -> String {
    let diff = now.timestamp_millis() - timestamp_ms;
    if diff < 60_000 {
        return "just now".to_string();
    }
    if diff < 3_600_000 {
        return format!("{} min ago", diff / 60_000);
    }
    if diff < 86_400_000 {
        return format!("{} h ago", diff / 3_600_000);
    }

    let Some(when) = Local.timestamp_millis_opt(timestamp_ms).single() else {
        return timestamp_ms.to_string();
    };
    let today = now.date_naive();
    if when.date_naive() == today {
        format!("today at {}", when.format("%H:%M"))
    } else if Some(when.date_naive()) == today.checked_sub_signed(Duration::days(1)) {
        format!("yesterday at {}", when.format("%H:%M"))
    } else {
        when.format("%-d %b, %H:%M").to_string()
    }
}

/// Rounded completion percentage; 0 while the total is unknown.
pub(crate) fn progress_percent(item: &TrackingItem) -> u16 {
    match item.known_total() {
        Some(total) if total > 0 => {
            let ratio = f64::from(item.current_episode_number()) / f64::from(total);
            (ratio * 100.0).round().min(100.0) as u16
        }
        _ => 0,
    }
}

pub(crate) fn progress_label(item: &TrackingItem) -> String {
    let total = item
        .known_total()
        .map(|total| total.to_string())
        .unwrap_or_else(|| UNKNOWN_TOTAL.to_string());
    format!("{}/{}", item.current_episode_number(), total)
}

pub(crate) fn site_domain(raw: &str) -> String {
    let Some(host) = Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
    else {
        return "unknown".to_string();
    };
    let host = host.strip_prefix("www.").unwrap_or(&host);
    truncate(host, 20)
}
