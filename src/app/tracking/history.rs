use std::collections::HashMap;

use tracing::info;

use crate::db::{Store, StoreError, StoreKey, load_history, load_settings, save};
use crate::extract::normalize_for_matching;
use crate::model::{AnimeObservation, HistoryEntry, Settings, new_entry_id};

pub(crate) fn new_history_entry(
    observation: &AnimeObservation,
    url: &str,
    tab_id: Option<i64>,
    now_ms: i64,
) -> HistoryEntry {
    HistoryEntry {
        id: new_entry_id(now_ms),
        title: observation.title.clone(),
        raw_title: observation.raw_title.clone(),
        season: observation.season.clone(),
        episode: observation.episode.clone(),
        cover: observation.cover.clone(),
        timestamp: now_ms,
        url: url.to_string(),
        tab_id,
    }
}

/// Newest entries first; anything past `max_items` is dropped from the tail.
pub(crate) fn append_observation(history: &mut Vec<HistoryEntry>, entry: HistoryEntry, max_items: usize) {
    history.insert(0, entry);
    truncate_to(history, max_items);
}

/// Returns how many entries were dropped.
pub(crate) fn truncate_to(history: &mut Vec<HistoryEntry>, max_items: usize) -> usize {
    let removed = history.len().saturating_sub(max_items);
    history.truncate(max_items);
    removed
}

pub(crate) fn history_cap(settings: &Settings) -> usize {
    if settings.max_history_items == 0 {
        Settings::default().max_history_items
    } else {
        settings.max_history_items
    }
}

/// Scheduled compaction, independent of insertion.
pub(crate) fn cleanup_history(store: &dyn Store) -> Result<usize, StoreError> {
    let cap = history_cap(&load_settings(store)?);
    let mut history = load_history(store)?;
    let removed = truncate_to(&mut history, cap);
    if removed > 0 {
        save(store, StoreKey::WatchHistory, &history)?;
        info!(removed, kept = history.len(), "history cleaned up");
    }
    Ok(removed)
}

pub(crate) fn remove_entry(history: &mut Vec<HistoryEntry>, id: &str) -> Option<HistoryEntry> {
    let idx = history.iter().position(|entry| entry.id == id)?;
    Some(history.remove(idx))
}

/// Read-modify-write of `watchHistory` in one round trip.
pub(crate) fn remove_history_entry(
    store: &dyn Store,
    id: &str,
) -> Result<Option<HistoryEntry>, StoreError> {
    let mut history = load_history(store)?;
    let removed = remove_entry(&mut history, id);
    if removed.is_some() {
        save(store, StoreKey::WatchHistory, &history)?;
    }
    Ok(removed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TitleCount {
    pub(crate) display_title: String,
    pub(crate) count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct HistoryStats {
    pub(crate) total_watched: usize,
    pub(crate) unique_titles: usize,
    /// Most watched first, ties in order of first appearance.
    pub(crate) titles: Vec<TitleCount>,
}

pub(crate) fn history_stats(history: &[HistoryEntry]) -> HistoryStats {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut titles: Vec<TitleCount> = Vec::new();
    for entry in history {
        let key = normalize_for_matching(&entry.title);
        match index.get(&key) {
            Some(&idx) => titles[idx].count += 1,
            None => {
                index.insert(key, titles.len());
                titles.push(TitleCount {
                    display_title: entry.display_title().to_string(),
                    count: 1,
                });
            }
        }
    }
    titles.sort_by(|a, b| b.count.cmp(&a.count));

    HistoryStats {
        total_watched: history.len(),
        unique_titles: titles.len(),
        titles,
    }
}
