use anyhow::{Result, bail};

use crate::db::{Store, StoreKey, load_current, load_history, load_tracking, save};
use crate::model::{AnimeObservation, CurrentAnime, HistoryEntry, TrackingItem, now_ms};

use super::super::tracking::{
    AddOutcome, add_to_tracking, decrement_episode, history_stats, increment_episode,
    modify_tracking, remove_from_tracking, remove_history_entry, set_total,
};
use super::{TotalInput, TuiData};

pub(super) fn load_data(store: &dyn Store) -> Result<TuiData> {
    let history = load_history(store)?;
    let stats = history_stats(&history);
    Ok(TuiData {
        current: load_current(store)?,
        tracking: load_tracking(store)?,
        history,
        stats,
    })
}

pub(super) fn status_info(msg: &str) -> String {
    format!("INFO: {msg}")
}

pub(super) fn status_error(msg: &str) -> String {
    format!("ERROR: {msg}")
}

/// Returns the status text and, when a new entry was created, its id.
fn add_observation(
    store: &dyn Store,
    observation: &AnimeObservation,
) -> Result<(String, Option<String>)> {
    let outcome = modify_tracking(store, |list| Ok(add_to_tracking(list, observation, now_ms())))?;
    Ok(match outcome {
        AddOutcome::Added(item) => (
            format!("Added \"{}\" to tracking.", item.display_title()),
            Some(item.id),
        ),
        AddOutcome::AlreadyTracked(item) => (
            format!("\"{}\" is already tracked.", item.display_title()),
            None,
        ),
    })
}

pub(super) fn add_current_to_tracking(
    store: &dyn Store,
    current: Option<&CurrentAnime>,
) -> Result<(String, Option<String>)> {
    let Some(current) = current else {
        bail!("nothing detected yet");
    };
    add_observation(store, &current.observation)
}

pub(super) fn add_history_to_tracking(
    store: &dyn Store,
    entry: Option<&HistoryEntry>,
) -> Result<(String, Option<String>)> {
    let Some(entry) = entry else {
        bail!("no history entry selected");
    };
    add_observation(store, &entry.observation())
}

pub(super) fn edit_episode(store: &dyn Store, id: &str, forward: bool) -> Result<String> {
    let item = modify_tracking(store, |list| {
        if forward {
            increment_episode(list, id)
        } else {
            decrement_episode(list, id)
        }
    })?;
    Ok(progress_message(&item))
}

pub(super) fn apply_total(store: &dyn Store, input: &TotalInput) -> Result<String> {
    let item = modify_tracking(store, |list| set_total(list, &input.id, &input.buffer))?;
    Ok(progress_message(&item))
}

fn progress_message(item: &TrackingItem) -> String {
    format!(
        "{}: episode {}/{} ({})",
        item.display_title(),
        item.current_episode,
        item.total_episodes,
        item.status.label()
    )
}

pub(super) fn delete_tracking(store: &dyn Store, id: &str, title: &str) -> Result<String> {
    modify_tracking(store, |list| remove_from_tracking(list, id))?;
    Ok(format!("Removed \"{title}\" from tracking."))
}

pub(super) fn remove_history(store: &dyn Store, id: &str) -> Result<String> {
    match remove_history_entry(store, id)? {
        Some(entry) => Ok(format!("Removed \"{}\" from history.", entry.display_title())),
        None => bail!("history entry `{id}` no longer exists"),
    }
}

pub(super) fn clear_history(store: &dyn Store) -> Result<String> {
    save(store, StoreKey::WatchHistory, &Vec::<HistoryEntry>::new())?;
    Ok("History cleared.".to_string())
}

pub(super) fn clear_tracking(store: &dyn Store) -> Result<String> {
    save(store, StoreKey::TrackingList, &Vec::<TrackingItem>::new())?;
    Ok("Tracking list cleared.".to_string())
}
