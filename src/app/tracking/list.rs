use crate::db::{Store, StoreError, StoreKey, load_tracking, save};
use crate::model::{
    AnimeObservation, TrackingItem, TrackingStatus, UNKNOWN_TOTAL, new_entry_id, parse_leading_u32,
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum EditError {
    #[error("no tracking entry with id `{0}`")]
    UnknownId(String),
    #[error("total must be a whole number or `?`, got `{0}`")]
    InvalidTotal(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AddOutcome {
    Added(TrackingItem),
    AlreadyTracked(TrackingItem),
}

/// New entries go to the front; an exact title+season pair is tracked once.
pub(crate) fn add_to_tracking(
    list: &mut Vec<TrackingItem>,
    observation: &AnimeObservation,
    now_ms: i64,
) -> AddOutcome {
    if let Some(existing) = list
        .iter()
        .find(|item| item.title == observation.title && item.season == observation.season)
    {
        return AddOutcome::AlreadyTracked(existing.clone());
    }

    let raw_title = if observation.raw_title.is_empty() {
        observation.title.clone()
    } else {
        observation.raw_title.clone()
    };
    let item = TrackingItem {
        id: new_entry_id(now_ms),
        title: observation.title.clone(),
        raw_title,
        season: observation.season.clone(),
        current_episode: observation.episode.clone(),
        total_episodes: UNKNOWN_TOTAL.to_string(),
        cover: observation.cover.clone(),
        added_at: now_ms,
        last_updated: None,
        status: TrackingStatus::Watching,
    };
    list.insert(0, item.clone());
    AddOutcome::Added(item)
}

fn find_mut<'a>(list: &'a mut [TrackingItem], id: &str) -> Result<&'a mut TrackingItem, EditError> {
    list.iter_mut()
        .find(|item| item.id == id)
        .ok_or_else(|| EditError::UnknownId(id.to_string()))
}

pub(crate) fn increment_episode(list: &mut [TrackingItem], id: &str) -> Result<TrackingItem, EditError> {
    let item = find_mut(list, id)?;
    item.current_episode = item.current_episode_number().saturating_add(1).to_string();
    item.refresh_status();
    Ok(item.clone())
}

/// Manual decrement is the one way progress may go back; it stops at zero.
pub(crate) fn decrement_episode(list: &mut [TrackingItem], id: &str) -> Result<TrackingItem, EditError> {
    let item = find_mut(list, id)?;
    let current = item.current_episode_number();
    if current > 0 {
        item.current_episode = (current - 1).to_string();
        item.refresh_status();
    }
    Ok(item.clone())
}

pub(crate) fn set_total(list: &mut [TrackingItem], id: &str, total: &str) -> Result<TrackingItem, EditError> {
    let total = total.trim();
    let total = if total == UNKNOWN_TOTAL {
        UNKNOWN_TOTAL.to_string()
    } else if !total.is_empty() && total.chars().all(|ch| ch.is_ascii_digit()) {
        parse_leading_u32(total)
            .ok_or_else(|| EditError::InvalidTotal(total.to_string()))?
            .to_string()
    } else {
        return Err(EditError::InvalidTotal(total.to_string()));
    };

    let item = find_mut(list, id)?;
    item.total_episodes = total;
    item.refresh_status();
    Ok(item.clone())
}

pub(crate) fn remove_from_tracking(list: &mut Vec<TrackingItem>, id: &str) -> Result<TrackingItem, EditError> {
    let idx = list
        .iter()
        .position(|item| item.id == id)
        .ok_or_else(|| EditError::UnknownId(id.to_string()))?;
    Ok(list.remove(idx))
}

/// Loads `trackingList`, applies `edit` and writes the list back when the edit succeeds.
pub(crate) fn modify_tracking<T>(
    store: &dyn Store,
    edit: impl FnOnce(&mut Vec<TrackingItem>) -> Result<T, EditError>,
) -> Result<T, EditError> {
    let mut list = load_tracking(store)?;
    let outcome = edit(&mut list)?;
    save(store, StoreKey::TrackingList, &list)?;
    Ok(outcome)
}
