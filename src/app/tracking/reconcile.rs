use serde::Serialize;
use tracing::{debug, info, warn};

use crate::extract::normalize_for_matching;
use crate::model::{AnimeObservation, TrackingItem, TrackingStatus, parse_leading_u32};

/// How an observation was tied to a tracking entry, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum MatchTier {
    TitleAndSeason,
    RawTitleAndSeason,
    TitleOnly,
}

pub(crate) fn match_tier(item: &TrackingItem, observation: &AnimeObservation) -> Option<MatchTier> {
    if item.title == observation.title && item.season == observation.season {
        return Some(MatchTier::TitleAndSeason);
    }
    if !item.raw_title.is_empty()
        && !observation.raw_title.is_empty()
        && item.season == observation.season
        && normalize_for_matching(&item.raw_title) == normalize_for_matching(&observation.raw_title)
    {
        return Some(MatchTier::RawTitleAndSeason);
    }
    if normalize_for_matching(&item.title) == normalize_for_matching(&observation.title) {
        return Some(MatchTier::TitleOnly);
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProgressUpdate {
    pub(crate) item_id: String,
    pub(crate) display_title: String,
    pub(crate) episode: u32,
    pub(crate) completed: bool,
    pub(crate) tier: MatchTier,
}

/// Advances matching entries to the observed episode. Entries never move
/// backwards here; only entries at the strongest tier present are considered.
pub(crate) fn apply_observation(
    list: &mut [TrackingItem],
    observation: &AnimeObservation,
    now_ms: i64,
) -> Vec<ProgressUpdate> {
    let Some(episode) = parse_leading_u32(&observation.episode) else {
        debug!(episode = %observation.episode, "episode is not a number, skipping progress update");
        return Vec::new();
    };

    let tiers: Vec<Option<MatchTier>> = list
        .iter()
        .map(|item| match_tier(item, observation))
        .collect();
    let Some(best) = tiers.iter().flatten().min().copied() else {
        return Vec::new();
    };
    if best == MatchTier::TitleOnly {
        warn!(
            title = %observation.title,
            season = %observation.season,
            "matched tracking entry by title only, season differs"
        );
    }

    let mut updates = Vec::new();
    for (item, tier) in list.iter_mut().zip(tiers) {
        if tier != Some(best) {
            continue;
        }
        let tracked = item.current_episode_number();
        if episode <= tracked {
            debug!(
                title = item.display_title(),
                tracked, episode, "tracked episode is already current"
            );
            continue;
        }

        item.current_episode = episode.to_string();
        item.last_updated = Some(now_ms);
        if item.reaches_total(episode) {
            item.status = TrackingStatus::Completed;
        }
        info!(
            title = item.display_title(),
            from = tracked,
            to = episode,
            status = item.status.label(),
            "tracking progress advanced"
        );
        updates.push(ProgressUpdate {
            item_id: item.id.clone(),
            display_title: item.display_title().to_string(),
            episode,
            completed: item.status == TrackingStatus::Completed,
            tier: best,
        });
    }
    updates
}
