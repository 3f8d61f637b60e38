mod cover;
mod episode;
mod normalize;
mod observe;
mod page;
mod season;
mod session;
mod strategy;
mod text;
mod title;


use tracing::{debug, warn};

use crate::model::AnimeObservation;

pub(crate) use normalize::normalize_for_matching;
pub(crate) use observe::{MutationRecord, diff_snapshots, is_relevant_click_target};
pub(crate) use page::Page;
pub(crate) use session::{Emission, PageSession, Trigger};

/// An observation together with the strategy that produced each field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExtractionReport {
    pub(crate) observation: AnimeObservation,
    pub(crate) title_source: Option<&'static str>,
    pub(crate) episode_source: Option<&'static str>,
    pub(crate) season_source: &'static str,
    pub(crate) cover_source: Option<&'static str>,
}

impl ExtractionReport {
    /// False when no usable title was found and the caller should retry.
    pub(crate) fn has_title(&self) -> bool {
        let observation = &self.observation;
        !observation.title.is_empty()
            && observation.title != title::UNKNOWN_TITLE
            && observation.raw_title != title::UNKNOWN_TITLE
            && !title::is_navigation_text(&observation.title)
    }
}

/// One full extraction pass over `page`.
pub(crate) fn extract_observation(page: &Page) -> ExtractionReport {
    let (raw_title, title_source) = title::extract_title(page);
    let (episode, episode_source) = episode::extract_episode(page);
    let season = season::extract_season(page, &raw_title, &episode);
    let (cover, cover_source) = cover::extract_cover(page);

    let observation = AnimeObservation {
        title: normalize::normalize_title(&raw_title),
        raw_title,
        season: season.value,
        episode,
        cover,
    };
    if observation.season == observation.episode && observation.episode != episode::DEFAULT_EPISODE
    {
        warn!(
            season = %observation.season,
            episode = %observation.episode,
            url = %page.url(),
            "season still equals episode after all fallbacks"
        );
    }
    debug!(
        title = %observation.title,
        episode = %observation.episode,
        season = %observation.season,
        "extraction pass finished"
    );

    ExtractionReport {
        observation,
        title_source,
        episode_source,
        season_source: season.source,
        cover_source,
    }
}
