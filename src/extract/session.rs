use std::time::{Duration, Instant};

use tracing::debug;
use url::Url;

use super::ExtractionReport;
use super::observe::MutationRecord;
use crate::config::EngineConfig;
use crate::model::AnimeObservation;

/// Events that may warrant a fresh extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Trigger {
    PageLoaded,
    Load,
    Mutation(MutationRecord),
    UserClick { relevant: bool },
    UrlChanged(Url),
    SafetyPoll,
}

/// What the caller should do with the result of an extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Emission {
    Emit(AnimeObservation),
    Duplicate,
    Retry(Duration),
    GaveUp,
}

/// Per-page detection state: dedup key, retry counter and the pending
/// debounce deadline. Time is passed in so the session stays deterministic.
pub(crate) struct PageSession {
    config: EngineConfig,
    location: String,
    last_key: Option<String>,
    retries: u32,
    pending: Option<Instant>,
    last_safety_poll: Instant,
}

impl PageSession {
    pub(crate) fn new(url: &Url, config: EngineConfig, now: Instant) -> Self {
        Self {
            config,
            location: location_of(url),
            last_key: None,
            retries: 0,
            pending: None,
            last_safety_poll: now,
        }
    }

    pub(crate) fn retries(&self) -> u32 {
        self.retries
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.pending
    }

    /// Records a trigger; returns whether it scheduled an extraction.
    pub(crate) fn trigger(&mut self, trigger: Trigger, now: Instant) -> bool {
        let delay = match trigger {
            Trigger::PageLoaded => self.config.initial_delay_ms,
            Trigger::Load => self.config.load_delay_ms,
            Trigger::Mutation(record) if record.is_relevant() => {
                self.config.mutation_debounce_ms
            }
            Trigger::Mutation(_) => return false,
            Trigger::UserClick { relevant: true } => self.config.click_debounce_ms,
            Trigger::UserClick { relevant: false } => return false,
            Trigger::UrlChanged(url) => {
                let location = location_of(&url);
                if location == self.location {
                    return false;
                }
                debug!(from = %self.location, to = %location, "navigation detected, resetting session");
                self.location = location;
                self.last_key = None;
                self.retries = 0;
                self.config.navigation_delay_ms
            }
            Trigger::SafetyPoll => {
                self.last_safety_poll = now;
                if !self.safety_poll_allowed() {
                    return false;
                }
                0
            }
        };
        self.schedule(now + Duration::from_millis(delay));
        true
    }

    /// True once a safety-poll interval has passed since the last safety poll.
    pub(crate) fn safety_poll_elapsed(&self, now: Instant) -> bool {
        now.duration_since(self.last_safety_poll) >= Duration::from_secs(self.config.safety_poll_secs)
    }

    /// True once the pending deadline has passed; consumes it.
    pub(crate) fn due(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(deadline) if deadline <= now => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Decides whether the observation from a finished pass gets sent.
    pub(crate) fn on_extracted(
        &mut self,
        report: &ExtractionReport,
        url: &Url,
        now: Instant,
    ) -> Emission {
        if !report.has_title() {
            if self.retries >= self.config.max_retries {
                debug!(retries = self.retries, "no usable title, giving up until the next trigger");
                return Emission::GaveUp;
            }
            self.retries += 1;
            let delay = Duration::from_millis(self.config.retry_step_ms * u64::from(self.retries));
            self.schedule(now + delay);
            return Emission::Retry(delay);
        }

        let key = report.observation.dedup_key(url.as_str());
        if self.last_key.as_deref() == Some(key.as_str()) {
            return Emission::Duplicate;
        }
        self.last_key = Some(key);
        Emission::Emit(report.observation.clone())
    }

    fn safety_poll_allowed(&self) -> bool {
        self.retries < self.config.safety_poll_retry_cap
    }

    // Overlapping triggers coalesce onto the earliest deadline.
    fn schedule(&mut self, deadline: Instant) {
        self.pending = Some(match self.pending {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
    }
}

fn location_of(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::observe::AddedNode;

    fn url(raw: &str) -> Url {
        Url::parse(raw).expect("valid url")
    }

    fn report(title: &str, episode: &str) -> ExtractionReport {
        ExtractionReport {
            observation: AnimeObservation {
                title: title.to_string(),
                raw_title: title.to_string(),
                season: "1".to_string(),
                episode: episode.to_string(),
                cover: None,
            },
            title_source: Some("title-selectors"),
            episode_source: Some("url"),
            season_source: "episode-band",
            cover_source: None,
        }
    }

    #[test]
    fn unchanged_page_is_emitted_once() {
        let page = url("https://jut.su/naruto/episode-5.html");
        let start = Instant::now();
        let mut session = PageSession::new(&page, EngineConfig::default(), start);

        let first = session.on_extracted(&report("Naruto", "5"), &page, start);
        assert!(matches!(first, Emission::Emit(_)));
        let second = session.on_extracted(&report("Naruto", "5"), &page, start);
        assert_eq!(second, Emission::Duplicate);
        let next = session.on_extracted(&report("Naruto", "6"), &page, start);
        assert!(matches!(next, Emission::Emit(obs) if obs.episode == "6"));
    }

    #[test]
    fn navigation_resets_dedup_state() {
        let page = url("https://jut.su/naruto/episode-5.html");
        let start = Instant::now();
        let mut session = PageSession::new(&page, EngineConfig::default(), start);
        session.on_extracted(&report("Naruto", "5"), &page, start);

        assert!(!session.trigger(Trigger::UrlChanged(page.clone()), start));
        assert!(session.trigger(Trigger::UrlChanged(url("https://jut.su/naruto/episode-5.html?t=1")), start));
        assert_eq!(
            session.next_deadline(),
            Some(start + Duration::from_millis(2000))
        );
        let again = session.on_extracted(&report("Naruto", "5"), &page, start);
        assert!(matches!(again, Emission::Emit(_)));
    }

    #[test]
    fn unknown_title_retries_with_linear_backoff_then_gives_up() {
        let page = url("https://animego.org/anime/1");
        let start = Instant::now();
        let config = EngineConfig {
            max_retries: 3,
            ..EngineConfig::default()
        };
        let mut session = PageSession::new(&page, config, start);
        let unknown = report(crate::extract::title::UNKNOWN_TITLE, "1");

        assert_eq!(
            session.on_extracted(&unknown, &page, start),
            Emission::Retry(Duration::from_millis(1000))
        );
        assert_eq!(
            session.on_extracted(&unknown, &page, start),
            Emission::Retry(Duration::from_millis(2000))
        );
        assert_eq!(
            session.on_extracted(&unknown, &page, start),
            Emission::Retry(Duration::from_millis(3000))
        );
        assert_eq!(session.on_extracted(&unknown, &page, start), Emission::GaveUp);
        assert_eq!(session.retries(), 3);
    }

    #[test]
    fn navigation_text_counts_as_missing_title() {
        let page = url("https://animego.org/anime/1");
        let start = Instant::now();
        let mut session = PageSession::new(&page, EngineConfig::default(), start);
        let outcome = session.on_extracted(&report("Главное меню", "1"), &page, start);
        assert!(matches!(outcome, Emission::Retry(_)));
    }

    #[test]
    fn triggers_coalesce_onto_the_earliest_deadline() {
        let page = url("https://animego.org/anime/1");
        let start = Instant::now();
        let mut session = PageSession::new(&page, EngineConfig::default(), start);

        assert!(session.trigger(Trigger::Load, start));
        assert!(session.trigger(Trigger::PageLoaded, start));
        let irrelevant = MutationRecord::ChildList {
            added: vec![AddedNode {
                classes: vec!["banner".to_string()],
                has_episode_attr: false,
            }],
        };
        assert!(!session.trigger(Trigger::Mutation(irrelevant), start));
        assert!(!session.trigger(Trigger::UserClick { relevant: false }, start));
        assert_eq!(
            session.next_deadline(),
            Some(start + Duration::from_millis(2000))
        );

        assert!(!session.due(start + Duration::from_millis(1999)));
        assert!(session.due(start + Duration::from_millis(2000)));
        assert!(!session.due(start + Duration::from_millis(2001)));
    }

    #[test]
    fn safety_poll_stops_once_retries_reach_the_cap() {
        let page = url("https://animego.org/anime/1");
        let start = Instant::now();
        let at = |secs: u64| start + Duration::from_secs(secs);
        let mut session = PageSession::new(&page, EngineConfig::default(), start);

        assert!(!session.safety_poll_elapsed(at(9)));
        assert!(session.safety_poll_elapsed(at(10)));
        assert!(session.trigger(Trigger::SafetyPoll, at(10)));
        assert!(session.due(at(10)));
        assert!(!session.safety_poll_elapsed(at(15)));

        let unknown = report(crate::extract::title::UNKNOWN_TITLE, "1");
        for _ in 0..3 {
            session.on_extracted(&unknown, &page, at(10));
        }
        assert!(session.safety_poll_elapsed(at(20)));
        assert!(!session.trigger(Trigger::SafetyPoll, at(20)));
        assert!(!session.safety_poll_elapsed(at(25)));
        // The retry scheduled by the failures still fires.
        assert!(session.due(at(20)));
        assert!(!session.due(at(30)));
    }
}
