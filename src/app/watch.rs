use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use scraper::Selector;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use super::tracking::{Message, Response, ServiceHandle};
use crate::config::{AppConfig, EngineConfig};
use crate::extract::{
    Emission, Page, PageSession, Trigger, diff_snapshots, extract_observation,
    is_relevant_click_target,
};
use crate::http::{FetchOptions, FetchedPage, fetch_page_with_retries};
use crate::model::AnimeObservation;

/// Page events a browser-side observer reports, one JSON object per line:
/// `{"event":"userClick","target":"#next"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub(crate) enum PageEvent {
    PageLoaded,
    MutationObserved,
    UserClick { target: String },
    UrlChanged { url: String },
}

/// Turns successive snapshots of one page into observations, standing in for
/// the load, mutation and navigation events a live browser would deliver.
pub(crate) struct PageWatcher {
    session: PageSession,
    previous: Option<Page>,
}

impl PageWatcher {
    pub(crate) fn new(url: &Url, engine: EngineConfig, now: Instant) -> Self {
        let mut session = PageSession::new(url, engine, now);
        session.trigger(Trigger::PageLoaded, now);
        session.trigger(Trigger::Load, now);
        Self {
            session,
            previous: None,
        }
    }

    /// Feeds one snapshot; returns an observation when it should be reported.
    pub(crate) fn poll(&mut self, fetched: &FetchedPage, now: Instant) -> Result<Option<AnimeObservation>> {
        let url = Url::parse(&fetched.final_url)
            .with_context(|| format!("server returned an invalid URL: {}", fetched.final_url))?;
        self.session.trigger(Trigger::UrlChanged(url.clone()), now);

        let page = Page::parse(&fetched.body, url);
        if let Some(previous) = &self.previous {
            for record in diff_snapshots(previous.document(), page.document()) {
                self.session.trigger(Trigger::Mutation(record), now);
            }
        }
        if self.session.safety_poll_elapsed(now) {
            self.session.trigger(Trigger::SafetyPoll, now);
        }

        let mut observation = None;
        if self.session.due(now) {
            let report = extract_observation(&page);
            match self.session.on_extracted(&report, page.url(), now) {
                Emission::Emit(found) => observation = Some(found),
                Emission::Duplicate => debug!("page state unchanged"),
                Emission::Retry(delay) => debug!(
                    delay_ms = delay.as_millis() as u64,
                    retries = self.session.retries(),
                    "no usable title yet, retrying"
                ),
                Emission::GaveUp => info!(
                    retries = self.session.retries(),
                    "no usable title after retries, waiting for changes"
                ),
            }
        }
        self.previous = Some(page);
        Ok(observation)
    }

    /// Resolves `target` against the last snapshot and records the click.
    /// Returns whether it landed in an episode list or the player.
    pub(crate) fn click(&mut self, target: &str, now: Instant) -> bool {
        let relevant = match Selector::parse(target) {
            Ok(selector) => self
                .previous
                .as_ref()
                .and_then(|page| page.select_first(&selector))
                .is_some_and(is_relevant_click_target),
            Err(err) => {
                debug!(selector = %target, error = %err, "click target is not a valid selector");
                false
            }
        };
        self.session.trigger(Trigger::UserClick { relevant }, now);
        relevant
    }

    pub(crate) fn page_loaded(&mut self, now: Instant) {
        self.session.trigger(Trigger::PageLoaded, now);
    }

    /// How long to wait before the next fetch: the poll interval, cut short
    /// by a pending debounce or retry deadline.
    pub(crate) fn wait_time(&self, now: Instant, interval: Duration) -> Duration {
        self.session
            .next_deadline()
            .map_or(interval, |deadline| {
                deadline.saturating_duration_since(now).min(interval)
            })
    }
}

pub(crate) fn run_watch(
    handle: &ServiceHandle,
    config: &AppConfig,
    raw_url: &str,
    interval: Duration,
    max_polls: Option<u64>,
    listen_for_events: bool,
) -> Result<()> {
    let url = Url::parse(raw_url).with_context(|| format!("invalid URL: {raw_url}"))?;
    if !config.sites.is_anime_streaming_site(url.as_str()) {
        info!(host = url.host_str().unwrap_or_default(), "not a known streaming site, watching anyway");
    }

    let options = FetchOptions::from(&config.watch);
    let mut watcher = PageWatcher::new(&url, config.engine.clone(), Instant::now());
    let mut events = if listen_for_events {
        Some(spawn_event_reader()?)
    } else {
        None
    };
    let mut current_url = url.to_string();
    let mut polls = 0u64;
    println!("Watching {url} (Ctrl-C to stop)");

    while max_polls.is_none_or(|max| polls < max) {
        polls += 1;
        match fetch_page_with_retries(&current_url, &options) {
            Ok(fetched) => {
                current_url = fetched.final_url.clone();
                if let Some(observation) = watcher.poll(&fetched, Instant::now())? {
                    report_observation(handle, observation, &current_url)?;
                }
            }
            Err(err) => warn!(url = %current_url, error = %err, "fetch failed"),
        }

        let wait = watcher.wait_time(Instant::now(), interval);
        let Some(receiver) = events.as_ref() else {
            thread::sleep(wait);
            continue;
        };
        match receiver.recv_timeout(wait) {
            Ok(event) => apply_event(&mut watcher, &mut current_url, event, Instant::now()),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("event input closed, polling only");
                events = None;
            }
        }
    }
    Ok(())
}

fn apply_event(watcher: &mut PageWatcher, current_url: &mut String, event: PageEvent, now: Instant) {
    match event {
        PageEvent::PageLoaded => watcher.page_loaded(now),
        // The next fetch diffs the new snapshot against the previous one.
        PageEvent::MutationObserved => debug!("mutation reported, refetching"),
        PageEvent::UserClick { target } => {
            let relevant = watcher.click(&target, now);
            debug!(selector = %target, relevant, "click reported");
        }
        PageEvent::UrlChanged { url } => match Url::parse(&url) {
            Ok(url) => *current_url = url.to_string(),
            Err(err) => warn!(url = %url, error = %err, "ignoring navigation to an invalid URL"),
        },
    }
}

fn spawn_event_reader() -> Result<Receiver<PageEvent>> {
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name("page-events".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<PageEvent>(&line) {
                    Ok(event) => {
                        if sender.send(event).is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(error = %err, "rejected malformed page event"),
                }
            }
        })
        .context("failed to start page event reader")?;
    Ok(receiver)
}

fn report_observation(handle: &ServiceHandle, observation: AnimeObservation, url: &str) -> Result<()> {
    println!(
        "Detected: {} | season {} | episode {}",
        observation.display_title(),
        observation.season,
        observation.episode
    );
    let response = handle.request(Message::DomDetected {
        data: observation,
        url: Some(url.to_string()),
        tab_id: None,
    })?;
    if let Response::Ack(ack) = response {
        for update in ack.updates {
            println!(
                "  Progress: {} -> episode {}{}",
                update.display_title,
                update.episode,
                if update.completed { " (completed)" } else { "" }
            );
        }
    }
    Ok(())
}
