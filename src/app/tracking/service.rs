use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::history::{append_observation, cleanup_history, history_cap, new_history_entry};
use super::notify::{Notification, Notifier};
use super::reconcile::{ProgressUpdate, apply_observation};
use crate::db::{
    Store, StoreError, StoreKey, load_current, load_history, load_settings, load_tracking, save,
};
use crate::model::{
    AnimeObservation, CurrentAnime, HistoryEntry, Settings, TrackingItem, now_ms,
};

/// Requests accepted by the service, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum Message {
    #[serde(rename_all = "camelCase")]
    DomDetected {
        data: AnimeObservation,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        tab_id: Option<i64>,
    },
    GetData,
    ClearHistory,
    ClearTracking,
    UpdateSettings {
        settings: Settings,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum AckStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Ack {
    pub(crate) status: AckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) updates: Vec<ProgressUpdate>,
}

impl Ack {
    pub(crate) fn success(message: Option<&str>) -> Self {
        Self {
            status: AckStatus::Success,
            message: message.map(str::to_string),
            updates: Vec::new(),
        }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self {
            status: AckStatus::Error,
            message: Some(message.into()),
            updates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DataSnapshot {
    pub(crate) current_anime: Option<CurrentAnime>,
    pub(crate) watch_history: Vec<HistoryEntry>,
    pub(crate) tracking_list: Vec<TrackingItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub(crate) enum Response {
    Ack(Ack),
    Data(Box<DataSnapshot>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct ObservationOutcome {
    pub(crate) duplicate: bool,
    pub(crate) updates: Vec<ProgressUpdate>,
}

/// Applies observations and popup requests to the store. Each key is its own
/// read-modify-write round trip; there is no cross-key transaction, so a
/// second writer on the same store could interleave between them.
pub(crate) struct ReconciliationService<S: Store> {
    store: S,
    notifier: Option<Box<dyn Notifier + Send>>,
}

impl<S: Store> ReconciliationService<S> {
    pub(crate) fn new(store: S, notifier: Option<Box<dyn Notifier + Send>>) -> Self {
        Self { store, notifier }
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn handle(&mut self, message: Message) -> Result<Response, StoreError> {
        match message {
            Message::DomDetected { data, url, tab_id } => {
                let url = url.unwrap_or_else(|| "unknown".to_string());
                let outcome = self.record_observation(&data, &url, tab_id)?;
                let mut ack = Ack::success(Some("data processed"));
                ack.updates = outcome.updates;
                Ok(Response::Ack(ack))
            }
            Message::GetData => Ok(Response::Data(Box::new(DataSnapshot {
                current_anime: load_current(&self.store)?,
                watch_history: load_history(&self.store)?,
                tracking_list: load_tracking(&self.store)?,
            }))),
            Message::ClearHistory => {
                save(&self.store, StoreKey::WatchHistory, &Vec::<HistoryEntry>::new())?;
                info!("history cleared");
                Ok(Response::Ack(Ack::success(None)))
            }
            Message::ClearTracking => {
                save(&self.store, StoreKey::TrackingList, &Vec::<TrackingItem>::new())?;
                info!("tracking list cleared");
                Ok(Response::Ack(Ack::success(None)))
            }
            Message::UpdateSettings { settings } => {
                save(&self.store, StoreKey::Settings, &settings)?;
                Ok(Response::Ack(Ack::success(None)))
            }
        }
    }

    pub(crate) fn record_observation(
        &mut self,
        observation: &AnimeObservation,
        url: &str,
        tab_id: Option<i64>,
    ) -> Result<ObservationOutcome, StoreError> {
        let now = now_ms();
        let current = CurrentAnime {
            observation: observation.clone(),
            timestamp: now,
            url: url.to_string(),
            tab_id,
        };
        save(&self.store, StoreKey::CurrentAnime, &current)?;

        let settings = load_settings(&self.store)?;
        let mut outcome = ObservationOutcome::default();

        let mut history = load_history(&self.store)?;
        let key = observation.dedup_key(url);
        if history.first().is_some_and(|newest| newest.dedup_key() == key) {
            debug!(key, "observation matches the newest history entry");
            outcome.duplicate = true;
        } else {
            let entry = new_history_entry(observation, url, tab_id, now);
            append_observation(&mut history, entry, history_cap(&settings));
            save(&self.store, StoreKey::WatchHistory, &history)?;
            info!(
                title = observation.display_title(),
                episode = %observation.episode,
                entries = history.len(),
                "observation saved to history"
            );
        }

        if !settings.auto_update_progress {
            return Ok(outcome);
        }
        let mut list = load_tracking(&self.store)?;
        outcome.updates = apply_observation(&mut list, observation, now);
        if let Some(first) = outcome.updates.first() {
            save(&self.store, StoreKey::TrackingList, &list)?;
            if settings.show_notifications {
                self.notify_progress(first);
            }
        }
        Ok(outcome)
    }

    fn notify_progress(&self, update: &ProgressUpdate) {
        let Some(notifier) = self.notifier.as_ref() else {
            return;
        };
        let notification = Notification::progress(&update.display_title, update.episode);
        if let Err(err) = notifier.notify(&notification) {
            warn!(error = %format!("{err:#}"), "failed to deliver progress notification");
        }
    }
}

struct Request {
    message: Message,
    reply: mpsc::Sender<Result<Response, StoreError>>,
}

/// Runs a service on its own thread; requests are handled one at a time and
/// history cleanup fires on a timer between them.
pub(crate) struct ServiceHandle {
    sender: Option<mpsc::Sender<Request>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl ServiceHandle {
    pub(crate) fn spawn<S: Store + 'static>(
        service: ReconciliationService<S>,
        cleanup_interval: Duration,
    ) -> anyhow::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Request>();
        let worker = thread::Builder::new()
            .name("reconciliation".to_string())
            .spawn(move || run_service(service, receiver, cleanup_interval))
            .context("failed to start reconciliation thread")?;
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    pub(crate) fn request(&self, message: Message) -> anyhow::Result<Response> {
        let sender = self
            .sender
            .as_ref()
            .context("reconciliation service is shut down")?;
        let (reply, response) = mpsc::channel();
        sender
            .send(Request { message, reply })
            .map_err(|_| anyhow!("reconciliation service stopped"))?;
        let result = response
            .recv()
            .map_err(|_| anyhow!("reconciliation service dropped the request"))?;
        Ok(result?)
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_service<S: Store>(
    mut service: ReconciliationService<S>,
    receiver: mpsc::Receiver<Request>,
    cleanup_interval: Duration,
) {
    let mut next_cleanup = Instant::now() + cleanup_interval;
    loop {
        let wait = next_cleanup.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(wait) {
            Ok(request) => {
                let result = service.handle(request.message);
                if let Err(err) = &result {
                    warn!(error = %err, "request failed");
                }
                let _ = request.reply.send(result);
            }
            Err(RecvTimeoutError::Timeout) => {
                if let Err(err) = cleanup_history(service.store()) {
                    warn!(error = %err, "scheduled history cleanup failed");
                }
                next_cleanup = Instant::now() + cleanup_interval;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("reconciliation service stopped");
}
