mod display;
mod tracking;
mod tui;
mod watch;

#[cfg(test)]
mod tests;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};
use url::Url;

use crate::cli::{Cli, Command, HistoryAction, TrackAction};
use crate::config::{AppConfig, load_config};
use crate::db::{
    Database, MemoryStore, Store, StoreError, ensure_defaults, load_current, load_history,
    load_settings, load_tracking,
};
use crate::extract::{ExtractionReport, Page, extract_observation};
use crate::http::{FetchOptions, fetch_page_with_retries};
use crate::model::{AnimeObservation, Settings, now_ms};
use crate::paths::database_file_path;

use self::display::{format_relative_time, progress_label, site_domain, truncate};
use self::tracking::{
    Ack, AddOutcome, Message, ObservationOutcome, ReconciliationService, Response, ServiceHandle,
    add_to_tracking, cleanup_history, decrement_episode, history_stats, increment_episode,
    modify_tracking, notifier_for, remove_from_tracking, remove_history_entry, set_total,
};

pub fn run(cli: Cli) -> Result<()> {
    let config = load_config()?;
    let db = open_db()?;

    match cli.command {
        Some(Command::Detect {
            source,
            url,
            tab_id,
            dry_run,
            explain,
        }) => run_detect(db, &config, &source, url.as_deref(), tab_id, dry_run, explain)?,
        Some(Command::Watch {
            url,
            interval_ms,
            max_polls,
            events,
        }) => {
            let interval = interval_ms
                .map(std::time::Duration::from_millis)
                .unwrap_or_else(|| config.watch.poll_interval());
            let handle = spawn_service(db, &config)?;
            watch::run_watch(&handle, &config, &url, interval, max_polls, events)?;
        }
        Some(Command::Ingest) => run_ingest(db, &config)?,
        Some(Command::Current) => run_current(&db)?,
        Some(Command::List) => run_list(&db)?,
        Some(Command::History { action, limit }) => run_history(db, action, limit)?,
        Some(Command::Track { action }) => run_track(db, action)?,
        Some(Command::Settings {
            auto_update,
            notifications,
            max_history,
        }) => run_settings(db, auto_update, notifications, max_history)?,
        Some(Command::Cleanup) => {
            let removed = cleanup_history(&db)?;
            println!("History cleanup removed {removed} entr(ies).");
        }
        Some(Command::Tui) | None => tui::run_tui(&db)?,
    }

    Ok(())
}

fn open_db() -> Result<Database> {
    let db_path = database_file_path()?;
    let db = Database::open(&db_path)?;
    db.migrate()?;
    ensure_defaults(&db).context("failed to initialize default storage values")?;
    Ok(db)
}

fn spawn_service(db: Database, config: &AppConfig) -> Result<ServiceHandle> {
    let service = ReconciliationService::new(db, notifier_for(config.notifier));
    ServiceHandle::spawn(service, config.service.cleanup_interval())
}

fn run_detect(
    db: Database,
    config: &AppConfig,
    source: &str,
    page_url: Option<&str>,
    tab_id: Option<i64>,
    dry_run: bool,
    explain: bool,
) -> Result<()> {
    let page = load_page(config, source, page_url)?;
    let report = extract_observation(&page);
    print_report(&report, explain);

    if !report.has_title() {
        println!("No reliable title on this page yet; nothing recorded.");
        return Ok(());
    }
    if dry_run {
        let outcome = preview_observation(&db, &report.observation, page.url().as_str(), tab_id)?;
        if outcome.duplicate {
            println!("Dry run: already the newest history entry.");
        } else {
            println!("Dry run: would be saved to history.");
        }
        for update in outcome.updates {
            println!(
                "Dry run: would update {} -> episode {}{}",
                update.display_title,
                update.episode,
                if update.completed { " (completed)" } else { "" }
            );
        }
        return Ok(());
    }

    let handle = spawn_service(db, config)?;
    let response = handle.request(Message::DomDetected {
        data: report.observation,
        url: Some(page.url().to_string()),
        tab_id,
    })?;
    if let Response::Ack(ack) = response {
        if ack.updates.is_empty() {
            println!("Saved to history.");
        }
        for update in ack.updates {
            println!(
                "Progress updated: {} -> episode {}{}",
                update.display_title,
                update.episode,
                if update.completed { " (completed)" } else { "" }
            );
        }
    }
    Ok(())
}

/// Runs the observation against an in-memory copy of `store`.
fn preview_observation(
    store: &dyn Store,
    observation: &AnimeObservation,
    url: &str,
    tab_id: Option<i64>,
) -> Result<ObservationOutcome, StoreError> {
    let mut service = ReconciliationService::new(MemoryStore::snapshot_of(store)?, None);
    service.record_observation(observation, url, tab_id)
}

fn load_page(config: &AppConfig, source: &str, page_url: Option<&str>) -> Result<Page> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let fetched = fetch_page_with_retries(source, &FetchOptions::from(&config.watch))
            .map_err(|err| anyhow::anyhow!("failed to fetch {source}: {err}"))?;
        let url = Url::parse(&fetched.final_url)
            .with_context(|| format!("invalid final URL: {}", fetched.final_url))?;
        return Ok(Page::parse(&fetched.body, url));
    }

    let path = Path::new(source);
    let html = fs::read_to_string(path)
        .with_context(|| format!("failed to read HTML from {}", path.display()))?;
    let url = match page_url {
        Some(raw) => Url::parse(raw).with_context(|| format!("invalid --url: {raw}"))?,
        None => {
            let absolute = fs::canonicalize(path)
                .with_context(|| format!("failed to resolve {}", path.display()))?;
            Url::from_file_path(&absolute)
                .map_err(|_| anyhow::anyhow!("cannot build a file URL for {}", absolute.display()))?
        }
    };
    Ok(Page::parse(&html, url))
}

fn print_report(report: &ExtractionReport, explain: bool) {
    let obs = &report.observation;
    let source = |name: Option<&str>| match (explain, name) {
        (true, Some(name)) => format!("  [{name}]"),
        (true, None) => "  [default]".to_string(),
        (false, _) => String::new(),
    };
    println!("Title:   {}{}", obs.raw_title, source(report.title_source));
    if obs.title != obs.raw_title {
        println!("Match:   {}", obs.title);
    }
    println!("Season:  {}{}", obs.season, source(Some(report.season_source)));
    println!("Episode: {}{}", obs.episode, source(report.episode_source));
    match &obs.cover {
        Some(cover) => println!("Cover:   {cover}{}", source(report.cover_source)),
        None => println!("Cover:   -"),
    }
}

fn run_ingest(db: Database, config: &AppConfig) -> Result<()> {
    let handle = spawn_service(db, config)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line.context("failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Message>(&line) {
            Ok(message) => {
                debug!(?message, "ingest message");
                handle
                    .request(message)
                    .unwrap_or_else(|err| Response::Ack(Ack::error(format!("{err:#}"))))
            }
            Err(err) => {
                warn!(error = %err, "rejected malformed message");
                Response::Ack(Ack::error(format!("invalid message: {err}")))
            }
        };
        serde_json::to_writer(&mut stdout, &response).context("failed to encode response")?;
        writeln!(stdout)?;
        stdout.flush()?;
    }
    Ok(())
}

fn run_current(store: &dyn Store) -> Result<()> {
    match load_current(store)? {
        Some(current) => {
            println!("{}", current.share_text());
            let age = format_relative_time(current.timestamp, chrono::Local::now());
            if current.is_stale(now_ms()) {
                println!("(last seen {age}; no recent activity)");
            } else {
                println!("(detected {age})");
            }
        }
        None => println!("No anime detected yet. Run `anitracker detect <URL>` first."),
    }
    Ok(())
}

fn run_list(store: &dyn Store) -> Result<()> {
    let items = load_tracking(store)?;
    if items.is_empty() {
        println!("Tracking list is empty. Run `anitracker track add` after a detection.");
        return Ok(());
    }

    println!(
        "{:<24} {:<40} {:<4} {:<10} {:<10}",
        "ID", "TITLE", "S", "PROGRESS", "STATUS"
    );
    for item in items {
        println!(
            "{:<24} {:<40} {:<4} {:<10} {:<10}",
            truncate(&item.id, 24),
            truncate(item.display_title(), 40),
            item.season,
            progress_label(&item),
            item.status.label()
        );
    }
    Ok(())
}

fn run_history(db: Database, action: Option<HistoryAction>, limit: usize) -> Result<()> {
    match action {
        None => {
            let history = load_history(&db)?;
            if history.is_empty() {
                println!("Watch history is empty.");
                return Ok(());
            }
            let stats = history_stats(&history);
            println!(
                "{} entr(ies), {} unique title(s)\n",
                stats.total_watched, stats.unique_titles
            );
            println!(
                "{:<24} {:<36} {:<4} {:<6} {:<20} {:<16}",
                "ID", "TITLE", "S", "EP", "SITE", "WHEN"
            );
            let now = chrono::Local::now();
            for entry in history.iter().take(limit) {
                println!(
                    "{:<24} {:<36} {:<4} {:<6} {:<20} {:<16}",
                    truncate(&entry.id, 24),
                    truncate(entry.display_title(), 36),
                    entry.season,
                    entry.episode,
                    site_domain(&entry.url),
                    format_relative_time(entry.timestamp, now)
                );
            }
        }
        Some(HistoryAction::Stats) => {
            let stats = history_stats(&load_history(&db)?);
            println!("Episodes watched: {}", stats.total_watched);
            println!("Unique titles:    {}", stats.unique_titles);
            for title in stats.titles.iter().take(10) {
                println!("  {:>4}  {}", title.count, truncate(&title.display_title, 60));
            }
        }
        Some(HistoryAction::Rm { id }) => match remove_history_entry(&db, &id)? {
            Some(entry) => println!("Removed from history: {}", entry.display_title()),
            None => bail!("no history entry with id `{id}`"),
        },
        Some(HistoryAction::Clear) => {
            let mut service = ReconciliationService::new(db, None);
            service.handle(Message::ClearHistory)?;
            println!("Watch history cleared.");
        }
    }
    Ok(())
}

fn run_track(db: Database, action: TrackAction) -> Result<()> {
    match action {
        TrackAction::Add { history_id } => {
            let observation = observation_to_track(&db, history_id.as_deref())?;
            let now = now_ms();
            match modify_tracking(&db, |list| Ok(add_to_tracking(list, &observation, now)))? {
                AddOutcome::Added(item) => println!(
                    "Tracking {} (season {}, episode {}) as {}",
                    item.display_title(),
                    item.season,
                    item.current_episode,
                    item.id
                ),
                AddOutcome::AlreadyTracked(item) => {
                    println!("{} is already tracked as {}", item.display_title(), item.id)
                }
            }
        }
        TrackAction::Inc { id } => {
            let item = modify_tracking(&db, |list| increment_episode(list, &id))?;
            println!("{}: {}", item.display_title(), progress_label(&item));
        }
        TrackAction::Dec { id } => {
            let item = modify_tracking(&db, |list| decrement_episode(list, &id))?;
            println!("{}: {}", item.display_title(), progress_label(&item));
        }
        TrackAction::Total { id, total } => {
            let item = modify_tracking(&db, |list| set_total(list, &id, &total))?;
            println!(
                "{}: {} ({})",
                item.display_title(),
                progress_label(&item),
                item.status.label()
            );
        }
        TrackAction::Rm { id } => {
            let item = modify_tracking(&db, |list| remove_from_tracking(list, &id))?;
            println!("Stopped tracking {}", item.display_title());
        }
        TrackAction::Clear => {
            let mut service = ReconciliationService::new(db, None);
            service.handle(Message::ClearTracking)?;
            println!("Tracking list cleared.");
        }
    }
    Ok(())
}

fn observation_to_track(store: &dyn Store, history_id: Option<&str>) -> Result<AnimeObservation> {
    match history_id {
        Some(id) => load_history(store)?
            .into_iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.observation())
            .with_context(|| format!("no history entry with id `{id}`")),
        None => load_current(store)?
            .map(|current| current.observation)
            .context("nothing detected yet; pass --history-id or run `anitracker detect` first"),
    }
}

fn run_settings(
    db: Database,
    auto_update: Option<bool>,
    notifications: Option<bool>,
    max_history: Option<usize>,
) -> Result<()> {
    let current = load_settings(&db)?;
    let updated = Settings {
        auto_update_progress: auto_update.unwrap_or(current.auto_update_progress),
        show_notifications: notifications.unwrap_or(current.show_notifications),
        max_history_items: max_history.unwrap_or(current.max_history_items),
    };
    if updated.max_history_items == 0 {
        bail!("--max-history must be at least 1");
    }
    if updated != current {
        let mut service = ReconciliationService::new(db, None);
        service.handle(Message::UpdateSettings { settings: updated })?;
    }

    println!("auto-update progress: {}", updated.auto_update_progress);
    println!("notifications:        {}", updated.show_notifications);
    println!("max history items:    {}", updated.max_history_items);
    Ok(())
}
