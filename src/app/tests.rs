use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::bail;
use serde_json::json;

use super::tracking::*;
use super::tui::{TotalInput, TuiTab};
use crate::db::{
    MemoryStore, StoreError, StoreKey, load_current, load_history, load_settings, load_tracking,
    save,
};
use crate::model::{
    AnimeObservation, HistoryEntry, Settings, TrackingItem, TrackingStatus, UNKNOWN_TOTAL,
};

fn observation(title: &str, raw_title: &str, season: &str, episode: &str) -> AnimeObservation {
    AnimeObservation {
        title: title.to_string(),
        raw_title: raw_title.to_string(),
        season: season.to_string(),
        episode: episode.to_string(),
        cover: None,
    }
}

fn tracked(id: &str, title: &str, season: &str, current: &str, total: &str) -> TrackingItem {
    TrackingItem {
        id: id.to_string(),
        title: title.to_string(),
        raw_title: title.to_string(),
        season: season.to_string(),
        current_episode: current.to_string(),
        total_episodes: total.to_string(),
        cover: None,
        added_at: 1,
        last_updated: None,
        status: TrackingStatus::Watching,
    }
}

fn history_entry(id: &str, title: &str, episode: &str, timestamp: i64) -> HistoryEntry {
    HistoryEntry {
        id: id.to_string(),
        title: title.to_string(),
        raw_title: title.to_string(),
        season: "1".to_string(),
        episode: episode.to_string(),
        cover: None,
        timestamp,
        url: format!("https://jut.su/{id}.html"),
        tab_id: None,
    }
}

#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        self.sent
            .lock()
            .expect("notifier lock")
            .push(notification.clone());
        Ok(())
    }
}

struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _notification: &Notification) -> anyhow::Result<()> {
        bail!("notification daemon is not running")
    }
}

fn service_with(
    store: &MemoryStore,
    notifier: Option<Box<dyn Notifier + Send>>,
) -> ReconciliationService<MemoryStore> {
    ReconciliationService::new(store.clone(), notifier)
}

#[test]
fn tracked_episode_only_moves_forward() {
    let mut list = vec![tracked("a", "Naruto", "1", "5", UNKNOWN_TOTAL)];

    let updates = apply_observation(&mut list, &observation("Naruto", "Naruto", "1", "3"), 100);
    assert!(updates.is_empty());
    assert_eq!(list[0].current_episode, "5");
    assert_eq!(list[0].last_updated, None);

    let updates = apply_observation(&mut list, &observation("Naruto", "Naruto", "1", "5"), 200);
    assert!(updates.is_empty());

    let updates = apply_observation(&mut list, &observation("Naruto", "Naruto", "1", "7"), 300);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].episode, 7);
    assert_eq!(updates[0].tier, MatchTier::TitleAndSeason);
    assert!(!updates[0].completed);
    assert_eq!(list[0].current_episode, "7");
    assert_eq!(list[0].last_updated, Some(300));
    assert_eq!(list[0].status, TrackingStatus::Watching);
}

#[test]
fn reaching_the_total_marks_entry_completed() {
    let mut list = vec![tracked("a", "Frieren", "1", "11", "12")];
    let updates = apply_observation(&mut list, &observation("Frieren", "Frieren", "1", "12"), 10);
    assert_eq!(updates.len(), 1);
    assert!(updates[0].completed);
    assert_eq!(list[0].status, TrackingStatus::Completed);
}

#[test]
fn unknown_total_never_completes_on_observation() {
    let mut list = vec![tracked("a", "One Piece", "1", "1000", UNKNOWN_TOTAL)];
    apply_observation(&mut list, &observation("One Piece", "One Piece", "1", "1100"), 10);
    assert_eq!(list[0].current_episode, "1100");
    assert_eq!(list[0].status, TrackingStatus::Watching);
}

#[test]
fn unparseable_episode_leaves_list_untouched() {
    let mut list = vec![tracked("a", "Naruto", "1", "5", UNKNOWN_TOTAL)];
    let before = list.clone();
    let updates = apply_observation(&mut list, &observation("Naruto", "Naruto", "1", "abc"), 10);
    assert!(updates.is_empty());
    assert_eq!(list, before);
}

#[test]
fn match_tiers_are_ranked_strongest_first() {
    let exact = tracked("a", "Naruto", "1", "1", UNKNOWN_TOTAL);
    assert_eq!(
        match_tier(&exact, &observation("Naruto", "Naruto - 2", "1", "2")),
        Some(MatchTier::TitleAndSeason)
    );

    let mut by_raw = tracked("b", "Shingeki no Kyojin", "2", "1", UNKNOWN_TOTAL);
    by_raw.raw_title = "Attack on Titan!".to_string();
    assert_eq!(
        match_tier(
            &by_raw,
            &observation("Attack on Titan Season 2", "attack on titan", "2", "3")
        ),
        Some(MatchTier::RawTitleAndSeason)
    );

    let other_season = tracked("c", "Naruto", "1", "1", UNKNOWN_TOTAL);
    assert_eq!(
        match_tier(&other_season, &observation("NARUTO", "Naruto Shippuden", "2", "3")),
        Some(MatchTier::TitleOnly)
    );

    assert_eq!(
        match_tier(&exact, &observation("Bleach", "Bleach", "1", "3")),
        None
    );
    assert!(MatchTier::TitleAndSeason < MatchTier::RawTitleAndSeason);
    assert!(MatchTier::RawTitleAndSeason < MatchTier::TitleOnly);
}

#[test]
fn only_entries_at_the_best_tier_are_advanced() {
    let mut list = vec![
        tracked("season-2", "naruto", "2", "1", UNKNOWN_TOTAL),
        tracked("season-1", "Naruto", "1", "1", UNKNOWN_TOTAL),
    ];
    let updates = apply_observation(&mut list, &observation("Naruto", "Naruto", "1", "4"), 10);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].item_id, "season-1");
    assert_eq!(list[0].current_episode, "1");
    assert_eq!(list[1].current_episode, "4");
}

#[test]
fn title_only_match_still_advances_when_nothing_better_exists() {
    let mut list = vec![tracked("a", "Naruto", "1", "1", UNKNOWN_TOTAL)];
    let updates = apply_observation(&mut list, &observation("Naruto", "Naruto", "2", "4"), 10);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].tier, MatchTier::TitleOnly);
}

#[test]
fn history_insert_keeps_newest_first_and_caps_length() {
    let mut history: Vec<HistoryEntry> = (0..1000)
        .map(|idx| history_entry(&format!("h{idx}"), "Naruto", "1", 1000 - idx))
        .collect();
    append_observation(&mut history, history_entry("new", "Bleach", "2", 5000), 1000);
    assert_eq!(history.len(), 1000);
    assert_eq!(history[0].id, "new");
    assert_eq!(history[999].id, "h998");
}

#[test]
fn recording_past_the_cap_drops_the_oldest_observations() {
    let mut service = ReconciliationService::new(MemoryStore::new(), None);
    for idx in 0..1005 {
        let title = format!("Show {idx}");
        service
            .record_observation(
                &observation(&title, &title, "1", "1"),
                "https://jut.su/show/",
                None,
            )
            .expect("record");
    }
    let history = load_history(service.store()).expect("history");
    assert_eq!(history.len(), 1000);
    assert_eq!(history[0].title, "Show 1004");
    assert_eq!(history[999].title, "Show 5");
}

#[test]
fn dry_run_preview_reports_updates_without_persisting() {
    let store = MemoryStore::new();
    save(
        &store,
        StoreKey::TrackingList,
        &vec![tracked("a", "Naruto", "1", "2", "220")],
    )
    .expect("seed tracking");

    let outcome = super::preview_observation(
        &store,
        &observation("Naruto", "Naruto", "1", "3"),
        "https://jut.su/naruto/episode-3.html",
        None,
    )
    .expect("preview");
    assert!(!outcome.duplicate);
    assert_eq!(outcome.updates.len(), 1);
    assert_eq!(outcome.updates[0].episode, 3);

    assert!(load_history(&store).expect("history").is_empty());
    assert_eq!(load_current(&store).expect("current"), None);
    assert_eq!(load_tracking(&store).expect("tracking")[0].current_episode, "2");
}

#[test]
fn cleanup_trims_oldest_entries_to_configured_cap() {
    let store = MemoryStore::new();
    let history: Vec<HistoryEntry> = (0..1005)
        .map(|idx| history_entry(&format!("h{idx}"), "Naruto", "1", 5000 - idx))
        .collect();
    save(&store, StoreKey::WatchHistory, &history).expect("seed history");

    assert_eq!(cleanup_history(&store).expect("cleanup"), 5);
    let history = load_history(&store).expect("history");
    assert_eq!(history.len(), 1000);
    assert_eq!(history[0].id, "h0");
    assert_eq!(history[999].id, "h999");

    assert_eq!(cleanup_history(&store).expect("second cleanup"), 0);
}

#[test]
fn zero_history_cap_falls_back_to_default() {
    let settings = Settings {
        max_history_items: 0,
        ..Settings::default()
    };
    assert_eq!(history_cap(&settings), 1000);
    let settings = Settings {
        max_history_items: 50,
        ..Settings::default()
    };
    assert_eq!(history_cap(&settings), 50);
}

#[test]
fn history_stats_group_by_matching_title() {
    let history = vec![
        history_entry("1", "Naruto", "3", 3),
        history_entry("2", "Bleach", "1", 2),
        history_entry("3", "NARUTO!", "2", 1),
        history_entry("4", "Naruto", "1", 0),
    ];
    let stats = history_stats(&history);
    assert_eq!(stats.total_watched, 4);
    assert_eq!(stats.unique_titles, 2);
    assert_eq!(stats.titles[0].display_title, "Naruto");
    assert_eq!(stats.titles[0].count, 3);
    assert_eq!(stats.titles[1].display_title, "Bleach");
}

#[test]
fn adding_the_same_title_and_season_twice_keeps_one_entry() {
    let mut list = Vec::new();
    let obs = observation("Naruto", "Naruto - Episode 5", "1", "5");
    let AddOutcome::Added(item) = add_to_tracking(&mut list, &obs, 42) else {
        panic!("first add should create an entry");
    };
    assert_eq!(item.current_episode, "5");
    assert_eq!(item.total_episodes, UNKNOWN_TOTAL);
    assert_eq!(item.raw_title, "Naruto - Episode 5");

    let again = add_to_tracking(&mut list, &observation("Naruto", "", "1", "6"), 43);
    assert!(matches!(again, AddOutcome::AlreadyTracked(existing) if existing.id == item.id));
    assert_eq!(list.len(), 1);

    let other_season = add_to_tracking(&mut list, &observation("Naruto", "", "2", "1"), 44);
    let AddOutcome::Added(second) = other_season else {
        panic!("another season is a separate entry");
    };
    assert_eq!(second.raw_title, "Naruto");
    assert_eq!(list[0].season, "2");
}

#[test]
fn manual_edits_clamp_and_recompute_status() {
    let mut list = vec![tracked("a", "Naruto", "1", "1", "2")];
    let item = decrement_episode(&mut list, "a").expect("dec");
    assert_eq!(item.current_episode, "0");
    let item = decrement_episode(&mut list, "a").expect("dec at zero");
    assert_eq!(item.current_episode, "0");

    increment_episode(&mut list, "a").expect("inc");
    let item = increment_episode(&mut list, "a").expect("inc");
    assert_eq!(item.status, TrackingStatus::Completed);
    assert_eq!(item.last_updated, None);

    let item = decrement_episode(&mut list, "a").expect("dec");
    assert_eq!(item.status, TrackingStatus::Watching);

    let item = set_total(&mut list, "a", " 1 ").expect("total");
    assert_eq!(item.total_episodes, "1");
    assert_eq!(item.status, TrackingStatus::Completed);
    let item = set_total(&mut list, "a", "?").expect("unknown total");
    assert_eq!(item.status, TrackingStatus::Watching);

    assert!(matches!(
        set_total(&mut list, "a", "twelve"),
        Err(EditError::InvalidTotal(_))
    ));
    assert!(matches!(
        increment_episode(&mut list, "missing"),
        Err(EditError::UnknownId(_))
    ));
}

#[test]
fn modify_tracking_persists_only_successful_edits() {
    let store = MemoryStore::new();
    save(
        &store,
        StoreKey::TrackingList,
        &vec![tracked("a", "Naruto", "1", "3", UNKNOWN_TOTAL)],
    )
    .expect("seed");

    modify_tracking(&store, |list| increment_episode(list, "a")).expect("inc");
    assert_eq!(load_tracking(&store).expect("list")[0].current_episode, "4");

    let err = modify_tracking(&store, |list| set_total(list, "a", "-1")).expect_err("invalid");
    assert!(matches!(err, EditError::InvalidTotal(_)));

    let removed = modify_tracking(&store, |list| remove_from_tracking(list, "a")).expect("rm");
    assert_eq!(removed.id, "a");
    assert!(load_tracking(&store).expect("list").is_empty());
}

#[test]
fn removing_a_history_entry_reports_what_was_removed() {
    let store = MemoryStore::new();
    save(
        &store,
        StoreKey::WatchHistory,
        &vec![history_entry("x", "Naruto", "1", 2), history_entry("y", "Bleach", "2", 1)],
    )
    .expect("seed");

    let removed = remove_history_entry(&store, "x").expect("remove");
    assert_eq!(removed.map(|entry| entry.id), Some("x".to_string()));
    assert_eq!(remove_history_entry(&store, "x").expect("remove again"), None);
    assert_eq!(load_history(&store).expect("history").len(), 1);
}

#[test]
fn observation_updates_current_history_and_tracking() {
    let store = MemoryStore::new();
    save(
        &store,
        StoreKey::TrackingList,
        &vec![tracked("a", "Naruto", "1", "4", "5")],
    )
    .expect("seed");
    let notifier = RecordingNotifier::default();
    let mut service = service_with(&store, Some(Box::new(notifier.clone())));

    let outcome = service
        .record_observation(
            &observation("Naruto", "Naruto - Episode 5", "1", "5"),
            "https://jut.su/naruto/episode-5.html",
            Some(7),
        )
        .expect("record");
    assert!(!outcome.duplicate);
    assert_eq!(outcome.updates.len(), 1);
    assert!(outcome.updates[0].completed);

    let current = load_current(&store).expect("current").expect("current saved");
    assert_eq!(current.observation.episode, "5");
    assert_eq!(current.tab_id, Some(7));
    assert_eq!(load_history(&store).expect("history").len(), 1);
    let list = load_tracking(&store).expect("tracking");
    assert_eq!(list[0].status, TrackingStatus::Completed);

    let sent = notifier.sent.lock().expect("notifier lock");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message, "Naruto: episode 5");
}

#[test]
fn repeated_observation_is_not_added_to_history_twice() {
    let store = MemoryStore::new();
    let mut service = service_with(&store, None);
    let url = "https://jut.su/naruto/episode-5.html";
    let five = observation("Naruto", "Naruto", "1", "5");
    let six = observation("Naruto", "Naruto", "1", "6");

    assert!(!service.record_observation(&five, url, None).expect("first").duplicate);
    assert!(service.record_observation(&five, url, None).expect("repeat").duplicate);
    assert_eq!(load_history(&store).expect("history").len(), 1);

    service.record_observation(&six, url, None).expect("six");
    assert_eq!(
        load_current(&store).expect("current").map(|c| c.observation.episode),
        Some("6".to_string())
    );
    // Only the newest entry is compared.
    assert!(!service.record_observation(&five, url, None).expect("back to five").duplicate);
    assert_eq!(load_history(&store).expect("history").len(), 3);
}

#[test]
fn auto_update_off_records_history_but_leaves_tracking() {
    let store = MemoryStore::new();
    save(
        &store,
        StoreKey::Settings,
        &Settings {
            auto_update_progress: false,
            ..Settings::default()
        },
    )
    .expect("settings");
    save(
        &store,
        StoreKey::TrackingList,
        &vec![tracked("a", "Naruto", "1", "1", UNKNOWN_TOTAL)],
    )
    .expect("seed");
    let notifier = RecordingNotifier::default();
    let mut service = service_with(&store, Some(Box::new(notifier.clone())));

    let outcome = service
        .record_observation(&observation("Naruto", "Naruto", "1", "9"), "u", None)
        .expect("record");
    assert!(outcome.updates.is_empty());
    assert_eq!(load_tracking(&store).expect("list")[0].current_episode, "1");
    assert_eq!(load_history(&store).expect("history").len(), 1);
    assert!(notifier.sent.lock().expect("notifier lock").is_empty());
}

#[test]
fn notifications_respect_the_setting() {
    let store = MemoryStore::new();
    save(
        &store,
        StoreKey::Settings,
        &Settings {
            show_notifications: false,
            ..Settings::default()
        },
    )
    .expect("settings");
    save(
        &store,
        StoreKey::TrackingList,
        &vec![tracked("a", "Naruto", "1", "1", UNKNOWN_TOTAL)],
    )
    .expect("seed");
    let notifier = RecordingNotifier::default();
    let mut service = service_with(&store, Some(Box::new(notifier.clone())));

    let outcome = service
        .record_observation(&observation("Naruto", "Naruto", "1", "2"), "u", None)
        .expect("record");
    assert_eq!(outcome.updates.len(), 1);
    assert!(notifier.sent.lock().expect("notifier lock").is_empty());
}

#[test]
fn failed_notification_does_not_fail_the_update() {
    let store = MemoryStore::new();
    save(
        &store,
        StoreKey::TrackingList,
        &vec![tracked("a", "Naruto", "1", "1", UNKNOWN_TOTAL)],
    )
    .expect("seed");
    let mut service = service_with(&store, Some(Box::new(FailingNotifier)));

    let response = service
        .handle(Message::DomDetected {
            data: observation("Naruto", "Naruto", "1", "2"),
            url: None,
            tab_id: None,
        })
        .expect("handled despite notifier failure");
    let Response::Ack(ack) = response else {
        panic!("expected an ack");
    };
    assert_eq!(ack.status, AckStatus::Success);
    assert_eq!(ack.updates.len(), 1);
    assert_eq!(load_tracking(&store).expect("list")[0].current_episode, "2");
    assert_eq!(load_history(&store).expect("history")[0].url, "unknown");
}

#[test]
fn rejected_write_surfaces_as_store_error() {
    let store = MemoryStore::new();
    store.fail_writes(true);
    let mut service = service_with(&store, None);
    let err = service
        .handle(Message::DomDetected {
            data: observation("Naruto", "Naruto", "1", "2"),
            url: Some("https://jut.su/naruto/episode-2.html".to_string()),
            tab_id: None,
        })
        .expect_err("write failure must be reported");
    assert!(matches!(err, StoreError::Unavailable(_)));
}

#[test]
fn popup_requests_read_and_reset_state() {
    let store = MemoryStore::new();
    let mut service = service_with(&store, None);
    service
        .record_observation(&observation("Naruto", "Naruto", "1", "2"), "u", None)
        .expect("record");
    save(
        &store,
        StoreKey::TrackingList,
        &vec![tracked("a", "Naruto", "1", "2", UNKNOWN_TOTAL)],
    )
    .expect("seed");

    let Response::Data(snapshot) = service.handle(Message::GetData).expect("get data") else {
        panic!("expected a data snapshot");
    };
    assert!(snapshot.current_anime.is_some());
    assert_eq!(snapshot.watch_history.len(), 1);
    assert_eq!(snapshot.tracking_list.len(), 1);

    service.handle(Message::ClearHistory).expect("clear history");
    service.handle(Message::ClearTracking).expect("clear tracking");
    assert!(load_history(&store).expect("history").is_empty());
    assert!(load_tracking(&store).expect("tracking").is_empty());
    assert!(load_current(&store).expect("current").is_some());

    let settings = Settings {
        auto_update_progress: false,
        show_notifications: true,
        max_history_items: 25,
    };
    let response = service
        .handle(Message::UpdateSettings { settings })
        .expect("update settings");
    assert_eq!(response, Response::Ack(Ack::success(None)));
    assert_eq!(load_settings(&store).expect("settings"), settings);
}

#[test]
fn messages_parse_from_tagged_json() {
    let message: Message = serde_json::from_value(json!({
        "type": "dom_detected",
        "data": {
            "title": "Naruto",
            "rawTitle": "Naruto - Episode 5",
            "season": "1",
            "episode": "5"
        },
        "url": "https://jut.su/naruto/episode-5.html",
        "tabId": 3
    }))
    .expect("dom_detected parses");
    let Message::DomDetected { data, url, tab_id } = message else {
        panic!("expected dom_detected");
    };
    assert_eq!(data.raw_title, "Naruto - Episode 5");
    assert_eq!(data.cover, None);
    assert_eq!(url.as_deref(), Some("https://jut.su/naruto/episode-5.html"));
    assert_eq!(tab_id, Some(3));

    let message: Message =
        serde_json::from_value(json!({"type": "get_data"})).expect("get_data parses");
    assert_eq!(message, Message::GetData);

    let message: Message = serde_json::from_value(json!({
        "type": "update_settings",
        "settings": {"autoUpdateProgress": false}
    }))
    .expect("partial settings parse");
    let Message::UpdateSettings { settings } = message else {
        panic!("expected update_settings");
    };
    assert!(!settings.auto_update_progress);
    assert_eq!(settings.max_history_items, 1000);

    assert!(serde_json::from_value::<Message>(json!({"type": "reboot"})).is_err());
}

#[test]
fn responses_serialize_in_wire_shape() {
    let value = serde_json::to_value(Response::Ack(Ack::success(None))).expect("serialize");
    assert_eq!(value, json!({"status": "success"}));

    let value = serde_json::to_value(Response::Ack(Ack::error("bad input"))).expect("serialize");
    assert_eq!(value, json!({"status": "error", "message": "bad input"}));

    let snapshot = DataSnapshot {
        current_anime: None,
        watch_history: Vec::new(),
        tracking_list: Vec::new(),
    };
    let value = serde_json::to_value(Response::Data(Box::new(snapshot))).expect("serialize");
    assert_eq!(
        value,
        json!({"currentAnime": null, "watchHistory": [], "trackingList": []})
    );
}

#[test]
fn service_thread_answers_requests_in_order() {
    let store = MemoryStore::new();
    let handle = ServiceHandle::spawn(service_with(&store, None), Duration::from_secs(3600))
        .expect("spawn service");

    let response = handle
        .request(Message::DomDetected {
            data: observation("Naruto", "Naruto", "1", "5"),
            url: Some("https://jut.su/naruto/episode-5.html".to_string()),
            tab_id: None,
        })
        .expect("dom_detected");
    assert!(matches!(response, Response::Ack(ack) if ack.status == AckStatus::Success));

    let Response::Data(snapshot) = handle.request(Message::GetData).expect("get_data") else {
        panic!("expected data");
    };
    assert_eq!(snapshot.watch_history.len(), 1);
    drop(handle);
    assert_eq!(load_history(&store).expect("history").len(), 1);
}

#[test]
fn service_thread_runs_scheduled_cleanup() {
    let store = MemoryStore::new();
    save(
        &store,
        StoreKey::Settings,
        &Settings {
            max_history_items: 3,
            ..Settings::default()
        },
    )
    .expect("settings");
    let history: Vec<HistoryEntry> = (0..6)
        .map(|idx| history_entry(&format!("h{idx}"), "Naruto", "1", 100 - idx))
        .collect();
    save(&store, StoreKey::WatchHistory, &history).expect("seed");

    let handle = ServiceHandle::spawn(service_with(&store, None), Duration::from_millis(20))
        .expect("spawn service");
    thread::sleep(Duration::from_millis(300));
    drop(handle);

    let history = load_history(&store).expect("history");
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].id, "h0");
}

#[test]
fn tui_tab_navigation_stops_at_edges() {
    assert_eq!(TuiTab::Current.move_left(), TuiTab::Current);
    assert_eq!(TuiTab::Current.move_right(), TuiTab::History);
    assert_eq!(TuiTab::History.move_right(), TuiTab::Tracking);
    assert_eq!(TuiTab::Tracking.move_right(), TuiTab::Tracking);
    assert_eq!(TuiTab::Tracking.move_left(), TuiTab::History);
    assert_eq!(TuiTab::Tracking.label(), "TRACKING");
}

#[test]
fn total_input_accepts_digits_or_unknown_marker() {
    let mut input = TotalInput::for_item(&tracked("a", "Naruto", "1", "3", UNKNOWN_TOTAL));
    assert_eq!(input.buffer, "?");
    input.push('1');
    input.push('x');
    input.push('2');
    assert_eq!(input.buffer, "12");
    input.backspace();
    assert_eq!(input.buffer, "1");
    input.push('?');
    assert_eq!(input.buffer, "?");
    for _ in 0..8 {
        input.push('9');
    }
    assert_eq!(input.buffer, "99999");
}
