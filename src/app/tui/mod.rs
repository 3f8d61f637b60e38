mod actions;
mod render;
mod session;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::TableState;

use crate::db::Store;
use crate::model::{CurrentAnime, HistoryEntry, TrackingItem};

use super::tracking::HistoryStats;

use self::actions::{
    add_current_to_tracking, add_history_to_tracking, apply_total, clear_history, clear_tracking,
    delete_tracking, edit_episode, load_data, remove_history, status_error, status_info,
};
use self::render::draw_tui;
use self::session::TuiSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TuiTab {
    Current,
    History,
    Tracking,
}

impl TuiTab {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Current => "CURRENT",
            Self::History => "HISTORY",
            Self::Tracking => "TRACKING",
        }
    }

    pub(crate) fn move_left(self) -> Self {
        match self {
            Self::Current => Self::Current,
            Self::History => Self::Current,
            Self::Tracking => Self::History,
        }
    }

    pub(crate) fn move_right(self) -> Self {
        match self {
            Self::Current => Self::History,
            Self::History => Self::Tracking,
            Self::Tracking => Self::Tracking,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum PendingConfirm {
    DeleteTracking { id: String, title: String },
    ClearTracking,
    ClearHistory,
}

/// Inline editor for a tracking entry's total episode count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TotalInput {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) buffer: String,
}

impl TotalInput {
    pub(crate) fn for_item(item: &TrackingItem) -> Self {
        Self {
            id: item.id.clone(),
            title: item.display_title().to_string(),
            buffer: item.total_episodes.clone(),
        }
    }

    /// Accepts digits, or a lone `?` for an unknown total.
    pub(crate) fn push(&mut self, ch: char) {
        if ch == '?' {
            self.buffer = "?".to_string();
        } else if ch.is_ascii_digit() {
            if self.buffer == "?" {
                self.buffer.clear();
            }
            if self.buffer.len() < 5 {
                self.buffer.push(ch);
            }
        }
    }

    pub(crate) fn backspace(&mut self) {
        self.buffer.pop();
    }
}

#[derive(Debug, Default)]
pub(super) struct TuiData {
    pub(super) current: Option<CurrentAnime>,
    pub(super) history: Vec<HistoryEntry>,
    pub(super) tracking: Vec<TrackingItem>,
    pub(super) stats: HistoryStats,
}

pub(super) struct TuiState {
    pub(super) tab: TuiTab,
    pub(super) data: TuiData,
    pub(super) history_table: TableState,
    pub(super) tracking_table: TableState,
    pub(super) status: String,
    pub(super) pending_confirm: Option<PendingConfirm>,
    pub(super) total_input: Option<TotalInput>,
}

impl TuiState {
    fn refresh(&mut self, store: &dyn Store, preferred_id: Option<&str>) -> Result<()> {
        self.data = load_data(store)?;
        reselect(
            &mut self.history_table,
            self.data.history.iter().map(|entry| entry.id.as_str()),
            preferred_id,
        );
        reselect(
            &mut self.tracking_table,
            self.data.tracking.iter().map(|item| item.id.as_str()),
            preferred_id,
        );
        Ok(())
    }

    fn selected_history(&self) -> Option<&HistoryEntry> {
        self.history_table
            .selected()
            .and_then(|idx| self.data.history.get(idx))
    }

    fn selected_tracking(&self) -> Option<&TrackingItem> {
        self.tracking_table
            .selected()
            .and_then(|idx| self.data.tracking.get(idx))
    }

    fn active_table(&mut self) -> Option<(&mut TableState, usize)> {
        match self.tab {
            TuiTab::Current => None,
            TuiTab::History => Some((&mut self.history_table, self.data.history.len())),
            TuiTab::Tracking => Some((&mut self.tracking_table, self.data.tracking.len())),
        }
    }
}

fn reselect<'a>(
    table: &mut TableState,
    ids: impl ExactSizeIterator<Item = &'a str>,
    preferred_id: Option<&str>,
) {
    let len = ids.len();
    if len == 0 {
        table.select(None);
        return;
    }
    let mut ids = ids;
    if let Some(id) = preferred_id
        && let Some(idx) = ids.position(|candidate| candidate == id)
    {
        table.select(Some(idx));
        return;
    }
    match table.selected() {
        Some(selected) => table.select(Some(selected.min(len - 1))),
        None => table.select(Some(0)),
    }
}

pub(crate) fn run_tui(store: &dyn Store) -> Result<()> {
    let mut session = TuiSession::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    let mut state = TuiState {
        tab: TuiTab::Current,
        data: TuiData::default(),
        history_table: TableState::default(),
        tracking_table: TableState::default(),
        status: status_info("Ready."),
        pending_confirm: None,
        total_input: None,
    };
    state.refresh(store, None)?;
    if state.data.current.is_none() {
        state.status = status_info("Nothing detected yet. Run `anitracker detect <URL>` or `watch`.");
    }

    loop {
        terminal.draw(|frame| draw_tui(frame, &mut state))?;

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some(input) = state.total_input.as_mut() {
            match key.code {
                KeyCode::Char(ch) => input.push(ch),
                KeyCode::Backspace => input.backspace(),
                KeyCode::Esc => {
                    state.total_input = None;
                    state.status = status_info("Edit canceled.");
                }
                KeyCode::Enter => {
                    let input = state.total_input.take();
                    if let Some(input) = input {
                        state.status = match apply_total(store, &input) {
                            Ok(msg) => status_info(&msg),
                            Err(err) => status_error(&format!("Edit failed: {err}")),
                        };
                        state.refresh(store, Some(&input.id))?;
                    }
                }
                _ => {}
            }
            continue;
        }

        if let Some(confirm) = state.pending_confirm.clone() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    state.pending_confirm = None;
                    let result = match &confirm {
                        PendingConfirm::DeleteTracking { id, title } => {
                            delete_tracking(store, id, title)
                        }
                        PendingConfirm::ClearTracking => clear_tracking(store),
                        PendingConfirm::ClearHistory => clear_history(store),
                    };
                    state.status = match result {
                        Ok(msg) => status_info(&msg),
                        Err(err) => status_error(&format!("Failed: {err}")),
                    };
                    state.refresh(store, None)?;
                }
                KeyCode::Esc | KeyCode::Char('n') => {
                    state.pending_confirm = None;
                    state.status = status_info("Canceled.");
                }
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') => break,
            KeyCode::Left => state.tab = state.tab.move_left(),
            KeyCode::Right | KeyCode::Tab => state.tab = state.tab.move_right(),
            KeyCode::Char('1') => state.tab = TuiTab::Current,
            KeyCode::Char('2') => state.tab = TuiTab::History,
            KeyCode::Char('3') => state.tab = TuiTab::Tracking,
            KeyCode::Char('r') => {
                state.refresh(store, None)?;
                state.status = status_info("Reloaded.");
            }
            KeyCode::Up => {
                if let Some((table, _)) = state.active_table()
                    && let Some(selected) = table.selected()
                {
                    table.select(Some(selected.saturating_sub(1)));
                }
            }
            KeyCode::Down => {
                if let Some((table, len)) = state.active_table()
                    && let Some(selected) = table.selected()
                    && len > 0
                {
                    table.select(Some((selected + 1).min(len - 1)));
                }
            }
            KeyCode::Char('a') => {
                let result = match state.tab {
                    TuiTab::Current => add_current_to_tracking(store, state.data.current.as_ref()),
                    TuiTab::History => add_history_to_tracking(store, state.selected_history()),
                    TuiTab::Tracking => continue,
                };
                match result {
                    Ok((msg, added_id)) => {
                        state.status = status_info(&msg);
                        state.refresh(store, added_id.as_deref())?;
                        if added_id.is_some() {
                            state.tab = TuiTab::Tracking;
                        }
                    }
                    Err(err) => state.status = status_error(&format!("Add failed: {err}")),
                }
            }
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Char('-')
                if state.tab == TuiTab::Tracking =>
            {
                let Some(id) = state.selected_tracking().map(|item| item.id.clone()) else {
                    continue;
                };
                let forward = key.code != KeyCode::Char('-');
                state.status = match edit_episode(store, &id, forward) {
                    Ok(msg) => status_info(&msg),
                    Err(err) => status_error(&format!("Edit failed: {err}")),
                };
                state.refresh(store, Some(&id))?;
            }
            KeyCode::Char('t') if state.tab == TuiTab::Tracking => {
                if let Some(item) = state.selected_tracking() {
                    state.total_input = Some(TotalInput::for_item(item));
                    state.status =
                        status_info("Type the total (digits or ?), Enter to save, Esc to cancel.");
                }
            }
            KeyCode::Char('d') => match state.tab {
                TuiTab::Tracking => {
                    if let Some(item) = state.selected_tracking() {
                        state.pending_confirm = Some(PendingConfirm::DeleteTracking {
                            id: item.id.clone(),
                            title: item.display_title().to_string(),
                        });
                        state.status = status_info("Confirm: y/Enter to delete, n/Esc to cancel.");
                    }
                }
                TuiTab::History => {
                    if let Some(id) = state.selected_history().map(|entry| entry.id.clone()) {
                        state.status = match remove_history(store, &id) {
                            Ok(msg) => status_info(&msg),
                            Err(err) => status_error(&format!("Remove failed: {err}")),
                        };
                        state.refresh(store, None)?;
                    }
                }
                TuiTab::Current => {}
            },
            KeyCode::Char('C') => match state.tab {
                TuiTab::Tracking => state.pending_confirm = Some(PendingConfirm::ClearTracking),
                TuiTab::History => state.pending_confirm = Some(PendingConfirm::ClearHistory),
                TuiTab::Current => {}
            },
            _ => {}
        }
    }

    terminal.show_cursor()?;
    session.leave()?;
    Ok(())
}
