use chrono::Local;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Cell, Clear, Gauge, Padding, Paragraph, Row, Table, Wrap,
};

use crate::model::{TrackingStatus, now_ms};

use super::super::display::{
    format_relative_time, progress_label, progress_percent, site_domain, truncate,
};
use super::{PendingConfirm, TuiState, TuiTab};

const ACCENT: Color = Color::Rgb(110, 170, 255);
const MUTED: Color = Color::Rgb(185, 195, 210);
const TEXT: Color = Color::Rgb(230, 230, 230);

pub(super) fn draw_tui(frame: &mut Frame, state: &mut TuiState) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_line(state))
        .alignment(Alignment::Center)
        .block(panel_block("Dashboard"));
    frame.render_widget(header, chunks[0]);

    match state.tab {
        TuiTab::Current => draw_current(frame, state, chunks[1]),
        TuiTab::History => draw_history(frame, state, chunks[1]),
        TuiTab::Tracking => draw_tracking(frame, state, chunks[1]),
    }

    let command_bar = Paragraph::new(controls_line(state.tab))
        .alignment(Alignment::Center)
        .block(panel_block("Controls"));
    frame.render_widget(command_bar, chunks[2]);

    let status_widget = Paragraph::new(state.status.clone())
        .style(status_style(&state.status))
        .block(panel_block("Status"));
    frame.render_widget(status_widget, chunks[3]);

    if let Some(input) = &state.total_input {
        let popup_text = format!(
            "Total episodes for\n{}\n\n> {}_\n\n[Enter] Save   [Esc] Cancel",
            truncate(&input.title, 56),
            input.buffer
        );
        render_popup(frame, &popup_text, "Edit Total");
    } else if let Some(confirm) = &state.pending_confirm {
        let (title, popup_text) = match confirm {
            PendingConfirm::DeleteTracking { title, .. } => (
                "Confirm Delete",
                format!(
                    "Stop tracking this anime?\n\n{}\n\n[y / Enter] Delete   [n / Esc] Cancel",
                    truncate(title, 56)
                ),
            ),
            PendingConfirm::ClearTracking => (
                "Confirm Clear",
                "Remove every entry from the tracking list?\n\nThis cannot be undone.\n\n[y / Enter] Clear   [n / Esc] Cancel".to_string(),
            ),
            PendingConfirm::ClearHistory => (
                "Confirm Clear",
                "Delete the whole watch history?\n\nThis cannot be undone.\n\n[y / Enter] Clear   [n / Esc] Cancel".to_string(),
            ),
        };
        render_popup(frame, &popup_text, title);
    }
}

fn header_line(state: &TuiState) -> Line<'static> {
    let mut spans = vec![
        Span::styled("ANITRACKER", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
        Span::styled("   ", Style::default()),
    ];
    for tab in [TuiTab::Current, TuiTab::History, TuiTab::Tracking] {
        spans.push(Span::styled(format!(" {} ", tab.label()), tab_pill_style(tab, state.tab)));
        spans.push(Span::styled(" ", Style::default()));
    }
    spans.push(Span::styled(
        format!(
            "  {} watched  {} tracked",
            state.data.history.len(),
            state.data.tracking.len()
        ),
        Style::default().fg(MUTED),
    ));
    Line::from(spans)
}

fn draw_current(frame: &mut Frame, state: &TuiState, area: Rect) {
    let now = now_ms();
    let text = match &state.data.current {
        Some(current) => {
            let observation = &current.observation;
            let mut text = format!(
                "Title\n{}\n\nMatch title\n{}\n\nSeason {}   Episode {}\n\nSite\n{}\n\nDetected\n{}",
                truncate(observation.display_title(), 60),
                truncate(&observation.title, 60),
                observation.season,
                observation.episode,
                site_domain(&current.url),
                format_relative_time(current.timestamp, Local::now()),
            );
            if current.is_stale(now) {
                text.push_str(" (stale)");
            }
            if let Some(cover) = &observation.cover {
                text.push_str(&format!("\n\nCover\n{}", truncate(cover, 60)));
            }
            text.push_str(&format!("\n\nLink\n{}", truncate(&current.url, 60)));
            text
        }
        None => "Nothing detected yet.\n\nRun `anitracker detect <URL>` or `anitracker watch <URL>`\nand the latest observation shows up here.".to_string(),
    };
    let card = Paragraph::new(text)
        .style(Style::default().fg(TEXT))
        .wrap(Wrap { trim: false })
        .block(panel_block("Now Watching"));
    frame.render_widget(card, area);
}

fn draw_history(frame: &mut Frame, state: &mut TuiState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    let stats = &state.data.stats;
    let mut stats_spans = vec![Span::styled(
        format!(
            "{} episodes watched   {} titles",
            stats.total_watched, stats.unique_titles
        ),
        Style::default().fg(TEXT),
    )];
    if let Some(top) = stats.titles.first() {
        stats_spans.push(Span::styled(
            format!("   most watched: {} ({})", truncate(&top.display_title, 30), top.count),
            Style::default().fg(MUTED),
        ));
    }
    let stats_widget = Paragraph::new(Line::from(stats_spans))
        .alignment(Alignment::Center)
        .block(panel_block("Statistics"));
    frame.render_widget(stats_widget, chunks[0]);

    let now = Local::now();
    let rows: Vec<Row> = state
        .data
        .history
        .iter()
        .map(|entry| {
            Row::new(vec![
                Cell::from(truncate(entry.display_title(), 48)),
                Cell::from(entry.season.clone()),
                Cell::from(entry.episode.clone()),
                Cell::from(site_domain(&entry.url)),
                Cell::from(format_relative_time(entry.timestamp, now)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(46),
            Constraint::Length(4),
            Constraint::Length(6),
            Constraint::Length(22),
            Constraint::Length(20),
        ],
    )
    .header(table_header(["Title", "S", "Ep", "Site", "When"]))
    .block(panel_block("History"))
    .row_highlight_style(highlight_style())
    .highlight_symbol("▸ ");
    frame.render_stateful_widget(table, chunks[1], &mut state.history_table);
}

fn draw_tracking(frame: &mut Frame, state: &mut TuiState, area: Rect) {
    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(64), Constraint::Percentage(36)])
        .split(area);
    let details_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(3)])
        .split(body_chunks[1]);

    let rows: Vec<Row> = state
        .data
        .tracking
        .iter()
        .map(|item| {
            let tone = match item.status {
                TrackingStatus::Completed => Style::default().fg(Color::Rgb(140, 220, 150)),
                TrackingStatus::Watching => Style::default().fg(MUTED),
            };
            Row::new(vec![
                Cell::from(truncate(item.display_title(), 48)),
                Cell::from(item.season.clone()),
                Cell::from(progress_label(item)),
                Cell::from(item.status.label()).style(tone),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(54),
            Constraint::Length(4),
            Constraint::Length(10),
            Constraint::Length(12),
        ],
    )
    .header(table_header(["Title", "S", "Progress", "Status"]))
    .block(panel_block("Tracking"))
    .row_highlight_style(highlight_style())
    .highlight_symbol("▸ ");
    frame.render_stateful_widget(table, body_chunks[0], &mut state.tracking_table);

    let selected = state
        .tracking_table
        .selected()
        .and_then(|idx| state.data.tracking.get(idx));
    let selection_text = match selected {
        Some(item) => {
            let mut text = format!(
                "Title\n{}\n\nSeason\n{}\n\nEpisode\n{}\n\nStatus\n{}\n\nAdded\n{}",
                truncate(item.display_title(), 40),
                item.season,
                progress_label(item),
                item.status.label(),
                format_relative_time(item.added_at, Local::now()),
            );
            if let Some(updated) = item.last_updated {
                text.push_str(&format!(
                    "\n\nUpdated\n{}",
                    format_relative_time(updated, Local::now())
                ));
            }
            text
        }
        None => "Nothing tracked yet.\n\nPress a on the Current or History tab\nto start tracking an anime.".to_string(),
    };
    let selection = Paragraph::new(selection_text)
        .style(Style::default().fg(TEXT))
        .block(panel_block("Selected"))
        .alignment(Alignment::Left);
    frame.render_widget(selection, details_chunks[0]);

    if let Some(item) = selected {
        let percent = progress_percent(item);
        let label = if item.known_total().is_some() {
            format!("{} ({percent}%)", progress_label(item))
        } else {
            format!("{} (total unknown)", progress_label(item))
        };
        let progress = Gauge::default()
            .block(panel_block("Progress"))
            .gauge_style(
                Style::default()
                    .fg(Color::Rgb(130, 190, 255))
                    .bg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .label(label)
            .percent(percent);
        frame.render_widget(progress, details_chunks[1]);
    }
}

fn table_header<const N: usize>(labels: [&'static str; N]) -> Row<'static> {
    Row::new(labels).style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
}

fn highlight_style() -> Style {
    Style::default()
        .bg(ACCENT)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

fn render_popup(frame: &mut Frame, text: &str, title: &'static str) {
    let popup_area = popup_rect_for_text(frame.area(), text);
    render_popup_shadow(frame, popup_area);
    frame.render_widget(Clear, popup_area);
    let popup = Paragraph::new(text.to_string())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(modal_block(title));
    frame.render_widget(popup, popup_area);
}

fn panel_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(125, 135, 150)))
        .title(title)
}

fn modal_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(
            Style::default()
                .fg(Color::Rgb(160, 190, 235))
                .add_modifier(Modifier::BOLD),
        )
        .title(title)
        .padding(Padding::new(2, 2, 1, 1))
}

fn tab_pill_style(tab: TuiTab, current: TuiTab) -> Style {
    if tab == current {
        Style::default()
            .bg(ACCENT)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .bg(Color::Rgb(72, 82, 96))
            .fg(Color::Rgb(230, 235, 242))
    }
}

fn controls_line(tab: TuiTab) -> Line<'static> {
    let keys = match tab {
        TuiTab::Current => "a track  r reload",
        TuiTab::History => "↑/↓ move  a track  d remove  C clear  r reload",
        TuiTab::Tracking => "↑/↓ move  +/- episode  t total  d delete  C clear",
    };
    Line::from(vec![
        Span::styled(keys, Style::default().fg(MUTED)),
        Span::styled("   ←/→ tab  q quit", Style::default().fg(MUTED)),
    ])
}

fn status_style(status: &str) -> Style {
    if status.starts_with("ERROR:") {
        Style::default()
            .fg(Color::Rgb(255, 145, 120))
            .add_modifier(Modifier::BOLD)
    } else if status.starts_with("INFO:") {
        Style::default().fg(Color::Rgb(205, 165, 255))
    } else {
        Style::default().fg(Color::Rgb(230, 235, 242))
    }
}

fn centered_fixed_rect(width: u16, height: u16, area: Rect) -> Rect {
    let clamped_width = width.min(area.width.max(1));
    let clamped_height = height.min(area.height.max(1));
    let x = area.x + area.width.saturating_sub(clamped_width) / 2;
    let y = area.y + area.height.saturating_sub(clamped_height) / 2;
    Rect::new(x, y, clamped_width, clamped_height)
}

fn render_popup_shadow(frame: &mut Frame, popup_area: Rect) {
    let area = frame.area();
    let shadow = Rect::new(
        (popup_area.x + 1).min(area.x + area.width.saturating_sub(1)),
        (popup_area.y + 1).min(area.y + area.height.saturating_sub(1)),
        popup_area.width.saturating_sub(1),
        popup_area.height.saturating_sub(1),
    );
    if shadow.width == 0 || shadow.height == 0 {
        return;
    }
    let shadow_block = Block::default().style(Style::default().bg(Color::Rgb(14, 16, 24)));
    frame.render_widget(shadow_block, shadow);
}

fn popup_rect_for_text(area: Rect, text: &str) -> Rect {
    let max_line_width = text
        .lines()
        .map(|line| line.chars().count() as u16)
        .max()
        .unwrap_or(0);
    let line_count = text.lines().count() as u16;

    let available_width = area.width.saturating_sub(2).max(1);
    let min_width = 48.min(available_width);
    let max_width = 72.min(available_width);
    let width = max_line_width.saturating_add(12).clamp(min_width, max_width);

    let available_height = area.height.saturating_sub(2).max(1);
    let min_height = 10.min(available_height);
    let max_height = 18.min(available_height);
    let height = line_count.saturating_add(6).clamp(min_height, max_height);

    centered_fixed_rect(width, height, area)
}
