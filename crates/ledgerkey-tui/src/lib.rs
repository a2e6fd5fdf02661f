// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ledgerkey_app::{
    AppRuntime, ComboboxState, CommandPalette, EntryAction, EntrySession, FieldId, HeaderField,
    HelpEntry, KeyPress, ModalSession, Response, SessionEvent, TrailingField, VoucherId,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const FOCUS_MARK: &str = "▸";
const OPTION_MARK: &str = "›";
const STATUS_HINT: &str = "ctrl+k commands · ? shortcuts · ctrl+q quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    status: Option<String>,
    status_token: u64,
    last_saved: Option<VoucherId>,
}

/// Both queues the event loop drains between frames. Responses arrive from
/// the runtime; internal events come from timers.
struct Channels {
    internal_tx: Sender<InternalEvent>,
    internal_rx: Receiver<InternalEvent>,
    response_tx: Sender<Response>,
    response_rx: Receiver<Response>,
}

impl Channels {
    fn new() -> Self {
        let (internal_tx, internal_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel();
        Self {
            internal_tx,
            internal_rx,
            response_tx,
            response_rx,
        }
    }
}

pub fn run_app<R: AppRuntime>(session: &mut EntrySession, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let channels = Channels::new();

    let events = session.start();
    apply_session_events(runtime, &mut view_data, &channels, events);

    let mut result = Ok(());
    loop {
        settle(session, runtime, &mut view_data, &channels);

        if let Err(error) = terminal.draw(|frame| render(frame, session, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(session, runtime, &mut view_data, &channels, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

/// Once per frame: mount the current fields, then apply whatever the runtime
/// and the timers delivered since the last frame.
fn settle<R: AppRuntime>(
    session: &mut EntrySession,
    runtime: &mut R,
    view_data: &mut ViewData,
    channels: &Channels,
) {
    let events = session.layout_pass();
    apply_session_events(runtime, view_data, channels, events);
    process_internal_events(session, runtime, view_data, channels);
}

fn process_internal_events<R: AppRuntime>(
    session: &mut EntrySession,
    runtime: &mut R,
    view_data: &mut ViewData,
    channels: &Channels,
) {
    while let Ok(event) = channels.internal_rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                view_data.status = None;
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }

    while let Ok(response) = channels.response_rx.try_recv() {
        let events = session.apply_response(response);
        apply_session_events(runtime, view_data, channels, events);
    }
}

fn apply_session_events<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    channels: &Channels,
    events: Vec<SessionEvent>,
) {
    for event in events {
        match event {
            SessionEvent::Request(request) => {
                let id = request.id();
                if let Err(error) = runtime.spawn_request(request, channels.response_tx.clone()) {
                    warn!(request = id.get(), error = %format!("{error:#}"), "request not sent");
                    emit_status(
                        view_data,
                        &channels.internal_tx,
                        format!("request failed: {error:#}"),
                    );
                }
            }
            SessionEvent::StatusUpdated(message) => {
                emit_status(view_data, &channels.internal_tx, message);
            }
            SessionEvent::Saved(id) => view_data.last_saved = Some(id),
            SessionEvent::PrintRequested(kind) => {
                info!(kind = kind.as_str(), "print requested");
            }
            other => debug!(event = ?other, "session event"),
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    view_data.status = Some(message.into());
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: AppRuntime>(
    session: &mut EntrySession,
    runtime: &mut R,
    view_data: &mut ViewData,
    channels: &Channels,
    key: KeyEvent,
) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }

    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        emit_status(view_data, &channels.internal_tx, "press ctrl+q to quit");
        return false;
    }

    let Some(press) = key_press(key) else {
        return false;
    };
    let events = session.handle_key(&press);
    apply_session_events(runtime, view_data, channels, events);
    false
}

/// Translates a terminal key into the engine's DOM-style press. Keys the
/// engine has no name for yield `None`.
fn key_press(key: KeyEvent) -> Option<KeyPress> {
    let mut press = match key.code {
        KeyCode::Char(ch) => KeyPress::char(ch),
        KeyCode::Enter => KeyPress::named("Enter"),
        KeyCode::Esc => KeyPress::named("Escape"),
        KeyCode::Backspace => KeyPress::named("Backspace"),
        KeyCode::Delete => KeyPress::named("Delete"),
        KeyCode::Tab => KeyPress::named("Tab"),
        KeyCode::BackTab => KeyPress::named("Tab").shift(),
        KeyCode::Up => KeyPress::named("ArrowUp"),
        KeyCode::Down => KeyPress::named("ArrowDown"),
        KeyCode::Left => KeyPress::named("ArrowLeft"),
        KeyCode::Right => KeyPress::named("ArrowRight"),
        KeyCode::Home => KeyPress::named("Home"),
        KeyCode::End => KeyPress::named("End"),
        KeyCode::PageUp => KeyPress::named("PageUp"),
        KeyCode::PageDown => KeyPress::named("PageDown"),
        KeyCode::F(number) => KeyPress::named(format!("F{number}")),
        _ => return None,
    };

    let modifiers = key.modifiers;
    if modifiers.contains(KeyModifiers::CONTROL) {
        press = press.ctrl();
    }
    if modifiers.contains(KeyModifiers::ALT) {
        press = press.alt();
    }
    if modifiers.contains(KeyModifiers::SHIFT) {
        press = press.shift();
    }
    if modifiers.intersects(KeyModifiers::SUPER | KeyModifiers::META) {
        press = press.meta();
    }
    Some(press)
}

fn render(frame: &mut ratatui::Frame<'_>, session: &EntrySession, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let title = format!("ledgerkey · {} voucher", session.form().kind().label());
    let header = Paragraph::new(header_text(session))
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    render_grid(frame, layout[1], session);

    let narration = FieldId::Trailing(TrailingField::Narration);
    let narration_style = if session.is_focused(narration) {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let narration_widget = Paragraph::new(session.display_text(narration)).block(
        Block::default()
            .title("narration")
            .borders(Borders::ALL)
            .border_style(narration_style),
    );
    frame.render_widget(narration_widget, layout[2]);

    let status_widget = Paragraph::new(status_text(session, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[3]);

    if let Some(field) = session.current_field()
        && let Some(combo) = session.combobox(field)
        && combo.is_open()
    {
        let area = centered_rect(50, 45, frame.area());
        frame.render_widget(Clear, area);
        let title = field.master().map_or("select", |kind| kind.label());
        let list = Paragraph::new(render_combobox_text(combo))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(list, area);
    }

    if let Some(modal) = session.modal() {
        let area = centered_rect(54, 34, frame.area());
        frame.render_widget(Clear, area);
        let dialog = Paragraph::new(render_modal_text(modal)).block(
            Block::default()
                .title(modal.kind.title())
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(dialog, area);
    }

    if let Some(prompt) = session.period_prompt() {
        let area = centered_rect(48, 20, frame.area());
        frame.render_widget(Clear, area);
        let picker = Paragraph::new(render_period_prompt_text(prompt))
            .block(Block::default().title("period").borders(Borders::ALL));
        frame.render_widget(picker, area);
    }

    if session.palette().is_open() {
        let area = centered_rect(60, 60, frame.area());
        frame.render_widget(Clear, area);
        let palette = Paragraph::new(render_palette_text(session.palette()))
            .block(Block::default().title("commands").borders(Borders::ALL));
        frame.render_widget(palette, area);
    }

    if session.help_visible() {
        let area = centered_rect(80, 72, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text(session.catalogue()))
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_grid(frame: &mut ratatui::Frame<'_>, area: Rect, session: &EntrySession) {
    let rows = session.form().rows();
    let columns = rows
        .first()
        .map(|row| row.columns())
        .unwrap_or_else(|| session.form().kind().row_kind().columns());

    let mut header_cells = vec![Cell::from("#")];
    header_cells.extend(columns.iter().map(|column| Cell::from(column.label())));
    let header = Row::new(header_cells).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    let body = rows.iter().enumerate().map(|(index, row)| {
        let mut cells = vec![Cell::from((index + 1).to_string())];
        cells.extend(row.columns().iter().map(|column| {
            let field = FieldId::cell(row.id, *column);
            let style = if session.is_focused(field) {
                Style::default().add_modifier(Modifier::REVERSED)
            } else if session.issues().iter().any(|issue| issue.field == field) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            Cell::from(session.display_text(field)).style(style)
        }));
        Row::new(cells)
    });

    let mut widths = vec![Constraint::Length(4)];
    let share = u16::try_from(96 / columns.len().max(1)).unwrap_or(20);
    widths.extend(columns.iter().map(|_| Constraint::Percentage(share)));

    let table = Table::new(body, widths)
        .header(header)
        .block(Block::default().title("entries").borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn header_text(session: &EntrySession) -> String {
    let mut parts = vec![format!("period {}", session.period())];
    parts.extend(session.sequence().iter().filter_map(|field| {
        let FieldId::Header(header) = field else {
            return None;
        };
        Some(header_field_text(session, *header))
    }));
    parts.join("  ")
}

fn header_field_text(session: &EntrySession, header: HeaderField) -> String {
    let field = FieldId::Header(header);
    let mark = if session.is_focused(field) {
        FOCUS_MARK
    } else {
        " "
    };
    format!("{mark}{}: {}", header.label(), session.display_text(field))
}

fn status_text(session: &EntrySession, view_data: &ViewData) -> String {
    let mut parts = Vec::new();
    if session.is_saving() {
        parts.push("saving…".to_owned());
    }
    if let Some(status) = &view_data.status {
        parts.push(status.clone());
    } else if let Some(issue) = session.issues().first() {
        let more = session.issues().len() - 1;
        if more == 0 {
            parts.push(format!("{}: {}", issue.field, issue.message));
        } else {
            parts.push(format!("{}: {} (+{more} more)", issue.field, issue.message));
        }
    }
    if parts.is_empty() {
        match view_data.last_saved {
            Some(id) => parts.push(format!("last saved #{} · {STATUS_HINT}", id.get())),
            None => parts.push(STATUS_HINT.to_owned()),
        }
    }
    parts.join(" · ")
}

fn render_combobox_text(combo: &ComboboxState) -> String {
    let mut lines = vec![format!("> {}", combo.query())];
    let filtered = combo.filtered();
    if filtered.is_empty() {
        lines.push("  no matches · alt+c creates".to_owned());
    }
    for (index, option) in filtered.iter().enumerate() {
        let mark = if index == combo.highlight() {
            OPTION_MARK
        } else {
            " "
        };
        lines.push(format!("{mark} {}", option.label));
    }
    lines.join("\n")
}

fn render_modal_text(modal: &ModalSession) -> String {
    let mut lines = Vec::new();
    for (index, field) in modal.draft.fields.iter().enumerate() {
        let mark = if index == modal.draft.cursor {
            FOCUS_MARK
        } else {
            " "
        };
        lines.push(format!("{mark}{}: {}", field.label, field.value));
    }
    lines.push(String::new());
    if modal.is_pending() {
        lines.push("saving…".to_owned());
    } else if let Some(error) = modal.error() {
        lines.push(format!("error: {error}"));
    }
    lines.push("ctrl+a accept · tab next field · esc cancel".to_owned());
    lines.join("\n")
}

fn render_period_prompt_text(prompt: &str) -> String {
    [
        format!("> {prompt}"),
        String::new(),
        "YYYY-MM-DD..YYYY-MM-DD · enter applies · esc cancels".to_owned(),
    ]
    .join("\n")
}

fn render_palette_text(palette: &CommandPalette<EntryAction>) -> String {
    let mut lines = vec![format!("> {}", palette.query())];
    for (index, command) in palette.matches().iter().enumerate() {
        let mark = if index == palette.selected() {
            OPTION_MARK
        } else {
            " "
        };
        lines.push(format!("{mark} {:<28} {}", command.label, command.group));
    }
    lines.join("\n")
}

fn help_overlay_text(catalogue: &[HelpEntry]) -> String {
    let mut lines = Vec::new();
    let mut scope: Option<&str> = None;
    for entry in catalogue {
        if scope != Some(entry.scope.as_str()) {
            if scope.is_some() {
                lines.push(String::new());
            }
            lines.push(entry.scope.clone());
            scope = Some(entry.scope.as_str());
        }
        lines.push(format!("  {:<14} {}", entry.combo, entry.description));
    }
    lines.push(String::new());
    lines.push("  ctrl+q         quit".to_owned());
    lines.join("\n")
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
