// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod clipboard;

pub use clipboard::SystemClipboard;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use jpkr_grid::{
    BatchKind, Clipboard, DataChange, Grid, GridCommand, GridEvent, HeaderCheck, Row as GridRow,
    RowId, RowRef,
};
use log::{debug, warn};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const EDIT_CARET: &str = "▏";
const DIRTY_MARK: &str = "*";

/// One page of rows as loaded from the backing store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadedPage {
    pub rows: Vec<GridRow>,
    pub total_count: usize,
}

/// The parent side of the grid: where pages come from and where batches go.
pub trait GridRuntime {
    fn load_page(&mut self, limit: usize, offset: usize) -> Result<LoadedPage>;
    fn create_rows(&mut self, rows: &[GridRow]) -> Result<()>;
    fn update_rows(&mut self, rows: &[GridRow]) -> Result<()>;
    fn delete_rows(&mut self, ids: &[RowId]) -> Result<()>;
    fn run_action(&mut self, ids: &[RowId]) -> Result<()>;
    fn cell_clicked(&mut self, row: &GridRow, column: &str) -> Result<String> {
        Ok(format!(
            "{column} of row {}",
            row.id().map(|id| id.to_string()).unwrap_or_else(|| "new".to_owned())
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOptions {
    pub title: String,
    pub page_size: usize,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            title: "jpkr".to_owned(),
            page_size: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ViewData {
    options: HostOptions,
    data: Vec<GridRow>,
    total_count: usize,
    offset: usize,
    cursor_row: usize,
    cursor_col: usize,
    status_line: Option<String>,
    status_token: u64,
}

pub fn run_grid<R: GridRuntime, C: Clipboard>(
    grid: &mut Grid,
    runtime: &mut R,
    clipboard: &mut C,
    options: HostOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(error) = execute!(stdout, terminal::EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(error).context("enter alternate screen");
    }

    let backend = CrosstermBackend::new(stdout);
    let result = Terminal::new(backend)
        .context("create terminal")
        .and_then(|mut terminal| {
            drive(&mut terminal, grid, runtime, clipboard, options, next_event)
        });

    // Raw mode is left on every path out of the loop, errors included.
    let restored = disable_raw_mode()
        .context("disable raw mode")
        .and_then(|()| {
            execute!(io::stdout(), terminal::LeaveAlternateScreen)
                .context("leave alternate screen")
        });
    result.and(restored)
}

fn next_event(timeout: Duration) -> Result<Option<Event>> {
    if !event::poll(timeout).context("poll event")? {
        return Ok(None);
    }
    event::read().context("read event").map(Some)
}

fn drive<B, R, C, F>(
    terminal: &mut Terminal<B>,
    grid: &mut Grid,
    runtime: &mut R,
    clipboard: &mut C,
    options: HostOptions,
    mut next_event: F,
) -> Result<()>
where
    B: Backend,
    R: GridRuntime,
    C: Clipboard,
    F: FnMut(Duration) -> Result<Option<Event>>,
{
    let mut view_data = ViewData {
        options,
        ..ViewData::default()
    };
    let (internal_tx, internal_rx) = mpsc::channel();
    reload_page(grid, runtime, &mut view_data, &internal_tx);

    loop {
        process_internal_events(&mut view_data, &internal_rx);

        terminal
            .draw(|frame| render(frame, grid, &view_data))
            .context("draw frame")?;

        if let Some(Event::Key(key)) = next_event(Duration::from_millis(120))?
            && key.kind != KeyEventKind::Release
            && handle_key_event(grid, runtime, clipboard, &mut view_data, &internal_tx, key)
        {
            return Ok(());
        }
    }
}

fn process_internal_events(view_data: &mut ViewData, rx: &Receiver<InternalEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                view_data.status_line = None;
            }
            InternalEvent::ClearStatus { .. } => {}
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
    view_data.status_line = Some(message.into());
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: GridRuntime, C: Clipboard + ?Sized>(
    grid: &mut Grid,
    runtime: &mut R,
    clipboard: &mut C,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if let Some(cursor) = grid.edit_cursor() {
        let command = match key.code {
            KeyCode::Esc => Some(GridCommand::CancelEdit),
            KeyCode::Enter => Some(GridCommand::CommitEdit),
            KeyCode::Backspace => {
                let mut draft = cursor.draft.clone();
                draft.pop();
                Some(GridCommand::SetDraft(draft))
            }
            KeyCode::Char(ch) => Some(GridCommand::SetDraft(format!("{}{ch}", cursor.draft))),
            _ => None,
        };
        if let Some(command) = command {
            dispatch(grid, runtime, view_data, internal_tx, command);
        }
        return false;
    }

    let command = match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('j') | KeyCode::Down => {
            move_cursor(view_data, 1, 0, grid.columns().len());
            None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            move_cursor(view_data, -1, 0, grid.columns().len());
            None
        }
        KeyCode::Char('l') | KeyCode::Right => {
            move_cursor(view_data, 0, 1, grid.columns().len());
            None
        }
        KeyCode::Char('h') | KeyCode::Left => {
            move_cursor(view_data, 0, -1, grid.columns().len());
            None
        }
        KeyCode::Char('s') => cursor_column(grid, view_data).map(GridCommand::ToggleSort),
        KeyCode::Char(' ') => cursor_row(grid, view_data).map(GridCommand::ToggleRow),
        KeyCode::Char('a') => Some(GridCommand::ToggleAll),
        KeyCode::Char('e') | KeyCode::Enter => cursor_row(grid, view_data)
            .zip(cursor_column(grid, view_data))
            .map(|(row, column)| GridCommand::CellClick { row, column }),
        KeyCode::Char('w') => Some(GridCommand::SaveChanges),
        KeyCode::Char('d') => Some(GridCommand::DeleteSelected),
        KeyCode::Char('D') => cursor_row(grid, view_data).map(GridCommand::DeleteRow),
        KeyCode::Char('x') => Some(GridCommand::ActionSelected),
        KeyCode::Char('o') => Some(GridCommand::AddRow),
        KeyCode::Char('c') => {
            create_unsaved_rows(grid, runtime, view_data, internal_tx);
            None
        }
        KeyCode::Char('y') => {
            let events = grid.copy(&view_data.data, clipboard);
            apply_events(grid, runtime, view_data, internal_tx, events);
            None
        }
        KeyCode::Char('p') => {
            let events = grid.paste(&view_data.data, clipboard);
            apply_events(grid, runtime, view_data, internal_tx, events);
            None
        }
        KeyCode::Char('n') => {
            change_page(grid, runtime, view_data, internal_tx, true);
            None
        }
        KeyCode::Char('N') => {
            change_page(grid, runtime, view_data, internal_tx, false);
            None
        }
        KeyCode::Char('r') => {
            reload_page(grid, runtime, view_data, internal_tx);
            None
        }
        _ => None,
    };

    if let Some(command) = command {
        dispatch(grid, runtime, view_data, internal_tx, command);
    }
    false
}

fn dispatch<R: GridRuntime>(
    grid: &mut Grid,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: GridCommand,
) {
    let events = grid.dispatch(&view_data.data, command);
    apply_events(grid, runtime, view_data, internal_tx, events);
}

/// Plays the parent's part: applies proposed data, runs batches against the
/// runtime and reports how they settled.
fn apply_events<R: GridRuntime>(
    grid: &mut Grid,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    events: Vec<GridEvent>,
) {
    let mut queue: VecDeque<GridEvent> = events.into();
    let mut reload = false;

    // Batches run once the grid's own events are applied, so a failure
    // status is the last thing shown.
    loop {
        let mut requests = Vec::new();
        while let Some(event) = queue.pop_front() {
            match event {
                GridEvent::DataChanged(rows) => {
                    view_data.data = rows;
                    grid.sync_data(&view_data.data, DataChange::SameResultSet);
                    clamp_cursor(view_data, grid.columns().len());
                }
                GridEvent::UpdateRequested(_)
                | GridEvent::DeleteRequested(_)
                | GridEvent::ActionRequested(_) => requests.push(event),
                GridEvent::CellClicked { row, column } => {
                    match runtime.cell_clicked(&row, &column) {
                        Ok(message) => emit_status(view_data, internal_tx, message),
                        Err(error) => emit_status(view_data, internal_tx, format!("{error:#}")),
                    }
                }
                GridEvent::Notice(notice) => emit_status(view_data, internal_tx, notice.message()),
                GridEvent::SortChanged(_)
                | GridEvent::SelectionChanged(_)
                | GridEvent::EditStarted { .. }
                | GridEvent::EditClosed => {}
            }
        }
        if requests.is_empty() {
            break;
        }

        for request in requests {
            let (kind, result) = match request {
                GridEvent::UpdateRequested(rows) => (BatchKind::Update, runtime.update_rows(&rows)),
                GridEvent::DeleteRequested(ids) => (BatchKind::Delete, runtime.delete_rows(&ids)),
                GridEvent::ActionRequested(ids) => (BatchKind::Action, runtime.run_action(&ids)),
                _ => continue,
            };
            reload |= kind != BatchKind::Update && result.is_ok();
            queue.extend(settle(grid, view_data, internal_tx, kind, result));
        }
    }

    if reload {
        reload_page(grid, runtime, view_data, internal_tx);
    }
}

fn settle(
    grid: &mut Grid,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: BatchKind,
    result: Result<()>,
) -> Vec<GridEvent> {
    let ok = match result {
        Ok(()) => true,
        Err(error) => {
            warn!("{} batch failed: {error:#}", kind.as_str());
            emit_status(
                view_data,
                internal_tx,
                format!("{} failed: {error:#}", kind.as_str()),
            );
            false
        }
    };
    let events = grid.dispatch(&view_data.data, GridCommand::BatchSettled { kind, ok });
    // A failure already has its own status line.
    events
        .into_iter()
        .filter(|event| ok || !matches!(event, GridEvent::Notice(_)))
        .collect()
}

fn create_unsaved_rows<R: GridRuntime>(
    grid: &mut Grid,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let unsaved: Vec<GridRow> = view_data
        .data
        .iter()
        .filter(|row| row.id().is_none())
        .cloned()
        .collect();
    if unsaved.is_empty() {
        emit_status(view_data, internal_tx, "no new rows to create");
        return;
    }

    match runtime.create_rows(&unsaved) {
        Ok(()) => {
            reload_page(grid, runtime, view_data, internal_tx);
            emit_status(
                view_data,
                internal_tx,
                format!("{} rows created", unsaved.len()),
            );
        }
        Err(error) => {
            warn!("create failed: {error:#}");
            emit_status(view_data, internal_tx, format!("create failed: {error:#}"));
        }
    }
}

fn change_page<R: GridRuntime>(
    grid: &mut Grid,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    forward: bool,
) {
    let size = view_data.options.page_size.max(1);
    let next = if forward {
        let candidate = view_data.offset + size;
        if candidate >= view_data.total_count {
            emit_status(view_data, internal_tx, "last page");
            return;
        }
        candidate
    } else {
        if view_data.offset == 0 {
            emit_status(view_data, internal_tx, "first page");
            return;
        }
        view_data.offset.saturating_sub(size)
    };
    view_data.offset = next;
    reload_page(grid, runtime, view_data, internal_tx);
}

fn reload_page<R: GridRuntime>(
    grid: &mut Grid,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    match runtime.load_page(view_data.options.page_size, view_data.offset) {
        Ok(page) => {
            debug!(
                "loaded {} rows at offset {} of {}",
                page.rows.len(),
                view_data.offset,
                page.total_count
            );
            view_data.data = page.rows;
            view_data.total_count = page.total_count;
            grid.sync_data(&view_data.data, DataChange::NewResultSet);
            clamp_cursor(view_data, grid.columns().len());
        }
        Err(error) => {
            warn!("load failed: {error:#}");
            emit_status(view_data, internal_tx, format!("load failed: {error:#}"));
        }
    }
}

fn move_cursor(view_data: &mut ViewData, rows: isize, cols: isize, column_count: usize) {
    view_data.cursor_row = view_data.cursor_row.saturating_add_signed(rows);
    view_data.cursor_col = view_data.cursor_col.saturating_add_signed(cols);
    clamp_cursor(view_data, column_count);
}

fn clamp_cursor(view_data: &mut ViewData, column_count: usize) {
    view_data.cursor_row = view_data
        .cursor_row
        .min(view_data.data.len().saturating_sub(1));
    view_data.cursor_col = view_data.cursor_col.min(column_count.saturating_sub(1));
}

fn cursor_row(grid: &Grid, view_data: &ViewData) -> Option<RowRef> {
    let order = grid.visible_order(&view_data.data);
    let index = *order.get(view_data.cursor_row)?;
    Some(RowRef::for_row(index, &view_data.data[index]))
}

fn cursor_column(grid: &Grid, view_data: &ViewData) -> Option<String> {
    grid.columns()
        .get(view_data.cursor_col)
        .map(|column| column.key.clone())
}

fn render(frame: &mut ratatui::Frame<'_>, grid: &Grid, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(frame.area());

    render_table(frame, layout[0], grid, view_data);

    let status = Paragraph::new(status_text(grid, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[1]);
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, grid: &Grid, view_data: &ViewData) {
    let data = &view_data.data;
    let mut widths = vec![Constraint::Length(4)];
    widths.extend(grid.columns().iter().map(|_| Constraint::Min(6)));

    let mut header_cells = vec![Cell::from(header_check_mark(grid.header_check(data)))];
    header_cells.extend(
        grid.columns()
            .iter()
            .map(|column| Cell::from(header_label(grid, &column.key, &column.label))),
    );
    let header = Row::new(header_cells).style(
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let edit = grid.edit_cursor();
    let rows = grid
        .visible_order(data)
        .into_iter()
        .enumerate()
        .map(|(position, index)| {
            let row = &data[index];
            let row_ref = RowRef::for_row(index, row);
            let on_cursor = position == view_data.cursor_row;

            let mut cells = vec![Cell::from(row_marker(grid, row))];
            cells.extend(grid.columns().iter().enumerate().map(|(col, column)| {
                let editing = edit.filter(|cursor| cursor.targets(row_ref, &column.key));
                let text = match editing {
                    Some(cursor) => format!("{}{EDIT_CARET}", cursor.draft),
                    None => row.display(&column.key),
                };

                let mut style = Style::default();
                if row_ref.id().is_none() {
                    style = style.fg(Color::Green);
                }
                if on_cursor {
                    style = style.bg(Color::DarkGray);
                }
                if on_cursor && col == view_data.cursor_col {
                    style = Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD);
                }
                if editing.is_some() {
                    style = Style::default().fg(Color::Black).bg(Color::Yellow);
                }
                Cell::from(text).style(style)
            }));
            Row::new(cells)
        });

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(table_title(grid, view_data))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, area);
}

fn header_check_mark(check: HeaderCheck) -> &'static str {
    match check {
        HeaderCheck::Checked => "[x]",
        HeaderCheck::Indeterminate => "[-]",
        HeaderCheck::Unchecked => "[ ]",
    }
}

fn header_label(grid: &Grid, key: &str, label: &str) -> String {
    format!("{label} {}", grid.sort_indicator(key))
}

// Checkbox plus dirty mark; rows without an id cannot be checked.
fn row_marker(grid: &Grid, row: &GridRow) -> String {
    match row.id() {
        Some(id) => {
            let check = if grid.is_selected(id) { "[x]" } else { "[ ]" };
            let dirty = if grid.is_dirty(id) { DIRTY_MARK } else { "" };
            format!("{check}{dirty}")
        }
        None => " + ".to_owned(),
    }
}

fn table_title(grid: &Grid, view_data: &ViewData) -> String {
    let shown = view_data.data.len();
    let first = if shown == 0 { 0 } else { view_data.offset + 1 };
    let mut title = format!(
        "{} {first}-{} / {}",
        view_data.options.title,
        view_data.offset + shown,
        view_data.total_count
    );
    let dirty = grid.dirty_ids().len();
    if dirty > 0 {
        title.push_str(&format!(" | {dirty} unsaved"));
    }
    let selected = grid.selected_count();
    if selected > 0 {
        title.push_str(&format!(" | {selected} selected"));
    }
    title
}

fn status_text(grid: &Grid, view_data: &ViewData) -> String {
    let (mode, hints) = if grid.edit_cursor().is_some() {
        ("EDIT", "enter commit | esc cancel")
    } else {
        (
            "NAV",
            "hjkl move | s sort | space/a select | e edit | w save | d/D del | x action | o add | c create | y/p tsv | n/N page | r reload | q quit",
        )
    };
    match &view_data.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
}
