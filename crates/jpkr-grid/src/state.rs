// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use log::{debug, warn};
use std::collections::{BTreeSet, VecDeque};

use crate::clipboard::{Clipboard, ClipboardError};
use crate::edit::{CommitOutcome, EditCursor, commit_draft};
use crate::ids::RowId;
use crate::model::{Column, ID_KEY, Row, RowRef, SortConfig, SortDirection};
use crate::selection::{HeaderCheck, Selection};
use crate::sort::{Collation, sorted_order};
use crate::tsv::{export_tsv, import_tsv};

/// When dirty rows and selections covered by a batch are cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearPolicy {
    /// At dispatch; the parent reconciles failures by reloading.
    #[default]
    Optimistic,
    /// Only when the parent reports the batch succeeded.
    ConfirmThenClear,
}

impl ClearPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Optimistic => "optimistic",
            Self::ConfirmThenClear => "confirm",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "optimistic" => Some(Self::Optimistic),
            "confirm" => Some(Self::ConfirmThenClear),
            _ => None,
        }
    }
}

/// Which parent handlers and controls a table instance has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridFeatures {
    pub update: bool,
    pub delete: bool,
    pub action: Option<String>,
    pub cell_click: bool,
    pub add_row: bool,
    pub paste: bool,
    pub copy: bool,
    pub row_delete: bool,
    pub clear_policy: ClearPolicy,
}

impl Default for GridFeatures {
    fn default() -> Self {
        Self {
            update: false,
            delete: false,
            action: None,
            cell_click: false,
            add_row: true,
            paste: true,
            copy: false,
            row_delete: true,
            clear_policy: ClearPolicy::Optimistic,
        }
    }
}

impl GridFeatures {
    pub fn with_update(mut self) -> Self {
        self.update = true;
        self
    }

    pub fn with_delete(mut self) -> Self {
        self.delete = true;
        self
    }

    pub fn with_action(mut self, label: &str) -> Self {
        self.action = Some(label.to_owned());
        self
    }

    pub fn with_cell_click(mut self) -> Self {
        self.cell_click = true;
        self
    }

    pub fn with_copy(mut self) -> Self {
        self.copy = true;
        self
    }

    pub fn with_clear_policy(mut self, policy: ClearPolicy) -> Self {
        self.clear_policy = policy;
        self
    }

    pub fn selectable(&self) -> bool {
        self.delete || self.action.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Update,
    Delete,
    Action,
}

impl BatchKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Action => "action",
        }
    }
}

/// Signal from the parent describing a new `data` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataChange {
    /// Local edits to the same result set (an applied `DataChanged`).
    SameResultSet,
    /// A different page, filter or reload from the server.
    NewResultSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridCommand {
    ToggleSort(String),
    ToggleRow(RowRef),
    ToggleAll,
    BeginEdit { row: RowRef, column: String },
    SetDraft(String),
    CommitEdit,
    CancelEdit,
    SaveChanges,
    DeleteSelected,
    ActionSelected,
    DeleteRow(RowRef),
    AddRow,
    CellClick { row: RowRef, column: String },
    BatchSettled { kind: BatchKind, ok: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    DataChanged(Vec<Row>),
    UpdateRequested(Vec<Row>),
    DeleteRequested(Vec<RowId>),
    ActionRequested(Vec<RowId>),
    CellClicked { row: Row, column: String },
    SortChanged(SortConfig),
    SelectionChanged(usize),
    EditStarted { row: RowRef, column: String },
    EditClosed,
    Notice(Notice),
}

impl GridEvent {
    const fn name(&self) -> &'static str {
        match self {
            Self::DataChanged(_) => "data_changed",
            Self::UpdateRequested(_) => "update_requested",
            Self::DeleteRequested(_) => "delete_requested",
            Self::ActionRequested(_) => "action_requested",
            Self::CellClicked { .. } => "cell_clicked",
            Self::SortChanged(_) => "sort_changed",
            Self::SelectionChanged(_) => "selection_changed",
            Self::EditStarted { .. } => "edit_started",
            Self::EditClosed => "edit_closed",
            Self::Notice(_) => "notice",
        }
    }
}

/// User-facing messages. Validation and permission problems end here
/// instead of propagating as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Sorted {
        column: String,
        direction: SortDirection,
    },
    UnknownColumn(String),
    ColumnReadOnly(String),
    InvalidValue(String),
    Unavailable(&'static str),
    RowWithoutId,
    NoChanges,
    ChangesSubmitted(usize),
    NothingSelected,
    DeleteSubmitted(usize),
    ActionSubmitted {
        label: String,
        count: usize,
    },
    RowAdded,
    RowRemoved,
    RowsAdded(usize),
    ClipboardEmpty,
    InvalidTsv,
    ClipboardDenied,
    ClipboardUnavailable(String),
    NothingToCopy,
    RowsCopied(usize),
    BatchConfirmed(BatchKind),
    BatchFailed(BatchKind),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Self::Sorted { column, direction } => format!("sort {column} {}", direction.as_str()),
            Self::UnknownColumn(key) => format!("unknown column {key:?}"),
            Self::ColumnReadOnly(label) => format!("{label} is read-only"),
            Self::InvalidValue(reason) => reason.clone(),
            Self::Unavailable(what) => format!("{what} unavailable in this table"),
            Self::RowWithoutId => "row has no id yet; save and reload to select it".to_owned(),
            Self::NoChanges => "no changes to save".to_owned(),
            Self::ChangesSubmitted(count) => format!("{count} changes submitted"),
            Self::NothingSelected => "select rows first".to_owned(),
            Self::DeleteSubmitted(count) => format!("{count} rows queued for delete"),
            Self::ActionSubmitted { label, count } => format!("{label}: {count} rows"),
            Self::RowAdded => "row added".to_owned(),
            Self::RowRemoved => "row removed".to_owned(),
            Self::RowsAdded(count) => format!("{count} rows added"),
            Self::ClipboardEmpty => "clipboard has no text".to_owned(),
            Self::InvalidTsv => "not valid TSV; columns must be tab separated".to_owned(),
            Self::ClipboardDenied => {
                "clipboard access denied; allow it in system settings".to_owned()
            }
            Self::ClipboardUnavailable(reason) => format!("clipboard unavailable: {reason}"),
            Self::NothingToCopy => "nothing to copy".to_owned(),
            Self::RowsCopied(count) => format!("{count} rows copied as TSV"),
            Self::BatchConfirmed(kind) => format!("{} confirmed", kind.as_str()),
            Self::BatchFailed(kind) => format!("{} failed; reload to reconcile", kind.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingBatch {
    kind: BatchKind,
    ids: Vec<RowId>,
}

/// Editable data grid over a parent-owned row list.
///
/// The grid never holds the rows. Every command receives the parent's
/// current `data` and answers with events; changes to the rows are proposed
/// as `GridEvent::DataChanged` with a complete new list.
#[derive(Debug)]
pub struct Grid {
    columns: Vec<Column>,
    features: GridFeatures,
    collation: Collation,
    sort: SortConfig,
    selection: Selection,
    dirty: BTreeSet<RowId>,
    edit: Option<EditCursor>,
    pending: VecDeque<PendingBatch>,
}

impl Grid {
    pub fn new(columns: Vec<Column>, features: GridFeatures) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for column in &columns {
            if !seen.insert(column.key.as_str()) {
                bail!("duplicate column key {:?}; keys must be unique", column.key);
            }
        }

        Ok(Self {
            columns,
            features,
            collation: Collation::korean()?,
            sort: SortConfig::default(),
            selection: Selection::default(),
            dirty: BTreeSet::new(),
            edit: None,
            pending: VecDeque::new(),
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn features(&self) -> &GridFeatures {
        &self.features
    }

    pub fn sort_config(&self) -> &SortConfig {
        &self.sort
    }

    pub fn edit_cursor(&self) -> Option<&EditCursor> {
        self.edit.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut String> {
        self.edit.as_mut().map(|cursor| &mut cursor.draft)
    }

    pub fn is_selected(&self, id: RowId) -> bool {
        self.selection.contains(id)
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }

    pub fn selected_ids(&self, data: &[Row]) -> Vec<RowId> {
        self.selection.selected_ids(data)
    }

    pub fn is_dirty(&self, id: RowId) -> bool {
        self.dirty.contains(&id)
    }

    pub fn dirty_ids(&self) -> Vec<RowId> {
        self.dirty.iter().copied().collect()
    }

    pub fn pending_batches(&self) -> usize {
        self.pending.len()
    }

    pub fn can_save(&self) -> bool {
        self.features.update && !self.dirty.is_empty()
    }

    pub fn can_delete(&self) -> bool {
        self.features.delete && !self.selection.is_empty()
    }

    pub fn can_act(&self) -> bool {
        self.features.action.is_some() && !self.selection.is_empty()
    }

    pub fn header_check(&self, data: &[Row]) -> HeaderCheck {
        self.selection.header_check(&self.visible_ids(data))
    }

    pub fn sort_indicator(&self, key: &str) -> &'static str {
        if self.sort.key.as_deref() != Some(key) {
            return "↕";
        }
        match self.sort.direction {
            SortDirection::Asc => "↑",
            SortDirection::Desc => "↓",
        }
    }

    /// Canonical indices in display order.
    pub fn visible_order(&self, data: &[Row]) -> Vec<usize> {
        sorted_order(data, &self.sort, &self.collation)
    }

    pub fn visible_rows<'a>(&self, data: &'a [Row]) -> Vec<&'a Row> {
        self.visible_order(data)
            .into_iter()
            .map(|index| &data[index])
            .collect()
    }

    fn visible_ids(&self, data: &[Row]) -> Vec<RowId> {
        self.visible_rows(data)
            .into_iter()
            .filter_map(Row::id)
            .collect()
    }

    /// Tells the grid what the parent's new `data` represents.
    pub fn sync_data(&mut self, data: &[Row], change: DataChange) {
        match change {
            DataChange::NewResultSet => {
                self.selection.clear();
                self.dirty.clear();
                self.edit = None;
                self.pending.clear();
            }
            DataChange::SameResultSet => {
                self.selection.retain_present(data);
                let present: BTreeSet<RowId> = data.iter().filter_map(Row::id).collect();
                self.dirty.retain(|id| present.contains(id));
                let keep_edit = self.edit.as_ref().is_some_and(|cursor| {
                    matches!(cursor.row, RowRef::Id(_)) && cursor.row.position(data).is_some()
                });
                if !keep_edit {
                    self.edit = None;
                }
            }
        }
        debug!(
            "grid sync {change:?}: {} rows, {} selected, {} dirty",
            data.len(),
            self.selection.len(),
            self.dirty.len()
        );
    }

    pub fn dispatch(&mut self, data: &[Row], command: GridCommand) -> Vec<GridEvent> {
        debug!("grid command {command:?}");
        let events = match command {
            GridCommand::ToggleSort(key) => self.toggle_sort(&key),
            GridCommand::ToggleRow(row) => self.toggle_row(data, row),
            GridCommand::ToggleAll => self.toggle_all(data),
            GridCommand::BeginEdit { row, column } => self.begin_edit(data, row, &column),
            GridCommand::SetDraft(text) => {
                if let Some(cursor) = self.edit.as_mut() {
                    cursor.draft = text;
                }
                Vec::new()
            }
            GridCommand::CommitEdit => self.commit_edit(data),
            GridCommand::CancelEdit => self.cancel_edit(),
            GridCommand::SaveChanges => self.save_changes(data),
            GridCommand::DeleteSelected => self.submit_selection(data, BatchKind::Delete),
            GridCommand::ActionSelected => self.submit_selection(data, BatchKind::Action),
            GridCommand::DeleteRow(row) => self.delete_row(data, row),
            GridCommand::AddRow => self.add_row(data),
            GridCommand::CellClick { row, column } => self.cell_click(data, row, &column),
            GridCommand::BatchSettled { kind, ok } => self.settle(kind, ok),
        };
        for event in &events {
            debug!("grid event {}", event.name());
        }
        events
    }

    /// Appends pasted TSV rows. A denied or unreadable clipboard leaves
    /// everything as it was and reports a notice.
    pub fn paste<C: Clipboard + ?Sized>(&mut self, data: &[Row], clipboard: &mut C) -> Vec<GridEvent> {
        if !self.features.paste {
            return vec![GridEvent::Notice(Notice::Unavailable("paste"))];
        }

        let text = match clipboard.read_text() {
            Ok(text) => text,
            Err(error) => return vec![GridEvent::Notice(clipboard_notice(error))],
        };
        if text.trim().is_empty() {
            return vec![GridEvent::Notice(Notice::ClipboardEmpty)];
        }

        let imported = import_tsv(&text, &self.columns);
        if imported.is_empty() {
            return vec![GridEvent::Notice(Notice::InvalidTsv)];
        }

        let count = imported.len();
        let mut rows = data.to_vec();
        rows.extend(imported);
        vec![
            GridEvent::DataChanged(rows),
            GridEvent::Notice(Notice::RowsAdded(count)),
        ]
    }

    /// Writes the visible rows to the clipboard as TSV.
    pub fn copy<C: Clipboard + ?Sized>(&self, data: &[Row], clipboard: &mut C) -> Vec<GridEvent> {
        if !self.features.copy {
            return vec![GridEvent::Notice(Notice::Unavailable("copy"))];
        }
        if data.is_empty() {
            return vec![GridEvent::Notice(Notice::NothingToCopy)];
        }

        let text = export_tsv(&self.columns, self.visible_rows(data));
        match clipboard.write_text(&text) {
            Ok(()) => vec![GridEvent::Notice(Notice::RowsCopied(data.len()))],
            Err(error) => vec![GridEvent::Notice(clipboard_notice(error))],
        }
    }

    fn column(&self, key: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.key == key)
    }

    fn toggle_sort(&mut self, key: &str) -> Vec<GridEvent> {
        let Some(label) = self.column(key).map(|column| column.label.clone()) else {
            return vec![GridEvent::Notice(Notice::UnknownColumn(key.to_owned()))];
        };
        self.sort.toggle(key);
        vec![
            GridEvent::SortChanged(self.sort.clone()),
            GridEvent::Notice(Notice::Sorted {
                column: label,
                direction: self.sort.direction,
            }),
        ]
    }

    fn toggle_row(&mut self, data: &[Row], row: RowRef) -> Vec<GridEvent> {
        if !self.features.selectable() {
            return vec![GridEvent::Notice(Notice::Unavailable("selection"))];
        }
        let RowRef::Id(id) = row else {
            return vec![GridEvent::Notice(Notice::RowWithoutId)];
        };
        if row.position(data).is_none() {
            debug!("ignoring selection of row {id} missing from data");
            return Vec::new();
        }
        self.selection.toggle(id);
        vec![GridEvent::SelectionChanged(self.selection.len())]
    }

    fn toggle_all(&mut self, data: &[Row]) -> Vec<GridEvent> {
        if !self.features.selectable() {
            return vec![GridEvent::Notice(Notice::Unavailable("selection"))];
        }
        let visible = self.visible_ids(data);
        self.selection.toggle_all(&visible);
        vec![GridEvent::SelectionChanged(self.selection.len())]
    }

    fn begin_edit(&mut self, data: &[Row], row: RowRef, key: &str) -> Vec<GridEvent> {
        if self.features.cell_click {
            debug!("inline editing disabled; cell clicks go to the parent");
            return Vec::new();
        }
        let Some(column) = self.column(key) else {
            return vec![GridEvent::Notice(Notice::UnknownColumn(key.to_owned()))];
        };
        if !column.editable {
            return vec![GridEvent::Notice(Notice::ColumnReadOnly(column.label.clone()))];
        }
        let Some(position) = row.position(data) else {
            return Vec::new();
        };
        if self
            .edit
            .as_ref()
            .is_some_and(|cursor| cursor.targets(row, key))
        {
            return Vec::new();
        }

        if let Some(previous) = self.edit.take() {
            debug!(
                "discarding uncommitted edit of {:?}.{}",
                previous.row, previous.column
            );
        }
        self.edit = Some(EditCursor {
            row,
            column: key.to_owned(),
            draft: data[position].display(key),
        });
        vec![GridEvent::EditStarted {
            row,
            column: key.to_owned(),
        }]
    }

    fn commit_edit(&mut self, data: &[Row]) -> Vec<GridEvent> {
        let Some(cursor) = self.edit.take() else {
            return Vec::new();
        };
        match commit_draft(data, &self.columns, &cursor) {
            CommitOutcome::Unchanged | CommitOutcome::Stale => vec![GridEvent::EditClosed],
            CommitOutcome::Changed { rows, id } => {
                if let Some(id) = id {
                    self.dirty.insert(id);
                    // A newer edit stays dirty when the earlier save settles.
                    for batch in self
                        .pending
                        .iter_mut()
                        .filter(|batch| batch.kind == BatchKind::Update)
                    {
                        batch.ids.retain(|pending| *pending != id);
                    }
                }
                vec![GridEvent::DataChanged(rows), GridEvent::EditClosed]
            }
            CommitOutcome::Rejected(reason) => {
                warn!("rejected edit of {:?}.{}: {reason}", cursor.row, cursor.column);
                self.edit = Some(cursor);
                vec![GridEvent::Notice(Notice::InvalidValue(reason))]
            }
        }
    }

    fn cancel_edit(&mut self) -> Vec<GridEvent> {
        match self.edit.take() {
            Some(_) => vec![GridEvent::EditClosed],
            None => Vec::new(),
        }
    }

    fn save_changes(&mut self, data: &[Row]) -> Vec<GridEvent> {
        if !self.features.update {
            return vec![GridEvent::Notice(Notice::Unavailable("save"))];
        }
        let rows: Vec<Row> = data
            .iter()
            .filter(|row| row.id().is_some_and(|id| self.dirty.contains(&id)))
            .cloned()
            .collect();
        if rows.is_empty() {
            return vec![GridEvent::Notice(Notice::NoChanges)];
        }

        let ids: Vec<RowId> = rows.iter().filter_map(Row::id).collect();
        let count = rows.len();
        self.hold_or_clear(BatchKind::Update, ids);
        vec![
            GridEvent::UpdateRequested(rows),
            GridEvent::Notice(Notice::ChangesSubmitted(count)),
        ]
    }

    fn submit_selection(&mut self, data: &[Row], kind: BatchKind) -> Vec<GridEvent> {
        let (allowed, what) = match kind {
            BatchKind::Delete => (self.features.delete, "delete"),
            BatchKind::Action => (self.features.action.is_some(), "action"),
            BatchKind::Update => (false, "update"),
        };
        if !allowed {
            return vec![GridEvent::Notice(Notice::Unavailable(what))];
        }

        let ids = self.selection.selected_ids(data);
        if ids.is_empty() {
            return vec![GridEvent::Notice(Notice::NothingSelected)];
        }

        let count = ids.len();
        let (request, notice) = match kind {
            BatchKind::Action => (
                GridEvent::ActionRequested(ids.clone()),
                Notice::ActionSubmitted {
                    label: self.features.action.clone().unwrap_or_default(),
                    count,
                },
            ),
            _ => (
                GridEvent::DeleteRequested(ids.clone()),
                Notice::DeleteSubmitted(count),
            ),
        };
        self.hold_or_clear(kind, ids);
        vec![
            request,
            GridEvent::SelectionChanged(self.selection.len()),
            GridEvent::Notice(notice),
        ]
    }

    fn delete_row(&mut self, data: &[Row], row: RowRef) -> Vec<GridEvent> {
        if !self.features.row_delete {
            return vec![GridEvent::Notice(Notice::Unavailable("row delete"))];
        }
        let Some(position) = row.position(data) else {
            return Vec::new();
        };

        if let (true, Some(id)) = (self.features.delete, row.id()) {
            self.hold_or_clear(BatchKind::Delete, vec![id]);
            return vec![
                GridEvent::DeleteRequested(vec![id]),
                GridEvent::Notice(Notice::DeleteSubmitted(1)),
            ];
        }

        let mut rows = data.to_vec();
        rows.remove(position);
        if let Some(id) = row.id() {
            self.selection.remove_all(&[id]);
            self.dirty.remove(&id);
        }

        let mut events = vec![GridEvent::DataChanged(rows)];
        // Removing a row shifts every unsaved index after it.
        let drop_edit = self
            .edit
            .as_ref()
            .is_some_and(|cursor| cursor.row == row || matches!(cursor.row, RowRef::Unsaved(_)));
        if drop_edit {
            self.edit = None;
            events.push(GridEvent::EditClosed);
        }
        events.push(GridEvent::Notice(Notice::RowRemoved));
        events
    }

    fn add_row(&mut self, data: &[Row]) -> Vec<GridEvent> {
        if !self.features.add_row {
            return vec![GridEvent::Notice(Notice::Unavailable("add row"))];
        }
        let mut blank = Row::new();
        for column in self.columns.iter().filter(|column| column.key != ID_KEY) {
            if let Some(value) = column.kind.empty_value() {
                blank.set(&column.key, value);
            }
        }
        let mut rows = data.to_vec();
        rows.push(blank);
        vec![
            GridEvent::DataChanged(rows),
            GridEvent::Notice(Notice::RowAdded),
        ]
    }

    fn cell_click(&mut self, data: &[Row], row: RowRef, key: &str) -> Vec<GridEvent> {
        if !self.features.cell_click {
            return self.begin_edit(data, row, key);
        }
        let Some(position) = row.position(data) else {
            return Vec::new();
        };
        vec![GridEvent::CellClicked {
            row: data[position].clone(),
            column: key.to_owned(),
        }]
    }

    fn hold_or_clear(&mut self, kind: BatchKind, ids: Vec<RowId>) {
        match self.features.clear_policy {
            ClearPolicy::Optimistic => self.clear_batch(kind, &ids),
            ClearPolicy::ConfirmThenClear => self.pending.push_back(PendingBatch { kind, ids }),
        }
    }

    fn clear_batch(&mut self, kind: BatchKind, ids: &[RowId]) {
        match kind {
            BatchKind::Update => {
                for id in ids {
                    self.dirty.remove(id);
                }
            }
            BatchKind::Delete | BatchKind::Action => self.selection.remove_all(ids),
        }
    }

    fn settle(&mut self, kind: BatchKind, ok: bool) -> Vec<GridEvent> {
        let pending = self
            .pending
            .iter()
            .position(|batch| batch.kind == kind)
            .and_then(|index| self.pending.remove(index));

        if !ok {
            warn!("{} batch failed", kind.as_str());
            return vec![GridEvent::Notice(Notice::BatchFailed(kind))];
        }
        let Some(batch) = pending else {
            return Vec::new();
        };

        self.clear_batch(kind, &batch.ids);
        let mut events = Vec::new();
        if kind != BatchKind::Update {
            events.push(GridEvent::SelectionChanged(self.selection.len()));
        }
        events.push(GridEvent::Notice(Notice::BatchConfirmed(kind)));
        events
    }
}

fn clipboard_notice(error: ClipboardError) -> Notice {
    warn!("clipboard: {error}");
    match error {
        ClipboardError::Denied => Notice::ClipboardDenied,
        ClipboardError::Unavailable(reason) => Notice::ClipboardUnavailable(reason),
    }
}
