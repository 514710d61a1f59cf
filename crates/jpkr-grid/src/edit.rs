// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ids::RowId;
use crate::model::{Column, Row, RowRef};

/// The single cell in edit mode and its uncommitted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditCursor {
    pub row: RowRef,
    pub column: String,
    pub draft: String,
}

impl EditCursor {
    pub fn targets(&self, row: RowRef, column: &str) -> bool {
        self.row == row && self.column == column
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Coerced value equals the stored one.
    Unchanged,
    Changed { rows: Vec<Row>, id: Option<RowId> },
    Rejected(String),
    /// The target row or column is gone from the current data.
    Stale,
}

/// Writes the draft into a copy of `data`. The edited row and the list are
/// both fresh values; `data` itself is untouched.
pub fn commit_draft(data: &[Row], columns: &[Column], cursor: &EditCursor) -> CommitOutcome {
    let Some(position) = cursor.row.position(data) else {
        return CommitOutcome::Stale;
    };
    let Some(column) = columns.iter().find(|column| column.key == cursor.column) else {
        return CommitOutcome::Stale;
    };

    let value = match column.kind.coerce(&cursor.draft) {
        Ok(value) => value,
        Err(error) => return CommitOutcome::Rejected(format!("{}: {error}", column.label)),
    };

    let current = &data[position];
    if current.get(&column.key) == value.as_ref() {
        return CommitOutcome::Unchanged;
    }

    let mut edited = current.clone();
    match value {
        Some(value) => edited.set(&column.key, value),
        None => {
            edited.remove(&column.key);
        }
    }

    let mut rows = data.to_vec();
    rows[position] = edited;
    CommitOutcome::Changed {
        rows,
        id: cursor.row.id(),
    }
}
