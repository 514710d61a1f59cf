// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::ids::RowId;
use crate::model::Row;

/// Tri-state of the header checkbox over the visible rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderCheck {
    Checked,
    Indeterminate,
    Unchecked,
}

/// Checked rows, by id only. Rows without an id cannot be selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<RowId>,
}

impl Selection {
    /// Flips one id; returns whether it is selected afterwards.
    pub fn toggle(&mut self, id: RowId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    /// Selects every visible id unless all are already selected, in which
    /// case exactly the visible ids are deselected. Selections outside the
    /// view are left alone.
    pub fn toggle_all(&mut self, visible: &[RowId]) {
        if visible.is_empty() {
            return;
        }
        if self.all_selected(visible) {
            for id in visible {
                self.ids.remove(id);
            }
        } else {
            self.ids.extend(visible.iter().copied());
        }
    }

    pub fn header_check(&self, visible: &[RowId]) -> HeaderCheck {
        let selected = visible.iter().filter(|id| self.ids.contains(*id)).count();
        if selected == 0 {
            HeaderCheck::Unchecked
        } else if selected == visible.len() {
            HeaderCheck::Checked
        } else {
            HeaderCheck::Indeterminate
        }
    }

    pub fn contains(&self, id: RowId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn remove_all(&mut self, ids: &[RowId]) {
        for id in ids {
            self.ids.remove(id);
        }
    }

    /// Batch payload: selected ids present in `data`, in canonical order.
    pub fn selected_ids(&self, data: &[Row]) -> Vec<RowId> {
        data.iter()
            .filter_map(Row::id)
            .filter(|id| self.ids.contains(id))
            .collect()
    }

    /// Drops ids that no longer reference a row in `data`.
    pub fn retain_present(&mut self, data: &[Row]) {
        let present: BTreeSet<RowId> = data.iter().filter_map(Row::id).collect();
        self.ids.retain(|id| present.contains(id));
    }

    fn all_selected(&self, visible: &[RowId]) -> bool {
        visible.iter().all(|id| self.ids.contains(id))
    }
}

#[cfg(test)]
mod tests {
    use super::{HeaderCheck, Selection};
    use crate::{Row, RowId};

    fn ids(values: &[i64]) -> Vec<RowId> {
        values.iter().copied().map(RowId::new).collect()
    }

    #[test]
    fn toggle_all_twice_restores_a_fully_selected_view() {
        let mut selection = Selection::default();
        selection.toggle(RowId::new(1));
        selection.toggle(RowId::new(2));

        selection.toggle_all(&ids(&[1, 2]));
        assert!(selection.is_empty());

        selection.toggle_all(&ids(&[1, 2]));
        assert_eq!(selection.header_check(&ids(&[1, 2])), HeaderCheck::Checked);
    }

    #[test]
    fn toggle_all_preserves_selection_outside_the_view() {
        let mut selection = Selection::default();
        selection.toggle(RowId::new(9));

        selection.toggle_all(&ids(&[1, 2]));
        assert!(selection.contains(RowId::new(9)));
        assert_eq!(selection.len(), 3);

        selection.toggle_all(&ids(&[1, 2]));
        assert!(selection.contains(RowId::new(9)));
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn partial_view_selection_is_indeterminate_and_toggle_all_fills_it() {
        let mut selection = Selection::default();
        selection.toggle(RowId::new(2));
        let visible = ids(&[1, 2, 3]);
        assert_eq!(selection.header_check(&visible), HeaderCheck::Indeterminate);

        selection.toggle_all(&visible);
        assert_eq!(selection.header_check(&visible), HeaderCheck::Checked);
        assert_eq!(selection.header_check(&[]), HeaderCheck::Unchecked);
    }

    #[test]
    fn payload_follows_canonical_order_and_skips_stale_ids() {
        let mut selection = Selection::default();
        selection.toggle(RowId::new(3));
        selection.toggle(RowId::new(1));
        selection.toggle(RowId::new(8));
        let data = vec![
            Row::new().with("id", 3),
            Row::new().with("id", 2),
            Row::new().with("id", 1),
        ];
        assert_eq!(selection.selected_ids(&data), ids(&[3, 1]));

        selection.retain_present(&data);
        assert!(!selection.contains(RowId::new(8)));
    }
}
