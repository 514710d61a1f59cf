// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use jpkr_grid::{
    CellValue, Collation, Column, DataChange, Grid, GridCommand, GridEvent, GridFeatures,
    HeaderCheck, Notice, Row, RowId, RowRef, SortConfig, SortDirection, export_tsv, import_tsv,
    sorted_view,
};
use jpkr_testkit::{MemoryClipboard, VocabFaker, sample_words, word_columns};
use std::collections::BTreeSet;

fn lemma_level() -> Vec<Column> {
    vec![Column::new("lemma", "lemma"), Column::new("level", "level")]
}

fn cat_and_dog() -> Vec<Row> {
    vec![
        Row::new().with("id", 1).with("lemma", "猫").with("level", "N5"),
        Row::new().with("id", 2).with("lemma", "犬").with("level", "N4"),
    ]
}

fn proposed_rows(events: &[GridEvent]) -> Option<Vec<Row>> {
    events.iter().find_map(|event| match event {
        GridEvent::DataChanged(rows) => Some(rows.clone()),
        _ => None,
    })
}

fn notices(events: &[GridEvent]) -> Vec<Notice> {
    events
        .iter()
        .filter_map(|event| match event {
            GridEvent::Notice(notice) => Some(notice.clone()),
            _ => None,
        })
        .collect()
}

fn ids(rows: &[&Row]) -> Vec<i64> {
    rows.iter()
        .filter_map(|row| row.id())
        .map(RowId::get)
        .collect()
}

#[test]
fn export_and_level_sort_of_two_words() -> Result<()> {
    let data = cat_and_dog();
    assert_eq!(export_tsv(&lemma_level(), &data), "lemma\tlevel\n猫\tN5\n犬\tN4");

    let mut grid = Grid::new(lemma_level(), GridFeatures::default())?;
    grid.dispatch(&data, GridCommand::ToggleSort("level".to_owned()));
    assert_eq!(ids(&grid.visible_rows(&data)), vec![2, 1]);
    assert_eq!(data, cat_and_dog());
    Ok(())
}

#[test]
fn paste_appends_valid_lines_and_drops_short_ones() -> Result<()> {
    let data = cat_and_dog();
    let mut grid = Grid::new(lemma_level(), GridFeatures::default())?;
    let mut clipboard = MemoryClipboard::with_text("狐\tN3\nextra");

    let events = grid.paste(&data, &mut clipboard);
    let rows = proposed_rows(&events).expect("paste should propose rows");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2], Row::new().with("lemma", "狐").with("level", "N3"));
    assert_eq!(rows[2].id(), None);
    assert_eq!(notices(&events), vec![Notice::RowsAdded(1)]);
    Ok(())
}

#[test]
fn toggle_all_after_selecting_both_rows_deselects_then_reselects() -> Result<()> {
    let data = cat_and_dog();
    let mut grid = Grid::new(lemma_level(), GridFeatures::default().with_delete())?;
    grid.dispatch(&data, GridCommand::ToggleRow(RowRef::Id(RowId::new(1))));
    grid.dispatch(&data, GridCommand::ToggleRow(RowRef::Id(RowId::new(2))));

    grid.dispatch(&data, GridCommand::ToggleAll);
    assert_eq!(grid.header_check(&data), HeaderCheck::Unchecked);
    assert_eq!(grid.selected_count(), 0);

    grid.dispatch(&data, GridCommand::ToggleAll);
    assert_eq!(grid.header_check(&data), HeaderCheck::Checked);
    assert_eq!(grid.selected_count(), 2);
    Ok(())
}

#[test]
fn sorting_is_idempotent_and_independent_of_input_order() -> Result<()> {
    let collation = Collation::korean()?;
    let mut faker = VocabFaker::new(17);
    let mut data = faker.words(40);
    // Mix numbers, numeric text, blanks and missing values into one column.
    data[3].set("level", 3);
    data[5].set("level", "12");
    data[8].set("level", "");
    data[9].remove("level");
    data[11].set("level", true);
    data[13].set("level", 2.5);

    for key in ["lemma", "kr_mean", "level", "num_examples", "has_embedding"] {
        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let config = SortConfig::by(key, direction);
            let once: Vec<Row> = sorted_view(&data, &config, &collation)
                .into_iter()
                .cloned()
                .collect();
            let twice: Vec<Row> = sorted_view(&once, &config, &collation)
                .into_iter()
                .cloned()
                .collect();
            assert_eq!(once, twice, "sort by {key} {direction:?} not idempotent");

            let mut reversed = data.clone();
            reversed.reverse();
            let from_reversed: Vec<String> = sorted_view(&reversed, &config, &collation)
                .into_iter()
                .map(|row| row.display(key))
                .collect();
            let values: Vec<String> = once.iter().map(|row| row.display(key)).collect();
            assert_eq!(values, from_reversed, "sort by {key} {direction:?} depends on input order");
        }
    }
    Ok(())
}

#[test]
fn numbers_sort_numerically_and_missing_values_sort_lowest() -> Result<()> {
    let collation = Collation::korean()?;
    let data = sample_words();
    let view = sorted_view(&data, &SortConfig::by("num_examples", SortDirection::Asc), &collation);
    assert_eq!(ids(&view), vec![2, 1, 3]);

    let view = sorted_view(&data, &SortConfig::by("num_examples", SortDirection::Desc), &collation);
    assert_eq!(ids(&view), vec![3, 1, 2]);
    Ok(())
}

#[test]
fn korean_meanings_sort_in_hangul_order() -> Result<()> {
    let collation = Collation::korean()?;
    let data = sample_words();
    let view = sorted_view(&data, &SortConfig::by("kr_mean", SortDirection::Asc), &collation);
    let meanings: Vec<String> = view.iter().map(|row| row.display("kr_mean")).collect();
    assert_eq!(meanings, vec!["개", "고양이", "나무"]);
    Ok(())
}

#[test]
fn export_then_import_reproduces_rows_without_ids() {
    let columns = vec![
        Column::new("lemma", "원형"),
        Column::new("kr_mean", "의미"),
        Column::new("level", "레벨"),
    ];
    let mut faker = VocabFaker::new(5);
    let mut rows: Vec<Row> = faker
        .words(12)
        .into_iter()
        .map(|word| {
            let mut row = Row::new();
            for column in &columns {
                row.set(&column.key, word.display(&column.key));
            }
            row
        })
        .collect();
    for position in [0, 5, rows.len()] {
        let mut blank = Row::new();
        for column in &columns {
            blank.set(&column.key, "");
        }
        rows.insert(position, blank);
    }

    let text = export_tsv(&columns, &rows);
    assert_eq!(import_tsv(&text, &columns), rows);
}

#[test]
fn added_blank_row_survives_copy_and_paste() -> Result<()> {
    let mut grid = Grid::new(lemma_level(), GridFeatures::default().with_copy())?;
    let added = proposed_rows(&grid.dispatch(&[], GridCommand::AddRow))
        .expect("add row should propose rows");

    let mut clipboard = MemoryClipboard::default();
    grid.copy(&added, &mut clipboard);
    assert_eq!(clipboard.content(), "lemma\tlevel\n\t");

    let pasted = proposed_rows(&grid.paste(&[], &mut clipboard)).expect("rows expected");
    assert_eq!(pasted, added);
    Ok(())
}

#[test]
fn dirty_set_tracks_exactly_the_committed_changes() -> Result<()> {
    let mut faker = VocabFaker::new(23);
    let mut data = faker.words(10);
    let mut grid = Grid::new(word_columns(), GridFeatures::default().with_update())?;
    let mut expected = BTreeSet::new();

    for step in 0..30 {
        let index = faker.int_n(data.len());
        let id = data[index].id().expect("faker rows carry ids");
        let row = RowRef::Id(id);
        grid.dispatch(
            &data,
            GridCommand::BeginEdit {
                row,
                column: "kr_mean".to_owned(),
            },
        );

        match faker.int_n(3) {
            0 => {
                grid.dispatch(&data, GridCommand::SetDraft(format!("뜻 {step}")));
                let before = data.clone();
                let events = grid.dispatch(&data, GridCommand::CancelEdit);
                assert!(proposed_rows(&events).is_none());
                assert_eq!(data, before);
            }
            1 => {
                // Committing the current text changes nothing.
                let events = grid.dispatch(&data, GridCommand::CommitEdit);
                assert!(proposed_rows(&events).is_none());
            }
            _ => {
                grid.dispatch(&data, GridCommand::SetDraft(format!("뜻 {step}")));
                let events = grid.dispatch(&data, GridCommand::CommitEdit);
                data = proposed_rows(&events).expect("changed draft should propose rows");
                grid.sync_data(&data, DataChange::SameResultSet);
                expected.insert(id);
            }
        }
        assert_eq!(grid.dirty_ids(), expected.iter().copied().collect::<Vec<_>>());
    }

    let events = grid.dispatch(&data, GridCommand::SaveChanges);
    let submitted = events
        .iter()
        .find_map(|event| match event {
            GridEvent::UpdateRequested(rows) => Some(rows.clone()),
            _ => None,
        })
        .unwrap_or_default();
    let submitted_ids: BTreeSet<RowId> = submitted.iter().filter_map(Row::id).collect();
    assert_eq!(submitted_ids, expected);
    assert!(grid.dirty_ids().is_empty());
    Ok(())
}

#[test]
fn denied_clipboard_reports_and_changes_nothing() -> Result<()> {
    let data = cat_and_dog();
    let mut grid = Grid::new(lemma_level(), GridFeatures::default().with_copy())?;
    let mut clipboard = MemoryClipboard::denied();

    let events = grid.paste(&data, &mut clipboard);
    assert_eq!(events, vec![GridEvent::Notice(Notice::ClipboardDenied)]);
    assert!(Notice::ClipboardDenied.message().contains("denied"));

    let events = grid.copy(&data, &mut clipboard);
    assert_eq!(events, vec![GridEvent::Notice(Notice::ClipboardDenied)]);
    Ok(())
}

#[test]
fn empty_and_malformed_pastes_are_notices() -> Result<()> {
    let data = cat_and_dog();
    let mut grid = Grid::new(lemma_level(), GridFeatures::default())?;

    let events = grid.paste(&data, &mut MemoryClipboard::with_text("  \n"));
    assert_eq!(notices(&events), vec![Notice::ClipboardEmpty]);

    let events = grid.paste(&data, &mut MemoryClipboard::with_text("one\ntwo\n"));
    assert_eq!(notices(&events), vec![Notice::InvalidTsv]);
    assert!(proposed_rows(&events).is_none());
    Ok(())
}

#[test]
fn copy_writes_the_sorted_view_with_a_header() -> Result<()> {
    let data = cat_and_dog();
    let mut grid = Grid::new(lemma_level(), GridFeatures::default().with_copy())?;
    grid.dispatch(&data, GridCommand::ToggleSort("level".to_owned()));
    let mut clipboard = MemoryClipboard::default();

    let events = grid.copy(&data, &mut clipboard);
    assert_eq!(notices(&events), vec![Notice::RowsCopied(2)]);
    assert_eq!(clipboard.content(), "lemma\tlevel\n犬\tN4\n猫\tN5");

    let events = grid.copy(&[], &mut clipboard);
    assert_eq!(notices(&events), vec![Notice::NothingToCopy]);
    assert_eq!(clipboard.writes().len(), 1);
    Ok(())
}

#[test]
fn copied_rows_paste_back_without_the_header() -> Result<()> {
    let data = cat_and_dog();
    let mut grid = Grid::new(lemma_level(), GridFeatures::default().with_copy())?;
    let mut clipboard = MemoryClipboard::default();
    grid.copy(&data, &mut clipboard);

    let rows = proposed_rows(&grid.paste(&data, &mut clipboard)).expect("rows expected");
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[2].get("lemma"), Some(&CellValue::text("猫")));
    assert_eq!(rows[2].id(), None);
    Ok(())
}

#[test]
fn pasted_rows_become_selectable_after_a_reload_assigns_ids() -> Result<()> {
    let data = cat_and_dog();
    let mut grid = Grid::new(lemma_level(), GridFeatures::default().with_delete())?;
    let pasted = proposed_rows(&grid.paste(&data, &mut MemoryClipboard::with_text("狐\tN3")))
        .expect("paste should propose rows");
    grid.sync_data(&pasted, DataChange::SameResultSet);

    let events = grid.dispatch(&pasted, GridCommand::ToggleRow(RowRef::Unsaved(2)));
    assert_eq!(notices(&events), vec![Notice::RowWithoutId]);
    grid.dispatch(&pasted, GridCommand::ToggleAll);
    assert_eq!(grid.selected_ids(&pasted).len(), 2);

    let mut reloaded = cat_and_dog();
    reloaded.push(Row::new().with("id", 3).with("lemma", "狐").with("level", "N3"));
    grid.sync_data(&reloaded, DataChange::NewResultSet);
    assert_eq!(grid.selected_count(), 0);

    grid.dispatch(&reloaded, GridCommand::ToggleRow(RowRef::Id(RowId::new(3))));
    assert_eq!(grid.selected_ids(&reloaded), vec![RowId::new(3)]);
    Ok(())
}

#[test]
fn header_check_follows_the_visible_rows() -> Result<()> {
    let data = sample_words();
    let mut grid = Grid::new(word_columns(), GridFeatures::default().with_action("임베딩 생성"))?;
    assert_eq!(grid.header_check(&data), HeaderCheck::Unchecked);

    grid.dispatch(&data, GridCommand::ToggleRow(RowRef::Id(RowId::new(1))));
    assert_eq!(grid.header_check(&data), HeaderCheck::Indeterminate);
    assert!(grid.can_act());
    assert!(!grid.can_delete());

    let events = grid.dispatch(&data, GridCommand::ActionSelected);
    assert_eq!(events[0], GridEvent::ActionRequested(vec![RowId::new(1)]));
    assert_eq!(
        notices(&events),
        vec![Notice::ActionSubmitted {
            label: "임베딩 생성".to_owned(),
            count: 1,
        }]
    );
    Ok(())
}
