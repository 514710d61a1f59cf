// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Tab-separated text for spreadsheet copy and paste.
//!
//! Fields are neither quoted nor escaped: an embedded tab or newline in a
//! value splits it on the way back in. Spreadsheets paste exactly this shape.

use log::debug;

use crate::model::{Column, ID_KEY, Row};

const FIELD_SEPARATOR: &str = "\t";
const LINE_SEPARATOR: &str = "\n";

/// Header line of labels, then one line per row; missing values are empty.
pub fn export_tsv<'a>(columns: &[Column], rows: impl IntoIterator<Item = &'a Row>) -> String {
    let header = columns
        .iter()
        .map(|column| column.label.as_str())
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR);

    let mut lines = vec![header];
    lines.extend(rows.into_iter().map(|row| {
        columns
            .iter()
            .map(|column| row.display(&column.key))
            .collect::<Vec<_>>()
            .join(FIELD_SEPARATOR)
    }));
    lines.join(LINE_SEPARATOR)
}

/// Parses pasted text into new rows.
///
/// A line becomes a row when it has at least one field per column; extra
/// fields are ignored and shorter lines are dropped. A leading line equal to
/// the column labels is treated as a header. Imported rows never carry an
/// `id`: the server assigns one when they are created.
pub fn import_tsv(text: &str, columns: &[Column]) -> Vec<Row> {
    if columns.is_empty() || text.is_empty() {
        return Vec::new();
    }

    // A trailing newline ends the last line; it does not start an empty one.
    let body = text.strip_suffix(LINE_SEPARATOR).unwrap_or(text);
    let mut rows = Vec::new();
    let mut dropped = 0usize;
    let mut first = true;
    for line in body.split(LINE_SEPARATOR) {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();
        if std::mem::take(&mut first) && is_header(&fields, columns) {
            continue;
        }
        if fields.len() < columns.len() {
            dropped += 1;
            continue;
        }
        rows.push(row_from_fields(&fields, columns));
    }

    if dropped > 0 {
        debug!("tsv import dropped {dropped} short lines");
    }
    rows
}

fn is_header(fields: &[&str], columns: &[Column]) -> bool {
    fields.len() >= columns.len()
        && columns
            .iter()
            .zip(fields)
            .all(|(column, field)| column.label == *field)
}

fn row_from_fields(fields: &[&str], columns: &[Column]) -> Row {
    let mut row = Row::new();
    for (column, field) in columns.iter().zip(fields) {
        if column.key == ID_KEY {
            continue;
        }
        if let Some(value) = column.kind.import(field) {
            row.set(&column.key, value);
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::{export_tsv, import_tsv};
    use crate::{Column, ColumnKind, Row};

    fn columns() -> Vec<Column> {
        vec![Column::new("lemma", "lemma"), Column::new("level", "level")]
    }

    #[test]
    fn export_writes_labels_then_rows() {
        let rows = vec![
            Row::new().with("id", 1).with("lemma", "猫").with("level", "N5"),
            Row::new().with("id", 2).with("lemma", "犬").with("level", "N4"),
        ];
        assert_eq!(export_tsv(&columns(), &rows), "lemma\tlevel\n猫\tN5\n犬\tN4");
    }

    #[test]
    fn export_leaves_missing_values_empty() {
        let rows = vec![Row::new().with("level", "N1")];
        assert_eq!(export_tsv(&columns(), &rows), "lemma\tlevel\n\tN1");
    }

    #[test]
    fn import_drops_short_lines_and_extra_fields() {
        let rows = import_tsv("狐\tN3\nextra", &columns());
        assert_eq!(
            rows,
            vec![Row::new().with("lemma", "狐").with("level", "N3")]
        );

        let rows = import_tsv("鳥\tN2\tignored\n", &columns());
        assert_eq!(rows, vec![Row::new().with("lemma", "鳥").with("level", "N2")]);
    }

    #[test]
    fn import_trims_fields_and_windows_line_endings() {
        let rows = import_tsv(" 狐 \tN3\r\n", &columns());
        assert_eq!(rows, vec![Row::new().with("lemma", "狐").with("level", "N3")]);
    }

    #[test]
    fn import_skips_a_header_line_and_never_assigns_ids() {
        let columns = vec![
            Column::new("id", "ID").read_only().with_kind(ColumnKind::Number),
            Column::new("lemma", "Lemma"),
        ];
        let rows = import_tsv("ID\tLemma\n12\t猫", &columns);
        assert_eq!(rows, vec![Row::new().with("lemma", "猫")]);
        assert_eq!(rows[0].id(), None);
    }

    #[test]
    fn blank_rows_survive_export_and_import() {
        let rows = vec![
            Row::new().with("lemma", "").with("level", ""),
            Row::new().with("lemma", "猫").with("level", "N5"),
        ];
        let text = export_tsv(&columns(), &rows);
        assert_eq!(text, "lemma\tlevel\n\t\n猫\tN5");
        assert_eq!(import_tsv(&text, &columns()), rows);
    }

    #[test]
    fn single_column_empty_lines_are_rows() {
        let columns = vec![Column::new("lemma", "Lemma")];
        let rows = import_tsv("猫\n\n犬\n", &columns);
        assert_eq!(
            rows,
            vec![
                Row::new().with("lemma", "猫"),
                Row::new().with("lemma", ""),
                Row::new().with("lemma", "犬"),
            ]
        );
        assert!(import_tsv("", &columns).is_empty());
    }

    #[test]
    fn short_blank_lines_are_still_dropped() {
        let rows = import_tsv("狐\tN3\n\n\r\n鳥\tN2\r\n", &columns());
        assert_eq!(rows.len(), 2);
    }
}
