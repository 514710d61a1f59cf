// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::ids::RowId;

/// Reserved field carrying the server-assigned identity.
pub const ID_KEY: &str = "id";

// Largest magnitude an f64 holds without losing integer precision.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_991.0;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn display(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Number(value) => format_number(*value),
            Self::Bool(value) => value.to_string(),
        }
    }

    /// Numeric reading used by sorting: numbers, and text that parses fully as one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) if value.is_finite() => Some(*value),
            Self::Number(_) | Self::Bool(_) => None,
            Self::Text(value) => parse_number(value),
        }
    }

    fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(value) => Some(Self::Bool(value)),
            serde_json::Value::Number(value) => value.as_f64().map(Self::Number),
            serde_json::Value::String(value) => Some(Self::Text(value)),
            nested => Some(Self::Text(nested.to_string())),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(value) => serializer.serialize_str(value),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Number(value) => match as_integer(*value) {
                Some(integer) => serializer.serialize_i64(integer),
                None => serializer.serialize_f64(*value),
            },
        }
    }
}

pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn as_integer(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER {
        Some(value as i64)
    } else {
        None
    }
}

fn format_number(value: f64) -> String {
    match as_integer(value) {
        Some(integer) => integer.to_string(),
        None => value.to_string(),
    }
}

/// A flat record keyed by column key.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Row {
    fields: BTreeMap<String, CellValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<CellValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<CellValue>) {
        self.fields.insert(key.to_owned(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<CellValue> {
        self.fields.remove(key)
    }

    pub fn display(&self, key: &str) -> String {
        self.get(key).map(CellValue::display).unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn id(&self) -> Option<RowId> {
        match self.get(ID_KEY)? {
            CellValue::Number(value) => as_integer(*value).map(RowId::new),
            CellValue::Text(value) => value.trim().parse::<i64>().ok().map(RowId::new),
            CellValue::Bool(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let fields = raw
            .into_iter()
            .filter_map(|(key, value)| CellValue::from_json(value).map(|value| (key, value)))
            .collect();
        Ok(Self { fields })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    #[default]
    Text,
    Number,
    Bool,
}

impl ColumnKind {
    /// Strict conversion of an edit draft. `Ok(None)` clears the field.
    pub fn coerce(self, draft: &str) -> Result<Option<CellValue>> {
        match self {
            Self::Text => Ok(Some(CellValue::Text(draft.to_owned()))),
            Self::Number => {
                let trimmed = draft.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                match parse_number(trimmed) {
                    Some(value) => Ok(Some(CellValue::Number(value))),
                    None => bail!("expected a number, got {trimmed:?}"),
                }
            }
            Self::Bool => {
                let trimmed = draft.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                match parse_bool(trimmed) {
                    Some(value) => Ok(Some(CellValue::Bool(value))),
                    None => bail!("expected true or false, got {trimmed:?}"),
                }
            }
        }
    }

    /// Lenient conversion of a pasted field: unparseable values stay text.
    pub fn import(self, field: &str) -> Option<CellValue> {
        match self {
            Self::Text => Some(CellValue::Text(field.to_owned())),
            Self::Number if field.is_empty() => None,
            Self::Number => Some(
                parse_number(field)
                    .map(CellValue::Number)
                    .unwrap_or_else(|| CellValue::text(field)),
            ),
            Self::Bool if field.is_empty() => None,
            Self::Bool => Some(
                parse_bool(field)
                    .map(CellValue::Bool)
                    .unwrap_or_else(|| CellValue::text(field)),
            ),
        }
    }

    pub fn empty_value(self) -> Option<CellValue> {
        match self {
            Self::Text => Some(CellValue::Text(String::new())),
            Self::Number | Self::Bool => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub key: String,
    pub label: String,
    #[serde(default = "default_editable")]
    pub editable: bool,
    #[serde(default)]
    pub kind: ColumnKind,
}

const fn default_editable() -> bool {
    true
}

impl Column {
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_owned(),
            label: label.to_owned(),
            editable: true,
            kind: ColumnKind::Text,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn with_kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Display-only sort preference; survives data swaps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortConfig {
    pub key: Option<String>,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn by(key: &str, direction: SortDirection) -> Self {
        Self {
            key: Some(key.to_owned()),
            direction,
        }
    }

    /// Header click: the active key flips asc to desc, anything else sorts ascending.
    pub fn toggle(&mut self, key: &str) {
        let direction = if self.key.as_deref() == Some(key) && self.direction == SortDirection::Asc
        {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        self.key = Some(key.to_owned());
        self.direction = direction;
    }
}

/// How a command addresses a row in the canonical list.
///
/// Rows carrying an id are addressed by it. Rows without one (pasted or
/// added locally, not yet created on the server) are addressed by their
/// canonical index, which is only meaningful until the next data sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowRef {
    Id(RowId),
    Unsaved(usize),
}

impl RowRef {
    pub fn for_row(index: usize, row: &Row) -> Self {
        match row.id() {
            Some(id) => Self::Id(id),
            None => Self::Unsaved(index),
        }
    }

    pub fn position(self, data: &[Row]) -> Option<usize> {
        match self {
            Self::Id(id) => data.iter().position(|row| row.id() == Some(id)),
            Self::Unsaved(index) => data
                .get(index)
                .filter(|row| row.id().is_none())
                .map(|_| index),
        }
    }

    pub const fn id(self) -> Option<RowId> {
        match self {
            Self::Id(id) => Some(id),
            Self::Unsaved(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CellValue, ColumnKind, Row, RowRef, SortConfig, SortDirection};
    use crate::RowId;

    #[test]
    fn row_id_reads_integral_numbers_and_digit_text() {
        assert_eq!(Row::new().with("id", 7).id(), Some(RowId::new(7)));
        assert_eq!(Row::new().with("id", "42").id(), Some(RowId::new(42)));
        assert_eq!(Row::new().with("id", 1.5).id(), None);
        assert_eq!(Row::new().with("id", "").id(), None);
        assert_eq!(Row::new().with("lemma", "猫").id(), None);
    }

    #[test]
    fn numbers_display_without_trailing_fraction() {
        assert_eq!(CellValue::from(3).display(), "3");
        assert_eq!(CellValue::from(2.5).display(), "2.5");
        assert_eq!(CellValue::from(true).display(), "true");
    }

    #[test]
    fn text_that_is_not_finite_is_not_numeric() {
        assert_eq!(CellValue::text("NaN").as_number(), None);
        assert_eq!(CellValue::text("inf").as_number(), None);
        assert_eq!(CellValue::text(" 12 ").as_number(), Some(12.0));
        assert_eq!(CellValue::text("").as_number(), None);
    }

    #[test]
    fn row_json_skips_nulls_and_keeps_integers_integral() -> anyhow::Result<()> {
        let row: Row = serde_json::from_str(
            r#"{"id":3,"lemma":"犬","level":null,"has_embedding":true,"tags":["a"]}"#,
        )?;
        assert_eq!(row.get("level"), None);
        assert_eq!(row.get("has_embedding"), Some(&CellValue::Bool(true)));
        assert_eq!(row.display("tags"), r#"["a"]"#);

        let encoded = serde_json::to_string(&row)?;
        assert!(encoded.contains(r#""id":3"#), "got {encoded}");
        Ok(())
    }

    #[test]
    fn number_coercion_rejects_garbage_and_clears_on_empty() -> anyhow::Result<()> {
        assert_eq!(
            ColumnKind::Number.coerce(" 4 ")?,
            Some(CellValue::Number(4.0))
        );
        assert_eq!(ColumnKind::Number.coerce("  ")?, None);
        let error = ColumnKind::Number
            .coerce("four")
            .expect_err("text is not a number");
        assert!(error.to_string().contains("expected a number"));
        Ok(())
    }

    #[test]
    fn lenient_import_keeps_unparseable_text() {
        assert_eq!(
            ColumnKind::Number.import("N5"),
            Some(CellValue::text("N5"))
        );
        assert_eq!(ColumnKind::Bool.import("yes"), Some(CellValue::Bool(true)));
        assert_eq!(ColumnKind::Number.import(""), None);
    }

    #[test]
    fn sort_toggle_flips_only_the_active_key() {
        let mut config = SortConfig::default();
        config.toggle("level");
        assert_eq!(config, SortConfig::by("level", SortDirection::Asc));
        config.toggle("level");
        assert_eq!(config, SortConfig::by("level", SortDirection::Desc));
        config.toggle("level");
        assert_eq!(config, SortConfig::by("level", SortDirection::Asc));
        config.toggle("level");
        config.toggle("lemma");
        assert_eq!(config, SortConfig::by("lemma", SortDirection::Asc));
    }

    #[test]
    fn unsaved_refs_do_not_resolve_to_rows_with_ids() {
        let data = vec![Row::new().with("id", 1), Row::new().with("lemma", "狐")];
        assert_eq!(RowRef::Unsaved(1).position(&data), Some(1));
        assert_eq!(RowRef::Unsaved(0).position(&data), None);
        assert_eq!(RowRef::Id(RowId::new(1)).position(&data), Some(0));
        assert_eq!(RowRef::for_row(1, &data[1]), RowRef::Unsaved(1));
    }
}
