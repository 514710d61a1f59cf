// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use icu_collator::{Collator, CollatorOptions};
use icu_locid::locale;
use std::cmp::Ordering;

use crate::model::{CellValue, Row, SortConfig, SortDirection};

/// Korean collation for mixed Korean, Japanese and Latin text.
pub struct Collation {
    collator: Collator,
}

impl Collation {
    pub fn korean() -> Result<Self> {
        let collator = Collator::try_new(&locale!("ko").into(), CollatorOptions::new())
            .map_err(|error| anyhow!("load Korean collation data: {error}"))?;
        Ok(Self { collator })
    }

    pub fn compare(&self, left: &str, right: &str) -> Ordering {
        self.collator.compare(left, right)
    }
}

impl std::fmt::Debug for Collation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Collation(ko)")
    }
}

// Missing and blank values rank lowest, then numbers, then text. Ranking the
// classes keeps the comparator transitive when a column mixes both.
enum SortKey {
    Missing,
    Number(f64),
    Text(String),
}

impl SortKey {
    fn of(value: Option<&CellValue>) -> Self {
        let Some(value) = value else {
            return Self::Missing;
        };
        if let Some(number) = value.as_number() {
            return Self::Number(number);
        }
        let text = value.display();
        if text.trim().is_empty() {
            Self::Missing
        } else {
            Self::Text(text)
        }
    }

    fn compare(&self, other: &Self, collation: &Collation) -> Ordering {
        match (self, other) {
            (Self::Missing, Self::Missing) => Ordering::Equal,
            (Self::Missing, _) => Ordering::Less,
            (_, Self::Missing) => Ordering::Greater,
            (Self::Number(left), Self::Number(right)) => left.total_cmp(right),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
            (Self::Text(left), Self::Text(right)) => collation.compare(left, right),
        }
    }
}

/// Canonical indices in display order. The canonical list is never reordered.
pub fn sorted_order(data: &[Row], config: &SortConfig, collation: &Collation) -> Vec<usize> {
    let mut order: Vec<usize> = (0..data.len()).collect();
    let Some(key) = config.key.as_deref() else {
        return order;
    };

    let keys: Vec<SortKey> = data.iter().map(|row| SortKey::of(row.get(key))).collect();
    order.sort_by(|left, right| {
        let ordering = keys[*left].compare(&keys[*right], collation);
        match config.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    order
}

pub fn sorted_view<'a>(data: &'a [Row], config: &SortConfig, collation: &Collation) -> Vec<&'a Row> {
    sorted_order(data, config, collation)
        .into_iter()
        .map(|index| &data[index])
        .collect()
}
