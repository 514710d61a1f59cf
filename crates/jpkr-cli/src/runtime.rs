// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use jpkr_api::{Client, Resource};
use jpkr_grid::{ClearPolicy, Column, GridFeatures, Row, RowId, export_tsv, import_tsv};
use jpkr_tui::{GridRuntime, LoadedPage};
use log::info;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Grid runtime backed by the remote vocabulary API.
pub struct ApiRuntime {
    client: Client,
}

impl ApiRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl GridRuntime for ApiRuntime {
    fn load_page(&mut self, limit: usize, offset: usize) -> Result<LoadedPage> {
        let page = self.client.list_page(limit, offset)?;
        Ok(LoadedPage {
            rows: page.items,
            total_count: page.total_count,
        })
    }

    fn create_rows(&mut self, rows: &[Row]) -> Result<()> {
        self.client.create_batch(rows)
    }

    fn update_rows(&mut self, rows: &[Row]) -> Result<()> {
        self.client.update_batch(rows)
    }

    fn delete_rows(&mut self, ids: &[RowId]) -> Result<()> {
        self.client.delete_batch(ids)
    }

    fn run_action(&mut self, ids: &[RowId]) -> Result<()> {
        self.client.gen_embeddings(ids)
    }
}

/// Controls offered for a resource table: every API batch route exists, so
/// every batch control is on.
pub fn grid_features(resource: Resource, policy: ClearPolicy) -> GridFeatures {
    GridFeatures::default()
        .with_update()
        .with_delete()
        .with_action(resource.action_label())
        .with_copy()
        .with_clear_policy(policy)
}

/// Writes the first page as TSV and returns how many rows it held.
pub fn export_page<R: GridRuntime, W: Write>(
    runtime: &mut R,
    columns: &[Column],
    page_size: usize,
    out: &mut W,
) -> Result<usize> {
    let page = runtime.load_page(page_size, 0)?;
    let text = export_tsv(columns, &page.rows);
    writeln!(out, "{text}").context("write TSV")?;
    out.flush().context("flush TSV")?;
    info!(
        "exported {} of {} rows",
        page.rows.len(),
        page.total_count
    );
    Ok(page.rows.len())
}

/// Creates one row per TSV line; a header line is skipped.
pub fn import_text<R: GridRuntime>(runtime: &mut R, columns: &[Column], text: &str) -> Result<usize> {
    let rows = import_tsv(text, columns);
    if rows.is_empty() {
        anyhow::bail!(
            "no rows to import; each line needs {} tab-separated fields",
            columns.len()
        );
    }
    runtime.create_rows(&rows)?;
    info!("imported {} rows", rows.len());
    Ok(rows.len())
}

/// Reads a TSV file and creates its rows.
pub fn import_file<R: GridRuntime>(runtime: &mut R, columns: &[Column], path: &Path) -> Result<usize> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read import file {}", path.display()))?;
    import_text(runtime, columns, &text).with_context(|| format!("import {}", path.display()))
}
