// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};
use std::fs::{self, OpenOptions};
use std::path::Path;

/// Routes the `log` facade to a file; the terminal belongs to the grid.
pub fn init(level: LevelFilter, path: &Path) -> Result<()> {
    if level == LevelFilter::Off {
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| {
            format!(
                "open log file {} -- set [log] file to a writable path",
                path.display()
            )
        })?;

    let config = ConfigBuilder::new()
        .add_filter_allow_str("jpkr")
        .build();
    WriteLogger::init(level, config, file).context("install logger")
}
