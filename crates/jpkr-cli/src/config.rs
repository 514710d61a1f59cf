// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use jpkr_api::{DEFAULT_BASE_URL, Resource};
use jpkr_grid::ClearPolicy;
use log::LevelFilter;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const APP_NAME: &str = "jpkr";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_PAGE_SIZE: i64 = 50;
const DEFAULT_LOG_LEVEL: &str = "info";
pub const LOG_ENV: &str = "JPKR_LOG";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub grid: GridSection,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            grid: GridSection::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
    pub resource: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
            resource: Some(Resource::Words.as_str().to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridSection {
    pub page_size: Option<i64>,
    pub clear_policy: Option<String>,
}

impl Default for GridSection {
    fn default() -> Self {
        Self {
            page_size: Some(DEFAULT_PAGE_SIZE),
            clear_policy: Some(ClearPolicy::Optimistic.as_str().to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("JPKR_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set JPKR_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and put values under [api], [grid], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.api.base_url
            && base_url.trim().is_empty()
        {
            bail!(
                "api.base_url in {} is empty; set it to the vocabulary API root, for example {}",
                path.display(),
                DEFAULT_BASE_URL
            );
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(resource) = &self.api.resource
            && Resource::parse(resource).is_none()
        {
            bail!(
                "api.resource in {} must be \"words\" or \"examples\", got {resource:?}",
                path.display()
            );
        }

        if let Some(page_size) = self.grid.page_size
            && page_size <= 0
        {
            bail!(
                "grid.page_size in {} must be positive, got {}",
                path.display(),
                page_size
            );
        }

        if let Some(policy) = &self.grid.clear_policy
            && ClearPolicy::parse(policy).is_none()
        {
            bail!(
                "grid.clear_policy in {} must be \"optimistic\" or \"confirm\", got {policy:?}",
                path.display()
            );
        }

        if let Some(level) = &self.log.level {
            parse_level(level)
                .with_context(|| format!("invalid log.level in {}", path.display()))?;
        }

        Ok(())
    }

    pub fn api_base_url(&self) -> &str {
        self.api
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn resource(&self) -> Resource {
        self.api
            .resource
            .as_deref()
            .and_then(Resource::parse)
            .unwrap_or_default()
    }

    pub fn page_size(&self) -> usize {
        let size = self.grid.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        usize::try_from(size).unwrap_or(1)
    }

    pub fn clear_policy(&self) -> ClearPolicy {
        self.grid
            .clear_policy
            .as_deref()
            .and_then(ClearPolicy::parse)
            .unwrap_or_default()
    }

    /// Level from `JPKR_LOG` when set, otherwise `[log] level`.
    pub fn log_level(&self) -> Result<LevelFilter> {
        match env::var(LOG_ENV) {
            Ok(level) if !level.trim().is_empty() => {
                parse_level(&level).with_context(|| format!("invalid {LOG_ENV}"))
            }
            _ => parse_level(self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)),
        }
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let cache_root = dirs::cache_dir().ok_or_else(|| {
            anyhow!("cannot resolve cache directory; set [log] file in the config")
        })?;
        Ok(cache_root.join(APP_NAME).join("jpkr.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# jpkr config\n# Place this file at: {}\n\nversion = 1\n\n[api]\nbase_url = \"{}\"\ntimeout = \"{}\"\n# words or examples\nresource = \"words\"\n\n[grid]\npage_size = {}\n# optimistic clears dirty rows and selections when a batch is sent;\n# confirm waits until the server accepted it\nclear_policy = \"optimistic\"\n\n[log]\n# off, error, warn, info, debug or trace; JPKR_LOG overrides\nlevel = \"{}\"\n# Optional. Default is the platform cache dir (for example ~/.cache/jpkr/jpkr.log)\n# file = \"/absolute/path/to/jpkr.log\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_PAGE_SIZE,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_level(raw: &str) -> Result<LevelFilter> {
    raw.trim().parse::<LevelFilter>().map_err(|_| {
        anyhow!("invalid log level {raw:?}; use one of: off, error, warn, info, debug, trace")
    })
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 10s)")
}
