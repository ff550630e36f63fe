use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::models::window::DescriptorMode;
use crate::tracker::monitor::SourceKind;

pub const DEFAULT_POLL_MS: u64 = 100;
pub const DEFAULT_ACCEPT_MS: u64 = 300;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub mode: DescriptorMode,
    pub source: SourceKind,
    pub poll_interval: Duration,
    pub accept_time: Duration,
    pub ignore: Vec<String>,
    pub debug_logs: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: DescriptorMode::Full,
            source: SourceKind::Auto,
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            accept_time: Duration::from_millis(DEFAULT_ACCEPT_MS),
            ignore: Vec::new(),
            debug_logs: false,
        }
    }
}

impl Settings {
    /// Loads settings from the process environment, after reading `.env` from
    /// the working directory if there is one.
    pub fn new() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(mode) = Self::parse_var::<DescriptorMode>(&lookup, "ACTIVE_WINDOW_MODE")? {
            settings.mode = mode;
        }
        if let Some(source) = Self::parse_var::<SourceKind>(&lookup, "ACTIVE_WINDOW_SOURCE")? {
            settings.source = source;
        }
        if let Some(ms) = Self::parse_var::<u64>(&lookup, "ACTIVE_WINDOW_POLL_MS")? {
            settings.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = Self::parse_var::<u64>(&lookup, "ACTIVE_WINDOW_ACCEPT_MS")? {
            settings.accept_time = Duration::from_millis(ms);
        }
        if let Some(ignore) = lookup("ACTIVE_WINDOW_IGNORE") {
            settings.ignore = split_list(&ignore);
        }
        if let Some(debug) = Self::parse_var::<bool>(&lookup, "DEBUG_LOGS_ENABLED")? {
            settings.debug_logs = debug;
        }

        Ok(settings)
    }

    fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match lookup(key) {
            Some(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| anyhow::anyhow!("{}", e))
                .with_context(|| format!("Invalid value '{}' for {}", raw, key)),
            _ => Ok(None),
        }
    }
}

/// Splits a comma-separated list, dropping blank entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
