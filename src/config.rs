//! Engine configuration loaded from TOML.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
const DEFAULT_SAVE_POLL_ATTEMPTS: u32 = 20;
const DEFAULT_SAVE_POLL_INTERVAL_MS: u64 = 250;
const DEFAULT_OPEN_PRACTICE_MINUTES: u32 = 30;
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Raw config file; every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct EngineConfigFile {
    /// Countdown tick period in milliseconds.
    pub tick_interval_ms: Option<u64>,
    /// How many times to poll the recorder for its artifact.
    pub save_poll_attempts: Option<u32>,
    /// Delay between recorder polls in milliseconds.
    pub save_poll_interval_ms: Option<u64>,
    /// Length of the single open-practice block.
    pub open_practice_minutes: Option<u32>,
    /// Buffered session events per subscriber.
    pub event_capacity: Option<usize>,
    /// Directory holding routines.json and sessions.json.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub tick_interval: Duration,
    pub save_poll_attempts: u32,
    pub save_poll_interval: Duration,
    pub open_practice_minutes: u32,
    pub event_capacity: usize,
    pub data_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfigFile::default().resolve()
    }
}

impl EngineConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        Self::parse(&raw).with_context(|| format!("parse config {:?}", path))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str::<EngineConfigFile>(raw)?)
    }

    pub fn resolve(self) -> EngineConfig {
        EngineConfig {
            tick_interval: Duration::from_millis(
                self.tick_interval_ms
                    .unwrap_or(DEFAULT_TICK_INTERVAL_MS)
                    .max(1),
            ),
            save_poll_attempts: self
                .save_poll_attempts
                .unwrap_or(DEFAULT_SAVE_POLL_ATTEMPTS)
                .max(1),
            save_poll_interval: Duration::from_millis(
                self.save_poll_interval_ms
                    .unwrap_or(DEFAULT_SAVE_POLL_INTERVAL_MS),
            ),
            open_practice_minutes: self
                .open_practice_minutes
                .unwrap_or(DEFAULT_OPEN_PRACTICE_MINUTES)
                .max(1),
            event_capacity: self
                .event_capacity
                .unwrap_or(DEFAULT_EVENT_CAPACITY)
                .max(1),
            data_dir: self.data_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineConfig, EngineConfigFile};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn empty_file_uses_defaults() {
        let config = EngineConfigFile::parse("").expect("parse").resolve();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.save_poll_attempts, 20);
        assert_eq!(config.open_practice_minutes, 30);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let raw = r#"
            tick_interval_ms = 500
            save_poll_attempts = 5
            save_poll_interval_ms = 100
            open_practice_minutes = 15
            data_dir = "/tmp/practice"
        "#;
        let config = EngineConfigFile::parse(raw).expect("parse").resolve();
        assert_eq!(config.tick_interval, Duration::from_millis(500));
        assert_eq!(config.save_poll_attempts, 5);
        assert_eq!(config.save_poll_interval, Duration::from_millis(100));
        assert_eq!(config.open_practice_minutes, 15);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/practice")));
    }

    #[test]
    fn zero_values_are_clamped() {
        let raw = "tick_interval_ms = 0\nsave_poll_attempts = 0\nopen_practice_minutes = 0";
        let config = EngineConfigFile::parse(raw).expect("parse").resolve();
        assert_eq!(config.tick_interval, Duration::from_millis(1));
        assert_eq!(config.save_poll_attempts, 1);
        assert_eq!(config.open_practice_minutes, 1);
    }

    #[test]
    fn malformed_file_is_rejected() {
        assert!(EngineConfigFile::parse("tick_interval_ms = \"fast\"").is_err());
    }
}
