// src/config.rs

use crate::logging::{PROJECT_NAME, data_dir};
use lazy_static::lazy_static;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

lazy_static! {
    pub static ref DEPTH_ENV: String = format!("{}_DEPTH", PROJECT_NAME.clone());
    pub static ref WORKERS_ENV: String = format!("{}_WORKERS", PROJECT_NAME.clone());
    pub static ref OUTPUT_DIR_ENV: String = format!("{}_OUTPUT_DIR", PROJECT_NAME.clone());
}

pub const DEFAULT_DEPTH: u32 = 2;
pub const DEFAULT_WORKERS: usize = 10;

/// Tunables for a scan session.
///
/// Every session gets its own copy; `start_scan` overrides `depth` from the
/// request before the session starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOptions {
    /// Crawl depth budget, at least 1.
    pub depth: u32,
    /// Size of the probe worker pool, at least 1.
    pub workers: usize,
    pub request_timeout: Duration,
    pub liveness_timeout: Duration,
    /// Fixed part of the delay applied before inspecting each crawled page.
    pub politeness_delay: Duration,
    /// Upper bound of the random extra delay added to `politeness_delay`.
    pub politeness_jitter: Duration,
    /// Scan artifacts are written to `<output_root>/<address>/`.
    pub output_root: PathBuf,
    pub event_capacity: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            workers: DEFAULT_WORKERS,
            request_timeout: Duration::from_secs(15),
            liveness_timeout: Duration::from_secs(5),
            politeness_delay: Duration::from_millis(300),
            politeness_jitter: Duration::from_millis(400),
            output_root: data_dir().join("recon_results"),
            event_capacity: 256,
        }
    }
}

impl ScanOptions {
    /// Defaults, overridden by `<CRATE>_DEPTH`, `<CRATE>_WORKERS` and
    /// `<CRATE>_OUTPUT_DIR` when they are set.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(depth) = read_env::<u32>(&DEPTH_ENV) {
            options.depth = depth;
        }
        if let Some(workers) = read_env::<usize>(&WORKERS_ENV) {
            options.workers = workers;
        }
        if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV.as_str()) {
            options.output_root = PathBuf::from(dir);
        }
        options
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.depth < 1 {
            return Err("crawl depth must be at least 1".to_string());
        }
        if self.workers < 1 {
            return Err("worker pool needs at least one worker".to_string());
        }
        if self.event_capacity < 1 {
            return Err("event channel capacity must be at least 1".to_string());
        }
        Ok(())
    }
}

fn read_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparsable environment override.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = ScanOptions::default();
        assert_eq!(options.depth, 2);
        assert_eq!(options.workers, 10);
        assert_eq!(options.request_timeout, Duration::from_secs(15));
        assert_eq!(options.liveness_timeout, Duration::from_secs(5));
        assert!(options.output_root.ends_with("recon_results"));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn zero_depth_or_workers_is_rejected() {
        let options = ScanOptions { depth: 0, ..ScanOptions::default() };
        assert!(options.validate().is_err());
        let options = ScanOptions { workers: 0, ..ScanOptions::default() };
        assert!(options.validate().is_err());
    }
}
