//! Central Configuration Constants
//!
//! Single source of truth for engine-wide defaults.
//! Per-component tuning lives in `logic::config`.

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "AEGIS";

/// Prefix for every environment override read by `EngineConfig::from_env`
pub const ENV_PREFIX: &str = "AEGIS_";

/// Default sliding window for rate tracking (seconds)
pub const DEFAULT_RATE_WINDOW_SECS: f64 = 60.0;

/// Hard cap on entries held by the rate window, independent of time pruning
pub const DEFAULT_RATE_MAX_ENTRIES: usize = 10_000;

/// Detection ring buffer capacity
pub const DEFAULT_HISTORY_CAPACITY: usize = 1_000;

/// Recent event buffer capacity (used by the single-event anomaly check)
pub const DEFAULT_EVENT_BUFFER_CAPACITY: usize = 1_000;

/// Processor receive timeout, so shutdown is observed promptly (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Period of the profile TTL sweep, independent of traffic (milliseconds)
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 1_000;

/// Tolerance used when comparing accumulated float scores to thresholds
pub const SCORE_EPSILON: f64 = 1e-9;

/// Read a parsed value from `AEGIS_<key>`, falling back to `default`
pub fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(format!("{}{}", ENV_PREFIX, key))
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
