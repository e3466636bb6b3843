//! # Global harness configuration.
//!
//! [`FracConfig`] collects the tunables shared by the local backend: the
//! graceful-kill escalation window, the default poll interval for events
//! that fall back to polling, the non-blocking drain window used around
//! suspension, and the chunk size for the stdin feeder.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use frac::FracConfig;
//!
//! let mut cfg = FracConfig::default();
//! cfg.kill_grace = Duration::from_millis(500);
//! cfg.poll_interval = Duration::from_millis(10);
//!
//! assert_eq!(cfg.poll_interval, Duration::from_millis(10));
//! ```

use std::time::Duration;

/// Configuration for the local process backend and event defaults.
#[derive(Clone, Debug)]
pub struct FracConfig {
    /// Maximum time to wait for a terminated process to exit before escalating to SIGKILL.
    pub kill_grace: Duration,
    /// Default interval for events on the polling fallback path.
    pub poll_interval: Duration,
    /// Per-read window for the best-effort stdout drain around suspension.
    pub drain_window: Duration,
    /// Chunk size the stdin feeder reads from the input source.
    pub feed_chunk: usize,
}

impl Default for FracConfig {
    /// Provides a default configuration:
    /// - `kill_grace = 1s`
    /// - `poll_interval = 50ms`
    /// - `drain_window = 100ms`
    /// - `feed_chunk = 8192`
    fn default() -> Self {
        Self {
            kill_grace: Duration::from_secs(1),
            poll_interval: Duration::from_millis(50),
            drain_window: Duration::from_millis(100),
            feed_chunk: 8192,
        }
    }
}
