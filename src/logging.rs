//! Logging setup and frame notices
//!
//! All diagnostics go through the `log` facade; `env_logger` writes them to
//! stderr. `RUST_LOG` still wins over the defaults chosen here, so
//! `RUST_LOG=wlcheck=trace` works as usual.
//!
//! # Usage
//!
//! ```no_run
//! use wlcheck::logging::{self, FrameLog};
//!
//! logging::init(false);
//!
//! let mut frames = FrameLog::new(60);
//! if let Some(n) = frames.record() {
//!     log::info!("presented {} frames", n);
//! }
//! ```

/// Default filter when `--debug` is not given
pub const DEFAULT_FILTER: &str = "info";

/// Default filter with `--debug`
pub const DEBUG_FILTER: &str = "debug";

/// Filter string for the requested verbosity
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        DEBUG_FILTER
    } else {
        DEFAULT_FILTER
    }
}

/// Initialize the global logger.
///
/// Calling this twice is harmless; the second call is ignored, which keeps
/// tests that share a process from panicking.
pub fn init(debug: bool) {
    let env = env_logger::Env::default().default_filter_or(default_filter(debug));
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}

/// Counts presented frames and says when a periodic notice is due
#[derive(Debug, Clone)]
pub struct FrameLog {
    interval: u32,
    presented: u64,
}

impl FrameLog {
    /// `interval` of 0 never asks for a notice
    pub fn new(interval: u32) -> Self {
        Self {
            interval,
            presented: 0,
        }
    }

    /// Record one presented frame.
    ///
    /// Returns the running total when a notice is due: on the first frame
    /// and then every `interval` frames.
    pub fn record(&mut self) -> Option<u64> {
        self.presented += 1;
        if self.interval == 0 {
            return None;
        }
        if self.presented == 1 || self.presented % u64::from(self.interval) == 0 {
            Some(self.presented)
        } else {
            None
        }
    }

    /// Frames presented so far
    pub fn presented(&self) -> u64 {
        self.presented
    }
}
