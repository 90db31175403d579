//! Clock and timing utilities for the capture loop.
//!
//! Every frame in a session is stamped relative to a monotonic epoch
//! recorded when the session starts. This module provides:
//! - Capturing the epoch
//! - Fixed-interval tick pacing with a drop-frame policy

use std::time::{Duration, Instant};

/// A recording clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment recording started).
#[derive(Debug, Clone)]
pub struct RecordingClock {
    /// The instant recording started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl RecordingClock {
    /// Create a new recording clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Get nanoseconds elapsed since recording start.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Get seconds elapsed since recording start.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at recording start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// Convert an elapsed nanosecond value to seconds.
    pub fn ns_to_secs(ns: u64) -> f64 {
        ns as f64 / 1_000_000_000.0
    }
}

/// Paces a loop that must fire once every `1 / target_fps` seconds.
///
/// The pacer never accumulates debt: a tick that overruns its interval is
/// followed immediately by the next one, and skipped time is not repaid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPacer {
    interval: Duration,
}

impl TickPacer {
    /// Create a pacer targeting the given rate. Returns `None` for 0 fps.
    pub fn from_fps(target_fps: u32) -> Option<Self> {
        if target_fps == 0 {
            return None;
        }
        Some(Self {
            interval: Duration::from_nanos(1_000_000_000 / target_fps as u64),
        })
    }

    /// Target interval between tick starts.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// How long to sleep after a tick whose work took `elapsed`.
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.interval.saturating_sub(elapsed)
    }

    /// Whether a tick's work consumed its whole interval.
    pub fn is_overrun(&self, elapsed: Duration) -> bool {
        elapsed >= self.interval
    }
}
