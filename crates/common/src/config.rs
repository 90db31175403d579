//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FramesnapError, FramesnapResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Recording defaults.
    pub recording: RecordingDefaults,

    /// Playback pacing.
    pub playback: PlaybackDefaults,

    /// Frame export defaults.
    pub export: ExportDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default recording parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingDefaults {
    /// Target capture rate in frames per second.
    pub fps: u32,

    /// Seconds to count down before the first tick. 0 disables the countdown.
    pub countdown_secs: u32,

    /// Optional cap on buffered frames.
    pub max_frames: Option<usize>,

    /// A dragged selection must exceed this many pixels on both axes.
    pub min_region_size: u32,
}

/// Playback pacing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackDefaults {
    /// Presented frames per second at 1x speed.
    pub base_fps: u32,

    /// Lower bound on the presentation tick interval.
    pub min_tick_ms: u64,

    /// Speed multiplier applied when a review starts.
    pub default_speed: f64,
}

/// Frame export defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Stride used by "every Nth frame" sampling.
    pub stride: usize,

    /// Directory exported PNGs are written to.
    pub output_dir: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "framesnap=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for RecordingDefaults {
    fn default() -> Self {
        Self {
            fps: 5,
            countdown_secs: 3,
            max_frames: None,
            min_region_size: 20,
        }
    }
}

impl Default for PlaybackDefaults {
    fn default() -> Self {
        Self {
            base_fps: 10,
            min_tick_ms: 16,
            default_speed: 1.0,
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            stride: 5,
            output_dir: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from a JSON file, falling back to defaults.
    ///
    /// A missing or unparsable file is logged and ignored; the result is
    /// still validated so out-of-range values are reported.
    pub fn load_from(path: &Path) -> FramesnapResult<Self> {
        let config = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, e);
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values no session could run with.
    pub fn validate(&self) -> FramesnapResult<()> {
        if self.recording.fps == 0 {
            return Err(FramesnapError::configuration(
                "recording.fps must be a positive integer",
            ));
        }
        if self.recording.max_frames == Some(0) {
            return Err(FramesnapError::configuration(
                "recording.max_frames must be positive when set",
            ));
        }
        if self.playback.base_fps == 0 {
            return Err(FramesnapError::configuration(
                "playback.base_fps must be a positive integer",
            ));
        }
        if self.playback.min_tick_ms == 0 {
            return Err(FramesnapError::configuration(
                "playback.min_tick_ms must be at least 1",
            ));
        }
        if !(self.playback.default_speed.is_finite() && self.playback.default_speed > 0.0) {
            return Err(FramesnapError::configuration(format!(
                "playback.default_speed must be positive, got {}",
                self.playback.default_speed
            )));
        }
        if self.export.stride == 0 {
            return Err(FramesnapError::configuration(
                "export.stride must be at least 1",
            ));
        }
        Ok(())
    }
}
