//! Audio playback boundary.
//!
//! The session core never touches sound directly; the driver talks to an
//! [`AudioSink`] and feeds completion events back. The default sink simulates
//! playback with timed sleeps so the daemon runs headless (CI, remote
//! sessions); a hardware-backed sink plugs in behind the same trait.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio clip not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read audio clip {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Playback parameters for one clip: start `offset_secs` in, play for
/// `duration_secs` (or to the end when `None`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaySpan {
    pub offset_secs: f64,
    pub duration_secs: Option<f64>,
}

impl PlaySpan {
    pub fn full() -> Self {
        Self {
            offset_secs: 0.0,
            duration_secs: None,
        }
    }
}

/// Where in the cue clip playback of its tail begins.
pub fn cue_tail_offset(total_secs: f64, playback_secs: f64) -> f64 {
    (total_secs - playback_secs).max(0.0)
}

pub trait AudioSink: Send + Sync {
    /// Total length of the clip, checked without playing it. Errors here are
    /// how missing stimulus files surface before a trial starts.
    fn duration_secs(&self, path: &Path) -> Result<f64, AudioError>;

    /// Begin playback; returns the span that will actually play. Playback
    /// runs until [`AudioSink::stop`] or the span elapses.
    fn start(&self, path: &Path, span: PlaySpan) -> Result<PlaySpan, AudioError>;

    fn stop(&self);

    /// Short sine beep for the motor-calibration phase.
    fn beep(&self, freq_hz: f64, duration_secs: f64);
}

/// Sink that verifies files exist and otherwise only logs. Durations are
/// estimated from file size, which is close enough for cue-tail math on the
/// constant-bitrate clips the experiment ships.
pub struct SimulatedAudio {
    /// Assumed encode rate for the duration estimate.
    bytes_per_sec: f64,
}

impl SimulatedAudio {
    pub fn new() -> Self {
        Self {
            bytes_per_sec: 16_000.0,
        }
    }
}

impl Default for SimulatedAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for SimulatedAudio {
    fn duration_secs(&self, path: &Path) -> Result<f64, AudioError> {
        let meta = std::fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AudioError::NotFound(path.to_path_buf())
            } else {
                AudioError::Read {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        Ok(meta.len() as f64 / self.bytes_per_sec)
    }

    fn start(&self, path: &Path, span: PlaySpan) -> Result<PlaySpan, AudioError> {
        // Existence check keeps simulated runs honest about broken catalogs.
        let total = self.duration_secs(path)?;
        let remaining = (total - span.offset_secs).max(0.0);
        let playing = span.duration_secs.map_or(remaining, |d| d.min(remaining));
        debug!(?path, offset = span.offset_secs, secs = playing, "simulated playback");
        Ok(PlaySpan {
            offset_secs: span.offset_secs,
            duration_secs: Some(playing),
        })
    }

    fn stop(&self) {
        debug!("simulated playback stopped");
    }

    fn beep(&self, freq_hz: f64, duration_secs: f64) {
        debug!(freq_hz, duration_secs, "simulated beep");
    }
}
