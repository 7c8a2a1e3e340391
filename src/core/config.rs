//! Experiment configuration.
//!
//! Two presets mirror the two ways a session is run: the full study and a
//! short test mode used to verify the apparatus.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Number of simple-reaction calibration trials.
    pub motor_trials: u32,
    /// Repetitions of each eligible card in the main deck.
    pub main_repetitions: u32,
    /// Full-run eligibility: cards with `id <= total_categories`.
    pub total_categories: u32,
    /// Test-mode eligibility: explicit allow-list. Takes precedence over
    /// `total_categories` when set.
    #[serde(default)]
    pub test_category_ids: Option<Vec<u32>>,
    /// A break screen is shown every this many completed trials.
    pub break_interval: u32,
    /// Seconds of the cue sound's tail played before each stimulus.
    pub cue_playback_secs: f64,
    /// Silence between cue tail and stimulus onset.
    pub cue_silence_ms: u64,
    pub beep_freq_hz: f64,
    pub beep_duration_secs: f64,
    /// Random pre-beep delay range for motor trials.
    pub min_wait_ms: f64,
    pub max_wait_ms: f64,
    /// Acknowledgement pause after a motor press before the next delay starts.
    pub motor_ack_ms: f64,
    /// Fixed seed for the session-random stream (deck order, motor delays).
    /// `None` derives one from the clock at session start. Per-trial menu
    /// seeds are unaffected; those are always a pure function of trial identity.
    #[serde(default)]
    pub session_seed: Option<u32>,
}

impl ExperimentConfig {
    pub fn full_run() -> Self {
        Self {
            motor_trials: 30,
            main_repetitions: 6,
            total_categories: 100,
            test_category_ids: None,
            break_interval: 50,
            cue_playback_secs: 2.0,
            cue_silence_ms: 1000,
            beep_freq_hz: 440.0,
            beep_duration_secs: 0.1,
            min_wait_ms: 800.0,
            max_wait_ms: 1600.0,
            motor_ack_ms: 500.0,
            session_seed: None,
        }
    }

    pub fn test_mode() -> Self {
        Self {
            motor_trials: 3,
            main_repetitions: 5,
            test_category_ids: Some(vec![1, 5, 10, 25, 50]),
            break_interval: 2,
            min_wait_ms: 100.0,
            max_wait_ms: 200.0,
            ..Self::full_run()
        }
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self::full_run()
    }
}
