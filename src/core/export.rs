//! CSV rendering of session results.
//!
//! Each row is a completed trial flattened together with session metadata and
//! the end-of-session summary, so a single file is self-describing without a
//! sidecar. Fields containing a comma are double-quoted; everything else is
//! written bare.

use crate::session::TrialResult;
use crate::stats::SummaryStats;
use serde::{Deserialize, Serialize};

/// Session-level fields repeated on every exported row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub participant_id: String,
    /// Unix seconds at session start; pairs with the export filename.
    pub session_unix_secs: u64,
    pub app_version: String,
    pub t_motor_ms: f64,
}

impl SessionMeta {
    pub fn new(participant_id: &str, session_unix_secs: u64, t_motor_ms: f64) -> Self {
        Self {
            participant_id: participant_id.to_string(),
            session_unix_secs,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            t_motor_ms,
        }
    }
}

const HEADER: &str = "participant_id,session_unix_secs,app_version,t_motor_ms,\
speed_median_ms,accuracy_percent,risk_delta_ms,\
trial_index,stimulus_card_id,repetition,seed,\
press_time_ms,prime_time_ms,input_device,choice_card_id,is_correct,answer_time_ms";

fn field(value: &str) -> String {
    if value.contains(',') {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

/// Render all results as CSV. An empty result set renders as the empty
/// string, not a lone header row.
pub fn results_csv(meta: &SessionMeta, stats: &SummaryStats, results: &[TrialResult]) -> String {
    if results.is_empty() {
        return String::new();
    }
    let mut rows = Vec::with_capacity(results.len() + 1);
    rows.push(HEADER.to_string());
    for r in results {
        let cols = [
            field(&meta.participant_id),
            meta.session_unix_secs.to_string(),
            field(&meta.app_version),
            meta.t_motor_ms.to_string(),
            stats.speed_median_ms.to_string(),
            stats.accuracy_percent.to_string(),
            stats.risk_delta_ms.to_string(),
            r.trial_index.to_string(),
            r.stimulus_card_id.to_string(),
            r.repetition.to_string(),
            r.seed.to_string(),
            r.press_time_ms.to_string(),
            r.prime_time_ms.to_string(),
            field(&r.input_device),
            r.choice_card_id.map(|id| id.to_string()).unwrap_or_default(),
            r.is_correct.to_string(),
            r.answer_time_ms.to_string(),
        ];
        rows.push(cols.join(","));
    }
    rows.join("\n")
}
