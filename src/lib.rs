//! # kikiwake
//!
//! Trial orchestration for a human-subject reaction-time experiment: a motor
//! calibration phase followed by a deck of audio-stimulus trials answered
//! through a hierarchical radial (donut) choice menu.
//!
//! Everything in this crate is deterministic and I/O-free. Audio playback,
//! rendering, remote logging and file export are collaborator boundaries owned
//! by the `kikiwaked` runner; this library only decides *what* happens and
//! *when*, driven by discrete events.
//!
//! ## Quick Start
//!
//! ```
//! use kikiwake::prelude::*;
//!
//! let cards = vec![
//!     Card { id: 1, label: "1".into(), kimariji: "あき".into(), audio_path: "I-001A.ogg".into() },
//!     Card { id: 2, label: "2".into(), kimariji: "はるの".into(), audio_path: "I-002A.ogg".into() },
//! ];
//!
//! let mut config = ExperimentConfig::test_mode();
//! config.motor_trials = 1;
//! config.test_category_ids = None;
//! config.session_seed = Some(7);
//!
//! let mut session = ExperimentSession::new(config, cards, "p01", "keyboard");
//! let effects = session.handle(Event::StartMotorPhase);
//! assert!(matches!(effects[0], Effect::ScheduleBeep { .. }));
//! ```
//!
//! ## Modules
//!
//! - [`rng`]: seeded generator, Fisher–Yates shuffle, FNV-1a string hash
//! - [`catalog`]: card catalog loading (manifest + kimariji join)
//! - [`deck`]: trial deck expansion and shuffling
//! - [`menu`]: choice hierarchy, radial layout engine, menu reducer
//! - [`session`]: the trial state machine
//! - [`stats`]: median and end-of-session summary statistics
//! - [`export`]: CSV rendering of results plus session metadata

#[path = "core/rng.rs"]
pub mod rng;

#[path = "core/config.rs"]
pub mod config;

#[path = "core/catalog.rs"]
pub mod catalog;

#[path = "core/deck.rs"]
pub mod deck;

#[path = "core/stats.rs"]
pub mod stats;

#[path = "core/session.rs"]
pub mod session;

#[path = "core/export.rs"]
pub mod export;

pub mod menu;

/// Prelude module for convenient imports.
///
/// ```
/// use kikiwake::prelude::*;
/// ```
pub mod prelude {
    pub use crate::catalog::Card;
    pub use crate::config::ExperimentConfig;
    pub use crate::deck::Trial;
    pub use crate::menu::{MenuController, MenuEvent, MenuItem, MenuOutcome, SectorView};
    pub use crate::rng::SeededRng;
    pub use crate::session::{
        Effect, Event, ExperimentSession, LogRecord, MotorRecord, Phase, TrialResult,
    };
    pub use crate::stats::SummaryStats;
}
