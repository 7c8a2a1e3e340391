//! Kikiwake Daemon - headless experiment runner
//!
//! This daemon drives one reaction-time session at a time, managing:
//! - The trial state machine (motor calibration + main trials)
//! - Audio cue/stimulus scheduling
//! - Remote result logging and CSV export
//! - IPC server for renderer clients
//!
//! Storage locations:
//! - Linux: ~/.local/share/kikiwake/
//! - Windows: %APPDATA%\kikiwake\
//! - MacOS: ~/Library/Application Support/kikiwake/
//!
//! Renderers connect over newline-delimited JSON, forward presses and menu
//! hits, and poll `GetState` for the sector primitives to draw.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use kikiwake::catalog::{load_catalog, Card};
use kikiwake::config::ExperimentConfig;
use kikiwake::export::{results_csv, SessionMeta};
use kikiwake::menu::{valid_initials, MenuEvent, SectorView};
use kikiwake::session::{Effect, Event, ExperimentSession, Phase};
use kikiwake::stats::SummaryStats;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{error, info, warn};

mod audio;
mod paths;
mod remote;

use audio::{cue_tail_offset, AudioSink, PlaySpan, SimulatedAudio};
use paths::AppPaths;
use remote::{LogEnvelope, RemoteLogger};

const CUE_CLIP: &str = "I-000B.ogg";

// ═══════════════════════════════════════════════════════════════════════════
// Protocol Messages
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum Request {
    GetState,
    BeginSession {
        participant_id: String,
        input_device: String,
        #[serde(default)]
        test_mode: bool,
    },
    StartMotor,
    /// A press from the renderer (key, click, or gamepad button edge).
    Press,
    StartMain,
    Menu {
        event: MenuEvent,
    },
    Resume,
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum Response {
    State(StateSnapshot),
    Success { message: String },
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateSnapshot {
    phase: Phase,
    /// Whether a press would currently mean anything; renderers use this to
    /// gate their gamepad polling.
    press_responsive: bool,
    participant_id: String,
    input_device: String,
    t_motor_ms: f64,
    motor_trial: u32,
    motor_trials_total: u32,
    deck_len: usize,
    current_index: usize,
    /// Kana the gojūon grid should enable.
    valid_initials: Vec<char>,
    /// Donut sectors of the open menu, empty outside `TrialChoosing`.
    sectors: Vec<SectorView>,
    results_recorded: usize,
    summary: Option<SummaryStats>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Driver
// ═══════════════════════════════════════════════════════════════════════════

/// Messages into the driver task. Requests come from IPC clients; internal
/// events come from timers/audio tasks spawned by earlier effects and carry
/// the epoch they were scheduled under.
enum DriverMsg {
    Request {
        req: Request,
        resp: oneshot::Sender<Response>,
    },
    Internal {
        epoch: u64,
        event: Event,
    },
}

struct Driver {
    cards: Vec<Card>,
    session: Option<ExperimentSession>,
    session_unix_secs: u64,
    /// Bumped whenever handling an event produced effects; internal events
    /// scheduled under an older epoch are stale and dropped.
    epoch: u64,
    start: Instant,
    exported: bool,
    sink: Arc<SimulatedAudio>,
    remote: RemoteLogger,
    paths: AppPaths,
    tx: mpsc::UnboundedSender<DriverMsg>,
}

impl Driver {
    fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    fn cue_path(&self) -> PathBuf {
        self.paths.audio_dir().join(CUE_CLIP)
    }

    fn snapshot(&self) -> StateSnapshot {
        match &self.session {
            Some(s) => StateSnapshot {
                phase: s.phase(),
                press_responsive: s.phase().accepts_press(),
                participant_id: s.participant_id().to_string(),
                input_device: s.input_device().to_string(),
                t_motor_ms: s.t_motor_ms(),
                motor_trial: s.current_motor_trial(),
                motor_trials_total: s.config().motor_trials,
                deck_len: s.deck().len(),
                current_index: s.current_index(),
                valid_initials: valid_initials(s.cards()),
                sectors: s.menu().map(|m| m.sectors()).unwrap_or_default(),
                results_recorded: s.results().len(),
                summary: s.summary().copied(),
            },
            None => StateSnapshot {
                phase: Phase::Idle,
                press_responsive: false,
                participant_id: String::new(),
                input_device: String::new(),
                t_motor_ms: 0.0,
                motor_trial: 0,
                motor_trials_total: 0,
                deck_len: 0,
                current_index: 0,
                valid_initials: valid_initials(&self.cards),
                sectors: Vec::new(),
                results_recorded: 0,
                summary: None,
            },
        }
    }

    fn begin_session(&mut self, participant_id: &str, input_device: &str, test_mode: bool) -> Response {
        if let Some(s) = &self.session {
            if s.phase() != Phase::Idle && s.phase() != Phase::Finished {
                return Response::Error {
                    message: "A session is already in progress".to_string(),
                };
            }
        }
        if participant_id.trim().is_empty() {
            return Response::Error {
                message: "Participant id must not be empty".to_string(),
            };
        }
        let config = if test_mode {
            ExperimentConfig::test_mode()
        } else {
            ExperimentConfig::full_run()
        };
        self.session = Some(ExperimentSession::new(
            config,
            self.cards.clone(),
            participant_id,
            input_device,
        ));
        self.session_unix_secs = unix_now_secs();
        self.exported = false;
        self.epoch += 1;
        info!(
            "Session started: participant={} device={} test_mode={}",
            participant_id, input_device, test_mode
        );
        Response::Success {
            message: "Session started".to_string(),
        }
    }

    /// Feed one event into the session and interpret the resulting effects.
    fn dispatch(&mut self, event: Event) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let effects = session.handle(event);
        if effects.is_empty() {
            return;
        }
        self.epoch += 1;
        for effect in effects {
            self.apply_effect(effect);
        }
    }

    fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::ScheduleBeep { delay_ms } => self.schedule_beep(delay_ms),
            Effect::BeginTrialAudio { trial } => self.begin_trial_audio(trial.stimulus_path),
            Effect::StopAudio => self.sink.stop(),
            Effect::OpenChoiceMenu { trial_index } => {
                info!("Choice menu open for trial {}", trial_index);
            }
            Effect::ShowBreak => {
                let idx = self.session.as_ref().map_or(0, |s| s.current_index());
                info!("Break after {} trials", idx);
            }
            Effect::Emit(record) => {
                let participant_id = self
                    .session
                    .as_ref()
                    .map_or_else(String::new, |s| s.participant_id().to_string());
                self.remote.log(LogEnvelope {
                    participant_id,
                    session_unix_secs: self.session_unix_secs,
                    record,
                });
            }
            Effect::Finished { stats } => {
                info!(
                    "Session finished: median={:.1}ms accuracy={:.1}% delta={:.1}ms",
                    stats.speed_median_ms, stats.accuracy_percent, stats.risk_delta_ms
                );
                if let Err(e) = self.export_results(&stats) {
                    error!("Result export failed: {}", e);
                }
            }
        }
    }

    fn schedule_beep(&self, delay_ms: f64) {
        let (freq, dur) = self.session.as_ref().map_or((440.0, 0.1), |s| {
            (s.config().beep_freq_hz, s.config().beep_duration_secs)
        });
        let sink = Arc::clone(&self.sink);
        let tx = self.tx.clone();
        let epoch = self.epoch;
        let start = self.start;
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(delay_ms as u64)).await;
            sink.beep(freq, dur);
            let t0_ms = start.elapsed().as_secs_f64() * 1000.0;
            let _ = tx.send(DriverMsg::Internal {
                epoch,
                event: Event::BeepSounded { t0_ms },
            });
        });
    }

    /// Play the cue tail, hold the silence gap, then start the stimulus.
    /// Completion (or failure) reports back as an internal event.
    fn begin_trial_audio(&self, stimulus_file: String) {
        let (playback_secs, silence_ms) = self.session.as_ref().map_or((2.0, 1000), |s| {
            (s.config().cue_playback_secs, s.config().cue_silence_ms)
        });
        let cue_path = self.cue_path();
        let stim_path = self.paths.audio_dir().join(&stimulus_file);
        let sink = Arc::clone(&self.sink);
        let tx = self.tx.clone();
        let epoch = self.epoch;
        let start = self.start;
        tokio::spawn(async move {
            let sequence = async {
                let cue_total = sink.duration_secs(&cue_path)?;
                let played = sink.start(
                    &cue_path,
                    PlaySpan {
                        offset_secs: cue_tail_offset(cue_total, playback_secs),
                        duration_secs: Some(playback_secs),
                    },
                )?;
                let cue_secs = played.duration_secs.unwrap_or(playback_secs);
                time::sleep(Duration::from_secs_f64(cue_secs)).await;
                time::sleep(Duration::from_millis(silence_ms)).await;
                sink.start(&stim_path, PlaySpan::full())?;
                Ok::<(), audio::AudioError>(())
            };
            let event = match sequence.await {
                Ok(()) => Event::StimulusStarted {
                    t0_ms: start.elapsed().as_secs_f64() * 1000.0,
                },
                Err(e) => {
                    warn!("Trial audio failed: {}", e);
                    Event::TrialAudioFailed {
                        message: e.to_string(),
                    }
                }
            };
            let _ = tx.send(DriverMsg::Internal { epoch, event });
        });
    }

    fn export_results(&mut self, stats: &SummaryStats) -> Result<(), String> {
        if self.exported {
            return Ok(());
        }
        let session = self.session.as_ref().ok_or("No session to export")?;
        let meta = SessionMeta::new(
            session.participant_id(),
            self.session_unix_secs,
            session.t_motor_ms(),
        );
        let csv = results_csv(&meta, stats, session.results());
        if csv.is_empty() {
            warn!("No results recorded; skipping export");
            return Ok(());
        }
        let path = self
            .paths
            .export_file(session.participant_id(), self.session_unix_secs);
        std::fs::write(&path, csv).map_err(|e| format!("Failed to write {:?}: {}", path, e))?;
        self.exported = true;
        info!("Results exported to {:?}", path);
        Ok(())
    }

    /// Cue audio must be present before trials can start; checking here turns
    /// a broken install into a clean error instead of a stalled first trial.
    fn check_cue_preload(&self) -> Result<(), String> {
        self.sink
            .duration_secs(&self.cue_path())
            .map(|_| ())
            .map_err(|e| format!("Cue audio unavailable: {}", e))
    }

    fn handle_request(&mut self, req: Request) -> Response {
        match req {
            Request::GetState => Response::State(self.snapshot()),
            Request::BeginSession {
                participant_id,
                input_device,
                test_mode,
            } => self.begin_session(&participant_id, &input_device, test_mode),
            Request::StartMotor => {
                self.dispatch(Event::StartMotorPhase);
                Response::Success {
                    message: "Motor calibration started".to_string(),
                }
            }
            Request::Press => {
                let Some(session) = self.session.as_ref() else {
                    return Response::Error {
                        message: "No active session".to_string(),
                    };
                };
                let device = session.input_device().to_string();
                let now_ms = self.now_ms();
                self.dispatch(Event::Press { now_ms, device });
                Response::Success {
                    message: "Press received".to_string(),
                }
            }
            Request::StartMain => {
                if let Err(message) = self.check_cue_preload() {
                    return Response::Error { message };
                }
                self.dispatch(Event::StartMainPhase);
                Response::Success {
                    message: "Main phase started".to_string(),
                }
            }
            Request::Menu { event } => {
                let now_ms = self.now_ms();
                self.dispatch(Event::Menu { now_ms, event });
                Response::State(self.snapshot())
            }
            Request::Resume => {
                self.dispatch(Event::ResumeFromBreak);
                Response::Success {
                    message: "Resumed".to_string(),
                }
            }
            Request::Shutdown => {
                info!("Shutdown requested");
                tokio::spawn(async {
                    // Give the response a moment to flush before exiting.
                    time::sleep(Duration::from_millis(50)).await;
                    std::process::exit(0);
                });
                Response::Success {
                    message: "Shutting down".to_string(),
                }
            }
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<DriverMsg>) {
        while let Some(msg) = rx.recv().await {
            match msg {
                DriverMsg::Request { req, resp } => {
                    let response = self.handle_request(req);
                    let _ = resp.send(response);
                }
                DriverMsg::Internal { epoch, event } => {
                    if epoch != self.epoch {
                        // A wait scheduled for a phase that already ended.
                        continue;
                    }
                    self.dispatch(event);
                }
            }
        }
    }
}

fn unix_now_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ═══════════════════════════════════════════════════════════════════════════
// Client Handler
// ═══════════════════════════════════════════════════════════════════════════

async fn handle_client(
    stream: TcpStream,
    driver_tx: mpsc::UnboundedSender<DriverMsg>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let request: Request = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                let resp = Response::Error {
                    message: format!("Invalid request: {}", e),
                };
                writer
                    .write_all(serde_json::to_string(&resp)?.as_bytes())
                    .await?;
                writer.write_all(b"\n").await?;
                continue;
            }
        };

        let (resp_tx, resp_rx) = oneshot::channel();
        if driver_tx
            .send(DriverMsg::Request {
                req: request,
                resp: resp_tx,
            })
            .is_err()
        {
            break;
        }
        let response = match resp_rx.await {
            Ok(r) => r,
            Err(_) => Response::Error {
                message: "Driver unavailable".to_string(),
            },
        };

        writer
            .write_all(serde_json::to_string(&response)?.as_bytes())
            .await?;
        writer.write_all(b"\n").await?;
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// Main
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Setup application paths
    let paths = AppPaths::new()?;
    info!("Data directory: {:?}", paths.data_dir());

    // A malformed or missing catalog is a fatal startup error.
    let cards = load_catalog(&paths.manifest_file(), &paths.kimariji_file())?;
    info!("Catalog loaded: {} cards", cards.len());

    let collector_addr = std::env::var("KIKIWAKE_COLLECTOR")
        .unwrap_or_else(|_| "127.0.0.1:9321".to_string());
    let remote = RemoteLogger::spawn(collector_addr);

    let (driver_tx, driver_rx) = mpsc::unbounded_channel();
    let driver = Driver {
        cards,
        session: None,
        session_unix_secs: 0,
        epoch: 0,
        start: Instant::now(),
        exported: false,
        sink: Arc::new(SimulatedAudio::new()),
        remote,
        paths,
        tx: driver_tx.clone(),
    };
    tokio::spawn(driver.run(driver_rx));

    // Start IPC server
    let listener = TcpListener::bind("127.0.0.1:9320").await?;
    info!("Kikiwake daemon listening on 127.0.0.1:9320");

    // Accept client connections
    loop {
        let (stream, addr) = listener.accept().await?;
        info!("Client connected: {}", addr);
        let tx = driver_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, tx).await {
                error!("Client handler error: {}", e);
            }
        });
    }
}
