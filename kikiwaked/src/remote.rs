//! Fire-and-forget remote result logging.
//!
//! Records stream to a collector over newline-delimited JSON. Logging must
//! never stall or fail a session: sends go through an unbounded channel to a
//! background task, connect lazily, and on any network error the record is
//! dropped with a warning. The CSV export is the durable copy.

use kikiwake::session::LogRecord;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// One wire record: session key plus the typed payload, flattened so the
/// collector sees a single flat JSON object.
#[derive(Debug, Clone, Serialize)]
pub struct LogEnvelope {
    pub participant_id: String,
    pub session_unix_secs: u64,
    #[serde(flatten)]
    pub record: LogRecord,
}

#[derive(Debug, Clone)]
pub struct RemoteLogger {
    tx: mpsc::UnboundedSender<LogEnvelope>,
}

impl RemoteLogger {
    /// Start the background sender. `addr` is host:port of the collector.
    pub fn spawn(addr: String) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(sender_task(addr, rx));
        Self { tx }
    }

    /// Queue a record. Never blocks; if the sender task is gone the record
    /// is silently dropped.
    pub fn log(&self, envelope: LogEnvelope) {
        let _ = self.tx.send(envelope);
    }
}

async fn sender_task(addr: String, mut rx: mpsc::UnboundedReceiver<LogEnvelope>) {
    let mut stream: Option<TcpStream> = None;

    while let Some(envelope) = rx.recv().await {
        let line = match serde_json::to_string(&envelope) {
            Ok(s) => s,
            Err(e) => {
                warn!("Could not encode log record: {}", e);
                continue;
            }
        };

        if stream.is_none() {
            match TcpStream::connect(&addr).await {
                Ok(s) => {
                    info!("Connected to log collector at {}", addr);
                    stream = Some(s);
                }
                Err(e) => {
                    warn!("Log collector unreachable ({}): record dropped", e);
                    continue;
                }
            }
        }

        // One failed write drops the record and the connection; the next
        // record reconnects.
        if let Some(s) = stream.as_mut() {
            let send = async {
                s.write_all(line.as_bytes()).await?;
                s.write_all(b"\n").await
            };
            if let Err(e) = send.await {
                warn!("Log send failed ({}): record dropped", e);
                stream = None;
            }
        }
    }
}
