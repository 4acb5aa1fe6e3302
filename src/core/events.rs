// src/core/events.rs

use crate::core::models::{Finding, ReconResult, SessionOutcome, SessionState};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use strum::Display;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Payload shared by `scan_complete` and `scan_cancelled`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<IpAddr>,
    pub vulnerabilities: Vec<Finding>,
    pub recon_results: ReconResult,
}

impl From<&SessionOutcome> for ScanSummary {
    fn from(outcome: &SessionOutcome) -> Self {
        Self {
            target: outcome.target.clone(),
            address: outcome.address,
            vulnerabilities: outcome.findings.clone(),
            recon_results: ReconResult {
                script_output: outcome.recon.script_proof(),
                ..outcome.recon.clone()
            },
        }
    }
}

/// Everything a session tells its observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    Log { message: String, level: LogLevel },
    Stage { state: SessionState },
    VulnerabilityFound(Finding),
    ScanComplete(ScanSummary),
    ScanCancelled(ScanSummary),
}

/// An event stamped with the session that produced it.
///
/// A superseded session keeps talking until it reaches its next checkpoint;
/// observers use the id to tell its events apart from the current session's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub session_id: u64,
    #[serde(flatten)]
    pub event: ScanEvent,
}

/// Sending half of the bounded event channel.
///
/// Cloned into every stage and worker. Sends wait for capacity, so a slow
/// observer slows the session down instead of losing events.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<SessionEvent>,
    session_id: u64,
    closed_reported: Arc<AtomicBool>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<SessionEvent>) -> Self {
        Self { tx, session_id: 0, closed_reported: Arc::new(AtomicBool::new(false)) }
    }

    /// A sink plus its receiving end.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Same channel, stamping events with `session_id`.
    pub fn for_session(&self, session_id: u64) -> Self {
        Self { tx: self.tx.clone(), session_id, closed_reported: Arc::clone(&self.closed_reported) }
    }

    pub async fn emit(&self, event: ScanEvent) {
        let stamped = SessionEvent { session_id: self.session_id, event };
        if self.tx.send(stamped).await.is_err() && !self.closed_reported.swap(true, Ordering::Relaxed) {
            warn!("Event observer has gone away; further events are dropped.");
        }
    }

    /// Emits a `log` event and mirrors it into the tracing log.
    pub async fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => debug!(%message, "scan log"),
            LogLevel::Success => info!(%message, "scan log"),
            LogLevel::Warning => warn!(%message, "scan log"),
            LogLevel::Error => error!(%message, "scan log"),
        }
        self.emit(ScanEvent::Log { message, level }).await;
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message).await;
    }

    pub async fn success(&self, message: impl Into<String>) {
        self.log(LogLevel::Success, message).await;
    }

    pub async fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message).await;
    }
}
