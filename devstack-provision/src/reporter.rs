//! Step-level progress reporting
//!
//! The sequencer emits a `start` and a `done` (or `failed`) marker per step;
//! the readiness prober adds one marker per attempt.

use colored::Colorize;
use devstack_core::StepKind;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

/// A progress marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    StepStarted {
        index: usize,
        total: usize,
        name: String,
        kind: StepKind,
    },
    StepDone {
        index: usize,
        total: usize,
        name: String,
        duration: Duration,
    },
    StepFailed {
        index: usize,
        total: usize,
        name: String,
        error_code: String,
        message: String,
    },
    ProbeAttempt {
        step: String,
        attempt: u32,
        elapsed: Duration,
        error: Option<String>,
    },
}

/// Receives progress markers as the run advances
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: &ProgressEvent);
}

/// Human-readable markers on stdout (or any writer)
pub struct ConsoleReporter {
    out: Mutex<Box<dyn Write + Send>>,
    color: bool,
}

impl ConsoleReporter {
    pub fn stdout(color: bool) -> Self {
        Self::with_writer(Box::new(std::io::stdout()), color)
    }

    pub fn with_writer(out: Box<dyn Write + Send>, color: bool) -> Self {
        Self {
            out: Mutex::new(out),
            color,
        }
    }

    fn render(&self, event: &ProgressEvent) -> String {
        match event {
            ProgressEvent::StepStarted { index, total, name, kind } => {
                let line = format!("==> [{}/{}] start {} ({})", index + 1, total, name, kind);
                if self.color {
                    line.cyan().bold().to_string()
                } else {
                    line
                }
            }
            ProgressEvent::StepDone {
                index,
                total,
                name,
                duration,
            } => {
                let line = format!("✅ [{}/{}] done {} ({:.1?})", index + 1, total, name, duration);
                if self.color {
                    line.green().to_string()
                } else {
                    line
                }
            }
            ProgressEvent::StepFailed {
                index,
                total,
                name,
                error_code,
                message,
            } => {
                let line = format!("❌ [{}/{}] failed {} [{}]: {}", index + 1, total, name, error_code, message);
                if self.color {
                    line.red().bold().to_string()
                } else {
                    line
                }
            }
            ProgressEvent::ProbeAttempt {
                attempt,
                elapsed,
                error,
                ..
            } => {
                let line = match error {
                    None => format!("    attempt {}: ready after {:.1?}", attempt, elapsed),
                    Some(error) => format!("    attempt {}: not ready ({})", attempt, error),
                };
                if self.color {
                    line.dimmed().to_string()
                } else {
                    line
                }
            }
        }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn report(&self, event: &ProgressEvent) {
        let line = self.render(event);
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{}", line);
            let _ = out.flush();
        }
    }
}

/// Markers as structured tracing events, for runs whose stdout is reserved
/// for machine-readable output
#[derive(Debug, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::StepStarted { index, total, name, kind } => {
                info!(step = %name, index, total, kind = %kind, "start");
            }
            ProgressEvent::StepDone {
                index, name, duration, ..
            } => {
                info!(step = %name, index, duration_ms = duration.as_millis() as u64, "done");
            }
            ProgressEvent::StepFailed {
                index,
                name,
                error_code,
                message,
                ..
            } => {
                warn!(step = %name, index, error_code = %error_code, "failed: {}", message);
            }
            ProgressEvent::ProbeAttempt {
                step, attempt, error, ..
            } => {
                info!(step = %step, attempt, ready = error.is_none(), "probe attempt");
            }
        }
    }
}

/// Keeps every marker in memory
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Names of the steps that reported `done`, in order
    pub fn done_markers(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::StepDone { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Names of the steps that reported `start`, in order
    pub fn start_markers(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::StepStarted { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn probe_attempts(&self, step: &str) -> u32 {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::ProbeAttempt { step: s, .. } if s == step))
            .count() as u32
    }
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, event: &ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
