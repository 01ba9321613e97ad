//! Run domain model: step kinds, the sequencer state machine and run reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ProvisionError;
use crate::types::ParseError;

/// Unique identifier for a provisioning run (newtype pattern for type safety)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Create a new random run ID
    pub fn new() -> Self {
        RunId(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of work a step performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Wait for a datastore to accept requests
    Probe,
    /// Apply bootstrap data to a datastore
    Seed,
    /// Start a dependent service
    Activate,
    /// Apply schema migrations
    Migrate,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Probe => "probe",
            StepKind::Seed => "seed",
            StepKind::Activate => "activate",
            StepKind::Migrate => "migrate",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StepKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "probe" => Ok(StepKind::Probe),
            "seed" => Ok(StepKind::Seed),
            "activate" => Ok(StepKind::Activate),
            "migrate" => Ok(StepKind::Migrate),
            _ => Err(ParseError::InvalidStepKind(s.to_string())),
        }
    }
}

/// Sequencer state machine.
///
/// `Pending → Running(i) → Succeeded | Failed(i, reason)`. The sequencer only
/// advances from `Running(i)` to `Running(i + 1)` when step `i` succeeds.
#[derive(Debug)]
pub enum RunState {
    Pending,
    Running { step_index: usize },
    Succeeded,
    Failed {
        step_index: usize,
        step_name: String,
        reason: ProvisionError,
    },
}

impl RunState {
    /// Check if the run is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed { .. })
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Pending => "pending",
            RunState::Running { .. } => "running",
            RunState::Succeeded => "succeeded",
            RunState::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Running { step_index } => write!(f, "running (step {})", step_index + 1),
            RunState::Failed {
                step_index,
                step_name,
                reason,
            } => write!(f, "failed at step {} '{}': {}", step_index + 1, step_name, reason),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Outcome of a single step in a run report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    /// Never started because an earlier step failed
    Skipped,
}

/// Record of one step of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub name: String,
    pub kind: StepKind,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub error_code: Option<String>,
    pub error: Option<String>,
}

impl StepRecord {
    /// Record for a step that never ran
    pub fn skipped(index: usize, name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            index,
            name: name.into(),
            kind,
            status: StepStatus::Skipped,
            started_at: None,
            duration_ms: None,
            error_code: None,
            error: None,
        }
    }
}

/// Terminal outcome of a run, in serialisable form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    Failed {
        step_index: usize,
        step: String,
        error_code: String,
        message: String,
    },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded)
    }
}

/// Summary of a finished provisioning run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepRecord>,
    pub outcome: RunOutcome,
    /// Set when the run stopped because of external cancellation
    #[serde(default)]
    pub cancelled: bool,
}

impl RunReport {
    /// Names of the steps that completed successfully, in order
    pub fn completed_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Succeeded)
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Total wall-clock duration of the run
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
