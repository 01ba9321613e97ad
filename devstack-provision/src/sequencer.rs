//! Bootstrap sequencer: runs the provisioning steps strictly in order
//!
//! A step starts only after the previous one completed successfully. The
//! first failure ends the run; the remaining steps are recorded as skipped.

use chrono::Utc;
use devstack_core::{ProvisionError, RunOutcome, RunReport, RunState, StepRecord, StepStatus};
use std::time::Instant;
use tracing::{error, info, Instrument};

use crate::context::RunContext;
use crate::reporter::ProgressEvent;
use crate::step::Step;

/// Terminal state of a run plus its serialisable report
#[derive(Debug)]
pub struct RunResult {
    pub state: RunState,
    pub report: RunReport,
}

impl RunResult {
    pub fn succeeded(&self) -> bool {
        matches!(self.state, RunState::Succeeded)
    }

    pub fn cancelled(&self) -> bool {
        self.report.cancelled
    }

    /// The error that stopped the run, if any
    pub fn error(&self) -> Option<&ProvisionError> {
        match self.state {
            RunState::Failed { ref reason, .. } => Some(reason),
            _ => None,
        }
    }
}

pub struct BootstrapSequencer {
    steps: Vec<Box<dyn Step>>,
}

impl BootstrapSequencer {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Box<dyn Step>] {
        &self.steps
    }

    pub async fn run(&self, ctx: &RunContext) -> RunResult {
        let total = self.steps.len();
        let started_at = Utc::now();
        let mut records = Vec::with_capacity(total);
        let mut state = RunState::Pending;

        info!(run_id = %ctx.run_id.as_uuid(), steps = total, "Provisioning run started");

        for (index, step) in self.steps.iter().enumerate() {
            state = RunState::Running { step_index: index };
            let name = step.name().to_string();
            let kind = step.kind();
            let step_started = Utc::now();
            let clock = Instant::now();

            ctx.report(ProgressEvent::StepStarted {
                index,
                total,
                name: name.clone(),
                kind,
            });

            let result = if ctx.is_cancelled() {
                Err(ProvisionError::Cancelled { stage: name.clone() })
            } else {
                let span = tracing::info_span!("step", index, name = %name, kind = %kind);
                step.run(ctx).instrument(span).await
            };
            let duration = clock.elapsed();

            match result {
                Ok(()) => {
                    records.push(StepRecord {
                        index,
                        name: name.clone(),
                        kind,
                        status: StepStatus::Succeeded,
                        started_at: Some(step_started),
                        duration_ms: Some(duration.as_millis() as u64),
                        error_code: None,
                        error: None,
                    });
                    ctx.report(ProgressEvent::StepDone {
                        index,
                        total,
                        name,
                        duration,
                    });
                }
                Err(reason) => {
                    let error_code = reason.error_code().to_string();
                    let message = reason.to_string();
                    error!(step = %name, index, error_code = %error_code, "Step failed: {}", message);

                    records.push(StepRecord {
                        index,
                        name: name.clone(),
                        kind,
                        status: StepStatus::Failed,
                        started_at: Some(step_started),
                        duration_ms: Some(duration.as_millis() as u64),
                        error_code: Some(error_code.clone()),
                        error: Some(message.clone()),
                    });
                    ctx.report(ProgressEvent::StepFailed {
                        index,
                        total,
                        name: name.clone(),
                        error_code,
                        message,
                    });

                    for (skipped_index, skipped) in self.steps.iter().enumerate().skip(index + 1) {
                        records.push(StepRecord::skipped(skipped_index, skipped.name(), skipped.kind()));
                    }

                    state = RunState::Failed {
                        step_index: index,
                        step_name: name,
                        reason,
                    };
                    break;
                }
            }
        }

        if !state.is_terminal() {
            state = RunState::Succeeded;
        }

        let (outcome, cancelled) = match state {
            RunState::Failed {
                step_index,
                ref step_name,
                ref reason,
            } => (
                RunOutcome::Failed {
                    step_index,
                    step: step_name.clone(),
                    error_code: reason.error_code().to_string(),
                    message: reason.to_string(),
                },
                reason.is_cancelled(),
            ),
            _ => (RunOutcome::Succeeded, false),
        };

        let report = RunReport {
            run_id: ctx.run_id,
            started_at,
            finished_at: Utc::now(),
            steps: records,
            outcome,
            cancelled,
        };

        info!(
            run_id = %ctx.run_id.as_uuid(),
            state = %state,
            completed = report.completed_steps().len(),
            "Provisioning run finished"
        );

        RunResult { state, report }
    }
}
