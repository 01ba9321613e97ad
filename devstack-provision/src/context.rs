//! Per-run state handed to every step

use devstack_config::DevstackConfig;
use devstack_core::RunId;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::reporter::{ProgressEvent, ProgressReporter};

/// Everything a step may consult while running
///
/// Created when a run starts and dropped when it ends.
#[derive(Clone)]
pub struct RunContext {
    pub run_id: RunId,
    pub config: Arc<DevstackConfig>,
    pub cancel: CancellationToken,
    pub reporter: Arc<dyn ProgressReporter>,
}

impl RunContext {
    pub fn new(config: Arc<DevstackConfig>, cancel: CancellationToken, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            run_id: RunId::new(),
            config,
            cancel,
            reporter,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn report(&self, event: ProgressEvent) {
        self.reporter.report(&event);
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
