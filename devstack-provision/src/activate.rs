//! Service activator: asks the orchestrator to start a dependent service

use async_trait::async_trait;
use devstack_core::{ProvisionError, Result, ServiceDescriptor, StepKind};
use devstack_execution::ProcessOrchestrator;
use std::sync::Arc;
use tracing::info;

use crate::context::RunContext;
use crate::step::Step;

/// Starts a service detached. Success means the orchestrator acknowledged the
/// request, not that the service is ready.
pub struct ServiceActivator {
    name: String,
    orchestrator: Arc<dyn ProcessOrchestrator>,
    service: ServiceDescriptor,
}

impl ServiceActivator {
    pub fn new(name: impl Into<String>, orchestrator: Arc<dyn ProcessOrchestrator>, service: ServiceDescriptor) -> Self {
        Self {
            name: name.into(),
            orchestrator,
            service,
        }
    }
}

#[async_trait]
impl Step for ServiceActivator {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StepKind {
        StepKind::Activate
    }

    fn describe(&self) -> String {
        format!("start service '{}' detached", self.service)
    }

    async fn run(&self, _ctx: &RunContext) -> Result<()> {
        info!(service = %self.service, "Starting service");

        self.orchestrator
            .start_detached(&self.service)
            .await
            .and_then(|output| output.check(&self.service.name, format!("up -d {}", self.service)))
            .map_err(|e| ProvisionError::activation_failure(self.service.clone(), e))?;

        info!(service = %self.service, "Start requested");
        Ok(())
    }
}
