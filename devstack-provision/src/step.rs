//! The unit of work the sequencer executes

use async_trait::async_trait;
use devstack_core::{Result, StepKind};

use crate::context::RunContext;

/// An atomic provisioning step: it either completes or aborts the run
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> StepKind;

    /// One-line description used by plan output
    fn describe(&self) -> String;

    async fn run(&self, ctx: &RunContext) -> Result<()>;
}
