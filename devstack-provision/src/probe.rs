//! Readiness prober: waits until a datastore answers its health query

use async_trait::async_trait;
use devstack_core::{ProvisionError, Result, StepKind};
use devstack_execution::DatastoreClient;
use devstack_resilience::{PollOutcome, PollPolicy, Poller};
use std::sync::Arc;
use tracing::{info, warn};

use crate::context::RunContext;
use crate::reporter::ProgressEvent;
use crate::step::Step;

pub struct ReadinessProber {
    name: String,
    client: Arc<dyn DatastoreClient>,
    policy: PollPolicy,
}

impl ReadinessProber {
    pub fn new(name: impl Into<String>, client: Arc<dyn DatastoreClient>, policy: PollPolicy) -> Self {
        Self {
            name: name.into(),
            client,
            policy,
        }
    }

    /// Poll the health query until ready, timed out or cancelled
    pub async fn wait(&self, ctx: &RunContext) -> PollOutcome {
        let poller = Poller::new(self.policy.clone(), ctx.cancel.clone());
        let client = &self.client;

        poller
            .poll_with_observer(
                move |_| client.ping(),
                |attempt| {
                    ctx.report(ProgressEvent::ProbeAttempt {
                        step: self.name.clone(),
                        attempt: attempt.attempt,
                        elapsed: attempt.elapsed,
                        error: attempt.error.clone(),
                    })
                },
            )
            .await
    }
}

#[async_trait]
impl Step for ReadinessProber {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StepKind {
        StepKind::Probe
    }

    fn describe(&self) -> String {
        format!(
            "wait for {} (timeout {:?}, {:?} backoff from {:?} to {:?})",
            self.client.target(),
            self.policy.timeout,
            self.policy.backoff_strategy,
            self.policy.initial_interval,
            self.policy.max_interval
        )
    }

    async fn run(&self, ctx: &RunContext) -> Result<()> {
        let target = self.client.target();
        info!(%target, timeout = ?self.policy.timeout, "Waiting for datastore");

        match self.wait(ctx).await {
            PollOutcome::Ready { attempts } => {
                info!(%target, attempts, "Datastore ready");
                Ok(())
            }
            PollOutcome::TimedOut { attempts, elapsed } => {
                warn!(%target, attempts, ?elapsed, "Datastore not ready in time");
                Err(ProvisionError::ReadinessTimeout {
                    target: target.to_string(),
                    attempts,
                    elapsed,
                })
            }
            PollOutcome::Cancelled { .. } => Err(ProvisionError::Cancelled {
                stage: self.name.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::RecordingReporter;
    use devstack_config::DevstackConfig;
    use devstack_core::{DatastoreKind, DatastoreTarget};
    use devstack_execution::{ExecutionError, ExecutionResult};
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    /// Store that answers its health query from the `ready_on`-th ping on
    struct FlakyStore {
        target: DatastoreTarget,
        ready_on: u32,
        pings: AtomicU32,
    }

    #[async_trait]
    impl DatastoreClient for FlakyStore {
        fn target(&self) -> &DatastoreTarget {
            &self.target
        }

        async fn ping(&self) -> ExecutionResult<()> {
            let calls = self.pings.fetch_add(1, Ordering::SeqCst) + 1;
            if calls >= self.ready_on {
                Ok(())
            } else {
                Err(ExecutionError::CommandFailed {
                    service: "mongo".to_string(),
                    command: "mongo --quiet --eval db.serverStatus()".to_string(),
                    status: devstack_core::ExitStatus(Some(1)),
                    stderr: "connection refused".to_string(),
                })
            }
        }

        async fn run_script(&self, _script: &Path) -> ExecutionResult<()> {
            Ok(())
        }

        async fn restore_dump(&self, _dump: &Path, _database: Option<&str>) -> ExecutionResult<()> {
            Ok(())
        }
    }

    fn store(ready_on: u32) -> FlakyStore {
        FlakyStore {
            target: DatastoreTarget::new(DatastoreKind::Document, "mongo"),
            ready_on,
            pings: AtomicU32::new(0),
        }
    }

    fn context(reporter: Arc<RecordingReporter>, cancel: CancellationToken) -> RunContext {
        RunContext::new(Arc::new(DevstackConfig::default()), cancel, reporter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_three_attempts() {
        let reporter = Arc::new(RecordingReporter::new());
        let prober = ReadinessProber::new(
            "wait-for-document",
            Arc::new(store(3)),
            PollPolicy::fixed(Duration::from_secs(1), Duration::from_secs(30)),
        );

        prober
            .run(&context(reporter.clone(), CancellationToken::new()))
            .await
            .unwrap();
        assert_eq!(reporter.probe_attempts("wait-for-document"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_readiness_timeout() {
        let reporter = Arc::new(RecordingReporter::new());
        let prober = ReadinessProber::new(
            "wait-for-document",
            Arc::new(store(u32::MAX)),
            PollPolicy::fixed(Duration::from_secs(2), Duration::from_secs(10)),
        );

        let err = prober
            .run(&context(reporter.clone(), CancellationToken::new()))
            .await
            .unwrap_err();

        match err {
            ProvisionError::ReadinessTimeout { target, attempts, .. } => {
                assert_eq!(attempts, 5);
                assert!(target.contains("mongo"));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(reporter.probe_attempts("wait-for-document"), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_maps_to_cancelled() {
        let cancel = CancellationToken::new();
        let prober = ReadinessProber::new(
            "wait-for-document",
            Arc::new(store(u32::MAX)),
            PollPolicy::fixed(Duration::from_secs(1), Duration::from_secs(60)),
        );

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            trigger.cancel();
        });

        let err = prober
            .run(&context(Arc::new(RecordingReporter::new()), cancel))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
