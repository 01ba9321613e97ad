//! Process signal to run cancellation wiring

use log::{error, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Resolve when the process receives Ctrl-C or, on unix, SIGTERM
///
/// A handler that cannot be installed never resolves; the failure is logged.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Cancel `token` when `signal` resolves
///
/// The spawned task ends on its own once the token is cancelled by anyone
/// else, so it never outlives the run.
pub fn cancel_on_signal<S>(token: CancellationToken, signal: S) -> JoinHandle<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = signal => {
                warn!("Interrupt received, cancelling provisioning run");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}
