//! Termination triggers for the worker process.
//!
//! Three event sources can end the life of the worker: a termination signal
//! from the host (`SIGTERM`), an interrupt (`SIGINT`/ctrl-c), and an
//! unrecoverable error reported by a running service over the fatal error
//! channel. All of them funnel into
//! [`Supervisor::shutdown`](crate::supervisor::Supervisor::shutdown), so the
//! "already shutting down" check is never bypassed.

use std::sync::Arc;

use derive_more::derive::Display;
use tokio::signal;
use tokio::sync::mpsc;

use super::{ShutdownError, Supervisor};
use crate::services::ServiceError;

/// Message sent over a service's halt channel to stop its background task.
#[derive(Copy, Clone, Debug, Display)]
pub enum Halted {
    Normal,
}

/// Sender half of the fatal error channel, cloned into each service that can
/// fail asynchronously.
pub type FatalSender = mpsc::UnboundedSender<ServiceError>;
pub type FatalReceiver = mpsc::UnboundedReceiver<ServiceError>;

/// Creates the channel services use to report unrecoverable async errors.
#[must_use]
pub fn fatal_channel() -> (FatalSender, FatalReceiver) {
    mpsc::unbounded_channel()
}

/// Resolves when the host delivers a termination or interrupt request.
///
/// # Panics
///
/// It panics if a signal handler cannot be installed.
pub async fn shutdown_signal() {
    let interrupt = async {
        signal::ctrl_c()
            .await
            .expect("it should be able to install the interrupt signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("it should be able to install the terminate signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }
}

/// Waits for the first termination trigger and runs the graceful shutdown,
/// keeping a listener alive so that any further signal reaches the
/// supervisor's force-exit branch while teardown is in flight.
///
/// # Errors
///
/// This function will return an error if one or more services failed to
/// stop during teardown.
pub async fn watch(supervisor: Arc<Supervisor>, mut fatal_rx: FatalReceiver) -> Result<(), ShutdownError> {
    tokio::select! {
        () = shutdown_signal() => {}
        fatal = fatal_rx.recv() => {
            if let Some(e) = fatal {
                tracing::error!(%e, "unrecoverable service error, shutting down");
            }
        }
    }

    let impatience = tokio::spawn({
        let supervisor = supervisor.clone();
        async move {
            loop {
                shutdown_signal().await;
                let _ = supervisor.shutdown().await;
            }
        }
    });

    let result = supervisor.shutdown().await;

    impatience.abort();

    result
}
