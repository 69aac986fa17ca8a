//! The lifecycle supervisor.
//!
//! The supervisor owns the [`ServiceRegistry`] and drives every supervised
//! service through its lifecycle:
//!
//! - [`startup`](Supervisor::startup) starts the services sequentially in
//!   registration order. A failed start is logged and does not abort the
//!   remaining services; partial startup is an accepted degraded state.
//! - [`shutdown`](Supervisor::shutdown) stops the services sequentially in
//!   reverse registration order, bounded by the 30-second watchdog. A
//!   second shutdown request while the first is in flight force-exits the
//!   process with status `1`.
//!
//! Teardown is best-effort: a failed stop is logged and the remaining
//! services are still stopped; the failures are returned once the reverse
//! loop completes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use derive_more::derive::Display;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::services::ServiceError;

pub mod registry;
pub mod signals;

pub use registry::ServiceRegistry;

/// How long a graceful shutdown may take before the watchdog force-exits
/// the process.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// The lifecycle states of the supervised worker.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Starting,
    Running,
    ShuttingDown,
    Stopped,
    ForceKilled,
}

/// Hook used to terminate the process, injectable so the forced-exit paths
/// are observable in tests.
pub type HaltFn = Arc<dyn Fn(i32) + Send + Sync>;

/// The process-level lifecycle supervisor.
///
/// Constructed once per process from an already populated registry; taking
/// the registry by value is what enforces the "no registration after
/// startup" invariant.
pub struct Supervisor {
    registry: ServiceRegistry,
    state: Mutex<State>,
    halt: HaltFn,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("registry", &self.registry)
            .field("state", &self.state)
            .finish()
    }
}

impl Supervisor {
    #[must_use]
    pub fn new(registry: ServiceRegistry) -> Self {
        Self::with_halt(registry, Arc::new(|code| std::process::exit(code)))
    }

    /// Builds a supervisor with a custom process-exit hook.
    #[must_use]
    pub fn with_halt(registry: ServiceRegistry, halt: HaltFn) -> Self {
        Self {
            registry,
            state: Mutex::new(State::Idle),
            halt,
        }
    }

    #[must_use]
    pub fn state(&self) -> State {
        *self.state.lock().expect("it should be able to lock the supervisor state")
    }

    fn set_state(&self, next: State) {
        *self.state.lock().expect("it should be able to lock the supervisor state") = next;
    }

    /// Starts every registered service, in registration order.
    ///
    /// A service that fails to start is logged and skipped; one failed
    /// component must not prevent independent components from coming up.
    pub async fn startup(&self) {
        {
            let mut state = self.state.lock().expect("it should be able to lock the supervisor state");
            if *state != State::Idle {
                tracing::warn!(state = %*state, "startup already ran, ignoring");
                return;
            }
            *state = State::Starting;
        }

        for service in self.registry.forward() {
            if let Err(e) = service.start().await {
                tracing::error!(service = service.name(), %e, "failed to start service");
            }
        }

        self.set_state(State::Running);
    }

    /// The single entry point for graceful termination.
    ///
    /// The first call stops every service in reverse registration order,
    /// racing against the watchdog. Any call after that is an impatience
    /// signal: it skips teardown entirely and force-exits with status `1`
    /// before doing anything else.
    ///
    /// # Errors
    ///
    /// This function will return an error listing the services whose `stop`
    /// failed; the remaining services are still stopped.
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        // The check-and-set must happen before the first await so that a
        // reentrant call always takes the force-exit branch.
        {
            let mut state = self.state.lock().expect("it should be able to lock the supervisor state");
            match *state {
                State::ShuttingDown | State::Stopped | State::ForceKilled => {
                    *state = State::ForceKilled;
                    drop(state);
                    tracing::warn!("repeated shutdown request, force exiting");
                    (self.halt)(1);
                    return Ok(());
                }
                _ => *state = State::ShuttingDown,
            }
        }

        tracing::info!(pid = std::process::id(), "shutting down");

        let watchdog = Watchdog::arm(self.halt.clone());

        let mut failed = Vec::new();

        for service in self.registry.reverse() {
            if let Err(e) = service.stop().await {
                tracing::error!(service = service.name(), %e, "failed to stop service");
                failed.push((service.name(), e));
            }
        }

        watchdog.disarm();
        self.set_state(State::Stopped);

        if failed.is_empty() {
            Ok(())
        } else {
            Err(ShutdownError { failed })
        }
    }
}

/// One or more services failed to stop during teardown.
#[derive(Debug, Error)]
#[error("{} of the supervised services failed to stop", .failed.len())]
pub struct ShutdownError {
    pub failed: Vec<(&'static str, ServiceError)>,
}

/// One-shot timer bounding graceful shutdown.
///
/// Armed when `shutdown` begins; if it fires before the reverse loop
/// completes, it warns and force-exits with status `1`. A spawned task never
/// keeps the process alive past `main`, so an early natural exit is never
/// blocked on it.
struct Watchdog {
    task: JoinHandle<()>,
}

impl Watchdog {
    fn arm(halt: HaltFn) -> Self {
        let task = tokio::spawn(async move {
            tokio::time::sleep(SHUTDOWN_TIMEOUT).await;
            tracing::warn!(
                "worker did not shut down gracefully after {} seconds, exiting",
                SHUTDOWN_TIMEOUT.as_secs()
            );
            halt(1);
        });

        Self { task }
    }

    fn disarm(self) {
        self.task.abort();
    }
}
