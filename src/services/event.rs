//! Process-wide event bus service.
//!
//! Other services publish [`WorkerEvent`]s over a broadcast channel; the bus
//! itself is created eagerly so publishers can be wired up while the
//! registry is assembled, before any service has started.

use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::broadcast;

use super::{Service, ServiceError};

/// An event published on the worker bus.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    BlockSynced {
        chain: String,
        network: String,
        height: u64,
    },
}

pub struct EventService {
    bus: broadcast::Sender<WorkerEvent>,
    running: AtomicBool,
}

impl EventService {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (bus, _) = broadcast::channel(capacity);

        Self {
            bus,
            running: AtomicBool::new(false),
        }
    }

    /// A sender handle for publishers, available before the service starts.
    #[must_use]
    pub fn sender(&self) -> broadcast::Sender<WorkerEvent> {
        self.bus.clone()
    }

    /// Subscribes to the bus.
    ///
    /// # Errors
    ///
    /// This function will return an error if the service is not running.
    pub fn subscribe(&self) -> Result<broadcast::Receiver<WorkerEvent>, ServiceError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(ServiceError::NotRunning);
        }

        Ok(self.bus.subscribe())
    }
}

impl Service for EventService {
    fn name(&self) -> &'static str {
        "event"
    }

    fn start(&self) -> BoxFuture<'_, Result<(), ServiceError>> {
        async move {
            if self.running.swap(true, Ordering::SeqCst) {
                return Err(ServiceError::AlreadyStarted);
            }

            tracing::info!("event bus started");

            Ok(())
        }
        .boxed()
    }

    fn stop(&self) -> BoxFuture<'_, Result<(), ServiceError>> {
        async move {
            if !self.running.swap(false, Ordering::SeqCst) {
                return Err(ServiceError::NotRunning);
            }

            tracing::info!("event bus stopped");

            Ok(())
        }
        .boxed()
    }
}
