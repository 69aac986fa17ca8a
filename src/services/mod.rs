//! Supervised worker services.
//!
//! This module defines the [`Service`] trait, which should be implemented by
//! any component that wishes to be managed by the lifecycle
//! [`Supervisor`](crate::supervisor::Supervisor), and the concrete services
//! the worker runs:
//!
//! - The [`storage`] module: the storage layer service.
//! - The [`event`] module: the process-wide event bus service.
//! - The [`p2p`] module: the chain synchronization services.

use std::path::PathBuf;

use futures::future::BoxFuture;
use thiserror::Error;

pub mod event;
pub mod p2p;
pub mod storage;

/// The `Service` trait defines the core functionality for a service that can
/// be started and stopped.
///
/// Both operations are asynchronous and fallible. The supervisor never calls
/// `start` or `stop` concurrently for the same registry, so implementations
/// only need interior mutability, not reentrancy.
pub trait Service: Send + Sync {
    /// A short stable name used in logs.
    fn name(&self) -> &'static str;

    /// Moves the service into the running state.
    ///
    /// # Errors
    ///
    /// This function will return an error if the service is already started
    /// or if it is unable to acquire its resources.
    fn start(&self) -> BoxFuture<'_, Result<(), ServiceError>>;

    /// Moves the service into the stopped state.
    ///
    /// # Errors
    ///
    /// This function will return an error if the service is not running or
    /// if its background task failed to wind down.
    fn stop(&self) -> BoxFuture<'_, Result<(), ServiceError>>;
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service was already started")]
    AlreadyStarted,

    #[error("service is not running")]
    NotRunning,

    #[error("could not prepare data directory {path}: {source}")]
    UnavailableDataDir { path: PathBuf, source: std::io::Error },

    #[error("background task for the {service} service failed: {source}")]
    TaskFailed {
        service: &'static str,
        source: tokio::task::JoinError,
    },

    #[error("halt channel for the {service} service was dropped before stop")]
    ChannelClosed { service: &'static str },

    #[error("sync loop for {chain}/{network} lost its controller")]
    SyncLoopOrphaned { chain: String, network: String },
}
