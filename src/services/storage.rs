//! Storage layer service.
//!
//! Prepares the data directory on start and owns the background flush loop.
//! The loop is halted through a oneshot channel when the service is stopped.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use derive_more::Constructor;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::{Service, ServiceError};
use crate::supervisor::signals::Halted;

pub struct StorageService {
    data_dir: PathBuf,
    flush_interval: Duration,
    running: Mutex<Option<FlushLoop>>,
}

#[derive(Constructor)]
struct FlushLoop {
    halt: oneshot::Sender<Halted>,
    task: JoinHandle<()>,
}

impl StorageService {
    #[must_use]
    pub fn new(data_dir: PathBuf, flush_interval: Duration) -> Self {
        Self {
            data_dir,
            flush_interval,
            running: Mutex::new(None),
        }
    }

    fn spawn_flush_loop(&self, mut rx_halt: oneshot::Receiver<Halted>) -> JoinHandle<()> {
        let flush_interval = self.flush_interval;
        let data_dir = self.data_dir.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(flush_interval);
            interval.tick().await;

            loop {
                tokio::select! {
                    halted = &mut rx_halt => {
                        if let Ok(halted) = halted {
                            tracing::debug!(%halted, "halting the flush loop");
                        }
                        break;
                    }
                    _ = interval.tick() => {
                        tracing::trace!(data_dir = %data_dir.display(), "flushing storage");
                    }
                }
            }
        })
    }
}

impl Service for StorageService {
    fn name(&self) -> &'static str {
        "storage"
    }

    fn start(&self) -> BoxFuture<'_, Result<(), ServiceError>> {
        async move {
            let mut running = self
                .running
                .lock()
                .expect("it should be able to lock the storage service state");

            if running.is_some() {
                return Err(ServiceError::AlreadyStarted);
            }

            std::fs::create_dir_all(&self.data_dir).map_err(|source| ServiceError::UnavailableDataDir {
                path: self.data_dir.clone(),
                source,
            })?;

            let (tx_halt, rx_halt) = oneshot::channel::<Halted>();
            let task = self.spawn_flush_loop(rx_halt);

            *running = Some(FlushLoop::new(tx_halt, task));

            tracing::info!(data_dir = %self.data_dir.display(), "storage service started");

            Ok(())
        }
        .boxed()
    }

    fn stop(&self) -> BoxFuture<'_, Result<(), ServiceError>> {
        async move {
            let flush_loop = self
                .running
                .lock()
                .expect("it should be able to lock the storage service state")
                .take()
                .ok_or(ServiceError::NotRunning)?;

            flush_loop
                .halt
                .send(Halted::Normal)
                .map_err(|_| ServiceError::ChannelClosed { service: self.name() })?;

            flush_loop.task.await.map_err(|source| ServiceError::TaskFailed {
                service: self.name(),
                source,
            })?;

            tracing::info!("storage service stopped");

            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::StorageService;
    use crate::services::{Service, ServiceError};

    fn unique_data_dir(test: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join("chainsync-worker-tests")
            .join(format!("{}-{}", test, std::process::id()))
    }

    #[tokio::test]
    async fn it_should_create_the_data_dir_on_start() {
        let data_dir = unique_data_dir("creates-data-dir");
        let service = StorageService::new(data_dir.clone(), Duration::from_secs(60));

        service.start().await.unwrap();

        assert!(data_dir.is_dir());

        service.stop().await.unwrap();
    }

    #[tokio::test]
    async fn it_should_refuse_to_start_twice() {
        let service = StorageService::new(unique_data_dir("refuses-restart"), Duration::from_secs(60));

        service.start().await.unwrap();

        assert!(matches!(service.start().await, Err(ServiceError::AlreadyStarted)));

        service.stop().await.unwrap();
    }

    #[tokio::test]
    async fn it_should_refuse_to_stop_when_not_running() {
        let service = StorageService::new(unique_data_dir("refuses-stop"), Duration::from_secs(60));

        assert!(matches!(service.stop().await, Err(ServiceError::NotRunning)));
    }
}
