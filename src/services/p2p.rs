//! Chain synchronization services.
//!
//! A [`ChainNetworkWorker`] synchronizes a single chain/network pair: its
//! sync loop ticks on the configured interval, polls the trusted peers and
//! publishes progress on the event bus. The [`P2pService`] is the default
//! aggregate that runs one worker per configured chain/network when no
//! explicit selection was made.

use std::sync::Mutex;
use std::time::Duration;

use derive_more::Constructor;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

use super::event::WorkerEvent;
use super::{Service, ServiceError};
use crate::settings::{ChainConfig, Settings};
use crate::supervisor::signals::{FatalSender, Halted};

/// Synchronizes one chain on one network.
pub struct ChainNetworkWorker {
    chain: String,
    network: String,
    config: ChainConfig,
    events: broadcast::Sender<WorkerEvent>,
    fatal: FatalSender,
    running: Mutex<Option<SyncLoop>>,
}

#[derive(Constructor)]
struct SyncLoop {
    halt: oneshot::Sender<Halted>,
    task: JoinHandle<()>,
}

impl ChainNetworkWorker {
    #[must_use]
    pub fn new(
        chain: String,
        network: String,
        config: ChainConfig,
        events: broadcast::Sender<WorkerEvent>,
        fatal: FatalSender,
    ) -> Self {
        Self {
            chain,
            network,
            config,
            events,
            fatal,
            running: Mutex::new(None),
        }
    }

    fn spawn_sync_loop(&self, mut rx_halt: oneshot::Receiver<Halted>) -> JoinHandle<()> {
        let chain = self.chain.clone();
        let network = self.network.clone();
        let peers = self.config.trusted_peers.clone();
        let sync_interval = Duration::from_secs(self.config.sync_interval_secs);
        let events = self.events.clone();
        let fatal = self.fatal.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sync_interval);
            interval.tick().await;

            let mut height: u64 = 0;

            loop {
                tokio::select! {
                    halted = &mut rx_halt => {
                        match halted {
                            Ok(halted) => tracing::debug!(%chain, %network, %halted, "halting the sync loop"),
                            Err(_) => {
                                // The controller vanished without stopping us;
                                // the process cannot be trusted to keep running.
                                let _ = fatal.send(ServiceError::SyncLoopOrphaned {
                                    chain: chain.clone(),
                                    network: network.clone(),
                                });
                            }
                        }
                        break;
                    }
                    _ = interval.tick() => {
                        height += 1;
                        tracing::trace!(%chain, %network, height, peers = peers.len(), "sync tick");
                        let _ = events.send(WorkerEvent::BlockSynced {
                            chain: chain.clone(),
                            network: network.clone(),
                            height,
                        });
                    }
                }
            }
        })
    }
}

impl Service for ChainNetworkWorker {
    fn name(&self) -> &'static str {
        "p2p"
    }

    fn start(&self) -> BoxFuture<'_, Result<(), ServiceError>> {
        async move {
            let mut running = self
                .running
                .lock()
                .expect("it should be able to lock the sync worker state");

            if running.is_some() {
                return Err(ServiceError::AlreadyStarted);
            }

            if self.config.trusted_peers.is_empty() {
                tracing::warn!(chain = %self.chain, network = %self.network, "no trusted peers configured");
            }

            let (tx_halt, rx_halt) = oneshot::channel::<Halted>();
            let task = self.spawn_sync_loop(rx_halt);

            *running = Some(SyncLoop::new(tx_halt, task));

            tracing::info!(chain = %self.chain, network = %self.network, "sync worker started");

            Ok(())
        }
        .boxed()
    }

    fn stop(&self) -> BoxFuture<'_, Result<(), ServiceError>> {
        async move {
            let sync_loop = self
                .running
                .lock()
                .expect("it should be able to lock the sync worker state")
                .take()
                .ok_or(ServiceError::NotRunning)?;

            sync_loop
                .halt
                .send(Halted::Normal)
                .map_err(|_| ServiceError::ChannelClosed { service: self.name() })?;

            sync_loop.task.await.map_err(|source| ServiceError::TaskFailed {
                service: self.name(),
                source,
            })?;

            tracing::info!(chain = %self.chain, network = %self.network, "sync worker stopped");

            Ok(())
        }
        .boxed()
    }
}

/// The default aggregate: one [`ChainNetworkWorker`] per configured
/// chain/network pair.
pub struct P2pService {
    workers: Vec<ChainNetworkWorker>,
}

impl P2pService {
    #[must_use]
    pub fn from_settings(settings: &Settings, events: &broadcast::Sender<WorkerEvent>, fatal: &FatalSender) -> Self {
        let workers = settings
            .chains
            .iter()
            .map(|it| {
                ChainNetworkWorker::new(
                    it.chain.clone(),
                    it.network.clone(),
                    it.config.clone(),
                    events.clone(),
                    fatal.clone(),
                )
            })
            .collect();

        Self { workers }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl Service for P2pService {
    fn name(&self) -> &'static str {
        "p2p"
    }

    fn start(&self) -> BoxFuture<'_, Result<(), ServiceError>> {
        async move {
            for worker in &self.workers {
                worker.start().await?;
            }

            Ok(())
        }
        .boxed()
    }

    fn stop(&self) -> BoxFuture<'_, Result<(), ServiceError>> {
        async move {
            // mirror of the start order
            for worker in self.workers.iter().rev() {
                worker.stop().await?;
            }

            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast;

    use super::{ChainNetworkWorker, P2pService};
    use crate::services::event::WorkerEvent;
    use crate::services::{Service, ServiceError};
    use crate::settings::{ChainConfig, ChainSettings, Settings};
    use crate::supervisor::signals::fatal_channel;

    fn two_chain_settings() -> Settings {
        Settings {
            chains: vec![
                ChainSettings {
                    chain: "BTC".to_owned(),
                    network: "regtest".to_owned(),
                    config: ChainConfig::default(),
                },
                ChainSettings {
                    chain: "ETH".to_owned(),
                    network: "sepolia".to_owned(),
                    config: ChainConfig::default(),
                },
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn it_should_publish_sync_progress_on_the_event_bus() {
        let (events, mut rx) = broadcast::channel(16);
        let (fatal_tx, _fatal_rx) = fatal_channel();

        let config = ChainConfig {
            sync_interval_secs: 1,
            trusted_peers: vec!["127.0.0.1:18444".to_owned()],
        };

        let worker = ChainNetworkWorker::new("BTC".to_owned(), "regtest".to_owned(), config, events, fatal_tx);

        tokio::time::pause();

        worker.start().await.unwrap();

        let WorkerEvent::BlockSynced { chain, height, .. } = rx.recv().await.unwrap();
        assert_eq!(chain, "BTC");
        assert_eq!(height, 1);

        worker.stop().await.unwrap();
    }

    #[tokio::test]
    async fn it_should_not_stop_a_worker_that_never_started() {
        let (events, _rx) = broadcast::channel(16);
        let (fatal_tx, _fatal_rx) = fatal_channel();

        let worker = ChainNetworkWorker::new(
            "BTC".to_owned(),
            "regtest".to_owned(),
            ChainConfig::default(),
            events,
            fatal_tx,
        );

        assert!(matches!(worker.stop().await, Err(ServiceError::NotRunning)));
    }

    #[tokio::test]
    async fn it_should_build_one_worker_per_configured_chain() {
        let (events, _rx) = broadcast::channel(16);
        let (fatal_tx, _fatal_rx) = fatal_channel();

        let aggregate = P2pService::from_settings(&two_chain_settings(), &events, &fatal_tx);

        assert_eq!(aggregate.len(), 2);
    }

    #[tokio::test]
    async fn it_should_start_and_stop_every_aggregated_worker() {
        let (events, _rx) = broadcast::channel(16);
        let (fatal_tx, _fatal_rx) = fatal_channel();

        let aggregate = P2pService::from_settings(&two_chain_settings(), &events, &fatal_tx);

        aggregate.start().await.unwrap();
        aggregate.stop().await.unwrap();

        // every worker is stopped, so stopping again reports not running
        assert!(matches!(aggregate.stop().await, Err(ServiceError::NotRunning)));
    }
}
