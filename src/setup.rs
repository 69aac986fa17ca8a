//! Assembles the service registry for the worker.
//!
//! The registry is populated once, before the supervisor is built: the
//! storage layer and the event bus first, then either a single
//! [`ChainNetworkWorker`] (when a chain and a network were selected through
//! the environment or the command line) or the aggregate [`P2pService`]
//! covering every configured chain.

use std::sync::Arc;
use std::time::Duration;

use crate::services::event::EventService;
use crate::services::p2p::{ChainNetworkWorker, P2pService};
use crate::services::storage::StorageService;
use crate::settings::{Settings, SettingsError};
use crate::supervisor::signals::FatalSender;
use crate::supervisor::ServiceRegistry;

/// Builds the ordered registry of services to supervise.
///
/// Registration order is startup order: storage, then the event bus, then
/// the sync worker(s). Shutdown happens in the reverse of this order.
///
/// # Errors
///
/// This function will return an error if a chain/network pair was selected
/// but is not declared in the settings.
pub fn setup(
    settings: &Settings,
    chain: Option<&str>,
    network: Option<&str>,
    fatal: &FatalSender,
) -> Result<ServiceRegistry, SettingsError> {
    let mut registry = ServiceRegistry::new();

    let event_service = Arc::new(EventService::new(settings.event_capacity));
    let events = event_service.sender();

    registry.register(Arc::new(StorageService::new(
        settings.data_dir.clone(),
        Duration::from_secs(settings.flush_interval_secs),
    )));
    registry.register(event_service);

    // sync a particular chain and network, or all of them
    match (chain, network) {
        (Some(chain), Some(network)) => {
            let config = settings
                .chain_config(chain, network)
                .ok_or_else(|| SettingsError::UnknownChain {
                    chain: chain.to_owned(),
                    network: network.to_owned(),
                })?
                .clone();

            registry.register(Arc::new(ChainNetworkWorker::new(
                chain.to_owned(),
                network.to_owned(),
                config,
                events,
                fatal.clone(),
            )));
        }
        _ => {
            registry.register(Arc::new(P2pService::from_settings(settings, &events, fatal)));
        }
    }

    Ok(registry)
}
