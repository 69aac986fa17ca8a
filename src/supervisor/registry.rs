//! Ordered registry of supervised services.
//!
//! The registry only stores order: services are appended once during
//! assembly, and the supervisor walks them forward on startup and in
//! reverse on shutdown. Reverse traversal is the exact mirror of forward
//! traversal, so the last service started is always the first one stopped.

use std::sync::Arc;

use crate::services::Service;

/// The ordered collection of services under supervision.
///
/// Registration happens while assembling the worker; the registry is then
/// moved into the [`Supervisor`](crate::supervisor::Supervisor), which makes
/// further registration impossible once startup begins.
#[derive(Default)]
pub struct ServiceRegistry {
    services: Vec<Arc<dyn Service>>,
}

impl ServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a service. Startup order is registration order.
    pub fn register(&mut self, service: Arc<dyn Service>) {
        self.services.push(service);
    }

    /// Services in registration order, for startup.
    pub fn forward(&self) -> impl Iterator<Item = &Arc<dyn Service>> {
        self.services.iter()
    }

    /// Services in reverse registration order, for shutdown.
    pub fn reverse(&self) -> impl Iterator<Item = &Arc<dyn Service>> {
        self.services.iter().rev()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.services.iter().map(|it| it.name())).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::BoxFuture;
    use futures::FutureExt;

    use super::ServiceRegistry;
    use crate::services::{Service, ServiceError};

    struct Named(&'static str);

    impl Service for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn start(&self) -> BoxFuture<'_, Result<(), ServiceError>> {
            async { Ok(()) }.boxed()
        }

        fn stop(&self) -> BoxFuture<'_, Result<(), ServiceError>> {
            async { Ok(()) }.boxed()
        }
    }

    #[test]
    fn it_should_preserve_registration_order() {
        let mut registry = ServiceRegistry::new();
        registry.register(Arc::new(Named("storage")));
        registry.register(Arc::new(Named("event")));
        registry.register(Arc::new(Named("p2p")));

        let forward: Vec<_> = registry.forward().map(|it| it.name()).collect();

        assert_eq!(forward, vec!["storage", "event", "p2p"]);
    }

    #[test]
    fn it_should_mirror_forward_order_when_traversed_in_reverse() {
        let mut registry = ServiceRegistry::new();
        registry.register(Arc::new(Named("storage")));
        registry.register(Arc::new(Named("event")));
        registry.register(Arc::new(Named("p2p")));

        let mut mirrored: Vec<_> = registry.reverse().map(|it| it.name()).collect();
        mirrored.reverse();
        let forward: Vec<_> = registry.forward().map(|it| it.name()).collect();

        assert_eq!(mirrored, forward);
    }

    #[test]
    fn it_should_start_out_empty() {
        let registry = ServiceRegistry::new();

        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }
}
