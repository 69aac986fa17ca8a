//! A supervised multi-chain P2P synchronization worker.
//!
//! The worker runs a small, fixed set of long-running services (storage,
//! event bus, one or more chain sync workers) under a single lifecycle
//! supervisor:
//!
//! - The [`services`] module: defines the [`Service`](services::Service)
//!   trait every supervised component implements, plus the concrete worker
//!   services.
//! - The [`supervisor`] module: the lifecycle core. It starts services in
//!   registration order, and on a termination trigger stops them in reverse
//!   order, bounded by a 30-second watchdog.
//! - The [`settings`] module: JSON settings describing the configured
//!   chains and networks.
//! - The [`setup`] module: assembles the service registry from settings and
//!   the optional `CHAIN`/`NETWORK` environment selection.
//!
//! Termination triggers (`SIGTERM`, `SIGINT`, or a fatal service error) all
//! funnel into [`Supervisor::shutdown`](supervisor::Supervisor::shutdown),
//! so a second trigger while teardown is in flight always force-exits the
//! process with status `1`.

pub mod bootstrap;
pub mod services;
pub mod settings;
pub mod setup;
pub mod supervisor;
