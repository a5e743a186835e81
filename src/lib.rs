pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod naming;
pub mod server;
pub mod tasks;
pub mod types;

// Layered boundaries: use cases and ports in `app`, adapters in `infra`
pub mod app;
pub mod infra;
