//! vhub daemon: health poller, HTTP façade, and the runtime that wires them to
//! the store and its persistence.

pub mod config;
mod error;
pub mod health;
pub mod http;
pub mod paths;
mod runtime;

pub use config::{DaemonConfig, HealthCheckConfig, HealthCheckEntry};
pub use error::DaemonError;
pub use health::HealthPoller;
pub use http::{router, AppState};
pub use runtime::{run, run_until, start_blocking};
