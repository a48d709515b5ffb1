//! vhub core library: deployment-version tree, its store, and durable storage.
//!
//! - [`types`]: region / environment / app data model and health types
//! - [`store`]: [`RegistryStore`], the locked in-memory tree
//! - [`persistence`]: [`Persistence`], backup-first JSON save and fallback load
//! - [`error`]: [`StoreError`], [`PersistError`]

pub mod error;
pub mod persistence;
pub mod store;
pub mod types;

pub use error::{NodePath, PersistError, StoreError};
pub use persistence::{LoadSource, Persistence};
pub use store::RegistryStore;
pub use types::{
    App, AppPatch, CreateAppOptions, Environment, HealthState, HealthStatus, Region,
    RegistryData, UNDEFINED_VERSION,
};
