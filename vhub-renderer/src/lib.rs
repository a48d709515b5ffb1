//! # vhub-renderer
//!
//! Tera-based rendering of the version tree: an HTML dashboard (tree plus
//! health snapshot) and a flat CSV export.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vhub_core::RegistryStore;
//! use vhub_renderer::Renderer;
//!
//! fn export(store: &RegistryStore) {
//!     if let Ok(renderer) = Renderer::new() {
//!         if let Ok(csv) = renderer.render_csv(&store.snapshot()) {
//!             print!("{csv}");
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{CsvRow, DashboardContext};
pub use engine::{Renderer, CSV_TEMPLATE, DASHBOARD_TEMPLATE};
pub use error::RenderError;
