//! Order View Engine Library
//!
//! Derives the ordered, aggregated rows shown by the order and production
//! dashboards: filtering, per-order rollup, multi-criteria sorting with a
//! user-reorderable fabrication priority, row expansion state and the
//! debounced persistence of each view's configuration.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod storage;

pub use config::{init_tracing, load_config, EngineConfig, EngineConfigError};
pub use errors::ViewError;
pub use services::expansion::{ExpansionPhase, ExpansionTracker, ToggleOutcome};
pub use services::pipeline::{
    derive_order_rows, derive_order_view, derive_production_rows, derive_production_view,
    DerivedView,
};
pub use services::priority::{canonical_fabrication_order, PriorityOrder, Rank};
pub use services::rollup::{OrderRow, OrderSummary, ProductionRow};
pub use services::view_config::{OrderViewStore, ProductionViewStore, ViewConfigStore};
pub use storage::{InMemoryViewState, JsonFileViewState, StorageError, ViewStateBackend, ViewStateFactory};
