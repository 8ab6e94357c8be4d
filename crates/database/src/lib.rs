//! # Wellness Database Crate
//!
//! The data-access layer: typed functions per table (profiles, categories,
//! goals, entries), hidden behind the `WellnessStore` trait.
//!
//! ## Public API
//!
//! - `connect` / `run_migrations`: pool setup and the embedded schema.
//! - `WellnessStore`: the data-access contract the web layer depends on.
//! - `DbRepository`: the Postgres implementation.
//! - `MemoryStore`: an in-process implementation with the same rules.
//! - `legacy`: import of the old denormalized export.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod legacy;
pub mod memory;
pub mod repository;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use legacy::{import_legacy, ImportSummary, LegacyExport};
pub use memory::MemoryStore;
pub use repository::DbRepository;
pub use store::WellnessStore;
