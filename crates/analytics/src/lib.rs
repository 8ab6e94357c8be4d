//! # Wellness Analytics
//!
//! Turns raw entries and goals into the numbers behind the progress charts.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** no knowledge of the database or HTTP. Depends only on `core-types`.
//! - **Stateless calculation:** `ProgressEngine` takes categories, goals and
//!   entries and produces a `ProgressReport`, which makes it easy to test.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use engine::{ProgressEngine, ProgressWindow, DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS};
pub use error::AnalyticsError;
pub use report::{CategoryProgress, DailyPoint, ProgressReport};
