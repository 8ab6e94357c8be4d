//! # Query Cache
//!
//! A process-local read-through cache for query results.
//!
//! - `get` returns a fresh value or reports a miss.
//! - `set` stores a value with an expiry and a set of tags.
//! - `invalidate` drops every value carrying a tag, so a write can evict all
//!   reads it affects without knowing their keys.
//! - `stats` feeds the debug view.

pub mod cache;
pub mod clock;
pub mod error;

pub use cache::{CacheKeyInfo, CacheStats, QueryCache, SetOptions};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CacheError;
