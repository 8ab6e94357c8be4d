pub mod enums;
pub mod envelope;
pub mod error;
pub mod structs;
pub mod validation;

// Re-export the core types to provide a clean public API.
pub use enums::DefaultCategory;
pub use envelope::ActionResult;
pub use error::CoreError;
pub use structs::{
    AuthUser, CategoryGoal, NewCategory, NewEntry, Profile, ProfileUpdate, Session,
    WellnessCategory, WellnessEntry,
};
