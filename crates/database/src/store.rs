use crate::error::DbError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{
    AuthUser, CategoryGoal, NewCategory, NewEntry, Profile, ProfileUpdate, WellnessCategory,
    WellnessEntry,
};
use rust_decimal::Decimal;
use uuid::Uuid;

/// The data-access interface, one method per table operation.
///
/// Every method is scoped to `user_id`: rows owned by another user are never
/// returned or touched, and a foreign row reads as "not found". Inputs are
/// validated by the implementation before anything is written.
#[async_trait]
pub trait WellnessStore: Send + Sync {
    // --- profiles ---
    async fn get_profile(&self, user_id: Uuid) -> Result<Profile, DbError>;

    /// Creates the profile on first sign-in; afterwards refreshes email and verification.
    async fn ensure_profile(&self, user: &AuthUser) -> Result<Profile, DbError>;

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<Profile, DbError>;

    // --- categories ---
    /// System defaults first, then the user's own categories, each by name.
    async fn list_categories(&self, user_id: Uuid) -> Result<Vec<WellnessCategory>, DbError>;

    async fn get_category(&self, user_id: Uuid, category_id: Uuid) -> Result<WellnessCategory, DbError>;

    async fn create_category(&self, user_id: Uuid, category: NewCategory) -> Result<WellnessCategory, DbError>;

    // --- goals ---
    async fn list_goals(&self, user_id: Uuid) -> Result<Vec<CategoryGoal>, DbError>;

    /// Inserts or replaces the goal for (user, category). Last write wins.
    async fn upsert_goal(&self, user_id: Uuid, category_id: Uuid, target_hours: Decimal) -> Result<CategoryGoal, DbError>;

    // --- entries ---
    /// Newest first. `since` filters on `recorded_at`.
    async fn list_entries(&self, user_id: Uuid, since: Option<DateTime<Utc>>) -> Result<Vec<WellnessEntry>, DbError>;

    async fn create_entry(&self, user_id: Uuid, entry: NewEntry) -> Result<WellnessEntry, DbError>;

    async fn delete_entry(&self, user_id: Uuid, entry_id: Uuid) -> Result<(), DbError>;
}
