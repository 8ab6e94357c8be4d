//! A process-local `WellnessStore` with the same rules as the Postgres one.
//! Backs `serve --in-memory` for local work without a database, and the tests.

use crate::error::DbError;
use crate::store::WellnessStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::validation::{
    palette_color, validate_category_name, validate_color, validate_duration,
    validate_profile_update, validate_target_hours,
};
use core_types::{
    AuthUser, CategoryGoal, DefaultCategory, NewCategory, NewEntry, Profile, ProfileUpdate,
    WellnessCategory, WellnessEntry,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    categories: Vec<WellnessCategory>,
    goals: HashMap<(Uuid, Uuid), CategoryGoal>,
    entries: Vec<WellnessEntry>,
}

impl Tables {
    fn visible_category(&self, user_id: Uuid, category_id: Uuid) -> Option<&WellnessCategory> {
        self.categories
            .iter()
            .find(|c| c.id == category_id && c.visible_to(user_id))
    }

    fn require_profile(&self, user_id: Uuid) -> Result<(), DbError> {
        if self.profiles.contains_key(&user_id) {
            Ok(())
        } else {
            Err(DbError::not_found("Profile"))
        }
    }
}

/// Cloning shares the underlying tables.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// A store seeded with the system default categories, like a fresh migration.
    pub fn new() -> Self {
        let now = Utc::now();
        let categories = DefaultCategory::ALL
            .iter()
            .map(|c| WellnessCategory {
                id: c.id(),
                name: c.name().to_string(),
                color: c.color().to_string(),
                user_id: None,
                created_at: now,
            })
            .collect();

        Self {
            tables: Arc::new(RwLock::new(Tables {
                categories,
                ..Default::default()
            })),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WellnessStore for MemoryStore {
    async fn get_profile(&self, user_id: Uuid) -> Result<Profile, DbError> {
        self.tables
            .read()
            .profiles
            .get(&user_id)
            .cloned()
            .ok_or_else(|| DbError::not_found("Profile"))
    }

    async fn ensure_profile(&self, user: &AuthUser) -> Result<Profile, DbError> {
        let now = Utc::now();
        let mut tables = self.tables.write();
        let profile = tables.profiles.entry(user.id).or_insert_with(|| Profile {
            id: user.id,
            email: user.email.clone(),
            display_name: None,
            avatar_url: None,
            email_verified: false,
            onboarding_completed: false,
            created_at: now,
            updated_at: now,
        });
        profile.email = user.email.clone();
        profile.email_verified = user.email_verified();
        profile.updated_at = now;
        Ok(profile.clone())
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<Profile, DbError> {
        let update = validate_profile_update(update)?;
        let mut tables = self.tables.write();
        let profile = tables
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| DbError::not_found("Profile"))?;

        if let Some(name) = update.display_name {
            profile.display_name = Some(name);
        }
        if let Some(url) = update.avatar_url {
            profile.avatar_url = Some(url);
        }
        if let Some(done) = update.onboarding_completed {
            profile.onboarding_completed = done;
        }
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn list_categories(&self, user_id: Uuid) -> Result<Vec<WellnessCategory>, DbError> {
        let mut categories: Vec<WellnessCategory> = self
            .tables
            .read()
            .categories
            .iter()
            .filter(|c| c.visible_to(user_id))
            .cloned()
            .collect();
        categories.sort_by(|a, b| {
            (!a.is_default(), &a.name).cmp(&(!b.is_default(), &b.name))
        });
        Ok(categories)
    }

    async fn get_category(&self, user_id: Uuid, category_id: Uuid) -> Result<WellnessCategory, DbError> {
        self.tables
            .read()
            .visible_category(user_id, category_id)
            .cloned()
            .ok_or_else(|| DbError::not_found("Category"))
    }

    async fn create_category(&self, user_id: Uuid, category: NewCategory) -> Result<WellnessCategory, DbError> {
        let name = validate_category_name(&category.name)?;
        let explicit_color = category.color.as_deref().map(validate_color).transpose()?;

        let mut tables = self.tables.write();
        tables.require_profile(user_id)?;

        let visible: Vec<&WellnessCategory> = tables
            .categories
            .iter()
            .filter(|c| c.visible_to(user_id))
            .collect();
        if visible.iter().any(|c| c.name.eq_ignore_ascii_case(&name)) {
            return Err(DbError::Conflict(format!(
                "A category named '{}' already exists",
                name
            )));
        }
        let owned = visible.iter().filter(|c| !c.is_default()).count();

        let created = WellnessCategory {
            id: Uuid::new_v4(),
            name,
            color: explicit_color.unwrap_or_else(|| palette_color(owned).to_string()),
            user_id: Some(user_id),
            created_at: Utc::now(),
        };
        tables.categories.push(created.clone());
        Ok(created)
    }

    async fn list_goals(&self, user_id: Uuid) -> Result<Vec<CategoryGoal>, DbError> {
        Ok(self
            .tables
            .read()
            .goals
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_goal(&self, user_id: Uuid, category_id: Uuid, target_hours: Decimal) -> Result<CategoryGoal, DbError> {
        let target_hours = validate_target_hours(target_hours)?;
        let mut tables = self.tables.write();
        tables.require_profile(user_id)?;
        if tables.visible_category(user_id, category_id).is_none() {
            return Err(DbError::not_found("Category"));
        }

        let goal = CategoryGoal {
            user_id,
            category_id,
            target_hours,
            updated_at: Utc::now(),
        };
        tables.goals.insert((user_id, category_id), goal.clone());
        Ok(goal)
    }

    async fn list_entries(&self, user_id: Uuid, since: Option<DateTime<Utc>>) -> Result<Vec<WellnessEntry>, DbError> {
        let mut entries: Vec<WellnessEntry> = self
            .tables
            .read()
            .entries
            .iter()
            .filter(|e| e.user_id == user_id && since.is_none_or(|s| e.recorded_at >= s))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(entries)
    }

    async fn create_entry(&self, user_id: Uuid, entry: NewEntry) -> Result<WellnessEntry, DbError> {
        let duration_minutes = validate_duration(entry.duration_minutes)?;
        let mut tables = self.tables.write();
        tables.require_profile(user_id)?;
        if tables.visible_category(user_id, entry.category_id).is_none() {
            return Err(DbError::not_found("Category"));
        }

        let now = Utc::now();
        let created = WellnessEntry {
            id: Uuid::new_v4(),
            user_id,
            category_id: entry.category_id,
            duration_minutes,
            notes: entry.notes.filter(|n| !n.trim().is_empty()),
            recorded_at: entry.recorded_at.unwrap_or(now),
            created_at: now,
        };
        tables.entries.push(created.clone());
        Ok(created)
    }

    async fn delete_entry(&self, user_id: Uuid, entry_id: Uuid) -> Result<(), DbError> {
        let mut tables = self.tables.write();
        let before = tables.entries.len();
        tables
            .entries
            .retain(|e| !(e.id == entry_id && e.user_id == user_id));
        if tables.entries.len() == before {
            return Err(DbError::not_found("Entry"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    async fn signed_in(store: &MemoryStore) -> Uuid {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            email_confirmed_at: None,
        };
        store.ensure_profile(&user).await.unwrap();
        user.id
    }

    #[tokio::test]
    async fn ensure_profile_is_idempotent() {
        let store = MemoryStore::new();
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            email_confirmed_at: None,
        };
        let first = store.ensure_profile(&user).await.unwrap();
        store
            .update_profile(user.id, ProfileUpdate {
                display_name: Some("Sam".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let again = store.ensure_profile(&user).await.unwrap();
        assert_eq!(again.created_at, first.created_at);
        assert_eq!(again.display_name.as_deref(), Some("Sam"));
    }

    #[tokio::test]
    async fn defaults_come_first_and_are_shared() {
        let store = MemoryStore::new();
        let user = signed_in(&store).await;
        store
            .create_category(user, NewCategory {
                name: "Art".to_string(),
                color: None,
            })
            .await
            .unwrap();

        let names: Vec<String> = store
            .list_categories(user)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Faith", "Health", "Life", "Work", "Art"]);

        let other = signed_in(&store).await;
        assert_eq!(store.list_categories(other).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn duplicate_category_names_conflict_with_defaults() {
        let store = MemoryStore::new();
        let user = signed_in(&store).await;
        let err = store
            .create_category(user, NewCategory {
                name: " work ".to_string(),
                color: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[tokio::test]
    async fn goal_upsert_replaces_previous_target() {
        let store = MemoryStore::new();
        let user = signed_in(&store).await;
        let work = DefaultCategory::Work.id();

        store.upsert_goal(user, work, dec!(10)).await.unwrap();
        store.upsert_goal(user, work, dec!(12.5)).await.unwrap();

        let goals = store.list_goals(user).await.unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].target_hours, dec!(12.5));
    }

    #[tokio::test]
    async fn goals_require_a_visible_category_and_valid_hours() {
        let store = MemoryStore::new();
        let owner = signed_in(&store).await;
        let private = store
            .create_category(owner, NewCategory {
                name: "Private".to_string(),
                color: Some("#000000".to_string()),
            })
            .await
            .unwrap();

        let other = signed_in(&store).await;
        assert!(matches!(
            store.upsert_goal(other, private.id, dec!(1)).await,
            Err(DbError::NotFound(_))
        ));
        assert!(matches!(
            store.upsert_goal(owner, private.id, dec!(-1)).await,
            Err(DbError::Validation(_))
        ));
        assert!(matches!(
            store.upsert_goal(owner, Uuid::new_v4(), dec!(1)).await,
            Err(DbError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn entries_are_scoped_to_their_owner() {
        let store = MemoryStore::new();
        let owner = signed_in(&store).await;
        let other = signed_in(&store).await;

        let entry = store
            .create_entry(owner, NewEntry {
                category_id: DefaultCategory::Health.id(),
                duration_minutes: 45,
                notes: Some("  ".to_string()),
                recorded_at: None,
            })
            .await
            .unwrap();
        assert_eq!(entry.notes, None);

        assert!(store.list_entries(other, None).await.unwrap().is_empty());
        assert!(matches!(
            store.delete_entry(other, entry.id).await,
            Err(DbError::NotFound(_))
        ));
        store.delete_entry(owner, entry.id).await.unwrap();
        assert!(store.list_entries(owner, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_entries_filters_by_since_newest_first() {
        let store = MemoryStore::new();
        let user = signed_in(&store).await;
        let now = Utc::now();
        for days_ago in [1, 10, 3] {
            store
                .create_entry(user, NewEntry {
                    category_id: DefaultCategory::Faith.id(),
                    duration_minutes: 30,
                    notes: None,
                    recorded_at: Some(now - chrono::Duration::days(days_ago)),
                })
                .await
                .unwrap();
        }

        let recent = store
            .list_entries(user, Some(now - chrono::Duration::days(7)))
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].recorded_at > recent[1].recorded_at);
    }
}
