use crate::error::DbError;
use crate::store::WellnessStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::validation::{
    palette_color, validate_category_name, validate_color, validate_duration,
    validate_profile_update, validate_target_hours,
};
use core_types::{
    AuthUser, CategoryGoal, NewCategory, NewEntry, Profile, ProfileUpdate, WellnessCategory,
    WellnessEntry,
};
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use uuid::Uuid;

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

const PROFILE_COLUMNS: &str =
    "id, email, display_name, avatar_url, email_verified, onboarding_completed, created_at, updated_at";
const ENTRY_COLUMNS: &str = "id, user_id, category_id, duration_minutes, notes, recorded_at, created_at";

/// Maps constraint violations to the domain errors the HTTP layer understands.
fn map_write_error(e: sqlx::Error, conflict: &str) -> DbError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => DbError::Conflict(conflict.to_string()),
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => DbError::not_found("Profile"),
        _ => e.into(),
    }
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl WellnessStore for DbRepository {
    async fn get_profile(&self, user_id: Uuid) -> Result<Profile, DbError> {
        sqlx::query_as::<_, Profile>(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Profile"))
    }

    async fn ensure_profile(&self, user: &AuthUser) -> Result<Profile, DbError> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            r#"
            INSERT INTO profiles (id, email, email_verified)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
                SET email = EXCLUDED.email,
                    email_verified = EXCLUDED.email_verified,
                    updated_at = now()
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(user.email_verified())
        .fetch_one(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<Profile, DbError> {
        let update = validate_profile_update(update)?;
        sqlx::query_as::<_, Profile>(&format!(
            r#"
            UPDATE profiles
            SET display_name = COALESCE($2, display_name),
                avatar_url = COALESCE($3, avatar_url),
                onboarding_completed = COALESCE($4, onboarding_completed),
                updated_at = now()
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(update.display_name)
        .bind(update.avatar_url)
        .bind(update.onboarding_completed)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Profile"))
    }

    async fn list_categories(&self, user_id: Uuid) -> Result<Vec<WellnessCategory>, DbError> {
        let categories = sqlx::query_as::<_, WellnessCategory>(
            r#"
            SELECT id, name, color, user_id, created_at
            FROM categories
            WHERE user_id IS NULL OR user_id = $1
            ORDER BY (user_id IS NOT NULL), name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn get_category(&self, user_id: Uuid, category_id: Uuid) -> Result<WellnessCategory, DbError> {
        sqlx::query_as::<_, WellnessCategory>(
            r#"
            SELECT id, name, color, user_id, created_at
            FROM categories
            WHERE id = $1 AND (user_id IS NULL OR user_id = $2)
            "#,
        )
        .bind(category_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Category"))
    }

    async fn create_category(&self, user_id: Uuid, category: NewCategory) -> Result<WellnessCategory, DbError> {
        let name = validate_category_name(&category.name)?;
        let color = match category.color.as_deref() {
            Some(color) => validate_color(color)?,
            None => {
                let owned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_one(&self.pool)
                    .await?;
                palette_color(owned as usize).to_string()
            }
        };

        let conflict = format!("A category named '{}' already exists", name);
        sqlx::query_as::<_, WellnessCategory>(
            r#"
            INSERT INTO categories (id, name, color, user_id)
            SELECT $1, $2, $3, $4
            WHERE NOT EXISTS (
                SELECT 1 FROM categories
                WHERE lower(name) = lower($2) AND (user_id IS NULL OR user_id = $4)
            )
            RETURNING id, name, color, user_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&name)
        .bind(&color)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &conflict))?
        .ok_or(DbError::Conflict(conflict))
    }

    async fn list_goals(&self, user_id: Uuid) -> Result<Vec<CategoryGoal>, DbError> {
        let goals = sqlx::query_as::<_, CategoryGoal>(
            "SELECT user_id, category_id, target_hours, updated_at FROM category_goals WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(goals)
    }

    async fn upsert_goal(&self, user_id: Uuid, category_id: Uuid, target_hours: Decimal) -> Result<CategoryGoal, DbError> {
        let target_hours = validate_target_hours(target_hours)?;
        self.get_category(user_id, category_id).await?;

        let goal = sqlx::query_as::<_, CategoryGoal>(
            r#"
            INSERT INTO category_goals (user_id, category_id, target_hours)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, category_id) DO UPDATE
                SET target_hours = EXCLUDED.target_hours,
                    updated_at = now()
            RETURNING user_id, category_id, target_hours, updated_at
            "#,
        )
        .bind(user_id)
        .bind(category_id)
        .bind(target_hours)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Goal already exists"))?;
        Ok(goal)
    }

    async fn list_entries(&self, user_id: Uuid, since: Option<DateTime<Utc>>) -> Result<Vec<WellnessEntry>, DbError> {
        let entries = sqlx::query_as::<_, WellnessEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM entries
            WHERE user_id = $1 AND ($2::timestamptz IS NULL OR recorded_at >= $2)
            ORDER BY recorded_at DESC
            "#
        ))
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn create_entry(&self, user_id: Uuid, entry: NewEntry) -> Result<WellnessEntry, DbError> {
        let duration = validate_duration(entry.duration_minutes)?;
        self.get_category(user_id, entry.category_id).await?;

        let created = sqlx::query_as::<_, WellnessEntry>(&format!(
            r#"
            INSERT INTO entries (id, user_id, category_id, duration_minutes, notes, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(entry.category_id)
        .bind(duration)
        .bind(entry.notes.filter(|n| !n.trim().is_empty()))
        .bind(entry.recorded_at.unwrap_or_else(Utc::now))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Entry already exists"))?;
        Ok(created)
    }

    async fn delete_entry(&self, user_id: Uuid, entry_id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM entries WHERE id = $1 AND user_id = $2")
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Entry"));
        }
        Ok(())
    }
}
