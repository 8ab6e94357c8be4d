//! Import of the old single-document export into the normalized tables.
//!
//! The earlier app kept everything in one JSON blob keyed by category *name*:
//!
//! ```json
//! { "entries": [ { "category": "Work", "duration": 90, "date": "2024-01-02", "notes": "..." } ],
//!   "goals": { "Work": 10.0 } }
//! ```
//!
//! Names are resolved case-insensitively against the user's visible categories;
//! unknown names become user-owned categories. Rows that fail validation are
//! skipped and counted, store failures abort the import.

use crate::error::DbError;
use crate::store::WellnessStore;
use chrono::{DateTime, NaiveDate, Utc};
use core_types::validation::{validate_duration, validate_target_hours};
use core_types::{AuthUser, NewCategory, NewEntry};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyExport {
    #[serde(default)]
    pub entries: Vec<LegacyEntry>,
    #[serde(default)]
    pub goals: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyEntry {
    pub category: String,
    /// Minutes. Older exports wrote fractional values.
    pub duration: f64,
    /// `YYYY-MM-DD` or a full RFC 3339 timestamp.
    pub date: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LegacyExport {
    pub fn from_json(text: &str) -> Result<Self, DbError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn total_rows(&self) -> usize {
        self.entries.len() + self.goals.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub entries_imported: usize,
    pub goals_imported: usize,
    pub categories_created: usize,
    pub skipped: usize,
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Whole minutes, or `None` when the value could never be stored.
fn legacy_minutes(duration: f64) -> Option<i32> {
    if !duration.is_finite() {
        return None;
    }
    validate_duration(duration.round() as i32).ok()
}

struct CategoryResolver<'a> {
    store: &'a dyn WellnessStore,
    user_id: Uuid,
    by_name: HashMap<String, Uuid>,
    created: usize,
}

impl CategoryResolver<'_> {
    /// `Ok(None)` when the name itself is unusable.
    async fn resolve(&mut self, name: &str) -> Result<Option<Uuid>, DbError> {
        let key = name.trim().to_lowercase();
        if let Some(id) = self.by_name.get(&key) {
            return Ok(Some(*id));
        }
        let new = NewCategory {
            name: name.to_string(),
            color: None,
        };
        match self.store.create_category(self.user_id, new).await {
            Ok(category) => {
                self.created += 1;
                self.by_name.insert(key, category.id);
                Ok(Some(category.id))
            }
            Err(DbError::Validation(e)) => {
                tracing::warn!(name, error = %e, "Skipping legacy category.");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Imports `export` for `user`, calling `on_row` after every processed row.
pub async fn import_legacy(
    store: &dyn WellnessStore,
    user: &AuthUser,
    export: LegacyExport,
    mut on_row: impl FnMut(),
) -> Result<ImportSummary, DbError> {
    // An existing profile keeps its verification state.
    match store.get_profile(user.id).await {
        Ok(_) => {}
        Err(DbError::NotFound(_)) => {
            store.ensure_profile(user).await?;
        }
        Err(e) => return Err(e),
    }

    let by_name = store
        .list_categories(user.id)
        .await?
        .into_iter()
        .map(|c| (c.name.to_lowercase(), c.id))
        .collect();
    let mut resolver = CategoryResolver {
        store,
        user_id: user.id,
        by_name,
        created: 0,
    };
    let mut summary = ImportSummary::default();

    for row in export.entries {
        // Only rows that would be stored may create a category.
        let valid = parse_date(&row.date).zip(legacy_minutes(row.duration));
        let Some((recorded_at, duration_minutes)) = valid else {
            tracing::warn!(category = %row.category, date = %row.date, duration = row.duration, "Skipping unreadable legacy entry.");
            summary.skipped += 1;
            on_row();
            continue;
        };

        match resolver.resolve(&row.category).await? {
            Some(category_id) => {
                let entry = NewEntry {
                    category_id,
                    duration_minutes,
                    notes: row.notes,
                    recorded_at: Some(recorded_at),
                };
                match store.create_entry(user.id, entry).await {
                    Ok(_) => summary.entries_imported += 1,
                    Err(DbError::Validation(e)) => {
                        tracing::warn!(error = %e, date = %row.date, "Skipping legacy entry.");
                        summary.skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
            None => summary.skipped += 1,
        }
        on_row();
    }

    for (name, hours) in export.goals {
        let hours = match validate_target_hours(hours) {
            Ok(hours) => hours,
            Err(e) => {
                tracing::warn!(category = %name, error = %e, "Skipping legacy goal.");
                summary.skipped += 1;
                on_row();
                continue;
            }
        };
        match resolver.resolve(&name).await? {
            Some(category_id) => match store.upsert_goal(user.id, category_id, hours).await {
                Ok(_) => summary.goals_imported += 1,
                Err(DbError::Validation(e)) => {
                    tracing::warn!(category = %name, error = %e, "Skipping legacy goal.");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e),
            },
            None => summary.skipped += 1,
        }
        on_row();
    }

    summary.categories_created = resolver.created;
    tracing::info!(?summary, user_id = %user.id, "Legacy import finished.");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use core_types::DefaultCategory;
    use rust_decimal_macros::dec;

    fn user() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "legacy@example.com".to_string(),
            email_confirmed_at: None,
        }
    }

    const EXPORT: &str = r#"{
        "entries": [
            { "category": "work", "duration": 90, "date": "2024-01-02" },
            { "category": "Gardening", "duration": 30.4, "date": "2024-01-03T08:00:00Z", "notes": "roses" },
            { "category": "gardening", "duration": 15, "date": "2024-01-04" },
            { "category": "Work", "duration": 0, "date": "2024-01-05" },
            { "category": "Work", "duration": 20, "date": "yesterday" },
            { "category": "   ", "duration": 20, "date": "2024-01-06" }
        ],
        "goals": { "WORK": 10.0, "Gardening": 2.5, "Life": -3 }
    }"#;

    #[tokio::test]
    async fn import_normalizes_names_and_counts_skips() {
        let store = MemoryStore::new();
        let user = user();
        let export = LegacyExport::from_json(EXPORT).unwrap();
        assert_eq!(export.total_rows(), 9);

        let mut rows = 0;
        let summary = import_legacy(&store, &user, export, || rows += 1).await.unwrap();

        assert_eq!(rows, 9);
        assert_eq!(
            summary,
            ImportSummary {
                entries_imported: 3,
                goals_imported: 2,
                categories_created: 1,
                skipped: 4,
            }
        );

        let entries = store.list_entries(user.id, None).await.unwrap();
        let work = entries
            .iter()
            .filter(|e| e.category_id == DefaultCategory::Work.id())
            .count();
        assert_eq!(work, 1);
        assert!(entries.iter().any(|e| e.duration_minutes == 30 && e.notes.as_deref() == Some("roses")));

        let goals = store.list_goals(user.id).await.unwrap();
        let work_goal = goals
            .iter()
            .find(|g| g.category_id == DefaultCategory::Work.id())
            .unwrap();
        assert_eq!(work_goal.target_hours, dec!(10));
    }

    #[tokio::test]
    async fn skipped_rows_do_not_create_categories() {
        let store = MemoryStore::new();
        let user = user();
        let export = LegacyExport::from_json(
            r#"{
                "entries": [
                    { "category": "Knitting", "duration": 20, "date": "yesterday" },
                    { "category": "Pottery", "duration": 0, "date": "2024-01-01" },
                    { "category": "Baking", "duration": 2000, "date": "2024-01-01" }
                ],
                "goals": { "Chess": 500 }
            }"#,
        )
        .unwrap();

        let summary = import_legacy(&store, &user, export, || {}).await.unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                entries_imported: 0,
                goals_imported: 0,
                categories_created: 0,
                skipped: 4,
            }
        );
        let categories = store.list_categories(user.id).await.unwrap();
        assert_eq!(categories.len(), DefaultCategory::ALL.len());
    }

    #[test]
    fn minutes_are_rounded_and_bounded() {
        assert_eq!(legacy_minutes(30.4), Some(30));
        assert_eq!(legacy_minutes(0.2), None);
        assert_eq!(legacy_minutes(f64::NAN), None);
        assert_eq!(legacy_minutes(1e12), None);
    }

    #[test]
    fn dates_accept_plain_days_and_timestamps() {
        assert!(parse_date("2024-02-29").is_some());
        assert!(parse_date("2024-01-03T08:00:00+02:00").is_some());
        assert!(parse_date("02/01/2024").is_none());
    }
}
