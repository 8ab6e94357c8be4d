use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Everything the dashboard charts need for one window of days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub days: u32,
    /// One row per visible category, in the order the categories were given.
    pub categories: Vec<CategoryProgress>,
    /// One point per day, oldest first, including days without activity.
    pub daily: Vec<DailyPoint>,
    pub total_minutes: i64,
    pub total_hours: Decimal,
    pub most_active_category: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProgress {
    pub category_id: Uuid,
    pub name: String,
    pub color: String,
    pub total_minutes: i64,
    /// Rounded to 2 decimal places.
    pub hours: Decimal,
    pub entry_count: usize,
    /// The weekly goal scaled to the window length.
    pub goal_hours: Option<Decimal>,
    /// Uncapped; may exceed 100.
    pub completion_pct: Option<Decimal>,
    /// `completion_pct` capped at 100 for progress bars.
    pub display_pct: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub total_minutes: i64,
    pub minutes_by_category: BTreeMap<Uuid, i64>,
}
