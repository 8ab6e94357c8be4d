use crate::error::AnalyticsError;
use crate::report::{CategoryProgress, DailyPoint, ProgressReport};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use core_types::{CategoryGoal, WellnessCategory, WellnessEntry};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

pub const MAX_WINDOW_DAYS: u32 = 365;
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// A run of whole UTC days ending on (and including) `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressWindow {
    pub days: u32,
    pub end: NaiveDate,
}

impl ProgressWindow {
    pub fn new(days: u32, end: NaiveDate) -> Result<Self, AnalyticsError> {
        if days == 0 || days > MAX_WINDOW_DAYS {
            return Err(AnalyticsError::InvalidWindow(format!(
                "days must be between 1 and {}, got {}",
                MAX_WINDOW_DAYS, days
            )));
        }
        Ok(Self { days, end })
    }

    pub fn ending_today(days: u32) -> Result<Self, AnalyticsError> {
        Self::new(days, Utc::now().date_naive())
    }

    pub fn start(&self) -> NaiveDate {
        self.end - Duration::days(i64::from(self.days) - 1)
    }

    /// The first instant inside the window, for filtering queries.
    pub fn since(&self) -> DateTime<Utc> {
        self.start().and_time(chrono::NaiveTime::MIN).and_utc()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        day >= self.start() && day <= self.end
    }
}

/// A stateless calculator for deriving dashboard progress from entries and goals.
#[derive(Debug, Default)]
pub struct ProgressEngine {}

impl ProgressEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the report for `window`. Entries outside the window, or for
    /// categories not in `categories`, are ignored.
    pub fn summarize(
        &self,
        categories: &[WellnessCategory],
        goals: &[CategoryGoal],
        entries: &[WellnessEntry],
        window: ProgressWindow,
    ) -> ProgressReport {
        let known: HashMap<Uuid, usize> = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i))
            .collect();

        let mut minutes = vec![0_i64; categories.len()];
        let mut counts = vec![0_usize; categories.len()];
        let mut daily: BTreeMap<NaiveDate, BTreeMap<Uuid, i64>> = (0..window.days)
            .map(|offset| (window.start() + Duration::days(i64::from(offset)), BTreeMap::new()))
            .collect();

        for entry in entries.iter().filter(|e| window.contains(e.recorded_at)) {
            let Some(&idx) = known.get(&entry.category_id) else {
                tracing::debug!(entry_id = %entry.id, "Entry for an unknown category ignored.");
                continue;
            };
            let duration = i64::from(entry.duration_minutes);
            minutes[idx] += duration;
            counts[idx] += 1;
            if let Some(day) = daily.get_mut(&entry.recorded_at.date_naive()) {
                *day.entry(entry.category_id).or_insert(0) += duration;
            }
        }

        let goals: HashMap<Uuid, Decimal> = goals
            .iter()
            .map(|g| (g.category_id, g.target_hours))
            .collect();

        let rows: Vec<CategoryProgress> = categories
            .iter()
            .enumerate()
            .map(|(i, category)| {
                let hours = minutes_to_hours(minutes[i]);
                let goal_hours = goals
                    .get(&category.id)
                    .map(|weekly| scale_weekly_goal(*weekly, window.days));
                let completion_pct = goal_hours.filter(|g| !g.is_zero()).map(|g| {
                    (Decimal::from(minutes[i]) / Decimal::from(60) / g * Decimal::ONE_HUNDRED)
                        .round_dp(1)
                        .normalize()
                });
                CategoryProgress {
                    category_id: category.id,
                    name: category.name.clone(),
                    color: category.color.clone(),
                    total_minutes: minutes[i],
                    hours,
                    entry_count: counts[i],
                    goal_hours,
                    completion_pct,
                    display_pct: completion_pct.map(|p| p.min(Decimal::ONE_HUNDRED)),
                }
            })
            .collect();

        let total_minutes: i64 = minutes.iter().sum();
        // Ties keep the earlier category.
        let most_active_category = rows
            .iter()
            .filter(|r| r.total_minutes > 0)
            .fold(None::<&CategoryProgress>, |best, r| match best {
                Some(b) if b.total_minutes >= r.total_minutes => Some(b),
                _ => Some(r),
            })
            .map(|r| r.category_id);

        ProgressReport {
            window_start: window.start(),
            window_end: window.end,
            days: window.days,
            categories: rows,
            daily: daily
                .into_iter()
                .map(|(date, by_category)| DailyPoint {
                    date,
                    total_minutes: by_category.values().sum(),
                    minutes_by_category: by_category,
                })
                .collect(),
            total_minutes,
            total_hours: minutes_to_hours(total_minutes),
            most_active_category,
        }
    }
}

fn minutes_to_hours(minutes: i64) -> Decimal {
    (Decimal::from(minutes) / Decimal::from(60)).round_dp(2).normalize()
}

/// Goals are weekly; a 14-day window expects twice the target.
fn scale_weekly_goal(weekly: Decimal, days: u32) -> Decimal {
    (weekly * Decimal::from(days) / Decimal::from(7))
        .round_dp(2)
        .normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::DefaultCategory;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn category(c: DefaultCategory) -> WellnessCategory {
        WellnessCategory {
            id: c.id(),
            name: c.name().to_string(),
            color: c.color().to_string(),
            user_id: None,
            created_at: Utc::now(),
        }
    }

    fn entry(category: DefaultCategory, minutes: i32, date: NaiveDate, hour: u32) -> WellnessEntry {
        let at = date.and_hms_opt(hour, 0, 0).unwrap().and_utc();
        WellnessEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            category_id: category.id(),
            duration_minutes: minutes,
            notes: None,
            recorded_at: at,
            created_at: at,
        }
    }

    fn goal(category: DefaultCategory, hours: Decimal) -> CategoryGoal {
        CategoryGoal {
            user_id: Uuid::nil(),
            category_id: category.id(),
            target_hours: hours,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let window = ProgressWindow::new(7, day(2024, 3, 10)).unwrap();
        assert_eq!(window.start(), day(2024, 3, 4));
        assert!(window.contains(day(2024, 3, 4).and_hms_opt(0, 0, 0).unwrap().and_utc()));
        assert!(window.contains(day(2024, 3, 10).and_hms_opt(23, 59, 59).unwrap().and_utc()));
        assert!(!window.contains(day(2024, 3, 3).and_hms_opt(23, 59, 59).unwrap().and_utc()));
        assert_eq!(window.since(), day(2024, 3, 4).and_hms_opt(0, 0, 0).unwrap().and_utc());
    }

    #[test]
    fn window_length_is_validated() {
        assert!(ProgressWindow::new(0, day(2024, 1, 1)).is_err());
        assert!(ProgressWindow::new(366, day(2024, 1, 1)).is_err());
        assert!(ProgressWindow::new(365, day(2024, 1, 1)).is_ok());
    }

    #[test]
    fn summarize_totals_goals_and_daily_series() {
        let end = day(2024, 3, 10);
        let window = ProgressWindow::new(7, end).unwrap();
        let categories = vec![
            category(DefaultCategory::Work),
            category(DefaultCategory::Health),
            category(DefaultCategory::Faith),
        ];
        let goals = vec![goal(DefaultCategory::Work, dec!(10)), goal(DefaultCategory::Health, dec!(1))];
        let entries = vec![
            entry(DefaultCategory::Work, 120, day(2024, 3, 10), 9),
            entry(DefaultCategory::Work, 60, day(2024, 3, 8), 9),
            entry(DefaultCategory::Health, 90, day(2024, 3, 8), 18),
            // Outside the window.
            entry(DefaultCategory::Work, 600, day(2024, 3, 1), 9),
        ];

        let report = ProgressEngine::new().summarize(&categories, &goals, &entries, window);

        assert_eq!(report.total_minutes, 270);
        assert_eq!(report.total_hours, dec!(4.5));
        assert_eq!(report.most_active_category, Some(DefaultCategory::Work.id()));

        let work = &report.categories[0];
        assert_eq!(work.total_minutes, 180);
        assert_eq!(work.entry_count, 2);
        assert_eq!(work.hours, dec!(3));
        assert_eq!(work.goal_hours, Some(dec!(10)));
        assert_eq!(work.completion_pct, Some(dec!(30.0)));

        let health = &report.categories[1];
        assert_eq!(health.completion_pct, Some(dec!(150.0)));
        assert_eq!(health.display_pct, Some(dec!(100)));

        let faith = &report.categories[2];
        assert_eq!(faith.total_minutes, 0);
        assert_eq!(faith.goal_hours, None);
        assert_eq!(faith.completion_pct, None);

        assert_eq!(report.daily.len(), 7);
        assert_eq!(report.daily[0].date, day(2024, 3, 4));
        assert_eq!(report.daily[4].total_minutes, 150);
        assert_eq!(report.daily[6].minutes_by_category[&DefaultCategory::Work.id()], 120);
        assert_eq!(report.daily[5].total_minutes, 0);
    }

    #[test]
    fn goals_scale_with_the_window() {
        let window = ProgressWindow::new(14, day(2024, 3, 14)).unwrap();
        let report = ProgressEngine::new().summarize(
            &[category(DefaultCategory::Life)],
            &[goal(DefaultCategory::Life, dec!(3.5))],
            &[],
            window,
        );
        assert_eq!(report.categories[0].goal_hours, Some(dec!(7)));
        assert_eq!(report.categories[0].completion_pct, Some(dec!(0)));
        assert_eq!(report.most_active_category, None);
    }

    #[test]
    fn zero_goal_has_no_completion() {
        let window = ProgressWindow::new(7, day(2024, 3, 10)).unwrap();
        let report = ProgressEngine::new().summarize(
            &[category(DefaultCategory::Life)],
            &[goal(DefaultCategory::Life, dec!(0))],
            &[entry(DefaultCategory::Life, 30, day(2024, 3, 9), 8)],
            window,
        );
        assert_eq!(report.categories[0].goal_hours, Some(dec!(0)));
        assert_eq!(report.categories[0].completion_pct, None);
    }
}
