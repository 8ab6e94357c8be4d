//! Cached reads and the invalidations that go with each write.
//!
//! Every key is per user and carries two tags: one for the table it mirrors
//! (`entries:{user}`) and `user:{user}` so sign-out can drop everything at once.

use crate::error::AppError;
use crate::AppState;
use analytics::{ProgressEngine, ProgressReport, ProgressWindow};
use core_types::{CategoryGoal, Profile, WellnessCategory, WellnessEntry};
use query_cache::{CacheStats, SetOptions};
use uuid::Uuid;

fn user_tag(user: Uuid) -> String {
    format!("user:{}", user)
}

fn table_tag(table: &str, user: Uuid) -> String {
    format!("{}:{}", table, user)
}

fn options(table: &str, user: Uuid) -> SetOptions {
    SetOptions::new()
        .tag(table_tag(table, user))
        .tag(user_tag(user))
}

pub async fn profile(state: &AppState, user: Uuid) -> Result<Profile, AppError> {
    let key = format!("profile:{}", user);
    state
        .cache
        .get_or_fetch(&key, options("profile", user), || async {
            Ok::<_, AppError>(state.store.get_profile(user).await?)
        })
        .await
}

pub async fn categories(state: &AppState, user: Uuid) -> Result<Vec<WellnessCategory>, AppError> {
    let key = format!("categories:{}", user);
    state
        .cache
        .get_or_fetch(&key, options("categories", user), || async {
            Ok::<_, AppError>(state.store.list_categories(user).await?)
        })
        .await
}

pub async fn goals(state: &AppState, user: Uuid) -> Result<Vec<CategoryGoal>, AppError> {
    let key = format!("goals:{}", user);
    state
        .cache
        .get_or_fetch(&key, options("goals", user), || async {
            Ok::<_, AppError>(state.store.list_goals(user).await?)
        })
        .await
}

pub async fn entries(state: &AppState, user: Uuid, window: ProgressWindow) -> Result<Vec<WellnessEntry>, AppError> {
    // The end date is part of the key so a new day starts with a fresh read.
    let key = format!("entries:{}:{}:{}", user, window.days, window.end);
    state
        .cache
        .get_or_fetch(&key, options("entries", user), || async {
            Ok::<_, AppError>(state.store.list_entries(user, Some(window.since())).await?)
        })
        .await
}

pub async fn progress(state: &AppState, user: Uuid, window: ProgressWindow) -> Result<ProgressReport, AppError> {
    let key = format!("progress:{}:{}:{}", user, window.days, window.end);
    state
        .cache
        .get_or_fetch(&key, options("progress", user), || async {
            let categories = categories(state, user).await?;
            let goals = goals(state, user).await?;
            let entries = entries(state, user, window).await?;
            Ok::<_, AppError>(ProgressEngine::new().summarize(&categories, &goals, &entries, window))
        })
        .await
}

/// Which cached reads a write makes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write {
    Profile,
    Category,
    Goal,
    Entry,
}

pub fn invalidate(state: &AppState, user: Uuid, write: Write) {
    let tables: &[&str] = match write {
        Write::Profile => &["profile"],
        Write::Category => &["categories", "progress"],
        Write::Goal => &["goals", "progress"],
        Write::Entry => &["entries", "progress"],
    };
    for table in tables {
        state.cache.invalidate(&table_tag(table, user));
    }
}

/// Cache counters with the key list narrowed to `user`'s own reads.
pub fn stats_for(state: &AppState, user: Uuid) -> CacheStats {
    let tag = user_tag(user);
    let mut stats = state.cache.stats();
    stats.keys.retain(|k| k.tags.contains(&tag));
    stats
}

/// Drops every cached read of `user`.
pub fn forget_user(state: &AppState, user: Uuid) {
    let removed = state.cache.invalidate(&user_tag(user));
    tracing::debug!(%user, removed, "Cleared cached reads for user.");
}
