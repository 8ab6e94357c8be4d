use crate::{
    error::AppError,
    queries::{self, Write},
    session::AuthSession,
    AppState,
};
use analytics::{ProgressReport, ProgressWindow, DEFAULT_WINDOW_DAYS};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use core_types::{
    ActionResult, CategoryGoal, NewCategory, NewEntry, Profile, ProfileUpdate, WellnessCategory,
    WellnessEntry,
};
use query_cache::CacheStats;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

pub mod auth;
pub mod pages;

/// Entries default to a month so the list view has some history.
const DEFAULT_ENTRY_DAYS: u32 = 30;

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub days: Option<u32>,
}

impl WindowQuery {
    fn window(&self, default_days: u32) -> Result<ProgressWindow, AppError> {
        Ok(ProgressWindow::ending_today(self.days.unwrap_or(default_days))?)
    }
}

#[derive(Debug, Deserialize)]
pub struct GoalForm {
    pub target_hours: Decimal,
}

/// # GET /api/health
pub async fn health() -> Json<ActionResult<&'static str>> {
    Json(ActionResult::ok("OK"))
}

/// # GET /api/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
) -> Result<Json<ActionResult<Profile>>, AppError> {
    let profile = queries::profile(&state, session.user.id).await?;
    Ok(Json(ActionResult::ok(profile)))
}

/// # PUT /api/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ActionResult<Profile>>, AppError> {
    let user_id = session.user.id;
    let profile = state.store.update_profile(user_id, update).await?;
    queries::invalidate(&state, user_id, Write::Profile);
    Ok(Json(ActionResult::ok(profile)))
}

/// # GET /api/categories
/// System defaults plus the caller's own categories.
pub async fn get_categories(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
) -> Result<Json<ActionResult<Vec<WellnessCategory>>>, AppError> {
    let categories = queries::categories(&state, session.user.id).await?;
    Ok(Json(ActionResult::ok(categories)))
}

/// # POST /api/categories
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Json(new): Json<NewCategory>,
) -> Result<(StatusCode, Json<ActionResult<WellnessCategory>>), AppError> {
    let user_id = session.user.id;
    let category = state.store.create_category(user_id, new).await?;
    queries::invalidate(&state, user_id, Write::Category);
    tracing::info!(%user_id, category_id = %category.id, "Category created.");
    Ok((StatusCode::CREATED, Json(ActionResult::ok(category))))
}

/// # GET /api/goals
pub async fn get_goals(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
) -> Result<Json<ActionResult<Vec<CategoryGoal>>>, AppError> {
    let goals = queries::goals(&state, session.user.id).await?;
    Ok(Json(ActionResult::ok(goals)))
}

/// # PUT /api/goals/:category_id
/// Sets the weekly target for one category. Last write wins.
pub async fn upsert_goal(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(category_id): Path<Uuid>,
    Json(form): Json<GoalForm>,
) -> Result<Json<ActionResult<CategoryGoal>>, AppError> {
    let user_id = session.user.id;
    let goal = state
        .store
        .upsert_goal(user_id, category_id, form.target_hours)
        .await?;
    queries::invalidate(&state, user_id, Write::Goal);
    Ok(Json(ActionResult::ok(goal)))
}

/// # GET /api/entries?days=N
pub async fn get_entries(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Query(query): Query<WindowQuery>,
) -> Result<Json<ActionResult<Vec<WellnessEntry>>>, AppError> {
    let window = query.window(DEFAULT_ENTRY_DAYS)?;
    let entries = queries::entries(&state, session.user.id, window).await?;
    Ok(Json(ActionResult::ok(entries)))
}

/// # POST /api/entries
pub async fn create_entry(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Json(new): Json<NewEntry>,
) -> Result<(StatusCode, Json<ActionResult<WellnessEntry>>), AppError> {
    let user_id = session.user.id;
    let entry = state.store.create_entry(user_id, new).await?;
    queries::invalidate(&state, user_id, Write::Entry);
    Ok((StatusCode::CREATED, Json(ActionResult::ok(entry))))
}

/// # DELETE /api/entries/:entry_id
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<ActionResult<()>>, AppError> {
    let user_id = session.user.id;
    state.store.delete_entry(user_id, entry_id).await?;
    queries::invalidate(&state, user_id, Write::Entry);
    Ok(Json(ActionResult::done()))
}

/// # GET /api/progress?days=N
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Query(query): Query<WindowQuery>,
) -> Result<Json<ActionResult<ProgressReport>>, AppError> {
    let window = query.window(DEFAULT_WINDOW_DAYS)?;
    let report = queries::progress(&state, session.user.id, window).await?;
    Ok(Json(ActionResult::ok(report)))
}

/// # GET /api/debug/cache
/// Only routed in debug mode. Lists the caller's keys only.
pub async fn cache_stats(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
) -> Json<ActionResult<CacheStats>> {
    Json(ActionResult::ok(queries::stats_for(&state, session.user.id)))
}

/// # POST /api/debug/cache/clear
pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
) -> Json<ActionResult<()>> {
    state.cache.clear();
    tracing::info!(user_id = %session.user.id, "Query cache cleared from the debug view.");
    Json(ActionResult::done())
}

/// Any unmatched path.
pub async fn not_found() -> AppError {
    AppError::NotFound("No such route".to_string())
}
