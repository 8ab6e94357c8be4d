//! Server-rendered pages. They carry just enough markup to be usable; the data
//! is embedded as JSON for the client scripts.

use crate::{
    error::AppError,
    queries,
    session::{safe_next, AuthSession, PageSession},
    AppState,
};
use analytics::{ProgressReport, ProgressWindow, DEFAULT_WINDOW_DAYS};
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use configuration::PublicConfig;
use core_types::{CategoryGoal, Profile, WellnessCategory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Everything the dashboard renders.
#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub profile: Profile,
    pub categories: Vec<WellnessCategory>,
    pub goals: Vec<CategoryGoal>,
    pub progress: ProgressReport,
    pub config: PublicConfig,
}

/// Escapes text for HTML element and attribute content.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON that can sit inside a `<script>` element.
fn script_json<T: Serialize>(value: &T) -> Result<String, AppError> {
    let json = serde_json::to_string(value)
        .map_err(|e| AppError::Internal(format!("failed to serialize page data: {}", e)))?;
    Ok(json.replace("</", "<\\/"))
}

/// # GET /
pub async fn index() -> Redirect {
    Redirect::to("/dashboard")
}

/// # GET /sign-in
/// Already signed-in visitors go straight on.
pub async fn sign_in_page(
    session: Option<AuthSession>,
    Query(query): Query<NextQuery>,
) -> Response {
    let next = query.next.as_deref().and_then(safe_next).unwrap_or("/dashboard");
    if session.is_some() {
        return Redirect::to(next).into_response();
    }

    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Sign in</title></head>
<body>
<main>
  <h1>Sign in</h1>
  <form id="sign-in" method="post" action="/auth/sign-in" data-next="{next}">
    <label>Email <input type="email" name="email" required></label>
    <label>Password <input type="password" name="password" minlength="6" required></label>
    <button type="submit">Sign in</button>
  </form>
</main>
</body>
</html>"#,
        next = escape(next)
    ))
    .into_response()
}

/// # GET /dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    PageSession(session): PageSession,
) -> Result<Html<String>, AppError> {
    let user_id = session.user.id;
    let window = ProgressWindow::ending_today(DEFAULT_WINDOW_DAYS)?;

    let view = DashboardView {
        profile: queries::profile(&state, user_id).await?,
        categories: queries::categories(&state, user_id).await?,
        goals: queries::goals(&state, user_id).await?,
        progress: queries::progress(&state, user_id, window).await?,
        config: state.options.public.clone(),
    };

    let greeting = view
        .profile
        .display_name
        .as_deref()
        .unwrap_or(&view.profile.email);
    let rows: String = view
        .progress
        .categories
        .iter()
        .map(|c| {
            let goal = c
                .goal_hours
                .map(|g| format!("{} h", g))
                .unwrap_or_else(|| "no goal".to_string());
            format!(
                "    <li style=\"color:{}\">{}: {} h of {}</li>\n",
                escape(&c.color),
                escape(&c.name),
                c.hours,
                goal
            )
        })
        .collect();

    Ok(Html(format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Dashboard</title></head>
<body>
<main>
  <h1>Welcome, {greeting}</h1>
  <p>{total} h logged in the last {days} days.</p>
  <ul id="categories">
{rows}  </ul>
  <form method="post" action="/auth/sign-out"><button type="submit">Sign out</button></form>
</main>
<script id="dashboard-data" type="application/json">{data}</script>
</body>
</html>"#,
        greeting = escape(greeting),
        total = view.progress.total_hours,
        days = view.progress.days,
        rows = rows,
        data = script_json(&view)?,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(escape("<b>\"Tom\" & 'Jerry'</b>"), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
    }

    #[test]
    fn script_json_cannot_close_the_script_element() {
        let json = script_json(&"</script><script>alert(1)").unwrap();
        assert!(!json.contains("</script>"));
    }
}
