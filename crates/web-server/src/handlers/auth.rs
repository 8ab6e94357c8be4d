use crate::{
    error::AppError,
    queries::{self, Write},
    session::{safe_next, with_session, without_session, AuthSession, REFRESH_COOKIE},
    AppState,
};
use api_client::{error::ApiError, SignUpOutcome};
use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use core_types::validation::{validate_email, validate_password};
use core_types::{ActionResult, AuthUser, Profile};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshForm {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct SignedIn {
    pub user: AuthUser,
    pub profile: Profile,
    pub redirect_to: String,
}

#[derive(Debug, Serialize)]
pub struct SignUpResult {
    pub confirmation_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_in: Option<SignedIn>,
}

/// # POST /auth/sign-in
/// Exchanges credentials for a session, creating the profile on first sign-in.
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(form): Json<SignInForm>,
) -> Result<(CookieJar, Json<ActionResult<SignedIn>>), AppError> {
    let email = validate_email(&form.email)?;
    let session = state.auth.sign_in(&email, &form.password).await?;
    let profile = state.store.ensure_profile(&session.user).await?;
    queries::invalidate(&state, session.user.id, Write::Profile);
    tracing::info!(user_id = %session.user.id, "User signed in.");

    let redirect_to = form
        .next
        .as_deref()
        .and_then(safe_next)
        .unwrap_or("/dashboard")
        .to_string();
    let jar = with_session(jar, &session, state.options.secure_cookies);
    Ok((
        jar,
        Json(ActionResult::ok(SignedIn {
            user: session.user,
            profile,
            redirect_to,
        })),
    ))
}

/// # POST /auth/sign-up
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(form): Json<SignUpForm>,
) -> Result<(CookieJar, Json<ActionResult<SignUpResult>>), AppError> {
    let email = validate_email(&form.email)?;
    validate_password(&form.password)?;

    match state.auth.sign_up(&email, &form.password).await? {
        SignUpOutcome::SignedIn(session) => {
            let profile = state.store.ensure_profile(&session.user).await?;
            queries::invalidate(&state, session.user.id, Write::Profile);
            tracing::info!(user_id = %session.user.id, "User signed up.");
            let jar = with_session(jar, &session, state.options.secure_cookies);
            let result = SignUpResult {
                confirmation_required: false,
                signed_in: Some(SignedIn {
                    user: session.user,
                    profile,
                    redirect_to: "/dashboard".to_string(),
                }),
            };
            Ok((jar, Json(ActionResult::ok(result))))
        }
        SignUpOutcome::ConfirmationRequired(user) => {
            tracing::info!(user_id = %user.id, "Sign-up awaiting e-mail confirmation.");
            let result = SignUpResult {
                confirmation_required: true,
                signed_in: None,
            };
            Ok((jar, Json(ActionResult::ok(result))))
        }
    }
}

/// # POST /auth/sign-out
/// Always ends the local session, even when the auth API cannot be reached.
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    session: Option<AuthSession>,
    jar: CookieJar,
) -> (CookieJar, Json<ActionResult<()>>) {
    if let Some(session) = session {
        if let Err(e) = state.auth.sign_out(&session.access_token).await {
            tracing::warn!(error = %e, user_id = %session.user.id, "Remote sign-out failed; clearing local session anyway.");
        }
        queries::forget_user(&state, session.user.id);
        tracing::info!(user_id = %session.user.id, "User signed out.");
    }
    (without_session(jar), Json(ActionResult::done()))
}

/// # POST /auth/refresh
/// Trades the refresh token (cookie, or JSON body for API clients) for a new
/// session. Tried once; a failure ends the session.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Option<Json<RefreshForm>>,
) -> Result<(CookieJar, Json<ActionResult<AuthUser>>), (CookieJar, AppError)> {
    let token = body
        .map(|Json(form)| form.refresh_token)
        .or_else(|| jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()))
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        return Err((without_session(jar), AppError::Unauthenticated));
    };

    match state.auth.refresh(&token).await {
        Ok(session) => {
            let jar = with_session(jar, &session, state.options.secure_cookies);
            Ok((jar, Json(ActionResult::ok(session.user))))
        }
        Err(e @ ApiError::Rejected(..)) => {
            tracing::info!(error = %e, "Session refresh rejected.");
            Err((without_session(jar), AppError::SessionExpired))
        }
        Err(e) => Err((jar, AppError::Auth(e))),
    }
}
