//! Session transport and the route guard.
//!
//! A session is an access/refresh token pair from the auth API. Browsers carry
//! it in two HTTP-only cookies; API clients may send `Authorization: Bearer`.
//! The guard is binary: a verified user reaches the handler, anyone else is
//! turned away (401 for API routes, a redirect to `/sign-in` for pages).

use crate::error::AppError;
use crate::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use core_types::{AuthUser, Session};
use std::sync::Arc;

pub const ACCESS_COOKIE: &str = "wb-access-token";
pub const REFRESH_COOKIE: &str = "wb-refresh-token";

/// A request made by a signed-in user.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: AuthUser,
    pub access_token: String,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn cookie_token(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(ACCESS_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| cookie_token(parts))
            .ok_or(AppError::Unauthenticated)?;

        match state.auth.get_user(&token).await {
            Ok(user) => Ok(AuthSession {
                user,
                access_token: token,
            }),
            Err(e) if e.is_unauthorized() => {
                tracing::debug!(error = %e, "Rejected session token.");
                Err(AppError::Unauthenticated)
            }
            Err(e) => Err(AppError::Auth(e)),
        }
    }
}

/// The guard for page routes: an unauthenticated visitor is sent to sign in.
#[derive(Debug, Clone)]
pub struct PageSession(pub AuthSession);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for PageSession {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        match AuthSession::from_request_parts(parts, state).await {
            Ok(session) => Ok(PageSession(session)),
            Err(AppError::Unauthenticated) => {
                let next = parts.uri.path();
                Err(Redirect::to(&sign_in_location(next)).into_response())
            }
            Err(e) => Err(e.into_response()),
        }
    }
}

/// `/sign-in?next=<path>`, dropping `next` unless it is a plain local path.
pub fn sign_in_location(next: &str) -> String {
    match safe_next(next) {
        Some(next) if next != "/" => format!("/sign-in?next={}", next),
        _ => "/sign-in".to_string(),
    }
}

/// Accepts only same-site absolute paths made of unreserved characters.
pub fn safe_next(next: &str) -> Option<&str> {
    let plain = next.starts_with('/')
        && !next.starts_with("//")
        && next
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_'));
    plain.then_some(next)
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Stores both tokens of `session` in the jar.
pub fn with_session(jar: CookieJar, session: &Session, secure: bool) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, session.access_token.clone(), secure))
        .add(session_cookie(REFRESH_COOKIE, session.refresh_token.clone(), secure))
}

/// Expires both session cookies.
pub fn without_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"))
}
