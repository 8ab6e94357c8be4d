use api_client::AuthProvider;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use configuration::{PublicConfig, Settings};
use core_types::ActionResult;
use database::WellnessStore;
use query_cache::QueryCache;
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowHeaders, AllowOrigin, Any as AnyCors, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;
pub mod queries;
pub mod session;

/// Per-process switches the handlers read.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Routes the cache debug view.
    pub debug_mode: bool,
    /// Marks session cookies `Secure`; on everywhere but local development.
    pub secure_cookies: bool,
    pub public: PublicConfig,
}

impl ServerOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            debug_mode: settings.debug_mode,
            secure_cookies: settings.is_production(),
            public: settings.public(),
        }
    }
}

/// The shared application state that all handlers can access.
pub struct AppState {
    pub store: Arc<dyn WellnessStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub cache: QueryCache,
    pub options: ServerOptions,
}

impl AppState {
    pub fn new(
        store: Arc<dyn WellnessStore>,
        auth: Arc<dyn AuthProvider>,
        cache_ttl: Duration,
        options: ServerOptions,
    ) -> Self {
        Self {
            store,
            auth,
            cache: QueryCache::new(cache_ttl),
            options,
        }
    }
}

/// Last-resort handler for a panicking request: the client gets the envelope,
/// the details only go to the log.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(%detail, "Request handler panicked.");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ActionResult::<()>::err("Something went wrong. Please try again.")),
    )
        .into_response()
}

/// Builds the full application router over `state`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(AnyCors)
        .allow_headers(AllowHeaders::any());

    let mut router = Router::new()
        // --- Pages ---
        .route("/", get(handlers::pages::index))
        .route("/sign-in", get(handlers::pages::sign_in_page))
        .route("/dashboard", get(handlers::pages::dashboard))
        // --- Session ---
        .route("/auth/sign-in", post(handlers::auth::sign_in))
        .route("/auth/sign-up", post(handlers::auth::sign_up))
        .route("/auth/sign-out", post(handlers::auth::sign_out))
        .route("/auth/refresh", post(handlers::auth::refresh))
        // --- Data ---
        .route("/api/health", get(handlers::health))
        .route(
            "/api/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route(
            "/api/categories",
            get(handlers::get_categories).post(handlers::create_category),
        )
        .route("/api/goals", get(handlers::get_goals))
        .route("/api/goals/:category_id", put(handlers::upsert_goal))
        .route(
            "/api/entries",
            get(handlers::get_entries).post(handlers::create_entry),
        )
        .route("/api/entries/:entry_id", delete(handlers::delete_entry))
        .route("/api/progress", get(handlers::get_progress));

    if state.options.debug_mode {
        router = router
            .route("/api/debug/cache", get(handlers::cache_stats))
            .route("/api/debug/cache/clear", post(handlers::clear_cache));
    }

    router
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CatchPanicLayer::custom(panic_response))
}

/// Binds `settings.server_addr` (or `addr`) and serves until Ctrl-C.
pub async fn run_server(
    settings: &Settings,
    addr: Option<SocketAddr>,
    store: Arc<dyn WellnessStore>,
    auth: Arc<dyn AuthProvider>,
) -> anyhow::Result<()> {
    // Tracing is initialized by the binary before we get here.
    let addr = addr.unwrap_or(settings.server_addr);
    let state = Arc::new(AppState::new(
        store,
        auth,
        settings.cache_ttl,
        ServerOptions::from_settings(settings),
    ));
    if state.options.debug_mode {
        tracing::warn!("Debug mode is on: the cache debug view is routed.");
    }
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, env = ?settings.app_env, "Web server listening.");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for the shutdown signal.");
            }
            tracing::info!("Shutting down.");
        })
        .await?;

    Ok(())
}
