//! HTTP API
//!
//! Routes are grouped under `/api/user`, `/api/task` and `/api/error`.
//! Everything except signup, login and the password reset pair sits behind
//! [`auth::require_auth`].

pub mod auth;
pub mod error;
mod logs;
mod task;
mod user;

use std::sync::Arc;

use accounts::{Mailer, SessionKeys};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use db::Database;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error_log;

/// Settings the handlers need from the config file
#[derive(Debug, Clone)]
pub struct WebSettings {
    pub production: bool,
    pub frontend_url: String,
}

/// Shared state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub accounts: accounts::Store,
    pub tasks: tasks::Store,
    pub error_log: error_log::Store,
    pub sessions: SessionKeys,
    pub mailer: Mailer,
    pub settings: Arc<WebSettings>,
}

impl AppState {
    pub fn new(db: Database, sessions: SessionKeys, mailer: Mailer, settings: WebSettings) -> Self {
        Self {
            accounts: accounts::Store::new(db.clone()),
            tasks: tasks::Store::new(db.clone()),
            error_log: error_log::Store::new(db),
            sessions,
            mailer,
            settings: Arc::new(settings),
        }
    }
}

/// Build the web router
pub fn build_router(state: AppState) -> Router {
    let protected = from_fn_with_state(state.clone(), auth::require_auth);

    let user_routes = Router::new()
        .route("/profile", get(user::profile))
        .route("/logout", post(user::logout))
        .route_layer(protected.clone())
        .route("/signup", post(user::signup))
        .route("/login", post(user::login))
        .route("/forgot-password", post(user::forgot_password))
        .route("/reset-password", post(user::reset_password));

    let task_routes = Router::new()
        .route("/", get(task::list_tasks))
        .route("/create", post(task::create_task))
        .route(
            "/:id",
            get(task::get_task)
                .put(task::update_task)
                .delete(task::delete_task),
        )
        .route_layer(protected.clone());

    let error_routes = Router::new()
        .route("/", get(logs::list_errors))
        .route_layer(protected);

    Router::new()
        .route("/", get(root))
        .nest("/api/user", user_routes)
        .nest("/api/task", task_routes)
        .nest("/api/error", error_routes)
        .layer(from_fn_with_state(state.clone(), error_log::record_errors))
        .layer(TraceLayer::new_for_http())
        .layer(cors(&state.settings.frontend_url))
        .with_state(state)
}

async fn root() -> &'static str {
    "api is working fine"
}

fn cors(frontend_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true);

    match frontend_url.trim_end_matches('/').parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            warn!("Invalid frontend URL {frontend_url:?}, cross-origin requests disabled: {e}");
            layer
        }
    }
}
