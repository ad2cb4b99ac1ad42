//! HTTP front end.
//!
//! `router` wires the named routes to their handlers; `serve` binds the
//! configured address and runs until the shutdown token fires.

pub mod auth;
pub mod error;
pub mod forms;
pub mod notes;
pub mod routes;
pub mod templates;

use std::sync::Arc;

use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::storage::SqliteStore;

use auth::CurrentUser;
use error::AppError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The store, one connection shared behind an async lock.
    pub store: Arc<Mutex<SqliteStore>>,
    /// Lifetime of sessions created at login or signup.
    pub session_ttl: Duration,
}

impl AppState {
    pub fn new(store: SqliteStore, session_ttl: Duration) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            session_ttl,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(routes::HOME, get(notes::home))
        .route(routes::NOTES_LIST, get(notes::list))
        .route(routes::NOTES_ADD, get(notes::add_form).post(notes::add))
        .route(routes::NOTES_DETAIL, get(notes::detail))
        .route(routes::NOTES_EDIT, get(notes::edit_form).post(notes::edit))
        .route(
            routes::NOTES_DELETE,
            get(notes::delete_confirm)
                .post(notes::delete)
                .delete(notes::delete),
        )
        .route(routes::NOTES_SUCCESS, get(notes::success))
        .route(routes::LOGIN, get(auth::login_form).post(auth::login))
        .route(routes::LOGOUT, get(auth::logout).post(auth::logout))
        .route(routes::SIGNUP, get(auth::signup_form).post(auth::signup))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A `302 Found` redirect.
pub fn redirect_found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

async fn not_found(CurrentUser(user): CurrentUser) -> AppError {
    AppError::NotFound(user)
}

/// Open the configured database and serve HTTP until `shutdown` is cancelled.
pub async fn serve(config: &Config, shutdown: CancellationToken) -> Result<()> {
    let store = SqliteStore::open(&config.database)?;
    let state = AppState::new(store, config.session_ttl());

    let listener = TcpListener::bind(config.socket_addr()?).await?;
    info!(
        addr = %listener.local_addr()?,
        database = %config.database.display(),
        "notekeeper listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("server stopped");
    Ok(())
}
