pub mod auth;
pub mod authz;
pub mod comments;
pub mod errors;
pub mod middleware;
pub mod session;
pub mod tickets;
pub mod views;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use helpdesk_db::Database;

use crate::errors::PageError;
use crate::session::SessionStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub sessions: SessionStore,
}

impl AppStateInner {
    pub fn new(db: Database) -> AppState {
        Arc::new(Self {
            db,
            sessions: SessionStore::new(),
        })
    }

    pub fn with_session_ttl(db: Database, ttl: Duration) -> AppState {
        Arc::new(Self {
            db,
            sessions: SessionStore::with_ttl(ttl),
        })
    }
}

/// Build the full HTTP surface.
pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/", get(auth::home))
        .route("/login", post(auth::login))
        .route("/signup", get(auth::signup_form).post(auth::signup))
        .route("/check_username", get(auth::check_username))
        .route("/logout", get(auth::logout))
        .route("/dashboard", get(tickets::dashboard))
        .route("/create_ticket", get(tickets::create_ticket_form).post(tickets::create_ticket))
        .route("/ticket_submitted", get(tickets::ticket_submitted))
        .route("/ticket/{ticket_id}", get(tickets::ticket_details))
        .route("/delete_ticket/{ticket_id}", post(tickets::delete_ticket))
        .route("/update_ticket_status/{ticket_id}", post(tickets::update_ticket_status))
        .route("/confirm_close_ticket/{ticket_id}", post(tickets::confirm_close_ticket))
        .route("/add_comment", post(comments::add_comment))
        .fallback(middleware::not_found)
        .with_state(state);

    with_error_pages(routes)
}

/// Wrap `routes` so panics and bare error statuses come back as HTML error
/// pages, with request tracing outermost.
pub fn with_error_pages(routes: Router) -> Router {
    routes
        .layer(CatchPanicLayer::custom(middleware::handle_panic))
        .layer(axum::middleware::map_response(middleware::render_error_pages))
        .layer(TraceLayer::new_for_http())
}

/// Run blocking store work (SQLite, Argon2) off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, PageError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            PageError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
        })?
        .map_err(PageError::from)
}
