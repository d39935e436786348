use axum::{response::IntoResponse, routing::get, Router};
use http::StatusCode;
use tower_http::services::ServeDir;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::{auth, books, state::AppState};

const SESSION_COOKIE_NAME: &str = "booknest";
const SESSION_EXPIRY_SECS: i64 = 3600;

/// Full application router, session layer included. Stored cover images are
/// served as static files below /covers.
pub fn app_router(state: AppState) -> Router {
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_name(SESSION_COOKIE_NAME)
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(
            SESSION_EXPIRY_SECS,
        )));

    let covers_root = state.store().root().join("covers");

    Router::new()
        .merge(books::books_router(state.config().upload_limit_mb))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .layer(session_layer)
        .route("/health", get(health))
        .nest_service("/covers", ServeDir::new(covers_root))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
