pub mod edit;
pub mod form;
pub mod manage;

use axum::{extract::DefaultBodyLimit, routing::get};
use booknest_dal::book::BookRepository;

use crate::state::AppState;

crate::repository_from_request!(BookRepository);

#[derive(Debug, serde::Deserialize)]
pub struct EditBookQuery {
    /// Raw so a garbage id produces a flash redirect, not a 400.
    pub id: Option<String>,
}

pub fn books_router(upload_limit_mb: usize) -> axum::Router<AppState> {
    axum::Router::new()
        .route("/edit_book", get(edit::edit_book_page).post(edit::update_book))
        .layer(DefaultBodyLimit::max(upload_limit_mb * 1024 * 1024))
        .route("/manage_books", get(manage::manage_books))
}
