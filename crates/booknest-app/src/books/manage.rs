use askama::Template;
use axum::response::{Html, IntoResponse, Response};
use booknest_dal::book::{Book, BookRepository};
use tower_sessions::Session;

use crate::{
    auth::AdminUser,
    error::PageResult,
    flash::{self, Flash},
};

#[derive(Template)]
#[template(path = "manage_books.html")]
struct ManageBooksTemplate {
    books: Vec<Book>,
    flash: Option<Flash>,
}

/// Admin book list, also the landing page for edit redirects and their
/// flash messages.
pub async fn manage_books(
    _admin: AdminUser,
    session: Session,
    repository: BookRepository,
) -> PageResult<Response> {
    let books = repository.list(booknest_dal::MAX_LIMIT).await?;
    let flash = flash::take(&session).await?;
    Ok(Html(ManageBooksTemplate { books, flash }.render()?).into_response())
}
