use axum::response::{Html, IntoResponse, Response};
use http::StatusCode;
use tracing::{debug, error};

pub type PageResult<T> = std::result::Result<T, PageError>;

/// Infrastructure failures on a page request. Recoverable conditions
/// (validation, upload policy, lookup misses) never end up here, they are
/// folded into the page being rendered instead.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Database error: {0}")]
    Database(#[from] booknest_dal::Error),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
}

fn error_page(title: &str, message: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"UTF-8\">\
         <title>{title} - BookNest Admin</title></head>\
         <body><div class=\"container\"><h2>{title}</h2><p>{message}</p>\
         <a href=\"/manage_books\">Back to books</a></div></body></html>"
    ))
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            PageError::Multipart(e) => {
                debug!("Malformed form submission: {e}");
                (
                    StatusCode::BAD_REQUEST,
                    error_page("Invalid request", "The submitted form could not be read."),
                )
                    .into_response()
            }
            e => {
                // internal details go to the log only
                error!("Page request failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_page("Something went wrong", "Please try again."),
                )
                    .into_response()
            }
        }
    }
}
