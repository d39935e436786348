use askama::Template;
use axum::{
    extract::{Multipart, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use booknest_dal::book::{Book, BookRepository};
use tower_sessions::Session;
use tracing::{debug, error};

use booknest_store::{error::StoreError, MAX_COVER_MB};

use crate::{
    auth::AdminUser,
    books::{
        form::{BookForm, CoverField, FormValues},
        EditBookQuery,
    },
    error::PageResult,
    flash::{self, Flash},
    state::AppState,
};

#[derive(Template)]
#[template(path = "edit_book.html")]
struct EditBookTemplate {
    book_id: i64,
    book_title: String,
    cover_image: Option<String>,
    values: FormValues,
    errors: Vec<String>,
    flash: Option<Flash>,
}

enum Loaded {
    Book(Book),
    Redirect(Response),
}

fn parse_book_id(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
}

/// Resolves the id parameter to a book, or to an immediate flash redirect
/// back to the list when the id is garbage or the row does not exist.
async fn load_for_edit(
    repository: &BookRepository,
    session: &Session,
    raw_id: Option<&str>,
) -> PageResult<Loaded> {
    let Some(id) = parse_book_id(raw_id) else {
        flash::set(session, Flash::error("Invalid book ID")).await?;
        return Ok(Loaded::Redirect(
            Redirect::to("/manage_books").into_response(),
        ));
    };
    match repository.get(id).await {
        Ok(book) => Ok(Loaded::Book(book)),
        Err(booknest_dal::Error::RecordNotFound(_)) => {
            flash::set(session, Flash::error("Book not found")).await?;
            Ok(Loaded::Redirect(
                Redirect::to("/manage_books").into_response(),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn edit_book_page(
    _admin: AdminUser,
    session: Session,
    repository: BookRepository,
    Query(query): Query<EditBookQuery>,
) -> PageResult<Response> {
    let book = match load_for_edit(&repository, &session, query.id.as_deref()).await? {
        Loaded::Book(book) => book,
        Loaded::Redirect(response) => return Ok(response),
    };
    let flash = flash::take(&session).await?;
    let page = EditBookTemplate {
        book_id: book.id,
        book_title: book.title.clone(),
        cover_image: book.cover_image.clone(),
        values: FormValues::from(&book),
        errors: Vec::new(),
        flash,
    };
    Ok(Html(page.render()?).into_response())
}

fn persist_flash(affected: u64, title: &str) -> Flash {
    if affected > 0 {
        Flash::success(format!("Book \"{title}\" updated successfully!"))
    } else {
        // the row vanished under us, nothing was written
        Flash::info("No changes were made to the book.")
    }
}

pub async fn update_book(
    _admin: AdminUser,
    session: Session,
    repository: BookRepository,
    State(state): State<AppState>,
    Query(query): Query<EditBookQuery>,
    multipart: Multipart,
) -> PageResult<Response> {
    let book = match load_for_edit(&repository, &session, query.id.as_deref()).await? {
        Loaded::Book(book) => book,
        Loaded::Redirect(response) => return Ok(response),
    };

    let (form, cover) = BookForm::from_multipart(multipart).await?;
    let (mut update, mut errors) = form.clone().into_update(book.cover_image.clone());

    // The old cover is removed only after the row update went through, so a
    // blocked submission never loses the currently stored image. The store
    // and the database are not transactional with each other; a stored file
    // that ends up orphaned is accepted.
    let mut replaced_cover = None;
    match cover {
        CoverField::Uploaded(upload) => {
            match state
                .store()
                .store_cover(&upload.file_name, &upload.data)
                .await
            {
                Ok(stored) => {
                    replaced_cover = book.cover_image.clone();
                    update.cover_image = Some(stored.into());
                }
                Err(e) => {
                    debug!("Cover upload rejected: {e}");
                    errors.push(e.to_string());
                }
            }
        }
        CoverField::TooLarge => {
            debug!("Cover upload exceeded the request body cap");
            errors.push(
                StoreError::TooLarge {
                    limit_mb: MAX_COVER_MB,
                }
                .to_string(),
            );
        }
        CoverField::None => {}
    }

    if errors.is_empty() {
        let title = update.title.clone();
        match repository.update(book.id, update.clone()).await {
            Ok(affected) => {
                if let Some(old) = replaced_cover {
                    state.store().delete_cover(&old).await;
                }
                flash::set(&session, persist_flash(affected, &title)).await?;
                return Ok(Redirect::to("/manage_books").into_response());
            }
            Err(e) => {
                error!("Book update error: {e}");
                errors.push(
                    "Database error: unable to update the book. Please try again.".to_string(),
                );
            }
        }
    }

    // Re-render with the submitted values so nothing the user typed is lost.
    let page = EditBookTemplate {
        book_id: book.id,
        book_title: book.title.clone(),
        cover_image: update.cover_image.clone(),
        values: FormValues::from(&form),
        errors,
        flash: None,
    };
    Ok(Html(page.render()?).into_response())
}
