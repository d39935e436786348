use axum::extract::Multipart;
use booknest_dal::book::{Book, BookUpdate};
use bytes::Bytes;
use http::StatusCode;
use tracing::debug;

use crate::error::PageResult;

/// Raw submitted fields, kept as strings so a failed submission re-renders
/// exactly what the user typed.
#[derive(Debug, Default, Clone)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub price: String,
    pub description: String,
    pub stock_quantity: String,
}

#[derive(Debug, Clone)]
pub struct UploadedCover {
    pub file_name: String,
    pub data: Bytes,
}

/// What the file part of the form carried.
#[derive(Debug, Clone)]
pub enum CoverField {
    /// No file submitted.
    None,
    /// A named file, still subject to the store's upload policy.
    Uploaded(UploadedCover),
    /// The request body hit the size cap while the file was being read.
    TooLarge,
}

impl BookForm {
    /// Reads the multipart body. A file part with an empty filename is how
    /// browsers submit an untouched file input, so it counts as "no new
    /// cover", distinct from a named but unusable upload. Hitting the body
    /// size cap mid-read is reported as an oversized cover, with whatever
    /// fields were already parsed, so the page can re-render instead of
    /// failing the whole request.
    pub async fn from_multipart(mut multipart: Multipart) -> PageResult<(Self, CoverField)> {
        let mut form = BookForm::default();
        let mut cover = CoverField::None;
        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                    debug!("Form body over the size cap: {e}");
                    cover = CoverField::TooLarge;
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                "title" => form.title = field.text().await?,
                "author" => form.author = field.text().await?,
                "genre" => form.genre = field.text().await?,
                "price" => form.price = field.text().await?,
                "description" => form.description = field.text().await?,
                "stock_quantity" => form.stock_quantity = field.text().await?,
                "cover_image" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    match field.bytes().await {
                        Ok(data) => {
                            if !file_name.is_empty() {
                                cover = CoverField::Uploaded(UploadedCover { file_name, data });
                            }
                        }
                        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                            debug!("Cover part over the size cap: {e}");
                            cover = CoverField::TooLarge;
                            break;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                other => debug!("Ignoring unknown form field {other}"),
            }
        }
        Ok((form, cover))
    }

    /// Sanitizes and coerces the raw fields into an update payload,
    /// accumulating every rule violation instead of stopping at the first.
    /// The returned payload borrows the current cover path; replacement is
    /// decided separately.
    pub fn into_update(self, current_cover: Option<String>) -> (BookUpdate, Vec<String>) {
        let mut errors = Vec::new();

        let title = sanitize(&self.title);
        if title.is_empty() {
            errors.push("Title is required".to_string());
        }
        let author = sanitize(&self.author);
        if author.is_empty() {
            errors.push("Author is required".to_string());
        }

        let price = parse_price(&self.price, &mut errors);
        let stock_quantity = parse_stock(&self.stock_quantity, &mut errors);

        let genre = sanitize(&self.genre);
        let description = sanitize(&self.description);

        let update = BookUpdate {
            title,
            author,
            genre: (!genre.is_empty()).then_some(genre),
            price,
            description: (!description.is_empty()).then_some(description),
            stock_quantity,
            cover_image: current_cover,
        };
        (update, errors)
    }
}

fn parse_price(raw: &str, errors: &mut Vec<String>) -> f64 {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.push("Price is required".to_string());
        return 0.0;
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            if value < 0.0 {
                errors.push("Price cannot be negative".to_string());
            }
            value
        }
        _ => {
            errors.push("Price must be a valid number".to_string());
            0.0
        }
    }
}

fn parse_stock(raw: &str, errors: &mut Vec<String>) -> i64 {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.push("Stock quantity is required".to_string());
        return 0;
    }
    match raw.parse::<i64>() {
        Ok(value) => {
            if value < 0 {
                errors.push("Stock quantity cannot be negative".to_string());
            }
            value
        }
        Err(_) => {
            errors.push("Stock quantity must be a whole number".to_string());
            0
        }
    }
}

/// Trims and escapes HTML metacharacters so the value is safe to embed in
/// markup even without the template escaping it again.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.trim().chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Field values the edit form is pre-filled with: the stored record on GET,
/// the submitted input verbatim when re-rendering a failed POST.
#[derive(Debug, Clone)]
pub struct FormValues {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub price: String,
    pub description: String,
    pub stock_quantity: String,
}

impl From<&Book> for FormValues {
    fn from(book: &Book) -> Self {
        FormValues {
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre.clone().unwrap_or_default(),
            price: format!("{:.2}", book.price),
            description: book.description.clone().unwrap_or_default(),
            stock_quantity: book.stock_quantity.to_string(),
        }
    }
}

impl From<&BookForm> for FormValues {
    fn from(form: &BookForm) -> Self {
        FormValues {
            title: form.title.clone(),
            author: form.author.clone(),
            genre: form.genre.clone(),
            price: form.price.clone(),
            description: form.description.clone(),
            stock_quantity: form.stock_quantity.clone(),
        }
    }
}
