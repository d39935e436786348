use futures::{StreamExt as _, TryStreamExt as _};
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::Pool;

use crate::error::Result;

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub price: f64,
    pub description: Option<String>,
    pub stock_quantity: i64,
    pub cover_image: Option<String>,
}

/// Mutable field set of a book. Identity is never updated.
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct BookUpdate {
    #[garde(length(min = 1, max = 255))]
    pub title: String,
    #[garde(length(min = 1, max = 255))]
    pub author: String,
    #[garde(skip)]
    pub genre: Option<String>,
    #[garde(range(min = 0.0))]
    pub price: f64,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(range(min = 0))]
    pub stock_quantity: i64,
    #[garde(skip)]
    pub cover_image: Option<String>,
}

pub type BookRepository = BookRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct BookRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> BookRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn get(&self, id: i64) -> Result<Book> {
        let record = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, genre, price, description, stock_quantity, cover_image
             FROM books WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.executor)
        .await?;
        record.ok_or_else(|| crate::Error::RecordNotFound("Book".to_string()))
    }

    pub async fn list(&self, limit: usize) -> Result<Vec<Book>> {
        let records = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, genre, price, description, stock_quantity, cover_image
             FROM books ORDER BY title",
        )
        .fetch(&self.executor)
        .take(limit)
        .try_collect::<Vec<_>>()
        .await?;
        Ok(records)
    }

    /// Updates all mutable fields of one row and reports how many rows matched.
    /// Zero means the row was gone by the time the update ran.
    pub async fn update(&self, id: i64, payload: BookUpdate) -> Result<u64> {
        payload
            .validate()
            .map_err(|e| crate::Error::InvalidData(e.to_string()))?;
        let result = sqlx::query(
            "UPDATE books SET title = ?, author = ?, genre = ?, price = ?, description = ?,
             stock_quantity = ?, cover_image = ? WHERE id = ?",
        )
        .bind(&payload.title)
        .bind(&payload.author)
        .bind(&payload.genre)
        .bind(payload.price)
        .bind(&payload.description)
        .bind(payload.stock_quantity)
        .bind(&payload.cover_image)
        .bind(id)
        .execute(&self.executor)
        .await?;

        Ok(result.rows_affected())
    }
}
