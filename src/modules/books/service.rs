use std::sync::Arc;

use libris_db::DbError;
use libris_http::AppError;
use serde_json::Value;
use thiserror::Error;

use super::models::{Book, BookInput, ValidationErrors};
use super::store::BookStore;

#[derive(Debug, Error)]
pub enum BookError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("book {0} not found")]
    NotFound(i64),

    #[error("storage failure: {0}")]
    Storage(#[from] DbError),
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::Validation(e) => AppError::validation(e.details(), e.to_string()),
            BookError::NotFound(id) => AppError::not_found(format!("book {} not found", id)),
            BookError::Storage(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

/// Validated CRUD over book records backed by an injected [`BookStore`].
///
/// Payloads are validated before any storage write, so a rejected request
/// never writes. Update looks the record up first: a missing id is
/// `NotFound` whatever the body holds.
#[derive(Clone)]
pub struct BookRecordService {
    store: Arc<dyn BookStore>,
}

impl BookRecordService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, payload: &Value) -> Result<Book, BookError> {
        let input = BookInput::from_json(payload)?;
        let book = self.store.insert(&input).await?;

        tracing::info!(book_id = book.id, "book created");
        Ok(book)
    }

    pub async fn get(&self, id: i64) -> Result<Book, BookError> {
        self.store
            .find(id)
            .await?
            .ok_or(BookError::NotFound(id))
    }

    /// Replace title and author; `id` and `date_added` are untouched.
    pub async fn update(&self, id: i64, payload: &Value) -> Result<Book, BookError> {
        self.store
            .find(id)
            .await?
            .ok_or(BookError::NotFound(id))?;

        let input = BookInput::from_json(payload)?;
        let book = self
            .store
            .update(id, &input)
            .await?
            .ok_or(BookError::NotFound(id))?;

        tracing::info!(book_id = book.id, "book updated");
        Ok(book)
    }

    pub async fn delete(&self, id: i64) -> Result<(), BookError> {
        if !self.store.delete(id).await? {
            return Err(BookError::NotFound(id));
        }

        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }
}
