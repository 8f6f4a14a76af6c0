//! Storage backends for book records.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use libris_db::DbError;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use super::models::{Book, BookInput};

/// Persistence operations the record service depends on.
///
/// Implementations assign `id` and `date_added` on insert and never change
/// them afterwards.
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn insert(&self, input: &BookInput) -> Result<Book, DbError>;

    async fn find(&self, id: i64) -> Result<Option<Book>, DbError>;

    /// Overwrite title and author. `None` when no record has `id`.
    async fn update(&self, id: i64, input: &BookInput) -> Result<Option<Book>, DbError>;

    /// `false` when no record has `id`.
    async fn delete(&self, id: i64) -> Result<bool, DbError>;
}

/// SQLite-backed store. Each call checks a connection out of the pool for
/// the duration of a single statement.
#[derive(Clone)]
pub struct SqliteBookStore {
    pool: SqlitePool,
}

impl SqliteBookStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for SqliteBookStore {
    async fn insert(&self, input: &BookInput) -> Result<Book, DbError> {
        let book = sqlx::query_as::<_, Book>(
            "INSERT INTO books (title, author, date_added) VALUES (?, ?, ?)
             RETURNING id, title, author, date_added",
        )
        .bind(&input.title)
        .bind(&input.author)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&self.pool)
        .await?;

        Ok(book)
    }

    async fn find(&self, id: i64) -> Result<Option<Book>, DbError> {
        let book = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, date_added FROM books WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn update(&self, id: i64, input: &BookInput) -> Result<Option<Book>, DbError> {
        let book = sqlx::query_as::<_, Book>(
            "UPDATE books SET title = ?, author = ? WHERE id = ?
             RETURNING id, title, author, date_added",
        )
        .bind(&input.title)
        .bind(&input.author)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn delete(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// In-process store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryBookStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    last_id: i64,
    books: BTreeMap<i64, Book>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn insert(&self, input: &BookInput) -> Result<Book, DbError> {
        let mut state = self.lock();
        state.last_id += 1;

        let book = Book {
            id: state.last_id,
            title: input.title.clone(),
            author: input.author.clone(),
            date_added: OffsetDateTime::now_utc(),
        };
        state.books.insert(book.id, book.clone());

        Ok(book)
    }

    async fn find(&self, id: i64) -> Result<Option<Book>, DbError> {
        Ok(self.lock().books.get(&id).cloned())
    }

    async fn update(&self, id: i64, input: &BookInput) -> Result<Option<Book>, DbError> {
        let mut state = self.lock();
        let Some(book) = state.books.get_mut(&id) else {
            return Ok(None);
        };

        book.title = input.title.clone();
        book.author = input.author.clone();
        Ok(Some(book.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, DbError> {
        Ok(self.lock().books.remove(&id).is_some())
    }
}
