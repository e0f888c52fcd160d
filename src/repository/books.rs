//! Books and copies repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{is_unique_violation, BookCatalog};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookCopy},
        enums::CopyStatus,
    },
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookCatalog for BooksRepository {
    /// Get book by ID
    async fn get_book(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT id, title, price, borrow_count FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn get_copy(&self, book_id: i32, copy_id: i32) -> AppResult<Option<BookCopy>> {
        let copy = sqlx::query_as::<_, BookCopy>(
            "SELECT * FROM copies WHERE book_id = $1 AND copy_id = $2",
        )
        .bind(book_id)
        .bind(copy_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(copy)
    }

    async fn list_copies(&self, book_id: i32) -> AppResult<Vec<BookCopy>> {
        let copies = sqlx::query_as::<_, BookCopy>(
            "SELECT * FROM copies WHERE book_id = $1 ORDER BY copy_id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(copies)
    }

    async fn first_available_copy(&self, book_id: i32) -> AppResult<Option<BookCopy>> {
        let copy = sqlx::query_as::<_, BookCopy>(
            "SELECT * FROM copies WHERE book_id = $1 AND status = 'Available' ORDER BY copy_id LIMIT 1",
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(copy)
    }

    /// Add a copy; its id is the next free number within the book
    async fn add_copy(&self, book_id: i32, location: &str, status: CopyStatus) -> AppResult<BookCopy> {
        sqlx::query_as::<_, BookCopy>(
            r#"
            INSERT INTO copies (book_id, copy_id, location, status)
            SELECT $1, COALESCE(MAX(copy_id), 0) + 1, $2, $3
            FROM copies WHERE book_id = $1
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(location)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::PreconditionFailed("Another copy was added concurrently, please retry".to_string())
            } else {
                e.into()
            }
        })
    }

    async fn update_copy(
        &self,
        book_id: i32,
        copy_id: i32,
        status: Option<CopyStatus>,
        location: Option<&str>,
    ) -> AppResult<BookCopy> {
        let updated = sqlx::query_as::<_, BookCopy>(
            r#"
            UPDATE copies SET
                status = COALESCE($3, status),
                location = COALESCE($4, location)
            WHERE book_id = $1 AND copy_id = $2
              AND status NOT IN ('Reserved', 'Borrowed')
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(copy_id)
        .bind(status)
        .bind(location)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(copy) = updated {
            return Ok(copy);
        }

        match self.get_copy(book_id, copy_id).await? {
            None => Err(AppError::NotFound(format!(
                "Copy {} of book {} not found",
                copy_id, book_id
            ))),
            Some(copy) => Err(AppError::PreconditionFailed(format!(
                "Cannot update a copy that is currently '{}'. Use the circulation workflow (return, cancel reservation) instead.",
                copy.status
            ))),
        }
    }
}
