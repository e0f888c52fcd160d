//! Copy management (staff)

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{BookCopy, CreateCopy, UpdateCopy},
        enums::CopyStatus,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct InventoryService {
    repository: Repository,
}

impl InventoryService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List the copies of a book
    pub async fn list_copies(&self, book_id: i32) -> AppResult<Vec<BookCopy>> {
        self.repository.books.get_book(book_id).await?;
        self.repository.books.list_copies(book_id).await
    }

    /// Add a copy to a book; Reserved/Borrowed can only be reached through circulation
    pub async fn add_copy(&self, book_id: i32, request: CreateCopy) -> AppResult<BookCopy> {
        let location = request.location.trim();
        if location.is_empty() {
            return Err(AppError::Validation("Copy location is required".to_string()));
        }
        let status = request.status.unwrap_or(CopyStatus::Available);
        require_manual(status)?;

        self.repository.books.get_book(book_id).await?;
        let copy = self.repository.books.add_copy(book_id, location, status).await?;
        tracing::info!("Added copy {}/{} at {}", copy.book_id, copy.copy_id, location);
        Ok(copy)
    }

    /// Change a copy's status or location; refused while the copy is held
    pub async fn update_copy(&self, book_id: i32, copy_id: i32, request: UpdateCopy) -> AppResult<BookCopy> {
        if let Some(status) = request.status {
            require_manual(status)?;
        }
        let location = request.location.as_deref().map(str::trim);
        if location.is_some_and(str::is_empty) {
            return Err(AppError::Validation("Copy location cannot be empty".to_string()));
        }
        let copy = self
            .repository
            .books
            .update_copy(book_id, copy_id, request.status, location)
            .await?;
        tracing::info!("Updated copy {}/{}: {}", book_id, copy_id, copy.status);
        Ok(copy)
    }
}

fn require_manual(status: CopyStatus) -> AppResult<()> {
    if status.is_manual() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Invalid status '{}'. Must be one of: Available, Maintenance, Lost, Damaged, Withdrawn",
            status
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::{models::book::Book, repository::memory::MemoryStore};

    async fn service() -> InventoryService {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_book(Book {
                id: 1,
                title: "Dune".to_string(),
                price: None,
                borrow_count: 0,
            })
            .await;
        InventoryService::new(Repository::in_memory(store))
    }

    fn create(location: &str, status: Option<CopyStatus>) -> CreateCopy {
        CreateCopy {
            location: location.to_string(),
            status,
        }
    }

    #[tokio::test]
    async fn test_add_and_update_copy() {
        let service = service().await;
        let copy = service.add_copy(1, create("Shelf A", None)).await.unwrap();
        assert_eq!(copy.status, CopyStatus::Available);

        let copy = service
            .update_copy(
                1,
                copy.copy_id,
                UpdateCopy {
                    status: Some(CopyStatus::Maintenance),
                    location: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(copy.status, CopyStatus::Maintenance);
        assert_eq!(copy.location.as_deref(), Some("Shelf A"));
    }

    #[tokio::test]
    async fn test_lifecycle_statuses_are_refused() {
        let service = service().await;
        let err = service
            .add_copy(1, create("Shelf A", Some(CopyStatus::Borrowed)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(matches!(
            service.add_copy(1, create("  ", None)).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.add_copy(2, create("Shelf B", None)).await,
            Err(AppError::NotFound(_))
        ));
    }
}
