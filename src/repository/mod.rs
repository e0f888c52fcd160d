//! Repository layer: persistence seams and their Postgres / in-memory backends

pub mod books;
pub mod borrowings;
pub mod members;
pub mod memory;
pub mod notifications;
pub mod settings;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookCopy},
        borrowing::{Borrowing, BorrowingQuery, BorrowingScan, PairWrite},
        enums::{BorrowingStatus, CopyStatus, NotificationType},
        member::Member,
        notification::{Notification, NotificationQuery},
        settings::LibrarySettings,
    },
};

/// Borrowing record store. `commit` is the only way borrowing rows and copy
/// statuses change during the lifecycle.
#[async_trait]
pub trait CirculationStore: Send + Sync {
    async fn get(&self, id: i32) -> AppResult<Borrowing>;

    async fn list(&self, query: &BorrowingQuery) -> AppResult<(Vec<Borrowing>, i64)>;

    async fn count_for_member(&self, member_id: i32, statuses: &[BorrowingStatus]) -> AppResult<i64>;

    async fn scan(&self, scan: BorrowingScan) -> AppResult<Vec<Borrowing>>;

    /// Apply a pair write atomically.
    ///
    /// Fails with `PreconditionFailed` when the stored borrowing status or copy
    /// status no longer matches the expected one, and with `Consistency` when
    /// the copy does not exist. Nothing is written on failure.
    async fn commit(&self, write: PairWrite) -> AppResult<Borrowing>;
}

/// Books and their copy arena keyed by `(book_id, copy_id)`
#[async_trait]
pub trait BookCatalog: Send + Sync {
    async fn get_book(&self, id: i32) -> AppResult<Book>;

    async fn get_copy(&self, book_id: i32, copy_id: i32) -> AppResult<Option<BookCopy>>;

    async fn list_copies(&self, book_id: i32) -> AppResult<Vec<BookCopy>>;

    async fn first_available_copy(&self, book_id: i32) -> AppResult<Option<BookCopy>>;

    async fn add_copy(&self, book_id: i32, location: &str, status: CopyStatus) -> AppResult<BookCopy>;

    /// Manual status/location change, refused while the copy is Reserved or Borrowed
    async fn update_copy(
        &self,
        book_id: i32,
        copy_id: i32,
        status: Option<CopyStatus>,
        location: Option<&str>,
    ) -> AppResult<BookCopy>;
}

#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn get_member(&self, id: i32) -> AppResult<Member>;

    /// Active librarians and administrators
    async fn list_staff(&self) -> AppResult<Vec<Member>>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read the settings row, creating it with defaults on first access
    async fn get_or_init(&self) -> AppResult<LibrarySettings>;

    async fn save(&self, settings: &LibrarySettings) -> AppResult<LibrarySettings>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, recipient_id: i32, kind: NotificationType, message: &str) -> AppResult<Notification>;

    async fn list_for(&self, recipient_id: i32, query: &NotificationQuery) -> AppResult<(Vec<Notification>, i64)>;

    async fn mark_read(&self, id: i32, recipient_id: i32) -> AppResult<Notification>;

    async fn mark_all_read(&self, recipient_id: i32) -> AppResult<u64>;
}

/// Main repository struct bundling every store
#[derive(Clone)]
pub struct Repository {
    pub borrowings: Arc<dyn CirculationStore>,
    pub books: Arc<dyn BookCatalog>,
    pub members: Arc<dyn MemberDirectory>,
    pub settings: Arc<dyn SettingsStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

impl Repository {
    /// Create a Postgres-backed repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            borrowings: Arc::new(borrowings::BorrowingsRepository::new(pool.clone())),
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            members: Arc::new(members::MembersRepository::new(pool.clone())),
            settings: Arc::new(settings::SettingsRepository::new(pool.clone())),
            notifications: Arc::new(notifications::NotificationsRepository::new(pool)),
        }
    }

    /// Create a repository where every store is served by one in-memory store
    pub fn in_memory(store: Arc<memory::MemoryStore>) -> Self {
        Self {
            borrowings: store.clone(),
            books: store.clone(),
            members: store.clone(),
            settings: store.clone(),
            notifications: store,
        }
    }
}

/// Postgres unique-constraint violation (SQLSTATE 23505)
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}
