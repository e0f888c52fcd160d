//! In-memory store implementing every repository seam.
//!
//! Used by the test suites and for running the engine without Postgres. The
//! guard semantics of `commit` match the Postgres transaction: the copy guard,
//! the borrowing status guard and the one-active-borrowing-per-copy rule are
//! all checked before anything is written.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{BookCatalog, CirculationStore, MemberDirectory, NotificationStore, SettingsStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookCopy},
        borrowing::{Borrowing, BorrowingQuery, BorrowingScan, BorrowingWrite, PairWrite},
        enums::{BorrowingStatus, CopyStatus, NotificationStatus, NotificationType},
        member::Member,
        notification::{Notification, NotificationQuery},
        settings::LibrarySettings,
    },
};

#[derive(Default)]
struct State {
    books: BTreeMap<i32, Book>,
    copies: BTreeMap<(i32, i32), BookCopy>,
    borrowings: BTreeMap<i32, Borrowing>,
    members: BTreeMap<i32, Member>,
    settings: Option<LibrarySettings>,
    notifications: BTreeMap<i32, Notification>,
    next_borrowing_id: i32,
    next_notification_id: i32,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_member(&self, member: Member) {
        self.state.write().await.members.insert(member.id, member);
    }

    pub async fn insert_book(&self, book: Book) {
        self.state.write().await.books.insert(book.id, book);
    }

    pub async fn insert_copy(&self, copy: BookCopy) {
        self.state
            .write()
            .await
            .copies
            .insert((copy.book_id, copy.copy_id), copy);
    }

    /// Drop a copy from the arena, leaving any borrowing that points at it
    pub async fn remove_copy(&self, book_id: i32, copy_id: i32) -> Option<BookCopy> {
        self.state.write().await.copies.remove(&(book_id, copy_id))
    }

    pub async fn replace_settings(&self, settings: LibrarySettings) {
        self.state.write().await.settings = Some(settings);
    }

    pub async fn copy_status(&self, book_id: i32, copy_id: i32) -> Option<CopyStatus> {
        self.state
            .read()
            .await
            .copies
            .get(&(book_id, copy_id))
            .map(|c| c.status)
    }

    /// Snapshot of every borrowing, ordered by id
    pub async fn borrowings(&self) -> Vec<Borrowing> {
        self.state.read().await.borrowings.values().cloned().collect()
    }

    /// Snapshot of every stored notification, ordered by id
    pub async fn notifications(&self) -> Vec<Notification> {
        self.state
            .read()
            .await
            .notifications
            .values()
            .cloned()
            .collect()
    }
}

fn copy_not_found(book_id: i32, copy_id: i32) -> AppError {
    AppError::NotFound(format!("Copy {} of book {} not found", copy_id, book_id))
}

#[async_trait]
impl CirculationStore for MemoryStore {
    async fn get(&self, id: i32) -> AppResult<Borrowing> {
        self.state
            .read()
            .await
            .borrowings
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))
    }

    async fn list(&self, query: &BorrowingQuery) -> AppResult<(Vec<Borrowing>, i64)> {
        let (limit, offset) = query.limit_offset();
        let state = self.state.read().await;
        let mut rows: Vec<Borrowing> = state
            .borrowings
            .values()
            .filter(|b| query.status.map_or(true, |s| b.status == s))
            .filter(|b| query.member_id.map_or(true, |m| b.member_id == m))
            .filter(|b| query.book_id.map_or(true, |id| b.book_id == id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = rows.len() as i64;
        let page = rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn count_for_member(&self, member_id: i32, statuses: &[BorrowingStatus]) -> AppResult<i64> {
        let state = self.state.read().await;
        let count = state
            .borrowings
            .values()
            .filter(|b| b.member_id == member_id && statuses.contains(&b.status))
            .count();
        Ok(count as i64)
    }

    async fn scan(&self, scan: BorrowingScan) -> AppResult<Vec<Borrowing>> {
        let state = self.state.read().await;
        Ok(state
            .borrowings
            .values()
            .filter(|b| scan.matches(b))
            .cloned()
            .collect())
    }

    async fn commit(&self, write: PairWrite) -> AppResult<Borrowing> {
        let mut state = self.state.write().await;

        // Check every guard before touching anything
        if let Some(ref cw) = write.copy {
            match state.copies.get(&(cw.book_id, cw.copy_id)) {
                None => {
                    return Err(AppError::consistency(format!(
                        "Copy {} of book {} does not exist",
                        cw.copy_id, cw.book_id
                    )))
                }
                Some(copy) if copy.status != cw.expected => {
                    return Err(AppError::PreconditionFailed(format!(
                        "Copy {} of book {} is not {} (current status: {})",
                        cw.copy_id, cw.book_id, cw.expected, copy.status
                    )))
                }
                Some(_) => {}
            }
        }

        match write.borrowing {
            BorrowingWrite::Insert(ref new) => {
                let taken = state.borrowings.values().any(|b| {
                    b.book_id == new.book_id && b.copy_id == new.copy_id && b.status.is_active()
                });
                if taken {
                    return Err(AppError::PreconditionFailed(format!(
                        "Copy {} of book {} already has an active borrowing",
                        new.copy_id, new.book_id
                    )));
                }
            }
            BorrowingWrite::Update {
                ref record,
                expected,
            } => match state.borrowings.get(&record.id) {
                Some(stored) if stored.status == expected => {}
                _ => {
                    return Err(AppError::PreconditionFailed(format!(
                        "Borrowing {} is no longer {}",
                        record.id, expected
                    )))
                }
            },
        }

        if let Some(cw) = write.copy {
            if let Some(copy) = state.copies.get_mut(&(cw.book_id, cw.copy_id)) {
                copy.status = cw.next;
            }
        }

        let borrowing = match write.borrowing {
            BorrowingWrite::Insert(new) => {
                state.next_borrowing_id += 1;
                new.into_borrowing(state.next_borrowing_id)
            }
            BorrowingWrite::Update { record, .. } => record,
        };
        state.borrowings.insert(borrowing.id, borrowing.clone());

        if write.count_borrow {
            if let Some(book) = state.books.get_mut(&borrowing.book_id) {
                book.borrow_count += 1;
            }
        }

        Ok(borrowing)
    }
}

#[async_trait]
impl BookCatalog for MemoryStore {
    async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.state
            .read()
            .await
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn get_copy(&self, book_id: i32, copy_id: i32) -> AppResult<Option<BookCopy>> {
        Ok(self.state.read().await.copies.get(&(book_id, copy_id)).cloned())
    }

    async fn list_copies(&self, book_id: i32) -> AppResult<Vec<BookCopy>> {
        let state = self.state.read().await;
        Ok(state
            .copies
            .range((book_id, i32::MIN)..=(book_id, i32::MAX))
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn first_available_copy(&self, book_id: i32) -> AppResult<Option<BookCopy>> {
        let state = self.state.read().await;
        Ok(state
            .copies
            .range((book_id, i32::MIN)..=(book_id, i32::MAX))
            .map(|(_, c)| c)
            .find(|c| c.status == CopyStatus::Available)
            .cloned())
    }

    async fn add_copy(&self, book_id: i32, location: &str, status: CopyStatus) -> AppResult<BookCopy> {
        let mut state = self.state.write().await;
        let copy_id = state
            .copies
            .range((book_id, i32::MIN)..=(book_id, i32::MAX))
            .next_back()
            .map_or(1, |((_, id), _)| id + 1);
        let copy = BookCopy {
            book_id,
            copy_id,
            location: Some(location.to_string()),
            status,
        };
        state.copies.insert((book_id, copy_id), copy.clone());
        Ok(copy)
    }

    async fn update_copy(
        &self,
        book_id: i32,
        copy_id: i32,
        status: Option<CopyStatus>,
        location: Option<&str>,
    ) -> AppResult<BookCopy> {
        let mut state = self.state.write().await;
        let copy = state
            .copies
            .get_mut(&(book_id, copy_id))
            .ok_or_else(|| copy_not_found(book_id, copy_id))?;
        if copy.status.is_held() {
            return Err(AppError::PreconditionFailed(format!(
                "Cannot update a copy that is currently '{}'. Use the circulation workflow (return, cancel reservation) instead.",
                copy.status
            )));
        }
        if let Some(status) = status {
            copy.status = status;
        }
        if let Some(location) = location {
            copy.location = Some(location.to_string());
        }
        Ok(copy.clone())
    }
}

#[async_trait]
impl MemberDirectory for MemoryStore {
    async fn get_member(&self, id: i32) -> AppResult<Member> {
        self.state
            .read()
            .await
            .members
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    async fn list_staff(&self) -> AppResult<Vec<Member>> {
        let state = self.state.read().await;
        Ok(state
            .members
            .values()
            .filter(|m| m.role.is_staff() && m.is_active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_or_init(&self) -> AppResult<LibrarySettings> {
        let mut state = self.state.write().await;
        Ok(state
            .settings
            .get_or_insert_with(|| LibrarySettings::defaults(Utc::now()))
            .clone())
    }

    async fn save(&self, settings: &LibrarySettings) -> AppResult<LibrarySettings> {
        self.state.write().await.settings = Some(settings.clone());
        Ok(settings.clone())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn create(&self, recipient_id: i32, kind: NotificationType, message: &str) -> AppResult<Notification> {
        let mut state = self.state.write().await;
        state.next_notification_id += 1;
        let notification = Notification {
            id: state.next_notification_id,
            recipient_id,
            kind,
            message: message.to_string(),
            status: NotificationStatus::Unread,
            created_at: Utc::now(),
        };
        state
            .notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn list_for(&self, recipient_id: i32, query: &NotificationQuery) -> AppResult<(Vec<Notification>, i64)> {
        let (limit, offset) = query.limit_offset();
        let state = self.state.read().await;
        let rows: Vec<Notification> = state
            .notifications
            .values()
            .rev()
            .filter(|n| n.recipient_id == recipient_id)
            .filter(|n| query.status.map_or(true, |s| n.status == s))
            .cloned()
            .collect();
        let total = rows.len() as i64;
        let page = rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn mark_read(&self, id: i32, recipient_id: i32) -> AppResult<Notification> {
        let mut state = self.state.write().await;
        match state.notifications.get_mut(&id) {
            Some(n) if n.recipient_id == recipient_id => {
                n.status = NotificationStatus::Read;
                Ok(n.clone())
            }
            _ => Err(AppError::NotFound(format!("Notification {} not found", id))),
        }
    }

    async fn mark_all_read(&self, recipient_id: i32) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let mut changed = 0;
        for n in state.notifications.values_mut() {
            if n.recipient_id == recipient_id && n.status == NotificationStatus::Unread {
                n.status = NotificationStatus::Read;
                changed += 1;
            }
        }
        Ok(changed)
    }
}
