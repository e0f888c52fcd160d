//! Borrowing lifecycle engine.
//!
//! Every transition locks its Borrowing+Copy pair, re-reads the record under
//! the lock, validates, and commits the borrowing and copy writes as one unit.
//! Notices go out after the commit, once the locks are released; a failing
//! notifier is logged and never affects the transition.

pub mod fines;
pub mod locks;
pub mod notices;
pub mod sweeps;
pub mod transitions;

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookCopy,
        borrowing::{Borrowing, BorrowingQuery, DirectBorrowRequest, ReserveRequest},
        enums::{BorrowingStatus, CopyLoss, CopyStatus},
        member::Requester,
        notification::Notice,
        settings::LibrarySettings,
    },
    repository::Repository,
};

use self::{
    locks::{KeyGuard, KeyedLocks, LockKey},
    transitions::{Holds, Opening},
};
use super::{clock::Clock, notifications::Notifier};

pub use self::sweeps::{ReminderLeads, SweepKind, SweepReport};

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    locks: KeyedLocks,
}

impl CirculationService {
    pub fn new(repository: Repository, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            notifier,
            clock,
            locks: KeyedLocks::new(),
        }
    }

    /// Reserve a copy for pickup. Members reserve for themselves; staff for anyone.
    pub async fn reserve(&self, requester: Requester, request: ReserveRequest) -> AppResult<Borrowing> {
        if !requester.is_staff() && requester.member_id != request.member_id {
            return Err(AppError::Authorization(
                "Members can only reserve books for themselves".to_string(),
            ));
        }
        self.open(request.member_id, request.book_id, request.copy_id, Opening::Reserve)
            .await
    }

    /// Counter checkout straight to Borrowed (staff)
    pub async fn direct_borrow(&self, requester: Requester, request: DirectBorrowRequest) -> AppResult<Borrowing> {
        require_staff(requester)?;
        self.open(request.member_id, request.book_id, request.copy_id, Opening::DirectBorrow)
            .await
    }

    /// Hand a reserved copy to the member (staff).
    ///
    /// A reservation past its pickup deadline is cancelled here exactly as the
    /// expiry sweep would, and the call fails with `ReservationExpired`.
    pub async fn confirm_pickup(&self, requester: Requester, borrowing_id: i32) -> AppResult<Borrowing> {
        require_staff(requester)?;
        let settings = self.settings().await?;
        let (guard, record) = self.lock_record(borrowing_id).await?;
        let now = self.clock.now();

        if let Some(write) = transitions::promote_if_expired(&record, now) {
            let cancelled = self.repository.borrowings.commit(write).await?;
            drop(guard);
            tracing::info!(
                "Borrowing {} expired at pickup, copy {}/{} released",
                cancelled.id,
                cancelled.book_id,
                cancelled.copy_id
            );
            let title = self.title(cancelled.book_id).await;
            self.deliver(notices::expired(&cancelled, &title)).await;
            return Err(AppError::ReservationExpired(format!(
                "The reservation expired at {}; it has been cancelled and the copy released",
                cancelled
                    .pickup_due_date
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_default()
            )));
        }

        let write = transitions::pickup(&record, &settings, now)?;
        let borrowing = self.repository.borrowings.commit(write).await?;
        drop(guard);
        tracing::info!("Borrowing {} picked up, due {:?}", borrowing.id, borrowing.due_date);
        let title = self.title(borrowing.book_id).await;
        self.deliver(notices::borrowed(&borrowing, &title)).await;
        Ok(borrowing)
    }

    /// Check a loan back in (staff); the fine is settled on the record
    pub async fn return_book(&self, requester: Requester, borrowing_id: i32) -> AppResult<Borrowing> {
        require_staff(requester)?;
        let settings = self.settings().await?;
        let (guard, record) = self.lock_record(borrowing_id).await?;
        let write = transitions::return_loan(&record, &settings, self.clock.now())?;
        let borrowing = self.repository.borrowings.commit(write).await?;
        drop(guard);
        tracing::info!("Borrowing {} returned, fine {}", borrowing.id, borrowing.fine);
        let title = self.title(borrowing.book_id).await;
        self.deliver(notices::returned(&borrowing, &title)).await;
        Ok(borrowing)
    }

    /// Extend a loan that is not late (owner or staff)
    pub async fn renew(&self, requester: Requester, borrowing_id: i32) -> AppResult<Borrowing> {
        let settings = self.settings().await?;
        let (guard, record) = self.lock_record(borrowing_id).await?;
        require_owner_or_staff(requester, &record)?;
        let write = transitions::renew(&record, &settings, self.clock.now())?;
        let borrowing = self.repository.borrowings.commit(write).await?;
        drop(guard);
        tracing::info!(
            "Borrowing {} renewed ({} renewals), due {:?}",
            borrowing.id,
            borrowing.renewals,
            borrowing.due_date
        );
        let title = self.title(borrowing.book_id).await;
        self.deliver(notices::renewed(&borrowing, &title)).await;
        Ok(borrowing)
    }

    /// Cancel a reservation (owner or staff)
    pub async fn cancel_reservation(&self, requester: Requester, borrowing_id: i32) -> AppResult<Borrowing> {
        let (guard, record) = self.lock_record(borrowing_id).await?;
        require_owner_or_staff(requester, &record)?;
        let write = transitions::cancel(&record, self.clock.now())?;
        let borrowing = self.repository.borrowings.commit(write).await?;
        drop(guard);
        tracing::info!("Borrowing {} cancelled by member {}", borrowing.id, requester.member_id);
        let title = self.title(borrowing.book_id).await;
        self.deliver(notices::cancelled(&borrowing, &title)).await;
        Ok(borrowing)
    }

    /// Close a loan whose copy is lost or damaged (staff); fine and replacement fee are charged
    pub async fn report_lost_or_damaged(
        &self,
        requester: Requester,
        borrowing_id: i32,
        loss: CopyLoss,
    ) -> AppResult<Borrowing> {
        require_staff(requester)?;
        let settings = self.settings().await?;
        let (guard, record) = self.lock_record(borrowing_id).await?;
        let book = self.repository.books.get_book(record.book_id).await?;
        let write = transitions::report_loss(&record, loss, &book, &settings, self.clock.now())?;
        let borrowing = self.repository.borrowings.commit(write).await?;
        drop(guard);
        tracing::info!(
            "Borrowing {} closed as {}, charges {}",
            borrowing.id,
            loss.as_str(),
            borrowing.total_charges()
        );
        self.deliver(notices::lost_or_damaged(&borrowing, &book.title)).await;
        Ok(borrowing)
    }

    /// Get one borrowing (owner or staff)
    pub async fn get_borrowing(&self, requester: Requester, borrowing_id: i32) -> AppResult<Borrowing> {
        let record = self.repository.borrowings.get(borrowing_id).await?;
        require_owner_or_staff(requester, &record)?;
        Ok(record)
    }

    /// Filtered listing across members (staff)
    pub async fn list_borrowings(&self, requester: Requester, query: &BorrowingQuery) -> AppResult<(Vec<Borrowing>, i64)> {
        require_staff(requester)?;
        self.repository.borrowings.list(query).await
    }

    /// A member's history, newest first (self or staff)
    pub async fn member_history(
        &self,
        requester: Requester,
        member_id: i32,
        query: BorrowingQuery,
    ) -> AppResult<(Vec<Borrowing>, i64)> {
        if !requester.is_staff() && requester.member_id != member_id {
            return Err(AppError::Authorization(
                "Not allowed to access another member's records".to_string(),
            ));
        }
        let query = BorrowingQuery {
            member_id: Some(member_id),
            ..query
        };
        self.repository.borrowings.list(&query).await
    }

    async fn open(
        &self,
        member_id: i32,
        book_id: i32,
        copy_id: Option<i32>,
        opening: Opening,
    ) -> AppResult<Borrowing> {
        let settings = self.settings().await?;
        let member = self.repository.members.get_member(member_id).await?;
        let book = self.repository.books.get_book(book_id).await?;
        // Without an explicit copy, a candidate taken between the scan and
        // the lock is skipped in favour of the next Available one.
        let (guards, copy) = loop {
            let target = match copy_id {
                Some(copy_id) => self.require_copy(book_id, copy_id).await?,
                None => self
                    .repository
                    .books
                    .first_available_copy(book_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::PreconditionFailed(format!(
                            "No copies of '{}' are currently available",
                            book.title
                        ))
                    })?,
            };
            let guards = self
                .locks
                .lock_member_and_copy(member.id, target.book_id, target.copy_id)
                .await;
            let copy = self.require_copy(target.book_id, target.copy_id).await?;
            if copy_id.is_none() && copy.status != CopyStatus::Available {
                tracing::debug!(
                    "Copy {}/{} was taken before the lock, trying the next one",
                    copy.book_id,
                    copy.copy_id
                );
                drop(guards);
                continue;
            }
            break (guards, copy);
        };
        let holds = Holds {
            active: self
                .repository
                .borrowings
                .count_for_member(member.id, &BorrowingStatus::ACTIVE)
                .await?,
            overdue: self
                .repository
                .borrowings
                .count_for_member(member.id, &[BorrowingStatus::Overdue])
                .await?,
        };
        transitions::check_eligibility(&member, holds, &settings)?;
        let write = transitions::open(&member, &copy, opening, &settings, self.clock.now())?;
        let borrowing = self.repository.borrowings.commit(write).await?;
        drop(guards);

        tracing::info!(
            "Borrowing {} opened as {} for member {} on copy {}/{}",
            borrowing.id,
            borrowing.status,
            borrowing.member_id,
            borrowing.book_id,
            borrowing.copy_id
        );
        let notices = match opening {
            Opening::Reserve => notices::reserved(&borrowing, &book.title),
            Opening::DirectBorrow => notices::borrowed(&borrowing, &book.title),
        };
        self.deliver(notices).await;
        Ok(borrowing)
    }

    async fn settings(&self) -> AppResult<LibrarySettings> {
        self.repository.settings.get_or_init().await
    }

    async fn require_copy(&self, book_id: i32, copy_id: i32) -> AppResult<BookCopy> {
        self.repository
            .books
            .get_copy(book_id, copy_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Copy {} of book {} not found", copy_id, book_id)))
    }

    /// Lock the record's pair and read it again under the lock.
    ///
    /// The copy of a borrowing never changes, so the key from the first read
    /// is the key of the record read under the lock.
    async fn lock_record(&self, borrowing_id: i32) -> AppResult<(KeyGuard, Borrowing)> {
        let (book_id, copy_id) = self.repository.borrowings.get(borrowing_id).await?.copy_key();
        let guard = self.locks.lock(LockKey::Copy(book_id, copy_id)).await;
        let record = self.repository.borrowings.get(borrowing_id).await?;
        Ok((guard, record))
    }

    /// Book title for notice texts; a lookup failure only degrades the text
    async fn title(&self, book_id: i32) -> String {
        match self.repository.books.get_book(book_id).await {
            Ok(book) => book.title,
            Err(e) => {
                tracing::warn!("Could not load book {} for a notice: {}", book_id, e);
                format!("book #{}", book_id)
            }
        }
    }

    async fn deliver(&self, notices: Vec<Notice>) {
        for notice in notices {
            let kind = notice.kind;
            if let Err(e) = self.notifier.notify(notice).await {
                tracing::warn!("Notifier failed to deliver {} notice: {}", kind, e);
            }
        }
    }
}

fn require_staff(requester: Requester) -> AppResult<()> {
    if requester.is_staff() {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "Librarian or administrator rights required".to_string(),
        ))
    }
}

fn require_owner_or_staff(requester: Requester, record: &Borrowing) -> AppResult<()> {
    if requester.is_staff() || requester.member_id == record.member_id {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "Not allowed to act on another member's borrowing".to_string(),
        ))
    }
}
