//! Borrowing (loan or reservation episode) model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::enums::{BorrowingStatus, CopyLoss, CopyStatus};

/// One row per reserve-or-borrow episode. Never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrowing {
    pub id: i32,
    pub member_id: i32,
    /// Member name at the time of the reservation/loan
    pub member_name: String,
    /// Member email at the time of the reservation/loan
    pub member_email: String,
    pub book_id: i32,
    pub copy_id: i32,
    pub status: BorrowingStatus,
    /// Set when the episode ended with the copy reported lost or damaged
    pub loss: Option<CopyLoss>,
    pub reservation_date: Option<DateTime<Utc>>,
    pub pickup_due_date: Option<DateTime<Utc>>,
    pub borrow_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    #[schema(value_type = f64)]
    pub fine: Decimal,
    #[schema(value_type = f64)]
    pub replacement_fee: Decimal,
    pub renewals: i16,
    pub notified_overdue: bool,
    pub notified_return_reminder: bool,
    pub notified_pickup_reminder: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Borrowing {
    /// Fine plus replacement fee
    pub fn total_charges(&self) -> Decimal {
        self.fine + self.replacement_fee
    }

    /// Key of the copy this episode holds
    pub fn copy_key(&self) -> (i32, i32) {
        (self.book_id, self.copy_id)
    }
}

/// Values for a borrowing about to be created
#[derive(Debug, Clone, PartialEq)]
pub struct NewBorrowing {
    pub member_id: i32,
    pub member_name: String,
    pub member_email: String,
    pub book_id: i32,
    pub copy_id: i32,
    pub status: BorrowingStatus,
    pub reservation_date: Option<DateTime<Utc>>,
    pub pickup_due_date: Option<DateTime<Utc>>,
    pub borrow_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl NewBorrowing {
    pub fn into_borrowing(self, id: i32) -> Borrowing {
        Borrowing {
            id,
            member_id: self.member_id,
            member_name: self.member_name,
            member_email: self.member_email,
            book_id: self.book_id,
            copy_id: self.copy_id,
            status: self.status,
            loss: None,
            reservation_date: self.reservation_date,
            pickup_due_date: self.pickup_due_date,
            borrow_date: self.borrow_date,
            due_date: self.due_date,
            return_date: None,
            fine: Decimal::ZERO,
            replacement_fee: Decimal::ZERO,
            renewals: 0,
            notified_overdue: false,
            notified_return_reminder: false,
            notified_pickup_reminder: false,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// How the borrowing row changes in a committed transition
#[derive(Debug, Clone, PartialEq)]
pub enum BorrowingWrite {
    Insert(NewBorrowing),
    /// Replace the stored row, provided its status still equals `expected`
    Update {
        record: Borrowing,
        expected: BorrowingStatus,
    },
}

/// Copy status change guarded by the status the copy must currently have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyWrite {
    pub book_id: i32,
    pub copy_id: i32,
    pub expected: CopyStatus,
    pub next: CopyStatus,
}

/// The unit of atomicity: a borrowing write and the matching copy write,
/// applied together or not at all
#[derive(Debug, Clone, PartialEq)]
pub struct PairWrite {
    pub borrowing: BorrowingWrite,
    pub copy: Option<CopyWrite>,
    /// Increment the book's aggregate borrow counter
    pub count_borrow: bool,
}

impl PairWrite {
    pub fn borrowing_only(record: Borrowing, expected: BorrowingStatus) -> Self {
        Self {
            borrowing: BorrowingWrite::Update { record, expected },
            copy: None,
            count_borrow: false,
        }
    }
}

/// Time/state predicates the sweeps scan for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowingScan {
    /// Borrowed past due, or Overdue whose notice has not gone out yet
    OverdueCandidates { now: DateTime<Utc> },
    /// Reserved past the pickup deadline
    ExpiredReservations { now: DateTime<Utc> },
    /// Borrowed, due within `(now, until]`, not yet reminded
    ReturnReminders { now: DateTime<Utc>, until: DateTime<Utc> },
    /// Reserved, pickup due within `(now, until]`, not yet reminded
    PickupReminders { now: DateTime<Utc>, until: DateTime<Utc> },
}

impl BorrowingScan {
    pub fn matches(&self, b: &Borrowing) -> bool {
        match *self {
            BorrowingScan::OverdueCandidates { now } => match b.status {
                BorrowingStatus::Borrowed => b.due_date.is_some_and(|due| due < now),
                BorrowingStatus::Overdue => !b.notified_overdue,
                _ => false,
            },
            BorrowingScan::ExpiredReservations { now } => {
                b.status == BorrowingStatus::Reserved
                    && b.pickup_due_date.is_some_and(|due| due < now)
            }
            BorrowingScan::ReturnReminders { now, until } => {
                b.status == BorrowingStatus::Borrowed
                    && !b.notified_return_reminder
                    && b.due_date.is_some_and(|due| due > now && due <= until)
            }
            BorrowingScan::PickupReminders { now, until } => {
                b.status == BorrowingStatus::Reserved
                    && !b.notified_pickup_reminder
                    && b.pickup_due_date.is_some_and(|due| due > now && due <= until)
            }
        }
    }
}

/// Borrowing list filters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct BorrowingQuery {
    pub status: Option<BorrowingStatus>,
    pub member_id: Option<i32>,
    pub book_id: Option<i32>,
    /// Page number (1-based)
    pub page: Option<i64>,
    /// Items per page
    pub per_page: Option<i64>,
}

impl BorrowingQuery {
    /// (limit, offset) with the defaults applied
    pub fn limit_offset(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(10).clamp(1, 200);
        (per_page, (page - 1) * per_page)
    }
}

/// Reserve request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReserveRequest {
    pub member_id: i32,
    pub book_id: i32,
    /// Specific copy; the first available copy is used when omitted
    pub copy_id: Option<i32>,
}

/// Counter checkout request (staff)
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DirectBorrowRequest {
    pub member_id: i32,
    pub book_id: i32,
    pub copy_id: Option<i32>,
}
