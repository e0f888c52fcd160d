//! Pure state-machine steps.
//!
//! Each function takes the current record, the policy and the time, checks the
//! preconditions and returns the pair write that performs the transition. No
//! I/O happens here; the engine commits the write.

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookCopy},
        borrowing::{Borrowing, BorrowingWrite, CopyWrite, NewBorrowing, PairWrite},
        enums::{BorrowingStatus, CopyLoss, CopyStatus},
        member::Member,
        settings::LibrarySettings,
    },
};

use super::fines::{calculate_fine, replacement_fee};

/// How a new episode starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opening {
    /// Hold the copy until pickup
    Reserve,
    /// Counter checkout, straight to Borrowed
    DirectBorrow,
}

/// Member's current holds, read under the member lock
#[derive(Debug, Clone, Copy, Default)]
pub struct Holds {
    /// Reserved + Borrowed + Overdue
    pub active: i64,
    pub overdue: i64,
}

/// Account checks shared by reserve and direct borrow
pub fn check_eligibility(member: &Member, holds: Holds, settings: &LibrarySettings) -> AppResult<()> {
    if !member.is_active {
        return Err(AppError::PreconditionFailed(
            "Your account is not active. Please contact the library.".to_string(),
        ));
    }
    if !member.has_complete_profile() {
        return Err(AppError::PreconditionFailed(
            "Please complete your profile (national ID and phone number) before borrowing books."
                .to_string(),
        ));
    }
    if holds.active >= i64::from(settings.max_books_per_user) {
        return Err(AppError::PreconditionFailed(format!(
            "You have reached the maximum limit of {} borrowed or reserved books.",
            settings.max_books_per_user
        )));
    }
    if settings.block_reservations_when_overdue && holds.overdue > 0 {
        return Err(AppError::PreconditionFailed(
            "You have overdue books. Please return them before reserving or borrowing more."
                .to_string(),
        ));
    }
    Ok(())
}

/// Create a Reserved or Borrowed episode on an Available copy
pub fn open(
    member: &Member,
    copy: &BookCopy,
    opening: Opening,
    settings: &LibrarySettings,
    now: DateTime<Utc>,
) -> AppResult<PairWrite> {
    if copy.status != CopyStatus::Available {
        return Err(AppError::PreconditionFailed(format!(
            "Copy {} of book {} is not Available (current status: {})",
            copy.copy_id, copy.book_id, copy.status
        )));
    }

    let (status, next_copy, reservation_date, pickup_due_date, borrow_date, due_date) = match opening {
        Opening::Reserve => (
            BorrowingStatus::Reserved,
            CopyStatus::Reserved,
            Some(now),
            Some(now + settings.pickup_window()),
            None,
            None,
        ),
        Opening::DirectBorrow => (
            BorrowingStatus::Borrowed,
            CopyStatus::Borrowed,
            None,
            None,
            Some(now),
            Some(now + settings.loan_period()),
        ),
    };

    Ok(PairWrite {
        borrowing: BorrowingWrite::Insert(NewBorrowing {
            member_id: member.id,
            member_name: member.name.clone(),
            member_email: member.email.clone(),
            book_id: copy.book_id,
            copy_id: copy.copy_id,
            status,
            reservation_date,
            pickup_due_date,
            borrow_date,
            due_date,
            created_at: now,
        }),
        copy: Some(copy_write(copy.book_id, copy.copy_id, CopyStatus::Available, next_copy)),
        count_borrow: opening == Opening::DirectBorrow,
    })
}

/// Reserved past its pickup deadline becomes Cancelled and frees the copy.
///
/// Both the expiry sweep and a late pickup attempt go through here.
pub fn promote_if_expired(record: &Borrowing, now: DateTime<Utc>) -> Option<PairWrite> {
    let expired = record.status == BorrowingStatus::Reserved
        && record.pickup_due_date.is_some_and(|due| due < now);
    if !expired {
        return None;
    }
    let mut next = record.clone();
    next.status = BorrowingStatus::Cancelled;
    next.updated_at = now;
    Some(PairWrite {
        copy: Some(copy_write(
            record.book_id,
            record.copy_id,
            CopyStatus::Reserved,
            CopyStatus::Available,
        )),
        ..PairWrite::borrowing_only(next, BorrowingStatus::Reserved)
    })
}

/// Reserved -> Borrowed. Callers run `promote_if_expired` first.
pub fn pickup(record: &Borrowing, settings: &LibrarySettings, now: DateTime<Utc>) -> AppResult<PairWrite> {
    require_status(record, &[BorrowingStatus::Reserved], "confirm pickup for")?;
    let mut next = record.clone();
    next.status = BorrowingStatus::Borrowed;
    next.borrow_date = Some(now);
    next.due_date = Some(now + settings.loan_period());
    next.updated_at = now;
    Ok(PairWrite {
        copy: Some(copy_write(
            record.book_id,
            record.copy_id,
            CopyStatus::Reserved,
            CopyStatus::Borrowed,
        )),
        count_borrow: true,
        ..PairWrite::borrowing_only(next, BorrowingStatus::Reserved)
    })
}

/// Borrowed/Overdue -> Returned with the fine settled
pub fn return_loan(record: &Borrowing, settings: &LibrarySettings, now: DateTime<Utc>) -> AppResult<PairWrite> {
    require_status(record, &BorrowingStatus::ON_LOAN, "return")?;
    let next = settle(record, settings, now)?;
    Ok(PairWrite {
        copy: Some(copy_write(
            record.book_id,
            record.copy_id,
            CopyStatus::Borrowed,
            CopyStatus::Available,
        )),
        ..PairWrite::borrowing_only(next, record.status)
    })
}

/// Extend the due date of a loan that is not yet late
pub fn renew(record: &Borrowing, settings: &LibrarySettings, now: DateTime<Utc>) -> AppResult<PairWrite> {
    if record.status == BorrowingStatus::Overdue {
        return Err(AppError::PreconditionFailed(
            "Overdue loans cannot be renewed. Please return the book first.".to_string(),
        ));
    }
    require_status(record, &[BorrowingStatus::Borrowed], "renew")?;
    let due = due_date(record)?;
    if now > due {
        return Err(AppError::PreconditionFailed(
            "This loan is past its due date and cannot be renewed. Please return the book first."
                .to_string(),
        ));
    }
    let mut next = record.clone();
    next.due_date = Some(due + settings.loan_period());
    next.renewals = record.renewals.saturating_add(1);
    next.notified_return_reminder = false;
    next.updated_at = now;
    Ok(PairWrite::borrowing_only(next, BorrowingStatus::Borrowed))
}

/// Reserved -> Cancelled on request
pub fn cancel(record: &Borrowing, now: DateTime<Utc>) -> AppResult<PairWrite> {
    require_status(record, &[BorrowingStatus::Reserved], "cancel")?;
    let mut next = record.clone();
    next.status = BorrowingStatus::Cancelled;
    next.updated_at = now;
    Ok(PairWrite {
        copy: Some(copy_write(
            record.book_id,
            record.copy_id,
            CopyStatus::Reserved,
            CopyStatus::Available,
        )),
        ..PairWrite::borrowing_only(next, BorrowingStatus::Reserved)
    })
}

/// Borrowed/Overdue -> Returned, the copy leaves circulation as Lost or Damaged
pub fn report_loss(
    record: &Borrowing,
    loss: CopyLoss,
    book: &Book,
    settings: &LibrarySettings,
    now: DateTime<Utc>,
) -> AppResult<PairWrite> {
    require_status(record, &BorrowingStatus::ON_LOAN, "report lost or damaged for")?;
    let mut next = settle(record, settings, now)?;
    next.loss = Some(loss);
    next.replacement_fee = replacement_fee(book.id, book.price, settings.lost_book_fee_multiplier)?;
    Ok(PairWrite {
        copy: Some(copy_write(
            record.book_id,
            record.copy_id,
            CopyStatus::Borrowed,
            loss.into(),
        )),
        ..PairWrite::borrowing_only(next, record.status)
    })
}

/// Borrowed past due becomes Overdue; the notice flag is set in the same write.
///
/// Also picks up an Overdue record whose notice never went out. Returns `None`
/// when there is nothing to do. The copy stays Borrowed.
pub fn mark_overdue(record: &Borrowing, now: DateTime<Utc>) -> Option<PairWrite> {
    let late = match record.status {
        BorrowingStatus::Borrowed => record.due_date.is_some_and(|due| due < now),
        BorrowingStatus::Overdue => !record.notified_overdue,
        _ => false,
    };
    if !late {
        return None;
    }
    let mut next = record.clone();
    next.status = BorrowingStatus::Overdue;
    next.notified_overdue = true;
    next.updated_at = now;
    Some(PairWrite::borrowing_only(next, record.status))
}

/// Which reminder flag a reminder sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reminder {
    Return,
    Pickup,
}

pub fn mark_reminded(record: &Borrowing, reminder: Reminder, now: DateTime<Utc>) -> PairWrite {
    let mut next = record.clone();
    match reminder {
        Reminder::Return => next.notified_return_reminder = true,
        Reminder::Pickup => next.notified_pickup_reminder = true,
    }
    next.updated_at = now;
    PairWrite::borrowing_only(next, record.status)
}

fn copy_write(book_id: i32, copy_id: i32, expected: CopyStatus, next: CopyStatus) -> CopyWrite {
    CopyWrite {
        book_id,
        copy_id,
        expected,
        next,
    }
}

fn require_status(record: &Borrowing, allowed: &[BorrowingStatus], action: &str) -> AppResult<()> {
    if allowed.contains(&record.status) {
        Ok(())
    } else {
        Err(AppError::PreconditionFailed(format!(
            "Cannot {} a borrowing that is {}",
            action, record.status
        )))
    }
}

fn due_date(record: &Borrowing) -> AppResult<DateTime<Utc>> {
    record.due_date.ok_or_else(|| {
        AppError::consistency(format!("Borrowing {} is on loan without a due date", record.id))
    })
}

/// Close a loan: return date, fine, Returned
fn settle(record: &Borrowing, settings: &LibrarySettings, now: DateTime<Utc>) -> AppResult<Borrowing> {
    let due = due_date(record)?;
    let mut next = record.clone();
    next.status = BorrowingStatus::Returned;
    next.return_date = Some(now);
    next.fine = calculate_fine(due, now, settings.fine_per_day, settings.grace_period_days);
    next.updated_at = now;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::Role;
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap()
    }

    fn member() -> Member {
        Member {
            id: 3,
            name: "Grace".to_string(),
            email: "grace@example.org".to_string(),
            role: Role::Member,
            is_active: true,
            national_id: Some("1234".to_string()),
            phone_number: Some("555".to_string()),
        }
    }

    fn copy(status: CopyStatus) -> BookCopy {
        BookCopy {
            book_id: 10,
            copy_id: 2,
            location: Some("Shelf A".to_string()),
            status,
        }
    }

    fn settings() -> LibrarySettings {
        LibrarySettings::defaults(now())
    }

    fn record(status: BorrowingStatus) -> Borrowing {
        let write = open(&member(), &copy(CopyStatus::Available), Opening::Reserve, &settings(), now()).unwrap();
        let BorrowingWrite::Insert(new) = write.borrowing else {
            panic!("expected insert");
        };
        let mut b = new.into_borrowing(1);
        b.status = status;
        if status.is_on_loan() {
            b.borrow_date = Some(now());
            b.due_date = Some(now() + Duration::days(7));
        }
        b
    }

    fn updated(write: &PairWrite) -> &Borrowing {
        match &write.borrowing {
            BorrowingWrite::Update { record, .. } => record,
            BorrowingWrite::Insert(_) => panic!("expected update"),
        }
    }

    #[test]
    fn test_reserve_sets_pickup_window() {
        let write = open(&member(), &copy(CopyStatus::Available), Opening::Reserve, &settings(), now()).unwrap();
        let BorrowingWrite::Insert(ref new) = write.borrowing else {
            panic!("expected insert");
        };
        assert_eq!(new.status, BorrowingStatus::Reserved);
        assert_eq!(new.pickup_due_date, Some(now() + Duration::hours(24)));
        assert_eq!(write.copy.unwrap().next, CopyStatus::Reserved);
        assert!(!write.count_borrow);
    }

    #[test]
    fn test_direct_borrow_counts_and_sets_due_date() {
        let write = open(&member(), &copy(CopyStatus::Available), Opening::DirectBorrow, &settings(), now()).unwrap();
        let BorrowingWrite::Insert(ref new) = write.borrowing else {
            panic!("expected insert");
        };
        assert_eq!(new.status, BorrowingStatus::Borrowed);
        assert_eq!(new.due_date, Some(now() + Duration::days(7)));
        assert!(new.pickup_due_date.is_none());
        assert!(write.count_borrow);
    }

    #[test]
    fn test_unavailable_copy_is_rejected() {
        let err = open(&member(), &copy(CopyStatus::Maintenance), Opening::Reserve, &settings(), now()).unwrap_err();
        assert!(err.to_string().contains("not Available"));
        assert!(err.to_string().contains("Maintenance"));
    }

    #[test]
    fn test_eligibility() {
        let s = settings();
        assert!(check_eligibility(&member(), Holds::default(), &s).is_ok());

        let full = Holds { active: 5, overdue: 0 };
        assert!(check_eligibility(&member(), full, &s).is_err());

        let mut inactive = member();
        inactive.is_active = false;
        assert!(check_eligibility(&inactive, Holds::default(), &s).is_err());

        let mut incomplete = member();
        incomplete.phone_number = None;
        assert!(check_eligibility(&incomplete, Holds::default(), &s).is_err());

        let late = Holds { active: 1, overdue: 1 };
        assert!(check_eligibility(&member(), late, &s).is_ok());
        let mut strict = s.clone();
        strict.block_reservations_when_overdue = true;
        assert!(check_eligibility(&member(), late, &strict).is_err());
    }

    #[test]
    fn test_promote_if_expired() {
        let r = record(BorrowingStatus::Reserved);
        assert!(promote_if_expired(&r, now() + Duration::hours(23)).is_none());
        let write = promote_if_expired(&r, now() + Duration::hours(25)).unwrap();
        assert_eq!(updated(&write).status, BorrowingStatus::Cancelled);
        assert_eq!(write.copy.unwrap().next, CopyStatus::Available);

        let borrowed = record(BorrowingStatus::Borrowed);
        assert!(promote_if_expired(&borrowed, now() + Duration::days(30)).is_none());
    }

    #[test]
    fn test_renew_extends_from_due_date() {
        let r = record(BorrowingStatus::Borrowed);
        let mut reminded = r.clone();
        reminded.notified_return_reminder = true;
        let write = renew(&reminded, &settings(), now() + Duration::days(6)).unwrap();
        let next = updated(&write);
        assert_eq!(next.due_date, Some(now() + Duration::days(14)));
        assert_eq!(next.renewals, 1);
        assert!(!next.notified_return_reminder);
        assert!(write.copy.is_none());
    }

    #[test]
    fn test_renew_refuses_late_loans() {
        let r = record(BorrowingStatus::Borrowed);
        assert!(renew(&r, &settings(), now() + Duration::days(8)).is_err());
        let overdue = record(BorrowingStatus::Overdue);
        assert!(renew(&overdue, &settings(), now()).is_err());
    }

    #[test]
    fn test_return_computes_fine() {
        let r = record(BorrowingStatus::Overdue);
        let write = return_loan(&r, &settings(), now() + Duration::days(10)).unwrap();
        let next = updated(&write);
        assert_eq!(next.status, BorrowingStatus::Returned);
        assert_eq!(next.fine, Decimal::new(15, 1));
        assert_eq!(write.copy.unwrap().expected, CopyStatus::Borrowed);
        assert!(matches!(
            write.borrowing,
            BorrowingWrite::Update { expected: BorrowingStatus::Overdue, .. }
        ));
    }

    #[test]
    fn test_report_loss_needs_price() {
        let r = record(BorrowingStatus::Borrowed);
        let mut book = Book {
            id: 10,
            title: "Dune".to_string(),
            price: Some(Decimal::from(20)),
            borrow_count: 0,
        };
        let write = report_loss(&r, CopyLoss::Damaged, &book, &settings(), now()).unwrap();
        assert_eq!(updated(&write).replacement_fee, Decimal::from(30));
        assert_eq!(updated(&write).loss, Some(CopyLoss::Damaged));
        assert_eq!(write.copy.unwrap().next, CopyStatus::Damaged);

        book.price = None;
        assert!(matches!(
            report_loss(&r, CopyLoss::Lost, &book, &settings(), now()),
            Err(AppError::Consistency(_))
        ));
    }

    #[test]
    fn test_mark_overdue() {
        let r = record(BorrowingStatus::Borrowed);
        assert!(mark_overdue(&r, now() + Duration::days(6)).is_none());
        let write = mark_overdue(&r, now() + Duration::days(8)).unwrap();
        let next = updated(&write);
        assert_eq!(next.status, BorrowingStatus::Overdue);
        assert!(next.notified_overdue);
        assert!(write.copy.is_none());
        assert!(mark_overdue(next, now() + Duration::days(9)).is_none());
    }

    #[test]
    fn test_terminal_records_reject_transitions() {
        let returned = record(BorrowingStatus::Returned);
        assert!(return_loan(&returned, &settings(), now()).is_err());
        assert!(cancel(&returned, now()).is_err());
        assert!(pickup(&returned, &settings(), now()).is_err());
    }
}
