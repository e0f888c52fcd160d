//! Notice texts for committed transitions

use chrono::{DateTime, Utc};

use crate::models::{
    borrowing::Borrowing,
    enums::NotificationType,
    notification::{Audience, Notice},
};

fn member_notice(b: &Borrowing, kind: NotificationType, message: String) -> Notice {
    let email = Some(b.member_email.trim())
        .filter(|e| !e.is_empty())
        .map(str::to_string);
    Notice {
        audience: Audience::Member {
            id: b.member_id,
            name: b.member_name.clone(),
            email,
        },
        kind,
        message,
    }
}

fn date(d: Option<DateTime<Utc>>) -> String {
    d.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn date_time(d: Option<DateTime<Utc>>) -> String {
    d.map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn reserved(b: &Borrowing, title: &str) -> Vec<Notice> {
    vec![
        member_notice(
            b,
            NotificationType::ReservationSuccess,
            format!(
                "Book '{}' reserved successfully. Please pick it up by {}.",
                title,
                date_time(b.pickup_due_date)
            ),
        ),
        Notice::staff(
            NotificationType::NewReservationAdmin,
            format!(
                "{} reserved '{}' (copy {}). Pickup due by {}.",
                b.member_name,
                title,
                b.copy_id,
                date_time(b.pickup_due_date)
            ),
        ),
    ]
}

pub fn borrowed(b: &Borrowing, title: &str) -> Vec<Notice> {
    vec![member_notice(
        b,
        NotificationType::BorrowSuccess,
        format!("You borrowed '{}'. It is due on {}.", title, date(b.due_date)),
    )]
}

pub fn returned(b: &Borrowing, title: &str) -> Vec<Notice> {
    let mut message = format!("'{}' returned successfully.", title);
    if b.fine > rust_decimal::Decimal::ZERO {
        message.push_str(&format!(" A fine of ${:.2} has been applied.", b.fine));
    }
    vec![member_notice(b, NotificationType::ReturnSuccess, message)]
}

pub fn renewed(b: &Borrowing, title: &str) -> Vec<Notice> {
    vec![member_notice(
        b,
        NotificationType::LoanRenewed,
        format!("'{}' renewed successfully. New due date is {}.", title, date(b.due_date)),
    )]
}

pub fn cancelled(b: &Borrowing, title: &str) -> Vec<Notice> {
    vec![member_notice(
        b,
        NotificationType::ReservationCancelled,
        format!("Your reservation for '{}' has been cancelled.", title),
    )]
}

pub fn expired(b: &Borrowing, title: &str) -> Vec<Notice> {
    vec![member_notice(
        b,
        NotificationType::ReservationCancelledExpired,
        format!(
            "Your reservation for '{}' has been cancelled as it was not picked up by the due date ({}).",
            title,
            date(b.pickup_due_date)
        ),
    )]
}

pub fn lost_or_damaged(b: &Borrowing, title: &str) -> Vec<Notice> {
    let outcome = b.loss.map_or("Lost", |l| l.as_str());
    vec![member_notice(
        b,
        NotificationType::CopyLostOrDamaged,
        format!(
            "Your copy of '{}' was marked as {}. Total fee applied is ${:.2} (Overdue: ${:.2}, Replacement: ${:.2}).",
            title,
            outcome,
            b.total_charges(),
            b.fine,
            b.replacement_fee
        ),
    )]
}

pub fn overdue(b: &Borrowing, title: &str) -> Vec<Notice> {
    vec![
        member_notice(
            b,
            NotificationType::OverdueNotice,
            format!(
                "Your borrowed book '{}' is now overdue (due {}). Please return it as soon as possible to avoid further fines.",
                title,
                date(b.due_date)
            ),
        ),
        Notice::staff(
            NotificationType::OverdueProcessingAdmin,
            format!(
                "Loan {} of '{}' by {} is overdue since {}.",
                b.id,
                title,
                b.member_name,
                date(b.due_date)
            ),
        ),
    ]
}

pub fn return_reminder(b: &Borrowing, title: &str) -> Vec<Notice> {
    vec![member_notice(
        b,
        NotificationType::ReturnReminder,
        format!("Reminder: your borrowed book '{}' is due on {}.", title, date(b.due_date)),
    )]
}

pub fn pickup_reminder(b: &Borrowing, title: &str) -> Vec<Notice> {
    vec![member_notice(
        b,
        NotificationType::PickupReminder,
        format!(
            "Reminder: please pick up your reserved book '{}' by {}.",
            title,
            date_time(b.pickup_due_date)
        ),
    )]
}
