//! Overdue fine and replacement fee arithmetic

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::error::{AppError, AppResult};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Fine owed for a return at `returned` on a loan due at `due`.
///
/// Days past `due + grace` are rounded up, so any started day is a full fine day.
pub fn calculate_fine(
    due: DateTime<Utc>,
    returned: DateTime<Utc>,
    fine_per_day: Decimal,
    grace_period_days: i32,
) -> Decimal {
    if returned <= due {
        return Decimal::ZERO;
    }
    let deadline = due + Duration::days(i64::from(grace_period_days.max(0)));
    if returned <= deadline {
        return Decimal::ZERO;
    }
    let late_ms = (returned - deadline).num_milliseconds();
    let days = (late_ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;
    Decimal::from(days) * fine_per_day
}

/// Replacement fee for a lost or damaged copy; the book price must be known
pub fn replacement_fee(book_id: i32, price: Option<Decimal>, multiplier: Decimal) -> AppResult<Decimal> {
    match price {
        Some(price) => Ok(price * multiplier),
        None => Err(AppError::consistency(format!(
            "Book {} has no price; cannot compute a replacement fee",
            book_id
        ))),
    }
}
