//! Circulation policy settings (singleton row)

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Policy parameters read by every transition that computes a deadline or fee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LibrarySettings {
    pub library_name: String,
    pub loan_period_days: i32,
    /// Maximum concurrent Reserved/Borrowed/Overdue records per member
    pub max_books_per_user: i32,
    #[schema(value_type = f64)]
    pub fine_per_day: Decimal,
    pub grace_period_days: i32,
    pub pickup_time_limit_hours: i32,
    /// Replacement fee = book price x multiplier
    #[schema(value_type = f64)]
    pub lost_book_fee_multiplier: Decimal,
    /// Refuse new reservations/loans while the member has an overdue loan
    pub block_reservations_when_overdue: bool,
    pub password_min_length: i32,
    pub password_requires_special_char: bool,
    pub updated_at: DateTime<Utc>,
}

impl LibrarySettings {
    pub fn loan_period(&self) -> Duration {
        Duration::days(i64::from(self.loan_period_days))
    }

    pub fn pickup_window(&self) -> Duration {
        Duration::hours(i64::from(self.pickup_time_limit_hours))
    }

    /// Defaults used when the settings row is first created
    pub fn defaults(now: DateTime<Utc>) -> Self {
        Self {
            library_name: "LibHub Library".to_string(),
            loan_period_days: 7,
            max_books_per_user: 5,
            fine_per_day: Decimal::new(5, 1),
            grace_period_days: 0,
            pickup_time_limit_hours: 24,
            lost_book_fee_multiplier: Decimal::new(15, 1),
            block_reservations_when_overdue: false,
            password_min_length: 8,
            password_requires_special_char: true,
            updated_at: now,
        }
    }

    /// Apply a partial update; values are expected to be validated already
    pub fn apply(&mut self, update: &UpdateSettings, now: DateTime<Utc>) {
        if let Some(ref name) = update.library_name {
            self.library_name = name.clone();
        }
        if let Some(v) = update.loan_period_days {
            self.loan_period_days = v;
        }
        if let Some(v) = update.max_books_per_user {
            self.max_books_per_user = v;
        }
        if let Some(v) = update.fine_per_day {
            self.fine_per_day = v;
        }
        if let Some(v) = update.grace_period_days {
            self.grace_period_days = v;
        }
        if let Some(v) = update.pickup_time_limit_hours {
            self.pickup_time_limit_hours = v;
        }
        if let Some(v) = update.lost_book_fee_multiplier {
            self.lost_book_fee_multiplier = v;
        }
        if let Some(v) = update.block_reservations_when_overdue {
            self.block_reservations_when_overdue = v;
        }
        if let Some(v) = update.password_min_length {
            self.password_min_length = v;
        }
        if let Some(v) = update.password_requires_special_char {
            self.password_requires_special_char = v;
        }
        self.updated_at = now;
    }
}

/// Partial settings update (administrators only)
#[derive(Debug, Default, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateSettings {
    #[validate(length(min = 1, max = 255))]
    pub library_name: Option<String>,
    #[validate(range(min = 1, max = 365))]
    pub loan_period_days: Option<i32>,
    #[validate(range(min = 0, max = 1000))]
    pub max_books_per_user: Option<i32>,
    #[schema(value_type = Option<f64>)]
    pub fine_per_day: Option<Decimal>,
    #[validate(range(min = 0, max = 365))]
    pub grace_period_days: Option<i32>,
    #[validate(range(min = 0, max = 8760))]
    pub pickup_time_limit_hours: Option<i32>,
    #[schema(value_type = Option<f64>)]
    pub lost_book_fee_multiplier: Option<Decimal>,
    pub block_reservations_when_overdue: Option<bool>,
    #[validate(range(min = 0, max = 256))]
    pub password_min_length: Option<i32>,
    pub password_requires_special_char: Option<bool>,
}

impl UpdateSettings {
    /// Field validation plus the non-negative money checks `validator` cannot express
    pub fn check(&self) -> Result<(), String> {
        self.validate().map_err(|e| e.to_string())?;
        for (name, value) in [
            ("fine_per_day", self.fine_per_day),
            ("lost_book_fee_multiplier", self.lost_book_fee_multiplier),
        ] {
            if value.is_some_and(|v| v.is_sign_negative() && !v.is_zero()) {
                return Err(format!("Invalid value for {}. Must be a non-negative number.", name));
            }
            // Stored as NUMERIC(_, 2)
            if value.is_some_and(|v| v.normalize().scale() > 2) {
                return Err(format!("Invalid value for {}. At most two decimal places.", name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = LibrarySettings::defaults(Utc::now());
        assert_eq!(s.loan_period(), Duration::days(7));
        assert_eq!(s.pickup_window(), Duration::hours(24));
        assert_eq!(s.fine_per_day.to_string(), "0.5");
        assert_eq!(s.lost_book_fee_multiplier.to_string(), "1.5");
    }

    #[test]
    fn test_update_rejects_negative_values() {
        let update = UpdateSettings {
            fine_per_day: Some(Decimal::new(-1, 0)),
            ..Default::default()
        };
        assert!(update.check().is_err());

        let update = UpdateSettings {
            grace_period_days: Some(-2),
            ..Default::default()
        };
        assert!(update.check().is_err());
    }

    #[test]
    fn test_update_rejects_sub_cent_money() {
        let update = UpdateSettings {
            fine_per_day: Some(Decimal::new(125, 3)),
            ..Default::default()
        };
        assert!(update.check().is_err());

        let update = UpdateSettings {
            lost_book_fee_multiplier: Some(Decimal::new(1255, 3)),
            ..Default::default()
        };
        assert!(update.check().is_err());

        // trailing zeros do not count
        let update = UpdateSettings {
            fine_per_day: Some(Decimal::new(2500, 3)),
            ..Default::default()
        };
        assert!(update.check().is_ok());
    }

    #[test]
    fn test_apply_partial_update() {
        let now = Utc::now();
        let mut s = LibrarySettings::defaults(now);
        let update = UpdateSettings {
            max_books_per_user: Some(3),
            fine_per_day: Some(Decimal::new(1, 0)),
            ..Default::default()
        };
        assert!(update.check().is_ok());
        s.apply(&update, now);
        assert_eq!(s.max_books_per_user, 3);
        assert_eq!(s.fine_per_day, Decimal::ONE);
        assert_eq!(s.loan_period_days, 7);
    }
}
