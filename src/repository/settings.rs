//! Settings repository (single row, id = 1)

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};

use super::SettingsStore;
use crate::{error::AppResult, models::settings::LibrarySettings};

const SELECT_SETTINGS: &str = r#"
    SELECT library_name, loan_period_days, max_books_per_user, fine_per_day,
           grace_period_days, pickup_time_limit_hours, lost_book_fee_multiplier,
           block_reservations_when_overdue, password_min_length,
           password_requires_special_char, updated_at
    FROM settings WHERE id = 1
"#;

#[derive(Clone)]
pub struct SettingsRepository {
    pool: Pool<Postgres>,
}

impl SettingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for SettingsRepository {
    async fn get_or_init(&self) -> AppResult<LibrarySettings> {
        if let Some(settings) = sqlx::query_as::<_, LibrarySettings>(SELECT_SETTINGS)
            .fetch_optional(&self.pool)
            .await?
        {
            return Ok(settings);
        }

        let defaults = LibrarySettings::defaults(Utc::now());
        tracing::info!("Settings row missing, creating defaults");
        // A concurrent first read may have inserted the row already
        sqlx::query(
            r#"
            INSERT INTO settings (
                id, library_name, loan_period_days, max_books_per_user, fine_per_day,
                grace_period_days, pickup_time_limit_hours, lost_book_fee_multiplier,
                block_reservations_when_overdue, password_min_length,
                password_requires_special_char, updated_at
            )
            VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&defaults.library_name)
        .bind(defaults.loan_period_days)
        .bind(defaults.max_books_per_user)
        .bind(defaults.fine_per_day)
        .bind(defaults.grace_period_days)
        .bind(defaults.pickup_time_limit_hours)
        .bind(defaults.lost_book_fee_multiplier)
        .bind(defaults.block_reservations_when_overdue)
        .bind(defaults.password_min_length)
        .bind(defaults.password_requires_special_char)
        .bind(defaults.updated_at)
        .execute(&self.pool)
        .await?;

        let settings = sqlx::query_as::<_, LibrarySettings>(SELECT_SETTINGS)
            .fetch_one(&self.pool)
            .await?;
        Ok(settings)
    }

    async fn save(&self, settings: &LibrarySettings) -> AppResult<LibrarySettings> {
        sqlx::query(
            r#"
            UPDATE settings SET
                library_name = $1, loan_period_days = $2, max_books_per_user = $3,
                fine_per_day = $4, grace_period_days = $5, pickup_time_limit_hours = $6,
                lost_book_fee_multiplier = $7, block_reservations_when_overdue = $8,
                password_min_length = $9, password_requires_special_char = $10,
                updated_at = $11
            WHERE id = 1
            "#,
        )
        .bind(&settings.library_name)
        .bind(settings.loan_period_days)
        .bind(settings.max_books_per_user)
        .bind(settings.fine_per_day)
        .bind(settings.grace_period_days)
        .bind(settings.pickup_time_limit_hours)
        .bind(settings.lost_book_fee_multiplier)
        .bind(settings.block_reservations_when_overdue)
        .bind(settings.password_min_length)
        .bind(settings.password_requires_special_char)
        .bind(settings.updated_at)
        .execute(&self.pool)
        .await?;

        let saved = sqlx::query_as::<_, LibrarySettings>(SELECT_SETTINGS)
            .fetch_one(&self.pool)
            .await?;
        Ok(saved)
    }
}
