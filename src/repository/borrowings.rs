//! Borrowings repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{is_unique_violation, CirculationStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        borrowing::{Borrowing, BorrowingQuery, BorrowingScan, BorrowingWrite, CopyWrite, PairWrite},
        enums::{BorrowingStatus, CopyStatus},
    },
};

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Guarded copy status change inside the commit transaction
    async fn write_copy(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        write: &CopyWrite,
    ) -> AppResult<()> {
        let updated = sqlx::query(
            "UPDATE copies SET status = $1 WHERE book_id = $2 AND copy_id = $3 AND status = $4",
        )
        .bind(write.next)
        .bind(write.book_id)
        .bind(write.copy_id)
        .bind(write.expected)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        if updated == 1 {
            return Ok(());
        }

        let current: Option<CopyStatus> = sqlx::query_scalar(
            "SELECT status FROM copies WHERE book_id = $1 AND copy_id = $2",
        )
        .bind(write.book_id)
        .bind(write.copy_id)
        .fetch_optional(&mut **tx)
        .await?;

        Err(match current {
            None => AppError::consistency(format!(
                "Copy {} of book {} does not exist",
                write.copy_id, write.book_id
            )),
            Some(status) => AppError::PreconditionFailed(format!(
                "Copy {} of book {} is not {} (current status: {})",
                write.copy_id, write.book_id, write.expected, status
            )),
        })
    }

    async fn write_borrowing(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        write: BorrowingWrite,
    ) -> AppResult<Borrowing> {
        match write {
            BorrowingWrite::Insert(new) => sqlx::query_as::<_, Borrowing>(
                r#"
                INSERT INTO borrowings (
                    member_id, member_name, member_email, book_id, copy_id, status,
                    reservation_date, pickup_due_date, borrow_date, due_date,
                    created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
                RETURNING *
                "#,
            )
            .bind(new.member_id)
            .bind(&new.member_name)
            .bind(&new.member_email)
            .bind(new.book_id)
            .bind(new.copy_id)
            .bind(new.status)
            .bind(new.reservation_date)
            .bind(new.pickup_due_date)
            .bind(new.borrow_date)
            .bind(new.due_date)
            .bind(new.created_at)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::PreconditionFailed(format!(
                        "Copy {} of book {} already has an active borrowing",
                        new.copy_id, new.book_id
                    ))
                } else {
                    e.into()
                }
            }),
            BorrowingWrite::Update { record, expected } => sqlx::query_as::<_, Borrowing>(
                r#"
                UPDATE borrowings SET
                    status = $3, loss = $4, pickup_due_date = $5, borrow_date = $6,
                    due_date = $7, return_date = $8, fine = $9, replacement_fee = $10,
                    renewals = $11, notified_overdue = $12, notified_return_reminder = $13,
                    notified_pickup_reminder = $14, updated_at = $15
                WHERE id = $1 AND status = $2
                RETURNING *
                "#,
            )
            .bind(record.id)
            .bind(expected)
            .bind(record.status)
            .bind(record.loss)
            .bind(record.pickup_due_date)
            .bind(record.borrow_date)
            .bind(record.due_date)
            .bind(record.return_date)
            .bind(record.fine)
            .bind(record.replacement_fee)
            .bind(record.renewals)
            .bind(record.notified_overdue)
            .bind(record.notified_return_reminder)
            .bind(record.notified_pickup_reminder)
            .bind(record.updated_at)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| {
                AppError::PreconditionFailed(format!(
                    "Borrowing {} is no longer {}",
                    record.id, expected
                ))
            }),
        }
    }
}

#[async_trait]
impl CirculationStore for BorrowingsRepository {
    /// Get borrowing by ID
    async fn get(&self, id: i32) -> AppResult<Borrowing> {
        sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))
    }

    async fn list(&self, query: &BorrowingQuery) -> AppResult<(Vec<Borrowing>, i64)> {
        let (limit, offset) = query.limit_offset();
        let where_clause = r#"
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::int IS NULL OR member_id = $2)
              AND ($3::int IS NULL OR book_id = $3)
        "#;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM borrowings {}",
            where_clause
        ))
        .bind(query.status)
        .bind(query.member_id)
        .bind(query.book_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Borrowing>(&format!(
            "SELECT * FROM borrowings {} ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5",
            where_clause
        ))
        .bind(query.status)
        .bind(query.member_id)
        .bind(query.book_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }

    async fn count_for_member(&self, member_id: i32, statuses: &[BorrowingStatus]) -> AppResult<i64> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrowings WHERE member_id = $1 AND status = ANY($2)",
        )
        .bind(member_id)
        .bind(statuses)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn scan(&self, scan: BorrowingScan) -> AppResult<Vec<Borrowing>> {
        let rows = match scan {
            BorrowingScan::OverdueCandidates { now } => {
                sqlx::query_as::<_, Borrowing>(
                    r#"
                    SELECT * FROM borrowings
                    WHERE (status = 'Borrowed' AND due_date < $1)
                       OR (status = 'Overdue' AND NOT notified_overdue)
                    ORDER BY due_date
                    "#,
                )
                .bind(now)
                .fetch_all(&self.pool)
                .await?
            }
            BorrowingScan::ExpiredReservations { now } => {
                sqlx::query_as::<_, Borrowing>(
                    "SELECT * FROM borrowings WHERE status = 'Reserved' AND pickup_due_date < $1 ORDER BY pickup_due_date",
                )
                .bind(now)
                .fetch_all(&self.pool)
                .await?
            }
            BorrowingScan::ReturnReminders { now, until } => {
                sqlx::query_as::<_, Borrowing>(
                    r#"
                    SELECT * FROM borrowings
                    WHERE status = 'Borrowed' AND NOT notified_return_reminder
                      AND due_date > $1 AND due_date <= $2
                    ORDER BY due_date
                    "#,
                )
                .bind(now)
                .bind(until)
                .fetch_all(&self.pool)
                .await?
            }
            BorrowingScan::PickupReminders { now, until } => {
                sqlx::query_as::<_, Borrowing>(
                    r#"
                    SELECT * FROM borrowings
                    WHERE status = 'Reserved' AND NOT notified_pickup_reminder
                      AND pickup_due_date > $1 AND pickup_due_date <= $2
                    ORDER BY pickup_due_date
                    "#,
                )
                .bind(now)
                .bind(until)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    async fn commit(&self, write: PairWrite) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;

        if let Some(ref copy) = write.copy {
            Self::write_copy(&mut tx, copy).await?;
        }

        let borrowing = Self::write_borrowing(&mut tx, write.borrowing).await?;

        if write.count_borrow {
            sqlx::query("UPDATE books SET borrow_count = borrow_count + 1 WHERE id = $1")
                .bind(borrowing.book_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(borrowing)
    }
}
