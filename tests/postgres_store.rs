//! Postgres store tests.
//!
//! Run with: DATABASE_URL=postgres://... cargo test --test postgres_store -- --ignored

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use circulation_server::{
    models::{
        borrowing::{PairWrite, ReserveRequest},
        enums::{BorrowingStatus, CopyStatus, NotificationType},
    },
    repository::Repository,
    services::{clock::ManualClock, Services},
    AppError,
};

use common::{as_member, librarian, RecordingNotifier};

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Insert a member and a one-copy book; returns (member_id, book_id)
async fn seed(pool: &PgPool) -> (i32, i32) {
    let tag = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let member_id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO members (name, email, role, national_id, phone_number)
        VALUES ('Ada', $1, 'Member', 'ID-1', '0901')
        RETURNING id
        "#,
    )
    .bind(format!("ada+{}@example.org", tag))
    .fetch_one(pool)
    .await
    .unwrap();

    let book_id: i32 = sqlx::query_scalar("INSERT INTO books (title, price) VALUES ('Dune', 20.00) RETURNING id")
        .fetch_one(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO copies (book_id, copy_id, location) VALUES ($1, 1, 'Shelf A')")
        .bind(book_id)
        .execute(pool)
        .await
        .unwrap();

    (member_id, book_id)
}

fn services(pool: PgPool) -> (Services, Arc<ManualClock>, Arc<RecordingNotifier>) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let notifier = Arc::new(RecordingNotifier::default());
    let services = Services::with_notifier(Repository::new(pool), notifier.clone(), clock.clone());
    (services, clock, notifier)
}

#[tokio::test]
#[ignore]
async fn test_settings_row_created_once() {
    let repository = Repository::new(pool().await);

    let first = repository.settings.get_or_init().await.unwrap();
    let second = repository.settings.get_or_init().await.unwrap();
    assert_eq!(first.loan_period_days, second.loan_period_days);
    assert_eq!(first.updated_at, second.updated_at);
}

#[tokio::test]
#[ignore]
async fn test_lifecycle_round_trip() {
    let pool = pool().await;
    let (member_id, book_id) = seed(&pool).await;
    let (services, clock, notifier) = services(pool.clone());
    let c = &services.circulation;

    let reserved = c
        .reserve(
            as_member(member_id),
            ReserveRequest {
                member_id,
                book_id,
                copy_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(reserved.status, BorrowingStatus::Reserved);

    clock.advance(Duration::hours(1));
    let loan = c.confirm_pickup(librarian(), reserved.id).await.unwrap();
    assert_eq!(loan.status, BorrowingStatus::Borrowed);

    let settings = services.settings.get_settings().await.unwrap();
    clock.advance(settings.loan_period() + Duration::days(2));
    let returned = c.return_book(librarian(), loan.id).await.unwrap();
    assert_eq!(returned.status, BorrowingStatus::Returned);
    assert!(returned.fine > rust_decimal::Decimal::ZERO);

    let copy = Repository::new(pool.clone())
        .books
        .get_copy(book_id, 1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(copy.status, CopyStatus::Available);

    let borrow_count: i64 = sqlx::query_scalar("SELECT borrow_count FROM books WHERE id = $1")
        .bind(book_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(borrow_count, 1);
    assert_eq!(notifier.count(NotificationType::ReturnSuccess), 1);
}

#[tokio::test]
#[ignore]
async fn test_stale_write_is_rejected() {
    let pool = pool().await;
    let (member_id, book_id) = seed(&pool).await;
    let (services, _clock, _notifier) = services(pool.clone());
    let repository = Repository::new(pool);

    let reserved = services
        .circulation
        .reserve(
            as_member(member_id),
            ReserveRequest {
                member_id,
                book_id,
                copy_id: Some(1),
            },
        )
        .await
        .unwrap();

    // A write prepared against the Reserved row, applied after a cancellation
    let mut stale = reserved.clone();
    stale.renewals = 3;
    services
        .circulation
        .cancel_reservation(as_member(member_id), reserved.id)
        .await
        .unwrap();

    let err = repository
        .borrowings
        .commit(PairWrite::borrowing_only(stale, BorrowingStatus::Reserved))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PreconditionFailed(_)));

    let stored = repository.borrowings.get(reserved.id).await.unwrap();
    assert_eq!(stored.status, BorrowingStatus::Cancelled);
    assert_eq!(stored.renewals, 0);
}
