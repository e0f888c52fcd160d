//! Shared fixture: in-memory store, manual clock and a notifier that records notices

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use circulation_server::{
    models::{
        book::{Book, BookCopy},
        borrowing::{Borrowing, ReserveRequest, DirectBorrowRequest},
        enums::{BorrowingStatus, CopyStatus, NotificationType, Role},
        member::{Member, Requester},
        notification::Notice,
        settings::LibrarySettings,
    },
    repository::{memory::MemoryStore, Repository},
    services::{clock::ManualClock, notifications::Notifier, Services},
    AppResult,
};

pub const ADA: i32 = 1;
pub const GRACE: i32 = 2;
pub const LIBRARIAN: i32 = 3;
pub const ADMIN: i32 = 4;
pub const NO_PROFILE: i32 = 5;
pub const INACTIVE: i32 = 6;

/// Priced at $20, two copies
pub const DUNE: i32 = 1;
/// No price on record, one copy
pub const SOLARIS: i32 = 2;
/// Priced at $10, six copies
pub const NEUROMANCER: i32 = 3;

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// Records every notice handed over by the engine
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<NotificationType> {
        self.notices().into_iter().map(|n| n.kind).collect()
    }

    pub fn count(&self, kind: NotificationType) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }

    pub fn clear(&self) {
        self.notices.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: Notice) -> AppResult<()> {
        self.notices.lock().unwrap().push(notice);
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub services: Services,
}

impl Harness {
    pub async fn new() -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        Self::with_notifier(notifier.clone(), notifier).await
    }

    /// Seeded harness whose engine talks to `engine_notifier`
    pub async fn with_notifier(
        recorder: Arc<RecordingNotifier>,
        engine_notifier: Arc<dyn Notifier>,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        seed(&store).await;
        let clock = Arc::new(ManualClock::new(start()));
        let services = Services::with_notifier(
            Repository::in_memory(store.clone()),
            engine_notifier,
            clock.clone(),
        );
        Self {
            store,
            clock,
            notifier: recorder,
            services,
        }
    }

    pub async fn update_settings(&self, f: impl FnOnce(&mut LibrarySettings)) {
        let mut settings = LibrarySettings::defaults(start());
        f(&mut settings);
        self.store.replace_settings(settings).await;
    }

    pub async fn reserve(&self, member_id: i32, book_id: i32, copy_id: Option<i32>) -> AppResult<Borrowing> {
        self.services
            .circulation
            .reserve(
                as_member(member_id),
                ReserveRequest {
                    member_id,
                    book_id,
                    copy_id,
                },
            )
            .await
    }

    pub async fn direct_borrow(&self, member_id: i32, book_id: i32, copy_id: Option<i32>) -> AppResult<Borrowing> {
        self.services
            .circulation
            .direct_borrow(
                librarian(),
                DirectBorrowRequest {
                    member_id,
                    book_id,
                    copy_id,
                },
            )
            .await
    }

    pub async fn copy_status(&self, book_id: i32, copy_id: i32) -> CopyStatus {
        self.store
            .copy_status(book_id, copy_id)
            .await
            .expect("copy is seeded")
    }

    /// At most one active borrowing per copy, and copy status mirrors it
    pub async fn assert_consistent(&self) {
        let borrowings = self.store.borrowings().await;
        for (book_id, copies) in [(DUNE, 2), (SOLARIS, 1), (NEUROMANCER, 6)] {
            for copy_id in 1..=copies {
                let active: Vec<&Borrowing> = borrowings
                    .iter()
                    .filter(|b| b.book_id == book_id && b.copy_id == copy_id && b.status.is_active())
                    .collect();
                assert!(active.len() <= 1, "copy {}/{} has {} active borrowings", book_id, copy_id, active.len());

                let Some(status) = self.store.copy_status(book_id, copy_id).await else {
                    continue;
                };
                match active.first().map(|b| b.status) {
                    Some(BorrowingStatus::Reserved) => assert_eq!(status, CopyStatus::Reserved),
                    Some(_) => assert_eq!(status, CopyStatus::Borrowed),
                    None => assert!(
                        !matches!(status, CopyStatus::Reserved | CopyStatus::Borrowed),
                        "copy {}/{} is {} without an active borrowing",
                        book_id,
                        copy_id,
                        status
                    ),
                }
            }
        }
    }
}

pub fn as_member(member_id: i32) -> Requester {
    Requester {
        member_id,
        role: Role::Member,
    }
}

pub fn librarian() -> Requester {
    Requester {
        member_id: LIBRARIAN,
        role: Role::Librarian,
    }
}

pub fn admin() -> Requester {
    Requester {
        member_id: ADMIN,
        role: Role::Admin,
    }
}

fn member(id: i32, name: &str, role: Role) -> Member {
    Member {
        id,
        name: name.to_string(),
        email: format!("{}@example.org", name.to_lowercase()),
        role,
        is_active: true,
        national_id: Some(format!("ID-{:04}", id)),
        phone_number: Some("0901 234 567".to_string()),
    }
}

async fn seed(store: &MemoryStore) {
    store.insert_member(member(ADA, "Ada", Role::Member)).await;
    store.insert_member(member(GRACE, "Grace", Role::Member)).await;
    store.insert_member(member(LIBRARIAN, "Linus", Role::Librarian)).await;
    store.insert_member(member(ADMIN, "Root", Role::Admin)).await;
    store
        .insert_member(Member {
            national_id: None,
            ..member(NO_PROFILE, "Nobody", Role::Member)
        })
        .await;
    store
        .insert_member(Member {
            is_active: false,
            ..member(INACTIVE, "Dormant", Role::Member)
        })
        .await;

    for (id, title, price, copies) in [
        (DUNE, "Dune", Some(Decimal::new(2000, 2)), 2),
        (SOLARIS, "Solaris", None, 1),
        (NEUROMANCER, "Neuromancer", Some(Decimal::new(1000, 2)), 6),
    ] {
        store
            .insert_book(Book {
                id,
                title: title.to_string(),
                price,
                borrow_count: 0,
            })
            .await;
        for copy_id in 1..=copies {
            store
                .insert_copy(BookCopy {
                    book_id: id,
                    copy_id,
                    location: Some(format!("Shelf {}", id)),
                    status: CopyStatus::Available,
                })
                .await;
        }
    }

    store.replace_settings(LibrarySettings::defaults(start())).await;
}
