//! Data models for the circulation server

pub mod book;
pub mod borrowing;
pub mod enums;
pub mod member;
pub mod notification;
pub mod settings;

// Re-export commonly used types
pub use book::{Book, BookCopy};
pub use borrowing::{Borrowing, BorrowingQuery, BorrowingScan, PairWrite};
pub use enums::{BorrowingStatus, CopyLoss, CopyStatus, NotificationStatus, NotificationType, Role};
pub use member::{Member, MemberClaims, Requester};
pub use notification::{Audience, Notice, Notification};
pub use settings::{LibrarySettings, UpdateSettings};
