//! Shared domain enums, stored as TEXT columns

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres};
use utoipa::ToSchema;

/// Implements the sqlx TEXT mapping for an enum exposing `as_str` and `FromStr<Err = String>`
macro_rules! impl_text_sqlx {
    ($ty:ty) => {
        impl sqlx::Type<Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $ty {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s: String = Decode::<Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl Encode<'_, Postgres> for $ty {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// BorrowingStatus
// ---------------------------------------------------------------------------

/// State of a borrowing record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum BorrowingStatus {
    Reserved,
    Borrowed,
    Overdue,
    Returned,
    Cancelled,
}

impl BorrowingStatus {
    /// Statuses holding a copy (counted against the member's limit)
    pub const ACTIVE: [BorrowingStatus; 3] = [
        BorrowingStatus::Reserved,
        BorrowingStatus::Borrowed,
        BorrowingStatus::Overdue,
    ];

    /// Statuses where the book is physically out with the member
    pub const ON_LOAN: [BorrowingStatus; 2] = [BorrowingStatus::Borrowed, BorrowingStatus::Overdue];

    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowingStatus::Reserved => "Reserved",
            BorrowingStatus::Borrowed => "Borrowed",
            BorrowingStatus::Overdue => "Overdue",
            BorrowingStatus::Returned => "Returned",
            BorrowingStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_on_loan(&self) -> bool {
        Self::ON_LOAN.contains(self)
    }
}

impl std::str::FromStr for BorrowingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Reserved" => Ok(BorrowingStatus::Reserved),
            "Borrowed" => Ok(BorrowingStatus::Borrowed),
            "Overdue" => Ok(BorrowingStatus::Overdue),
            "Returned" => Ok(BorrowingStatus::Returned),
            "Cancelled" => Ok(BorrowingStatus::Cancelled),
            _ => Err(format!("Invalid borrowing status: {}", s)),
        }
    }
}

impl_text_sqlx!(BorrowingStatus);

// ---------------------------------------------------------------------------
// CopyStatus
// ---------------------------------------------------------------------------

/// Circulation status of a physical copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum CopyStatus {
    Available,
    Reserved,
    Borrowed,
    Maintenance,
    Lost,
    Damaged,
    Withdrawn,
}

impl CopyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyStatus::Available => "Available",
            CopyStatus::Reserved => "Reserved",
            CopyStatus::Borrowed => "Borrowed",
            CopyStatus::Maintenance => "Maintenance",
            CopyStatus::Lost => "Lost",
            CopyStatus::Damaged => "Damaged",
            CopyStatus::Withdrawn => "Withdrawn",
        }
    }

    /// Statuses staff may set by hand; Reserved/Borrowed only come from the lifecycle
    pub fn is_manual(&self) -> bool {
        !self.is_held()
    }

    /// Held by an active borrowing
    pub fn is_held(&self) -> bool {
        matches!(self, CopyStatus::Reserved | CopyStatus::Borrowed)
    }
}

impl std::str::FromStr for CopyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(CopyStatus::Available),
            "Reserved" => Ok(CopyStatus::Reserved),
            "Borrowed" => Ok(CopyStatus::Borrowed),
            "Maintenance" => Ok(CopyStatus::Maintenance),
            "Lost" => Ok(CopyStatus::Lost),
            "Damaged" => Ok(CopyStatus::Damaged),
            "Withdrawn" => Ok(CopyStatus::Withdrawn),
            _ => Err(format!("Invalid copy status: {}", s)),
        }
    }
}

impl_text_sqlx!(CopyStatus);

// ---------------------------------------------------------------------------
// CopyLoss
// ---------------------------------------------------------------------------

/// Final outcome recorded when a borrowed copy does not come back intact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum CopyLoss {
    Lost,
    Damaged,
}

impl CopyLoss {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyLoss::Lost => "Lost",
            CopyLoss::Damaged => "Damaged",
        }
    }
}

impl From<CopyLoss> for CopyStatus {
    fn from(loss: CopyLoss) -> Self {
        match loss {
            CopyLoss::Lost => CopyStatus::Lost,
            CopyLoss::Damaged => CopyStatus::Damaged,
        }
    }
}

impl std::str::FromStr for CopyLoss {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Lost" => Ok(CopyLoss::Lost),
            "Damaged" => Ok(CopyLoss::Damaged),
            _ => Err(format!("Final status must be 'Lost' or 'Damaged', got '{}'", s)),
        }
    }
}

impl_text_sqlx!(CopyLoss);

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Role {
    Member,
    Librarian,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "Member",
            Role::Librarian => "Librarian",
            Role::Admin => "Admin",
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Librarian | Role::Admin)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Member" => Ok(Role::Member),
            "Librarian" => Ok(Role::Librarian),
            "Admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl_text_sqlx!(Role);

// ---------------------------------------------------------------------------
// NotificationType
// ---------------------------------------------------------------------------

/// Kind of lifecycle notice sent to members and staff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    ReservationSuccess,
    PickupReminder,
    ReservationCancelledExpired,
    ReservationCancelled,
    BorrowSuccess,
    LoanRenewed,
    ReturnReminder,
    OverdueNotice,
    ReturnSuccess,
    CopyLostOrDamaged,
    NewReservationAdmin,
    OverdueProcessingAdmin,
    PolicyChangeAdmin,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::ReservationSuccess => "RESERVATION_SUCCESS",
            NotificationType::PickupReminder => "PICKUP_REMINDER",
            NotificationType::ReservationCancelledExpired => "RESERVATION_CANCELLED_EXPIRED",
            NotificationType::ReservationCancelled => "RESERVATION_CANCELLED",
            NotificationType::BorrowSuccess => "BORROW_SUCCESS",
            NotificationType::LoanRenewed => "LOAN_RENEWED",
            NotificationType::ReturnReminder => "RETURN_REMINDER",
            NotificationType::OverdueNotice => "OVERDUE_NOTICE",
            NotificationType::ReturnSuccess => "RETURN_SUCCESS",
            NotificationType::CopyLostOrDamaged => "COPY_LOST_OR_DAMAGED",
            NotificationType::NewReservationAdmin => "NEW_RESERVATION_ADMIN",
            NotificationType::OverdueProcessingAdmin => "OVERDUE_PROCESSING_ADMIN",
            NotificationType::PolicyChangeAdmin => "POLICY_CHANGE_ADMIN",
        }
    }

    /// Email subject for member-facing kinds; staff kinds stay in the inbox
    pub fn email_subject(&self) -> Option<&'static str> {
        match self {
            NotificationType::ReservationSuccess => Some("Reservation Confirmed"),
            NotificationType::PickupReminder => Some("Book Pickup Reminder"),
            NotificationType::ReservationCancelledExpired => Some("Reservation Cancelled"),
            NotificationType::ReservationCancelled => Some("Reservation Cancelled"),
            NotificationType::BorrowSuccess => Some("Book Borrowed"),
            NotificationType::LoanRenewed => Some("Loan Renewed"),
            NotificationType::ReturnReminder => Some("Book Return Reminder"),
            NotificationType::OverdueNotice => Some("Overdue Book Notice"),
            NotificationType::ReturnSuccess => Some("Book Returned"),
            NotificationType::CopyLostOrDamaged => Some("Lost or Damaged Book Charges"),
            NotificationType::NewReservationAdmin
            | NotificationType::OverdueProcessingAdmin
            | NotificationType::PolicyChangeAdmin => None,
        }
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "RESERVATION_SUCCESS" => NotificationType::ReservationSuccess,
            "PICKUP_REMINDER" => NotificationType::PickupReminder,
            "RESERVATION_CANCELLED_EXPIRED" => NotificationType::ReservationCancelledExpired,
            "RESERVATION_CANCELLED" => NotificationType::ReservationCancelled,
            "BORROW_SUCCESS" => NotificationType::BorrowSuccess,
            "LOAN_RENEWED" => NotificationType::LoanRenewed,
            "RETURN_REMINDER" => NotificationType::ReturnReminder,
            "OVERDUE_NOTICE" => NotificationType::OverdueNotice,
            "RETURN_SUCCESS" => NotificationType::ReturnSuccess,
            "COPY_LOST_OR_DAMAGED" => NotificationType::CopyLostOrDamaged,
            "NEW_RESERVATION_ADMIN" => NotificationType::NewReservationAdmin,
            "OVERDUE_PROCESSING_ADMIN" => NotificationType::OverdueProcessingAdmin,
            "POLICY_CHANGE_ADMIN" => NotificationType::PolicyChangeAdmin,
            _ => return Err(format!("Invalid notification type: {}", s)),
        };
        Ok(kind)
    }
}

impl_text_sqlx!(NotificationType);

// ---------------------------------------------------------------------------
// NotificationStatus
// ---------------------------------------------------------------------------

/// Read state of an in-app notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Unread,
    Read,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Unread => "unread",
            NotificationStatus::Read => "read",
        }
    }
}

impl std::str::FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unread" => Ok(NotificationStatus::Unread),
            "read" => Ok(NotificationStatus::Read),
            _ => Err(format!("Invalid notification status: {}", s)),
        }
    }
}

impl_text_sqlx!(NotificationStatus);
