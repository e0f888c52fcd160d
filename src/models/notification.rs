//! In-app notifications and outgoing lifecycle notices

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::enums::{NotificationStatus, NotificationType};

/// Stored in-app notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Notification {
    pub id: i32,
    pub recipient_id: i32,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub message: String,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

/// Who a notice is for
#[derive(Debug, Clone, PartialEq)]
pub enum Audience {
    /// One member, addressed with the name/email snapshot of the borrowing
    Member {
        id: i32,
        name: String,
        email: Option<String>,
    },
    /// Every active librarian and administrator
    Staff,
}

/// A notice emitted by the lifecycle engine after a transition commits
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub audience: Audience,
    pub kind: NotificationType,
    pub message: String,
}

impl Notice {
    pub fn staff(kind: NotificationType, message: impl Into<String>) -> Self {
        Self {
            audience: Audience::Staff,
            kind,
            message: message.into(),
        }
    }

    /// Member the notice is addressed to, if any
    pub fn member_id(&self) -> Option<i32> {
        match self.audience {
            Audience::Member { id, .. } => Some(id),
            Audience::Staff => None,
        }
    }
}

/// Notification inbox filters
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
pub struct NotificationQuery {
    pub status: Option<NotificationStatus>,
    /// Page number (1-based)
    pub page: Option<i64>,
    /// Items per page
    pub per_page: Option<i64>,
}

impl NotificationQuery {
    pub fn limit_offset(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(10).clamp(1, 100);
        (per_page, (page - 1) * per_page)
    }
}
