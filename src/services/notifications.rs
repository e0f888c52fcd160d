//! Notification delivery (in-app inbox + email) and inbox operations

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::notification::{Audience, Notice, Notification, NotificationQuery},
    repository::Repository,
};

use super::email::EmailService;

/// Receives notices after a transition has committed.
///
/// Errors are reported to the caller for logging only; a failed delivery never
/// undoes the transition.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: Notice) -> AppResult<()>;
}

#[derive(Clone)]
pub struct NotificationService {
    repository: Repository,
    email: EmailService,
}

impl NotificationService {
    pub fn new(repository: Repository, email: EmailService) -> Self {
        Self { repository, email }
    }

    /// List a member's notifications, newest first
    pub async fn list(&self, recipient_id: i32, query: &NotificationQuery) -> AppResult<(Vec<Notification>, i64)> {
        self.repository.notifications.list_for(recipient_id, query).await
    }

    pub async fn mark_read(&self, id: i32, recipient_id: i32) -> AppResult<Notification> {
        self.repository.notifications.mark_read(id, recipient_id).await
    }

    pub async fn mark_all_read(&self, recipient_id: i32) -> AppResult<u64> {
        self.repository.notifications.mark_all_read(recipient_id).await
    }

    /// Mail a member in the background; failures are logged
    fn spawn_email(&self, to: String, name: String, subject: &'static str, message: String) {
        if !self.email.is_enabled() {
            return;
        }
        let email = self.email.clone();
        tokio::spawn(async move {
            if let Err(e) = email.send_notice(&to, &name, subject, &message).await {
                tracing::warn!("Failed to email '{}' notice to {}: {}", subject, to, e);
            }
        });
    }
}

#[async_trait]
impl Notifier for NotificationService {
    async fn notify(&self, notice: Notice) -> AppResult<()> {
        match notice.audience {
            Audience::Member { id, name, email } => {
                self.repository
                    .notifications
                    .create(id, notice.kind, &notice.message)
                    .await?;
                if let (Some(to), Some(subject)) = (email, notice.kind.email_subject()) {
                    self.spawn_email(to, name, subject, notice.message);
                }
            }
            Audience::Staff => {
                for staff in self.repository.members.list_staff().await? {
                    self.repository
                        .notifications
                        .create(staff.id, notice.kind, &notice.message)
                        .await?;
                }
            }
        }
        tracing::debug!("Delivered {} notice", notice.kind);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::{
        config::EmailConfig,
        models::{
            enums::{NotificationStatus, NotificationType, Role},
            member::Member,
        },
        repository::memory::MemoryStore,
    };

    fn member(id: i32, role: Role, is_active: bool) -> Member {
        Member {
            id,
            name: format!("member {}", id),
            email: format!("m{}@example.org", id),
            role,
            is_active,
            national_id: None,
            phone_number: None,
        }
    }

    async fn service() -> (Arc<MemoryStore>, NotificationService) {
        let store = Arc::new(MemoryStore::new());
        store.insert_member(member(1, Role::Member, true)).await;
        store.insert_member(member(2, Role::Librarian, true)).await;
        store.insert_member(member(3, Role::Admin, true)).await;
        store.insert_member(member(4, Role::Librarian, false)).await;
        let service = NotificationService::new(
            Repository::in_memory(store.clone()),
            EmailService::new(EmailConfig::default()),
        );
        (store, service)
    }

    #[tokio::test]
    async fn test_staff_notice_reaches_active_staff() {
        let (store, service) = service().await;
        service
            .notify(Notice::staff(NotificationType::PolicyChangeAdmin, "Loan period changed"))
            .await
            .unwrap();
        let recipients: Vec<i32> = store.notifications().await.iter().map(|n| n.recipient_id).collect();
        assert_eq!(recipients, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_inbox_read_flow() {
        let (_store, service) = service().await;
        for message in ["one", "two"] {
            service
                .notify(Notice {
                    audience: Audience::Member {
                        id: 1,
                        name: "member 1".to_string(),
                        email: None,
                    },
                    kind: NotificationType::ReturnReminder,
                    message: message.to_string(),
                })
                .await
                .unwrap();
        }

        let (rows, total) = service.list(1, &NotificationQuery::default()).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows[0].message, "two");

        service.mark_read(rows[0].id, 1).await.unwrap();
        assert!(service.mark_read(rows[0].id, 2).await.is_err());

        let unread = NotificationQuery {
            status: Some(NotificationStatus::Unread),
            ..Default::default()
        };
        let (_, total) = service.list(1, &unread).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(service.mark_all_read(1).await.unwrap(), 1);
    }
}
