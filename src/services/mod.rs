//! Business logic services

pub mod circulation;
pub mod clock;
pub mod email;
pub mod inventory;
pub mod notifications;
pub mod scheduler;
pub mod settings;

use std::sync::Arc;

use crate::{config::EmailConfig, repository::Repository};

use self::{
    circulation::CirculationService,
    clock::Clock,
    email::EmailService,
    inventory::InventoryService,
    notifications::{NotificationService, Notifier},
    settings::SettingsService,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub circulation: CirculationService,
    pub inventory: InventoryService,
    pub settings: SettingsService,
    pub notifications: NotificationService,
}

impl Services {
    /// Create all services; notices go to the in-app inbox and, when enabled, by email
    pub fn new(repository: Repository, email_config: EmailConfig, clock: Arc<dyn Clock>) -> Self {
        let notifications = NotificationService::new(repository.clone(), EmailService::new(email_config));
        let notifier: Arc<dyn Notifier> = Arc::new(notifications.clone());
        Self::assemble(repository, notifications, notifier, clock)
    }

    /// Create all services with a custom notifier for lifecycle notices
    pub fn with_notifier(repository: Repository, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        let notifications = NotificationService::new(repository.clone(), EmailService::new(EmailConfig::default()));
        Self::assemble(repository, notifications, notifier, clock)
    }

    fn assemble(
        repository: Repository,
        notifications: NotificationService,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            circulation: CirculationService::new(repository.clone(), notifier.clone(), clock.clone()),
            inventory: InventoryService::new(repository.clone()),
            settings: SettingsService::new(repository, notifier, clock),
            notifications,
        }
    }
}
