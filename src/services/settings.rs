//! Settings service

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::NotificationType,
        notification::Notice,
        settings::{LibrarySettings, UpdateSettings},
    },
    repository::Repository,
};

use super::{clock::Clock, notifications::Notifier};

#[derive(Clone)]
pub struct SettingsService {
    repository: Repository,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl SettingsService {
    pub fn new(repository: Repository, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            notifier,
            clock,
        }
    }

    /// Get current settings, created with defaults on first access
    pub async fn get_settings(&self) -> AppResult<LibrarySettings> {
        self.repository.settings.get_or_init().await
    }

    /// Apply a partial update and tell staff about it
    pub async fn update_settings(&self, update: UpdateSettings) -> AppResult<LibrarySettings> {
        update.check().map_err(AppError::Validation)?;

        let mut settings = self.repository.settings.get_or_init().await?;
        settings.apply(&update, self.clock.now());
        let saved = self.repository.settings.save(&settings).await?;
        tracing::info!("Library settings updated");

        let notice = Notice::staff(
            NotificationType::PolicyChangeAdmin,
            format!(
                "Library policy updated: loan period {} days, max {} books, fine {} per day, grace {} days, pickup window {} hours.",
                saved.loan_period_days,
                saved.max_books_per_user,
                saved.fine_per_day,
                saved.grace_period_days,
                saved.pickup_time_limit_hours
            ),
        );
        if let Err(e) = self.notifier.notify(notice).await {
            tracing::warn!("Failed to notify staff of the policy change: {}", e);
        }
        Ok(saved)
    }
}
