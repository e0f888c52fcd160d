//! Periodic driver for the lifecycle sweeps

use std::time::Duration;

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::config::SchedulerConfig;

use super::circulation::{CirculationService, ReminderLeads};

/// Background sweep task. Dropping the handle does not stop it; call `shutdown`.
pub struct Scheduler {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Start the sweep loop: overdue + expiry on one interval, reminders on another
    pub fn spawn(circulation: CirculationService, config: &SchedulerConfig) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let leads = ReminderLeads::from(config);
        let mut lifecycle = interval(Duration::from_secs(config.sweep_interval_secs.max(1)));
        let mut reminders = interval(Duration::from_secs(config.reminder_interval_secs.max(1)));
        lifecycle.set_missed_tick_behavior(MissedTickBehavior::Skip);
        reminders.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            "Scheduler started: lifecycle sweeps every {}s, reminders every {}s",
            config.sweep_interval_secs,
            config.reminder_interval_secs
        );

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = lifecycle.tick() => run_lifecycle(&circulation).await,
                    _ = reminders.tick() => run_reminders(&circulation, leads).await,
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("Scheduler stopped");
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stop after the sweep in progress, if any, and wait for the task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!("Scheduler task ended abnormally: {}", e);
        }
    }
}

/// Overdue promotion then reservation expiry; a failed scan waits for the next tick
async fn run_lifecycle(circulation: &CirculationService) {
    if let Err(e) = circulation.sweep_overdue().await {
        tracing::error!("Overdue sweep failed: {}", e);
    }
    if let Err(e) = circulation.sweep_expired_reservations().await {
        tracing::error!("Reservation expiry sweep failed: {}", e);
    }
}

async fn run_reminders(circulation: &CirculationService, leads: ReminderLeads) {
    if let Err(e) = circulation.sweep_reminders(leads).await {
        tracing::error!("Reminder sweep failed: {}", e);
    }
}
