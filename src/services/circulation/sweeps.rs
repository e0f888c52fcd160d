//! Time-driven transitions: overdue promotion, reservation expiry, reminders.
//!
//! Each sweep scans for candidates, then handles every candidate on its own:
//! lock the pair, re-read, re-check the scan predicate, commit, notify. A
//! failure on one record is logged and counted; the rest of the batch goes on.
//! Running a sweep again right away finds nothing left to do.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::SchedulerConfig,
    error::AppResult,
    models::{
        borrowing::{Borrowing, BorrowingScan, PairWrite},
        notification::Notice,
    },
};

use super::{
    notices,
    transitions::{self, Reminder},
    CirculationService,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    Overdue,
    ExpiredReservations,
    ReturnReminders,
    PickupReminders,
}

/// Outcome of one sweep run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    pub sweep: SweepKind,
    /// Candidates returned by the scan
    pub scanned: usize,
    pub transitioned: usize,
    /// No longer matching once locked
    pub skipped: usize,
    pub failed: usize,
}

impl SweepReport {
    fn new(sweep: SweepKind, scanned: usize) -> Self {
        Self {
            sweep,
            scanned,
            transitioned: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

/// How far ahead reminders look
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderLeads {
    pub return_lead: Duration,
    pub pickup_lead: Duration,
}

impl Default for ReminderLeads {
    fn default() -> Self {
        Self {
            return_lead: Duration::hours(48),
            pickup_lead: Duration::hours(24),
        }
    }
}

impl From<&SchedulerConfig> for ReminderLeads {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            return_lead: Duration::hours(config.return_reminder_lead_hours),
            pickup_lead: Duration::hours(config.pickup_reminder_lead_hours),
        }
    }
}

type NoticeFn = fn(&Borrowing, &str) -> Vec<Notice>;

/// Write for one candidate, and the notices to send once it commits
fn plan(sweep: SweepKind, record: &Borrowing, now: DateTime<Utc>) -> Option<(PairWrite, Option<NoticeFn>)> {
    match sweep {
        SweepKind::Overdue => {
            let notify = !record.notified_overdue;
            transitions::mark_overdue(record, now)
                .map(|write| (write, notify.then_some(notices::overdue as NoticeFn)))
        }
        SweepKind::ExpiredReservations => transitions::promote_if_expired(record, now)
            .map(|write| (write, Some(notices::expired as NoticeFn))),
        SweepKind::ReturnReminders => Some((
            transitions::mark_reminded(record, Reminder::Return, now),
            Some(notices::return_reminder as NoticeFn),
        )),
        SweepKind::PickupReminders => Some((
            transitions::mark_reminded(record, Reminder::Pickup, now),
            Some(notices::pickup_reminder as NoticeFn),
        )),
    }
}

enum Outcome {
    Transitioned,
    Skipped,
}

impl CirculationService {
    /// Promote Borrowed loans past due to Overdue and send the overdue notice once
    pub async fn sweep_overdue(&self) -> AppResult<SweepReport> {
        let now = self.clock.now();
        self.sweep(SweepKind::Overdue, BorrowingScan::OverdueCandidates { now }, now)
            .await
    }

    /// Cancel reservations past their pickup deadline and release the copies
    pub async fn sweep_expired_reservations(&self) -> AppResult<SweepReport> {
        let now = self.clock.now();
        self.sweep(
            SweepKind::ExpiredReservations,
            BorrowingScan::ExpiredReservations { now },
            now,
        )
        .await
    }

    /// Due-date and pickup reminders, each sent at most once per record
    pub async fn sweep_reminders(&self, leads: ReminderLeads) -> AppResult<Vec<SweepReport>> {
        let now = self.clock.now();
        let returns = self
            .sweep(
                SweepKind::ReturnReminders,
                BorrowingScan::ReturnReminders {
                    now,
                    until: now + leads.return_lead,
                },
                now,
            )
            .await?;
        let pickups = self
            .sweep(
                SweepKind::PickupReminders,
                BorrowingScan::PickupReminders {
                    now,
                    until: now + leads.pickup_lead,
                },
                now,
            )
            .await?;
        Ok(vec![returns, pickups])
    }

    /// Every sweep, in lifecycle order
    pub async fn run_all_sweeps(&self, leads: ReminderLeads) -> AppResult<Vec<SweepReport>> {
        let mut reports = vec![
            self.sweep_overdue().await?,
            self.sweep_expired_reservations().await?,
        ];
        reports.extend(self.sweep_reminders(leads).await?);
        Ok(reports)
    }

    async fn sweep(&self, sweep: SweepKind, scan: BorrowingScan, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let candidates = self.repository.borrowings.scan(scan).await?;
        let mut report = SweepReport::new(sweep, candidates.len());

        for candidate in candidates {
            match self.sweep_one(sweep, scan, candidate.id, now).await {
                Ok(Outcome::Transitioned) => report.transitioned += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        "{:?} sweep failed on borrowing {}: {}",
                        sweep,
                        candidate.id,
                        e
                    );
                }
            }
        }

        if report.transitioned > 0 || report.failed > 0 {
            tracing::info!(
                "{:?} sweep: {} scanned, {} transitioned, {} skipped, {} failed",
                sweep,
                report.scanned,
                report.transitioned,
                report.skipped,
                report.failed
            );
        }
        Ok(report)
    }

    async fn sweep_one(
        &self,
        sweep: SweepKind,
        scan: BorrowingScan,
        borrowing_id: i32,
        now: DateTime<Utc>,
    ) -> AppResult<Outcome> {
        let (guard, record) = self.lock_record(borrowing_id).await?;
        if !scan.matches(&record) {
            return Ok(Outcome::Skipped);
        }
        let Some((write, notice_fn)) = plan(sweep, &record, now) else {
            return Ok(Outcome::Skipped);
        };
        let committed = self.repository.borrowings.commit(write).await?;
        drop(guard);

        if let Some(notice_fn) = notice_fn {
            let title = self.title(committed.book_id).await;
            self.deliver(notice_fn(&committed, &title)).await;
        }
        Ok(Outcome::Transitioned)
    }
}
