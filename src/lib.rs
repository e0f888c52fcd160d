//! Circulation Server
//!
//! Borrowing lifecycle engine for a lending library: reservations, pickups,
//! returns, renewals, loss reporting, fines, and the scheduled sweeps that
//! mark overdue loans, expire stale reservations and send reminders.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
