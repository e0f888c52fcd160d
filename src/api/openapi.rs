//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{borrowings, copies, health, notifications, settings};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Circulation API",
        version = "1.0.0",
        description = "Borrowing lifecycle REST API: reservations, loans, returns, fines and reminders"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Borrowings
        borrowings::reserve,
        borrowings::direct_borrow,
        borrowings::list_borrowings,
        borrowings::my_borrowings,
        borrowings::member_borrowings,
        borrowings::get_borrowing,
        borrowings::confirm_pickup,
        borrowings::return_book,
        borrowings::renew,
        borrowings::cancel_reservation,
        borrowings::report_lost_or_damaged,
        borrowings::run_sweeps,
        // Copies
        copies::list_copies,
        copies::add_copy,
        copies::update_copy,
        // Notifications
        notifications::list_notifications,
        notifications::mark_read,
        notifications::mark_all_read,
        // Settings
        settings::get_settings,
        settings::update_settings,
    ),
    components(
        schemas(
            // Borrowings
            crate::models::borrowing::Borrowing,
            crate::models::borrowing::ReserveRequest,
            crate::models::borrowing::DirectBorrowRequest,
            crate::models::enums::BorrowingStatus,
            crate::models::enums::CopyLoss,
            borrowings::ReportLossRequest,
            crate::services::circulation::SweepReport,
            crate::services::circulation::SweepKind,
            // Copies
            crate::models::book::BookCopy,
            crate::models::book::CreateCopy,
            crate::models::book::UpdateCopy,
            crate::models::enums::CopyStatus,
            // Notifications
            crate::models::notification::Notification,
            crate::models::enums::NotificationType,
            crate::models::enums::NotificationStatus,
            notifications::MarkAllReadResponse,
            // Settings
            crate::models::settings::LibrarySettings,
            crate::models::settings::UpdateSettings,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "borrowings", description = "Reservations, loans and their lifecycle"),
        (name = "copies", description = "Physical copy management"),
        (name = "notifications", description = "In-app notification inbox"),
        (name = "settings", description = "Circulation policy settings")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
