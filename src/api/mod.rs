//! API handlers for the circulation REST endpoints

pub mod borrowings;
pub mod copies;
pub mod health;
pub mod notifications;
pub mod openapi;
pub mod settings;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{error::AppError, models::member::MemberClaims, AppState};

/// Extractor for the authenticated member from the JWT bearer token
pub struct AuthenticatedUser(pub MemberClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = MemberClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub items: Vec<T>,
    /// Total number of matching records
    pub total: i64,
    /// Current page number
    pub page: i64,
    pub per_page: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    fn new(items: Vec<T>, total: i64, (limit, offset): (i64, i64)) -> Self {
        Self {
            items,
            total,
            page: offset / limit + 1,
            per_page: limit,
        }
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Borrowings
        .route("/borrowings", get(borrowings::list_borrowings))
        .route("/borrowings/reserve", post(borrowings::reserve))
        .route("/borrowings/direct", post(borrowings::direct_borrow))
        .route("/borrowings/:id", get(borrowings::get_borrowing))
        .route("/borrowings/:id/pickup", post(borrowings::confirm_pickup))
        .route("/borrowings/:id/return", post(borrowings::return_book))
        .route("/borrowings/:id/renew", post(borrowings::renew))
        .route("/borrowings/:id/cancel", post(borrowings::cancel_reservation))
        .route("/borrowings/:id/lost-or-damaged", post(borrowings::report_lost_or_damaged))
        .route("/me/borrowings", get(borrowings::my_borrowings))
        .route("/members/:id/borrowings", get(borrowings::member_borrowings))
        .route("/admin/sweeps", post(borrowings::run_sweeps))
        // Copies
        .route("/books/:id/copies", get(copies::list_copies).post(copies::add_copy))
        .route("/books/:id/copies/:copy_id", put(copies::update_copy))
        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/read-all", put(notifications::mark_all_read))
        .route("/notifications/:id/read", put(notifications::mark_read))
        // Settings
        .route("/settings", get(settings::get_settings).put(settings::update_settings))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
