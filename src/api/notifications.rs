//! Notification inbox endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::notification::{Notification, NotificationQuery},
    AppState,
};

use super::{AuthenticatedUser, PaginatedResponse};

#[derive(Serialize, ToSchema)]
pub struct MarkAllReadResponse {
    /// Notifications that changed from unread to read
    pub updated: u64,
}

/// List own notifications, newest first
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(NotificationQuery),
    responses(
        (status = 200, description = "Notifications", body = PaginatedResponse<Notification>)
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<PaginatedResponse<Notification>>> {
    let (items, total) = state
        .services
        .notifications
        .list(claims.member_id, &query)
        .await?;
    Ok(Json(PaginatedResponse::new(items, total, query.limit_offset())))
}

/// Mark one notification as read
#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked as read", body = Notification),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Notification>> {
    let notification = state
        .services
        .notifications
        .mark_read(id, claims.member_id)
        .await?;
    Ok(Json(notification))
}

/// Mark every own notification as read
#[utoipa::path(
    put,
    path = "/notifications/read-all",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Count of notifications marked", body = MarkAllReadResponse)
    )
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<MarkAllReadResponse>> {
    let updated = state
        .services
        .notifications
        .mark_all_read(claims.member_id)
        .await?;
    Ok(Json(MarkAllReadResponse { updated }))
}
