//! Borrowing lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        borrowing::{Borrowing, BorrowingQuery, DirectBorrowRequest, ReserveRequest},
        enums::CopyLoss,
    },
    services::circulation::{ReminderLeads, SweepReport},
    AppState,
};

use super::{AuthenticatedUser, PaginatedResponse};

/// Lost/damaged report body
#[derive(Deserialize, ToSchema)]
pub struct ReportLossRequest {
    /// `Lost` or `Damaged`
    pub final_status: CopyLoss,
}

/// Reserve a copy for pickup
#[utoipa::path(
    post,
    path = "/borrowings/reserve",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    request_body = ReserveRequest,
    responses(
        (status = 201, description = "Reservation created", body = Borrowing),
        (status = 404, description = "Member, book or copy not found"),
        (status = 409, description = "Copy not available or member not eligible")
    )
)]
pub async fn reserve(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<ReserveRequest>,
) -> AppResult<(StatusCode, Json<Borrowing>)> {
    let borrowing = state
        .services
        .circulation
        .reserve(claims.requester(), request)
        .await?;
    Ok((StatusCode::CREATED, Json(borrowing)))
}

/// Counter checkout without a reservation
#[utoipa::path(
    post,
    path = "/borrowings/direct",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    request_body = DirectBorrowRequest,
    responses(
        (status = 201, description = "Loan created", body = Borrowing),
        (status = 403, description = "Staff only"),
        (status = 409, description = "Copy not available or member not eligible")
    )
)]
pub async fn direct_borrow(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<DirectBorrowRequest>,
) -> AppResult<(StatusCode, Json<Borrowing>)> {
    let borrowing = state
        .services
        .circulation
        .direct_borrow(claims.requester(), request)
        .await?;
    Ok((StatusCode::CREATED, Json(borrowing)))
}

/// List borrowings with filters
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(BorrowingQuery),
    responses(
        (status = 200, description = "Borrowings, newest first", body = PaginatedResponse<Borrowing>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_borrowings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<PaginatedResponse<Borrowing>>> {
    let (items, total) = state
        .services
        .circulation
        .list_borrowings(claims.requester(), &query)
        .await?;
    Ok(Json(PaginatedResponse::new(items, total, query.limit_offset())))
}

/// Current member's borrowing history
#[utoipa::path(
    get,
    path = "/me/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(BorrowingQuery),
    responses(
        (status = 200, description = "Own borrowings, newest first", body = PaginatedResponse<Borrowing>)
    )
)]
pub async fn my_borrowings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<PaginatedResponse<Borrowing>>> {
    let page = query.limit_offset();
    let (items, total) = state
        .services
        .circulation
        .member_history(claims.requester(), claims.member_id, query)
        .await?;
    Ok(Json(PaginatedResponse::new(items, total, page)))
}

/// A member's borrowing history
#[utoipa::path(
    get,
    path = "/members/{id}/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID"),
        BorrowingQuery
    ),
    responses(
        (status = 200, description = "Member's borrowings, newest first", body = PaginatedResponse<Borrowing>),
        (status = 403, description = "Not the member and not staff")
    )
)]
pub async fn member_borrowings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(member_id): Path<i32>,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<PaginatedResponse<Borrowing>>> {
    let page = query.limit_offset();
    let (items, total) = state
        .services
        .circulation
        .member_history(claims.requester(), member_id, query)
        .await?;
    Ok(Json(PaginatedResponse::new(items, total, page)))
}

/// Get a borrowing
#[utoipa::path(
    get,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 200, description = "Borrowing", body = Borrowing),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn get_borrowing(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Borrowing>> {
    let borrowing = state
        .services
        .circulation
        .get_borrowing(claims.requester(), id)
        .await?;
    Ok(Json(borrowing))
}

/// Confirm pickup of a reserved copy
#[utoipa::path(
    post,
    path = "/borrowings/{id}/pickup",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 200, description = "Loan started", body = Borrowing),
        (status = 409, description = "Borrowing is not Reserved"),
        (status = 410, description = "Reservation expired and was cancelled")
    )
)]
pub async fn confirm_pickup(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Borrowing>> {
    let borrowing = state
        .services
        .circulation
        .confirm_pickup(claims.requester(), id)
        .await?;
    Ok(Json(borrowing))
}

/// Return a borrowed copy
#[utoipa::path(
    post,
    path = "/borrowings/{id}/return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 200, description = "Returned, fine settled", body = Borrowing),
        (status = 409, description = "Borrowing is not on loan")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Borrowing>> {
    let borrowing = state
        .services
        .circulation
        .return_book(claims.requester(), id)
        .await?;
    Ok(Json(borrowing))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/borrowings/{id}/renew",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 200, description = "Due date extended", body = Borrowing),
        (status = 409, description = "Loan is overdue or not Borrowed")
    )
)]
pub async fn renew(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Borrowing>> {
    let borrowing = state
        .services
        .circulation
        .renew(claims.requester(), id)
        .await?;
    Ok(Json(borrowing))
}

/// Cancel a reservation
#[utoipa::path(
    post,
    path = "/borrowings/{id}/cancel",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 200, description = "Reservation cancelled", body = Borrowing),
        (status = 403, description = "Not the owner and not staff"),
        (status = 409, description = "Borrowing is not Reserved")
    )
)]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Borrowing>> {
    let borrowing = state
        .services
        .circulation
        .cancel_reservation(claims.requester(), id)
        .await?;
    Ok(Json(borrowing))
}

/// Close a loan as lost or damaged
#[utoipa::path(
    post,
    path = "/borrowings/{id}/lost-or-damaged",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrowing ID")),
    request_body = ReportLossRequest,
    responses(
        (status = 200, description = "Loan closed, charges applied", body = Borrowing),
        (status = 409, description = "Borrowing is not on loan"),
        (status = 500, description = "Book has no price")
    )
)]
pub async fn report_lost_or_damaged(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<ReportLossRequest>,
) -> AppResult<Json<Borrowing>> {
    let borrowing = state
        .services
        .circulation
        .report_lost_or_damaged(claims.requester(), id, request.final_status)
        .await?;
    Ok(Json(borrowing))
}

/// Run every sweep now
#[utoipa::path(
    post,
    path = "/admin/sweeps",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep reports", body = Vec<SweepReport>),
        (status = 403, description = "Administrators only")
    )
)]
pub async fn run_sweeps(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<SweepReport>>> {
    claims.require_admin()?;
    let leads = ReminderLeads::from(&state.config.scheduler);
    let reports = state.services.circulation.run_all_sweeps(leads).await?;
    Ok(Json(reports))
}
