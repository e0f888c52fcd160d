//! Copy (physical item) endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{BookCopy, CreateCopy, UpdateCopy},
    AppState,
};

use super::AuthenticatedUser;

/// List the copies of a book
#[utoipa::path(
    get,
    path = "/books/{id}/copies",
    tag = "copies",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Copies of the book", body = Vec<BookCopy>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn list_copies(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<Vec<BookCopy>>> {
    let copies = state.services.inventory.list_copies(book_id).await?;
    Ok(Json(copies))
}

/// Add a copy to a book
#[utoipa::path(
    post,
    path = "/books/{id}/copies",
    tag = "copies",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = CreateCopy,
    responses(
        (status = 201, description = "Copy created", body = BookCopy),
        (status = 400, description = "Missing location or lifecycle status"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn add_copy(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
    Json(request): Json<CreateCopy>,
) -> AppResult<(StatusCode, Json<BookCopy>)> {
    claims.require_staff()?;
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let copy = state.services.inventory.add_copy(book_id, request).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

/// Update a copy's status or location
#[utoipa::path(
    put,
    path = "/books/{id}/copies/{copy_id}",
    tag = "copies",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID"),
        ("copy_id" = i32, Path, description = "Copy ID within the book")
    ),
    request_body = UpdateCopy,
    responses(
        (status = 200, description = "Copy updated", body = BookCopy),
        (status = 404, description = "Copy not found"),
        (status = 409, description = "Copy is Reserved or Borrowed")
    )
)]
pub async fn update_copy(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((book_id, copy_id)): Path<(i32, i32)>,
    Json(request): Json<UpdateCopy>,
) -> AppResult<Json<BookCopy>> {
    claims.require_staff()?;
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let copy = state
        .services
        .inventory
        .update_copy(book_id, copy_id, request)
        .await?;
    Ok(Json(copy))
}
