//! Settings endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::settings::{LibrarySettings, UpdateSettings},
    AppState,
};

use super::AuthenticatedUser;

/// Get circulation settings
#[utoipa::path(
    get,
    path = "/settings",
    tag = "settings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current settings", body = LibrarySettings)
    )
)]
pub async fn get_settings(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<LibrarySettings>> {
    let settings = state.services.settings.get_settings().await?;
    Ok(Json(settings))
}

/// Update circulation settings
#[utoipa::path(
    put,
    path = "/settings",
    tag = "settings",
    security(("bearer_auth" = [])),
    request_body = UpdateSettings,
    responses(
        (status = 200, description = "Settings updated", body = LibrarySettings),
        (status = 400, description = "Invalid value"),
        (status = 403, description = "Administrators only")
    )
)]
pub async fn update_settings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<UpdateSettings>,
) -> AppResult<Json<LibrarySettings>> {
    claims.require_admin()?;

    let settings = state.services.settings.update_settings(request).await?;
    Ok(Json(settings))
}
