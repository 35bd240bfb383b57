use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::entity::favorite;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::recipe::RecipeShortResponse;
use crate::state::AppState;
use crate::utils::collection::{add_recipe, remove_recipe};
use crate::utils::recipe::short_recipe;

#[utoipa::path(
    post,
    path = "/{id}/favorite",
    tag = "Favorites",
    operation_id = "addFavorite",
    summary = "Add a recipe to favorites",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 201, description = "Added", body = RecipeShortResponse),
        (status = 400, description = "Unknown recipe or already in favorites (VALIDATION_ERROR, ALREADY_EXISTS)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn add_favorite(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = add_recipe::<favorite::Entity, _>(&state.db, auth_user.user_id, id).await?;

    Ok((
        StatusCode::CREATED,
        Json(short_recipe(recipe, &state.config.media.public_url)),
    ))
}

#[utoipa::path(
    delete,
    path = "/{id}/favorite",
    tag = "Favorites",
    operation_id = "removeFavorite",
    summary = "Remove a recipe from favorites",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 400, description = "Recipe is not in favorites (NOT_PRESENT)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn remove_favorite(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    remove_recipe::<favorite::Entity, _>(&state.db, auth_user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
