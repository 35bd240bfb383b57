use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::entity::shopping_cart;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::recipe::RecipeShortResponse;
use crate::state::AppState;
use crate::utils::collection::{add_recipe, remove_recipe};
use crate::utils::recipe::short_recipe;

#[utoipa::path(
    post,
    path = "/{id}/shopping_cart",
    tag = "Shopping Cart",
    operation_id = "addToShoppingCart",
    summary = "Add a recipe to the shopping cart",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 201, description = "Added", body = RecipeShortResponse),
        (status = 400, description = "Unknown recipe or already in the shopping cart (VALIDATION_ERROR, ALREADY_EXISTS)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn add_to_shopping_cart(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = add_recipe::<shopping_cart::Entity, _>(&state.db, auth_user.user_id, id).await?;

    Ok((
        StatusCode::CREATED,
        Json(short_recipe(recipe, &state.config.media.public_url)),
    ))
}

#[utoipa::path(
    delete,
    path = "/{id}/shopping_cart",
    tag = "Shopping Cart",
    operation_id = "removeFromShoppingCart",
    summary = "Remove a recipe from the shopping cart",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 400, description = "Recipe is not in the shopping cart (NOT_PRESENT)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn remove_from_shopping_cart(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    remove_recipe::<shopping_cart::Entity, _>(&state.db, auth_user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
