use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use common::MediaKey;
use sea_orm::sea_query::{LockType, Query as SeaQuery};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{
    favorite, ingredient, recipe, recipe_ingredient, recipe_tag, shopping_cart, tag, user,
};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::extractors::query::AppQuery;
use crate::models::recipe::*;
use crate::models::shared::PageQuery;
use crate::state::AppState;
use crate::utils::image::{RECIPE_IMAGE_NAMESPACE, decode_data_url};
use crate::utils::recipe::{find_recipe, recipe_details};
use crate::utils::shopping_list;

/// Look up which of the referenced tags and ingredients exist.
async fn known_references<C: ConnectionTrait>(
    db: &C,
    tags: &[i32],
    ingredients: &[IngredientAmount],
) -> Result<KnownReferences, DbErr> {
    let tag_ids: Vec<i32> = if tags.is_empty() {
        Vec::new()
    } else {
        tag::Entity::find()
            .select_only()
            .column(tag::Column::Id)
            .filter(tag::Column::Id.is_in(tags.to_vec()))
            .into_tuple()
            .all(db)
            .await?
    };

    let ingredient_ids: Vec<i32> = if ingredients.is_empty() {
        Vec::new()
    } else {
        ingredient::Entity::find()
            .select_only()
            .column(ingredient::Column::Id)
            .filter(ingredient::Column::Id.is_in(ingredients.iter().map(|i| i.id)))
            .into_tuple()
            .all(db)
            .await?
    };

    Ok(KnownReferences {
        tags: tag_ids.into_iter().collect(),
        ingredients: ingredient_ids.into_iter().collect(),
    })
}

/// Replace the tag and ingredient sets of a recipe.
async fn write_associations<C: ConnectionTrait>(
    db: &C,
    recipe_id: i32,
    tags: &[i32],
    ingredients: &[IngredientAmount],
) -> Result<(), DbErr> {
    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;
    recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;

    for &tag_id in tags {
        recipe_tag::Entity::insert(recipe_tag::ActiveModel {
            recipe_id: Set(recipe_id),
            tag_id: Set(tag_id),
            ..Default::default()
        })
        .exec_without_returning(db)
        .await?;
    }

    for line in ingredients {
        recipe_ingredient::Entity::insert(recipe_ingredient::ActiveModel {
            recipe_id: Set(recipe_id),
            ingredient_id: Set(line.id),
            amount: Set(line.amount),
            ..Default::default()
        })
        .exec_without_returning(db)
        .await?;
    }

    Ok(())
}

async fn store_image(state: &AppState, data_url: &str) -> Result<String, AppError> {
    let image = decode_data_url(data_url)?;
    let key = state
        .media
        .put(RECIPE_IMAGE_NAMESPACE, image.extension, &image.bytes)
        .await?;
    Ok(key.as_path())
}

/// Delete an image file once no recipe points at it any more.
///
/// Files are content-addressed, so two recipes may share one. The caller must
/// not hold `image_gate`.
async fn release_image(state: &AppState, image: &str) {
    let _exclusive = state.image_gate.write().await;
    let still_used = recipe::Entity::find()
        .filter(recipe::Column::Image.eq(image))
        .count(&state.db)
        .await;

    match still_used {
        Ok(0) => {}
        Ok(_) => return,
        Err(e) => {
            tracing::warn!("Could not check image usage for {}: {}", image, e);
            return;
        }
    }

    let result = match MediaKey::parse(image) {
        Ok(key) => state.media.delete(&key).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::warn!("Failed to delete image {}: {}", image, e);
    }
}

async fn insert_recipe(
    db: &DatabaseConnection,
    author_id: i32,
    payload: CreateRecipeRequest,
    image_key: String,
) -> Result<recipe::Model, AppError> {
    let txn = db.begin().await?;

    let model = recipe::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        text: Set(payload.text),
        cooking_time: Set(payload.cooking_time),
        image: Set(image_key),
        author_id: Set(author_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    write_associations(&txn, model.id, &payload.tags, &payload.ingredients).await?;
    txn.commit().await?;
    Ok(model)
}

/// Apply a PATCH under a row lock. Returns the updated row and the image it
/// pointed at before.
async fn apply_update(
    db: &DatabaseConnection,
    id: i32,
    payload: UpdateRecipeRequest,
    cooking_time: i32,
    new_image_key: Option<String>,
) -> Result<(recipe::Model, String), AppError> {
    let txn = db.begin().await?;

    let current = recipe::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {id} not found")))?;
    let old_image = current.image.clone();

    let mut active: recipe::ActiveModel = current.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(text) = payload.text {
        active.text = Set(text);
    }
    active.cooking_time = Set(cooking_time);
    if let Some(key) = new_image_key {
        active.image = Set(key);
    }
    let model = active.update(&txn).await?;

    write_associations(&txn, id, &payload.tags, &payload.ingredients).await?;
    txn.commit().await?;
    Ok((model, old_image))
}

async fn single_detail(
    state: &AppState,
    model: recipe::Model,
    viewer: Option<i32>,
) -> Result<RecipeResponse, AppError> {
    let id = model.id;
    recipe_details(&state.db, &state.config.media.public_url, vec![model], viewer)
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound(format!("Recipe {id} not found")))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Recipes",
    operation_id = "listRecipes",
    summary = "List recipes",
    description = "Returns a page of recipes, newest first. `tags` may repeat and matches any of the given slugs. `is_favorited` and `is_in_shopping_cart` only apply to authenticated callers.",
    params(RecipeListQuery),
    responses(
        (status = 200, description = "Page of recipes", body = RecipeListResponse),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_recipes(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<RecipeListQuery>,
) -> Result<Json<RecipeListResponse>, AppError> {
    let viewer = auth_user.map(|u| u.user_id);
    let window = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve(&state.config.pagination)?;

    let mut select = recipe::Entity::find();

    let slugs: Vec<&str> = query
        .tags
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if !slugs.is_empty() {
        let tag_ids: Vec<i32> = tag::Entity::find()
            .select_only()
            .column(tag::Column::Id)
            .filter(tag::Column::Slug.is_in(slugs))
            .into_tuple()
            .all(&state.db)
            .await?;
        select = select.filter(
            recipe::Column::Id.in_subquery(
                SeaQuery::select()
                    .column(recipe_tag::Column::RecipeId)
                    .from(recipe_tag::Entity)
                    .and_where(recipe_tag::Column::TagId.is_in(tag_ids))
                    .to_owned(),
            ),
        );
    }

    if let Some(author) = query.author {
        select = select.filter(recipe::Column::AuthorId.eq(author));
    }

    if let Some(uid) = viewer {
        if query.is_favorited == Some(true) {
            select = select.filter(
                recipe::Column::Id.in_subquery(
                    SeaQuery::select()
                        .column(favorite::Column::RecipeId)
                        .from(favorite::Entity)
                        .and_where(favorite::Column::UserId.eq(uid))
                        .to_owned(),
                ),
            );
        }
        if query.is_in_shopping_cart == Some(true) {
            select = select.filter(
                recipe::Column::Id.in_subquery(
                    SeaQuery::select()
                        .column(shopping_cart::Column::RecipeId)
                        .from(shopping_cart::Entity)
                        .and_where(shopping_cart::Column::UserId.eq(uid))
                        .to_owned(),
                ),
            );
        }
    }

    let total = select
        .clone()
        .paginate(&state.db, window.per_page)
        .num_items()
        .await?;

    let recipes = select
        .order_by_desc(recipe::Column::CreatedAt)
        .order_by_desc(recipe::Column::Id)
        .offset(Some(window.offset))
        .limit(Some(window.per_page))
        .all(&state.db)
        .await?;

    let data = recipe_details(&state.db, &state.config.media.public_url, recipes, viewer).await?;

    Ok(Json(RecipeListResponse {
        data,
        pagination: window.pagination(total),
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Recipes",
    operation_id = "createRecipe",
    summary = "Create a recipe",
    description = "Creates a recipe owned by the caller. Requires at least one tag and one ingredient, no repeats, amounts and cooking time within the configured bounds, and a base64 data-URL image.",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created", body = RecipeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, name = %payload.name))]
pub async fn create_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateRecipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_recipe_fields(Some(&payload.name), Some(&payload.text))?;

    let image = payload.image.as_deref().map(str::trim).unwrap_or_default();
    let known = known_references(&state.db, &payload.tags, &payload.ingredients).await?;
    validate_recipe(
        &RecipeCandidate {
            tags: &payload.tags,
            ingredients: &payload.ingredients,
            cooking_time: payload.cooking_time,
            has_image: !image.is_empty(),
        },
        &state.config.recipe,
        &known,
    )?;

    let upload = state.image_gate.read().await;
    let image_key = store_image(&state, image).await?;
    let inserted = insert_recipe(&state.db, auth_user.user_id, payload, image_key.clone()).await;
    drop(upload);

    let model = match inserted {
        Ok(model) => model,
        Err(e) => {
            release_image(&state, &image_key).await;
            return Err(e);
        }
    };

    let detail = single_detail(&state, model, Some(auth_user.user_id)).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Recipes",
    operation_id = "getRecipe",
    summary = "Get a recipe by ID",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Recipe", body = RecipeResponse),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_recipe(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RecipeResponse>, AppError> {
    let model = find_recipe(&state.db, id).await?;
    let detail = single_detail(&state, model, auth_user.map(|u| u.user_id)).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Recipes",
    operation_id = "updateRecipe",
    summary = "Update a recipe",
    description = "Replaces the tag and ingredient sets wholesale; both are required. `name`, `text`, `cooking_time` and `image` keep their current value when omitted. Only the author or an admin may update.",
    params(("id" = i32, Path, description = "Recipe ID")),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated", body = RecipeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, user_id = auth_user.user_id))]
pub async fn update_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateRecipeRequest>,
) -> Result<Json<RecipeResponse>, AppError> {
    let existing = find_recipe(&state.db, id).await?;
    auth_user.require_owner_or_admin(existing.author_id)?;

    validate_recipe_fields(payload.name.as_deref(), payload.text.as_deref())?;

    let new_image = payload
        .image
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let cooking_time = payload.cooking_time.unwrap_or(existing.cooking_time);
    let known = known_references(&state.db, &payload.tags, &payload.ingredients).await?;
    validate_recipe(
        &RecipeCandidate {
            tags: &payload.tags,
            ingredients: &payload.ingredients,
            cooking_time,
            has_image: new_image.is_some() || !existing.image.is_empty(),
        },
        &state.config.recipe,
        &known,
    )?;

    let upload = state.image_gate.read().await;
    let new_image_key = match new_image {
        Some(data_url) => Some(store_image(&state, data_url).await?),
        None => None,
    };
    let applied = apply_update(&state.db, id, payload, cooking_time, new_image_key.clone()).await;
    drop(upload);

    let (model, old_image) = match applied {
        Ok(applied) => applied,
        Err(e) => {
            if let Some(key) = &new_image_key {
                release_image(&state, key).await;
            }
            return Err(e);
        }
    };

    if new_image_key.is_some_and(|key| key != old_image) {
        release_image(&state, &old_image).await;
    }

    let detail = single_detail(&state, model, Some(auth_user.user_id)).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Recipes",
    operation_id = "deleteRecipe",
    summary = "Delete a recipe",
    description = "Deletes the recipe together with its ingredient lines, tag links, favorites and cart entries. Only the author or an admin may delete.",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Recipe deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn delete_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let existing = find_recipe(&state.db, id).await?;
    auth_user.require_owner_or_admin(existing.author_id)?;

    let txn = state.db.begin().await?;

    favorite::Entity::delete_many()
        .filter(favorite::Column::RecipeId.eq(id))
        .exec(&txn)
        .await?;
    shopping_cart::Entity::delete_many()
        .filter(shopping_cart::Column::RecipeId.eq(id))
        .exec(&txn)
        .await?;
    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(id))
        .exec(&txn)
        .await?;
    recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(id))
        .exec(&txn)
        .await?;
    let result = recipe::Entity::delete_by_id(id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Recipe {id} not found")));
    }

    txn.commit().await?;

    release_image(&state, &existing.image).await;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/download_shopping_cart",
    tag = "Shopping Cart",
    operation_id = "downloadShoppingCart",
    summary = "Download the shopping list",
    description = "Sums ingredient amounts across every recipe in the caller's cart and returns them as a plain-text attachment, one line per ingredient and unit, ordered by name.",
    responses(
        (status = 200, description = "Shopping list", content_type = "text/plain", body = String),
        (status = 400, description = "Cart is empty (SHOPPING_CART_EMPTY)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn download_shopping_cart(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let owner = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    let in_cart = shopping_cart::Entity::find()
        .filter(shopping_cart::Column::UserId.eq(owner.id))
        .count(&state.db)
        .await?;
    if in_cart == 0 {
        return Err(AppError::EmptyShoppingCart);
    }

    let lines = shopping_list::aggregate(&state.db, owner.id).await?;
    let body = shopping_list::render(
        &owner.full_name(),
        &lines,
        chrono::Utc::now().date_naive(),
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    shopping_list::attachment_filename(&owner.username)
                ),
            ),
        ],
        body,
    ))
}
