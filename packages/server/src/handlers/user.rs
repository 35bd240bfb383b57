use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{subscription, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::extractors::query::AppQuery;
use crate::models::auth::{
    RegisterRequest, SetPasswordRequest, validate_password, validate_register_request,
};
use crate::models::shared::PageQuery;
use crate::models::user::*;
use crate::state::AppState;
use crate::utils::hash;
use crate::utils::recipe::{subscription_entries, user_profiles};

async fn find_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Users",
    operation_id = "registerUser",
    summary = "Register a new user",
    description = "Creates a user account. Email and username must be unique.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = RegisterResponse),
        (status = 400, description = "Validation error or duplicate email/username (VALIDATION_ERROR, ALREADY_EXISTS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    let hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let new_user = user::ActiveModel {
        email: Set(payload.email.trim().to_string()),
        username: Set(payload.username.trim().to_string()),
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
        password: Set(hash),
        is_admin: Set(false),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let user = new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Registration race condition: unique constraint caught on insert");
            AppError::Conflict("A user with this email or username already exists".into())
        }
        _ => AppError::from(e),
    })?;

    Ok((StatusCode::CREATED, Json(RegisterResponse::from(user))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Users",
    operation_id = "listUsers",
    summary = "List users",
    description = "Returns a page of users ordered by username. `is_subscribed` is relative to the caller and always false for anonymous callers.",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of users", body = UserListResponse),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_users(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    let window = query.resolve(&state.config.pagination)?;
    let select = user::Entity::find();

    let total = select
        .clone()
        .paginate(&state.db, window.per_page)
        .num_items()
        .await?;

    let users = select
        .order_by_asc(user::Column::Username)
        .offset(Some(window.offset))
        .limit(Some(window.per_page))
        .all(&state.db)
        .await?;

    let data = user_profiles(&state.db, users, auth_user.map(|u| u.user_id)).await?;

    Ok(Json(UserListResponse {
        data,
        pagination: window.pagination(total),
    }))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Users",
    operation_id = "getCurrentUser",
    summary = "Get the current user",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let user = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    Ok(Json(UserResponse::new(user, false)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Users",
    operation_id = "getUser",
    summary = "Get a user profile",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_user(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>, AppError> {
    let user = find_user(&state.db, id).await?;
    let mut profiles = user_profiles(&state.db, vec![user], auth_user.map(|u| u.user_id)).await?;

    profiles
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
}

#[utoipa::path(
    post,
    path = "/set_password",
    tag = "Users",
    operation_id = "setPassword",
    summary = "Change the current user's password",
    request_body = SetPasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Wrong current password or weak new password (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn set_password(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    validate_password(&payload.new_password)?;

    let user = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    let is_valid = hash::verify_password(&payload.current_password, &user.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
    if !is_valid {
        return Err(AppError::Validation("Current password is incorrect".into()));
    }

    let hash = hash::hash_password(&payload.new_password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let mut active: user::ActiveModel = user.into();
    active.password = Set(hash);
    active.update(&state.db).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/subscriptions",
    tag = "Subscriptions",
    operation_id = "listSubscriptions",
    summary = "List followed authors",
    description = "Returns a page of the authors the caller follows, each with a preview of their recipes. `recipes_limit` caps the preview.",
    params(SubscriptionListQuery),
    responses(
        (status = 200, description = "Page of subscriptions", body = SubscriptionListResponse),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_subscriptions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SubscriptionListQuery>,
) -> Result<Json<SubscriptionListResponse>, AppError> {
    let window = query.page_query().resolve(&state.config.pagination)?;

    let select = user::Entity::find().filter(
        user::Column::Id.in_subquery(
            SeaQuery::select()
                .column(subscription::Column::AuthorId)
                .from(subscription::Entity)
                .and_where(subscription::Column::UserId.eq(auth_user.user_id))
                .to_owned(),
        ),
    );

    let total = select
        .clone()
        .paginate(&state.db, window.per_page)
        .num_items()
        .await?;

    let authors = select
        .order_by_asc(user::Column::Username)
        .offset(Some(window.offset))
        .limit(Some(window.per_page))
        .all(&state.db)
        .await?;

    let data = subscription_entries(
        &state.db,
        &state.config.media.public_url,
        authors,
        query.recipes_limit,
    )
    .await?;

    Ok(Json(SubscriptionListResponse {
        data,
        pagination: window.pagination(total),
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/subscribe",
    tag = "Subscriptions",
    operation_id = "subscribe",
    summary = "Follow an author",
    params(
        ("id" = i32, Path, description = "Author user ID"),
        RecipesLimitQuery,
    ),
    responses(
        (status = 201, description = "Subscribed", body = SubscriptionResponse),
        (status = 400, description = "Self-subscription or already subscribed (VALIDATION_ERROR, ALREADY_EXISTS)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Author not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id, author_id = id))]
pub async fn subscribe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppQuery(query): AppQuery<RecipesLimitQuery>,
) -> Result<impl IntoResponse, AppError> {
    let author = find_user(&state.db, id).await?;

    if author.id == auth_user.user_id {
        return Err(AppError::Validation("You cannot subscribe to yourself".into()));
    }

    let row = subscription::ActiveModel {
        user_id: Set(auth_user.user_id),
        author_id: Set(author.id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    subscription::Entity::insert(row)
        .exec_without_returning(&state.db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict(format!("Already subscribed to user {id}"))
            }
            _ => AppError::from(e),
        })?;

    let entry = subscription_entries(
        &state.db,
        &state.config.media.public_url,
        vec![author],
        query.recipes_limit,
    )
    .await?
    .pop()
    .ok_or_else(|| AppError::Internal("subscription entry missing".into()))?;

    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    delete,
    path = "/{id}/subscribe",
    tag = "Subscriptions",
    operation_id = "unsubscribe",
    summary = "Stop following an author",
    params(("id" = i32, Path, description = "Author user ID")),
    responses(
        (status = 204, description = "Unsubscribed"),
        (status = 400, description = "Not subscribed (NOT_PRESENT)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Author not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, author_id = id))]
pub async fn unsubscribe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    find_user(&state.db, id).await?;

    let result = subscription::Entity::delete_many()
        .filter(subscription::Column::UserId.eq(auth_user.user_id))
        .filter(subscription::Column::AuthorId.eq(id))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotPresent(format!(
            "You are not subscribed to user {id}"
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}
