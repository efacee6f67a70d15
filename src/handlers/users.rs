use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use compute::{recipe_query, relations, validation::validate_username};
use model::entities::{subscription, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::{AuthUser, MaybeUser, hash_password, verify_password};
use crate::error::ApiError;
use crate::extract::{ValidJson, ValidQuery};
use crate::handlers::recipes::ShortRecipeResponse;
use crate::schemas::{ApiResponse, AppState, ErrorResponse, PageQuery, PaginatedResponse};

/// Registration form
#[derive(Deserialize, Serialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(email, length(max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1, max = 150))]
    pub first_name: String,
    #[validate(length(min = 1, max = 150))]
    pub last_name: String,
    #[validate(length(min = 1, max = 150))]
    pub password: String,
}

#[derive(Deserialize, Serialize, ToSchema, Validate)]
pub struct SetPasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 1, max = 150))]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the requesting user follows this user
    pub is_subscribed: bool,
}

impl UserResponse {
    pub fn new(model: user::Model, is_subscribed: bool) -> Self {
        Self {
            email: model.email,
            id: model.id,
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            is_subscribed,
        }
    }
}

/// A followed author with a preview of their recipes
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionResponse {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<ShortRecipeResponse>,
    pub recipes_count: u64,
}

#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct SubscriptionsQuery {
    #[validate(range(min = 1, max = 100000))]
    pub page: Option<u64>,
    #[validate(range(min = 1))]
    pub limit: Option<u64>,
    /// Show at most this many recipes per author
    pub recipes_limit: Option<u64>,
}

/// Build the subscription view of `author` as seen by its follower.
async fn subscription_view(
    state: &AppState,
    author: user::Model,
    recipes_limit: Option<u64>,
) -> Result<SubscriptionResponse, ApiError> {
    let recipes = recipe_query::recipes_by_author(&state.db, author.id, recipes_limit).await?;
    let recipes_count = recipe_query::count_by_author(&state.db, author.id).await?;

    Ok(SubscriptionResponse {
        email: author.email,
        id: author.id,
        username: author.username,
        first_name: author.first_name,
        last_name: author.last_name,
        is_subscribed: true,
        recipes: recipes.into_iter().map(ShortRecipeResponse::from).collect(),
        recipes_count,
    })
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid or duplicate data", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    validate_username(&request.username, &state.settings)?;

    let email_taken = user::Entity::find()
        .filter(user::Column::Email.eq(request.email.as_str()))
        .count(&state.db)
        .await?
        > 0;
    if email_taken {
        return Err(ApiError::validation("email", "A user with this email already exists"));
    }
    let username_taken = user::Entity::find()
        .filter(user::Column::Username.eq(request.username.as_str()))
        .count(&state.db)
        .await?
        > 0;
    if username_taken {
        return Err(ApiError::validation(
            "username",
            "A user with this username already exists",
        ));
    }

    let created = user::ActiveModel {
        email: Set(request.email),
        username: Set(request.username),
        first_name: Set(request.first_name),
        last_name: Set(request.last_name),
        password_hash: Set(hash_password(&request.password)?),
        is_admin: Set(false),
        date_joined: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Registered user {} ({})", created.id, created.username);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            UserResponse::new(created, false),
            "User created successfully",
        )),
    ))
}

/// List users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(PageQuery),
    responses(
        (status = 200, description = "Users ordered by username", body = ApiResponse<PaginatedResponse<UserResponse>>)
    )
)]
#[instrument(skip(state, viewer))]
pub async fn list_users(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> Result<(StatusCode, Json<ApiResponse<PaginatedResponse<UserResponse>>>), ApiError> {
    let per_page = state.settings.page_size(query.limit);
    let paginator = user::Entity::find()
        .order_by_asc(user::Column::Username)
        .paginate(&state.db, per_page);
    let count = paginator.num_items().await?;
    let users = paginator.fetch_page(query.page().saturating_sub(1)).await?;
    trace!("Fetched {} of {} users", users.len(), count);

    let followed: HashSet<i32> = match viewer.id() {
        Some(viewer_id) => subscription::Entity::find()
            .filter(subscription::Column::UserId.eq(viewer_id))
            .filter(subscription::Column::FollowingId.is_in(users.iter().map(|u| u.id)))
            .all(&state.db)
            .await?
            .into_iter()
            .map(|edge| edge.following_id)
            .collect(),
        None => HashSet::new(),
    };

    let results = users
        .into_iter()
        .map(|u| {
            let subscribed = followed.contains(&u.id);
            UserResponse::new(u, subscribed)
        })
        .collect();

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(
            PaginatedResponse { count, results },
            "Users retrieved successfully",
        )),
    ))
}

/// Get a user profile
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(("user_id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, viewer))]
pub async fn get_user(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(user_id): Path<i32>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let found = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {} not found", user_id)))?;
    let subscribed = relations::is_subscribed(&state.db, viewer.id(), found.id).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(
            UserResponse::new(found, subscribed),
            "User retrieved successfully",
        )),
    ))
}

/// The authenticated user's own profile
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(auth), fields(user_id = auth.user.id))]
pub async fn me(auth: AuthUser) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(
            UserResponse::new(auth.user, false),
            "User retrieved successfully",
        )),
    ))
}

/// Change the authenticated user's password
#[utoipa::path(
    post,
    path = "/api/v1/users/set_password",
    tag = "users",
    request_body = SetPasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Current password is wrong", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request), fields(user_id = auth.user.id))]
pub async fn set_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(request): ValidJson<SetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    if !verify_password(&request.current_password, &auth.user.password_hash) {
        return Err(ApiError::validation("current_password", "Invalid password"));
    }

    let mut active = auth.user.into_active_model();
    active.password_hash = Set(hash_password(&request.new_password)?);
    active.update(&state.db).await?;

    info!("Password changed");
    Ok(StatusCode::NO_CONTENT)
}

/// Follow a user
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/subscribe",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "User to follow"),
        SubscriptionsQuery
    ),
    responses(
        (status = 201, description = "Subscribed", body = ApiResponse<SubscriptionResponse>),
        (status = 400, description = "Self subscription or already subscribed", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(user_id = auth.user.id))]
pub async fn subscribe(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(following_id): Path<i32>,
    ValidQuery(query): ValidQuery<SubscriptionsQuery>,
) -> Result<(StatusCode, Json<ApiResponse<SubscriptionResponse>>), ApiError> {
    let author = relations::subscribe(&state.db, auth.user.id, following_id).await?;
    let view = subscription_view(&state, author, query.recipes_limit).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(view, "Subscribed successfully")),
    ))
}

/// Stop following a user
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}/subscribe",
    tag = "users",
    params(("user_id" = i32, Path, description = "User to unfollow")),
    responses(
        (status = 204, description = "Unsubscribed"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "User not found or not subscribed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(user_id = auth.user.id))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(following_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    relations::unsubscribe(&state.db, auth.user.id, following_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Authors the current user follows
#[utoipa::path(
    get,
    path = "/api/v1/users/subscriptions",
    tag = "users",
    params(SubscriptionsQuery),
    responses(
        (status = 200, description = "Followed authors", body = ApiResponse<PaginatedResponse<SubscriptionResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(user_id = auth.user.id))]
pub async fn subscriptions(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidQuery(query): ValidQuery<SubscriptionsQuery>,
) -> Result<(StatusCode, Json<ApiResponse<PaginatedResponse<SubscriptionResponse>>>), ApiError> {
    let per_page = state.settings.page_size(query.limit);
    let page = relations::followed_authors(
        &state.db,
        auth.user.id,
        query.page.unwrap_or(1),
        per_page,
    )
    .await?;
    debug!("User follows {} authors", page.count);

    let mut results = Vec::with_capacity(page.results.len());
    for author in page.results {
        results.push(subscription_view(&state, author, query.recipes_limit).await?);
    }

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(
            PaginatedResponse {
                count: page.count,
                results,
            },
            "Subscriptions retrieved successfully",
        )),
    ))
}
