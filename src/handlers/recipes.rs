use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json},
};
use compute::{
    recipe_query::{self, RecipeDetails, RecipeFilter},
    recipe_writer::{self, RecipeDraft, RecipePatch},
    relations, shopping_list,
    validation::IngredientAmount,
};
use model::entities::{recipe, user_recipe::RecipeListKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::{AuthUser, MaybeUser};
use crate::error::ApiError;
use crate::extract::{ValidJson, ValidQuery};
use crate::handlers::{tags::TagResponse, users::UserResponse};
use crate::schemas::{ApiResponse, AppState, ErrorResponse, PaginatedResponse};

pub const SHOPPING_LIST_FILENAME: &str = "shopping_cart.txt";

#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
pub struct IngredientAmountRequest {
    /// Ingredient ID
    pub id: i32,
    pub amount: i32,
}

impl From<IngredientAmountRequest> for IngredientAmount {
    fn from(request: IngredientAmountRequest) -> Self {
        IngredientAmount {
            id: request.id,
            amount: request.amount,
        }
    }
}

fn to_amounts(requests: Vec<IngredientAmountRequest>) -> Vec<IngredientAmount> {
    requests.into_iter().map(IngredientAmount::from).collect()
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateRecipeRequest {
    #[serde(default)]
    pub ingredients: Vec<IngredientAmountRequest>,
    /// Tag IDs
    #[serde(default)]
    pub tags: Vec<i32>,
    /// Image reference, stored as sent
    #[validate(length(min = 1))]
    pub image: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1))]
    pub text: String,
    /// Minutes
    pub cooking_time: i32,
}

/// Partial update; omitted fields keep their values
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateRecipeRequest {
    pub ingredients: Option<Vec<IngredientAmountRequest>>,
    pub tags: Option<Vec<i32>>,
    #[validate(length(min = 1))]
    pub image: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipeIngredientResponse {
    /// Ingredient ID
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipeResponse {
    pub id: i32,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl From<RecipeDetails> for RecipeResponse {
    fn from(details: RecipeDetails) -> Self {
        Self {
            id: details.recipe.id,
            tags: details.tags.into_iter().map(TagResponse::from).collect(),
            author: UserResponse::new(details.author, details.author_is_subscribed),
            ingredients: details
                .ingredients
                .into_iter()
                .map(|line| RecipeIngredientResponse {
                    id: line.id,
                    name: line.name,
                    measurement_unit: line.measurement_unit,
                    amount: line.amount,
                })
                .collect(),
            is_favorited: details.is_favorited,
            is_in_shopping_cart: details.is_in_shopping_cart,
            name: details.recipe.name,
            image: details.recipe.image,
            text: details.recipe.text,
            cooking_time: details.recipe.cooking_time,
        }
    }
}

/// Compact recipe used in lists of saved recipes and subscriptions
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShortRecipeResponse {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<recipe::Model> for ShortRecipeResponse {
    fn from(model: recipe::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            image: model.image,
            cooking_time: model.cooking_time,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct RecipeListQuery {
    #[validate(range(min = 1, max = 100000))]
    pub page: Option<u64>,
    #[validate(range(min = 1))]
    pub limit: Option<u64>,
    /// Author user ID
    pub author: Option<i32>,
    /// Comma separated tag slugs; recipes with any of them match
    pub tags: Option<String>,
    /// `1` to show only the caller's favorites
    #[validate(range(max = 1))]
    pub is_favorited: Option<u8>,
    /// `1` to show only recipes in the caller's shopping cart
    #[validate(range(max = 1))]
    pub is_in_shopping_cart: Option<u8>,
}

impl RecipeListQuery {
    fn filter(&self) -> RecipeFilter {
        RecipeFilter {
            author: self.author,
            tags: self
                .tags
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|slug| !slug.is_empty())
                .map(str::to_string)
                .collect(),
            is_favorited: self.is_favorited == Some(1),
            is_in_shopping_cart: self.is_in_shopping_cart == Some(1),
        }
    }
}

async fn load_recipe(
    state: &AppState,
    recipe_id: i32,
    viewer: Option<i32>,
) -> Result<RecipeResponse, ApiError> {
    recipe_query::get_recipe(&state.db, recipe_id, viewer)
        .await?
        .map(RecipeResponse::from)
        .ok_or_else(|| ApiError::not_found(format!("Recipe {} not found", recipe_id)))
}

/// List recipes
#[utoipa::path(
    get,
    path = "/api/v1/recipes",
    tag = "recipes",
    params(RecipeListQuery),
    responses(
        (status = 200, description = "Recipes, newest first", body = ApiResponse<PaginatedResponse<RecipeResponse>>),
        (status = 400, description = "Invalid query", body = ErrorResponse)
    )
)]
#[instrument(skip(state, viewer))]
pub async fn list_recipes(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ValidQuery(query): ValidQuery<RecipeListQuery>,
) -> Result<(StatusCode, Json<ApiResponse<PaginatedResponse<RecipeResponse>>>), ApiError> {
    let per_page = state.settings.page_size(query.limit);
    let page = recipe_query::list_recipes(
        &state.db,
        &query.filter(),
        viewer.id(),
        query.page.unwrap_or(1),
        per_page,
    )
    .await?;
    debug!("Returning {} of {} recipes", page.results.len(), page.count);

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(
            PaginatedResponse {
                count: page.count,
                results: page.results.into_iter().map(RecipeResponse::from).collect(),
            },
            "Recipes retrieved successfully",
        )),
    ))
}

/// Get a recipe
#[utoipa::path(
    get,
    path = "/api/v1/recipes/{recipe_id}",
    tag = "recipes",
    params(("recipe_id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Recipe found", body = ApiResponse<RecipeResponse>),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, viewer))]
pub async fn get_recipe(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(recipe_id): Path<i32>,
) -> Result<(StatusCode, Json<ApiResponse<RecipeResponse>>), ApiError> {
    let found = load_recipe(&state, recipe_id, viewer.id()).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(found, "Recipe retrieved successfully")),
    ))
}

/// Publish a recipe
#[utoipa::path(
    post,
    path = "/api/v1/recipes",
    tag = "recipes",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created", body = ApiResponse<RecipeResponse>),
        (status = 400, description = "Invalid recipe", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request), fields(user_id = auth.user.id))]
pub async fn create_recipe(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(request): ValidJson<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RecipeResponse>>), ApiError> {
    let draft = RecipeDraft {
        name: request.name,
        image: request.image,
        text: request.text,
        cooking_time: request.cooking_time,
        ingredients: to_amounts(request.ingredients),
        tags: request.tags,
    };
    let created =
        recipe_writer::create_recipe(&state.db, &auth.user, draft, &state.settings).await?;
    info!("Recipe {} published", created.id);

    let view = load_recipe(&state, created.id, Some(auth.user.id)).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(view, "Recipe created successfully")),
    ))
}

/// Update a recipe
#[utoipa::path(
    patch,
    path = "/api/v1/recipes/{recipe_id}",
    tag = "recipes",
    params(("recipe_id" = i32, Path, description = "Recipe ID")),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated", body = ApiResponse<RecipeResponse>),
        (status = 400, description = "Invalid recipe", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request), fields(user_id = auth.user.id))]
pub async fn update_recipe(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(recipe_id): Path<i32>,
    ValidJson(request): ValidJson<UpdateRecipeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RecipeResponse>>), ApiError> {
    let patch = RecipePatch {
        name: request.name,
        image: request.image,
        text: request.text,
        cooking_time: request.cooking_time,
        ingredients: request.ingredients.map(to_amounts),
        tags: request.tags,
    };
    recipe_writer::update_recipe(&state.db, &auth.user, recipe_id, patch, &state.settings).await?;

    let view = load_recipe(&state, recipe_id, Some(auth.user.id)).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(view, "Recipe updated successfully")),
    ))
}

/// Delete a recipe
#[utoipa::path(
    delete,
    path = "/api/v1/recipes/{recipe_id}",
    tag = "recipes",
    params(("recipe_id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Recipe deleted"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(user_id = auth.user.id))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(recipe_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    recipe_writer::delete_recipe(&state.db, &auth.user, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn save_recipe(
    state: &AppState,
    user_id: i32,
    recipe_id: i32,
    kind: RecipeListKind,
) -> Result<(StatusCode, Json<ApiResponse<ShortRecipeResponse>>), ApiError> {
    let saved = relations::add_to_list(&state.db, user_id, recipe_id, kind).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            ShortRecipeResponse::from(saved),
            format!("Recipe added to {}", kind.label()),
        )),
    ))
}

/// Add a recipe to favorites
#[utoipa::path(
    post,
    path = "/api/v1/recipes/{recipe_id}/favorite",
    tag = "recipes",
    params(("recipe_id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 201, description = "Added", body = ApiResponse<ShortRecipeResponse>),
        (status = 400, description = "Already in favorites", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(user_id = auth.user.id))]
pub async fn add_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(recipe_id): Path<i32>,
) -> Result<(StatusCode, Json<ApiResponse<ShortRecipeResponse>>), ApiError> {
    save_recipe(&state, auth.user.id, recipe_id, RecipeListKind::Favorite).await
}

/// Remove a recipe from favorites
#[utoipa::path(
    delete,
    path = "/api/v1/recipes/{recipe_id}/favorite",
    tag = "recipes",
    params(("recipe_id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Recipe not found or not in favorites", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(user_id = auth.user.id))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(recipe_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    relations::remove_from_list(&state.db, auth.user.id, recipe_id, RecipeListKind::Favorite)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add a recipe to the shopping cart
#[utoipa::path(
    post,
    path = "/api/v1/recipes/{recipe_id}/shopping_cart",
    tag = "recipes",
    params(("recipe_id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 201, description = "Added", body = ApiResponse<ShortRecipeResponse>),
        (status = 400, description = "Already in the shopping cart", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(user_id = auth.user.id))]
pub async fn add_to_shopping_cart(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(recipe_id): Path<i32>,
) -> Result<(StatusCode, Json<ApiResponse<ShortRecipeResponse>>), ApiError> {
    save_recipe(&state, auth.user.id, recipe_id, RecipeListKind::ShoppingCart).await
}

/// Remove a recipe from the shopping cart
#[utoipa::path(
    delete,
    path = "/api/v1/recipes/{recipe_id}/shopping_cart",
    tag = "recipes",
    params(("recipe_id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Recipe not found or not in the shopping cart", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(user_id = auth.user.id))]
pub async fn remove_from_shopping_cart(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(recipe_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    relations::remove_from_list(&state.db, auth.user.id, recipe_id, RecipeListKind::ShoppingCart)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Download the aggregated shopping list as a text file
#[utoipa::path(
    get,
    path = "/api/v1/recipes/download_shopping_cart",
    tag = "recipes",
    responses(
        (status = 200, description = "Shopping list", body = String, content_type = "text/plain"),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(user_id = auth.user.id))]
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let document = shopping_list::export_shopping_list(&state.db, auth.user.id).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", SHOPPING_LIST_FILENAME),
            ),
        ],
        document,
    ))
}
