use std::sync::Arc;

use compute::Settings;
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};
use validator::Validate;

use crate::handlers::{
    auth::{LoginRequest, TokenResponse},
    ingredients::IngredientResponse,
    recipes::{
        CreateRecipeRequest, IngredientAmountRequest, RecipeIngredientResponse, RecipeResponse,
        ShortRecipeResponse, UpdateRecipeRequest,
    },
    tags::TagResponse,
    users::{RegisterRequest, SetPasswordRequest, SubscriptionResponse, UserResponse},
};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Cache for catalog reads
    pub cache: Cache<String, CachedData>,
    /// Business rules
    pub settings: Arc<Settings>,
}

/// Cached data types
#[derive(Clone, Debug)]
pub enum CachedData {
    Tags(Vec<TagResponse>),
    Ingredients(Vec<IngredientResponse>),
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
    /// Request field the error refers to, for validation errors
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub field: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// One page of a list endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    /// Number of matching rows across all pages
    pub count: u64,
    pub results: Vec<T>,
}

/// Pagination query parameters
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page number, starting at 1
    #[validate(range(min = 1, max = 100000))]
    pub page: Option<u64>,
    /// Page size (defaults to the configured page size)
    #[validate(range(min = 1))]
    pub limit: Option<u64>,
}

impl PageQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1)
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::users::register,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::me,
        crate::handlers::users::set_password,
        crate::handlers::users::subscribe,
        crate::handlers::users::unsubscribe,
        crate::handlers::users::subscriptions,
        crate::handlers::tags::list_tags,
        crate::handlers::tags::get_tag,
        crate::handlers::ingredients::list_ingredients,
        crate::handlers::ingredients::get_ingredient,
        crate::handlers::recipes::list_recipes,
        crate::handlers::recipes::get_recipe,
        crate::handlers::recipes::create_recipe,
        crate::handlers::recipes::update_recipe,
        crate::handlers::recipes::delete_recipe,
        crate::handlers::recipes::add_favorite,
        crate::handlers::recipes::remove_favorite,
        crate::handlers::recipes::add_to_shopping_cart,
        crate::handlers::recipes::remove_from_shopping_cart,
        crate::handlers::recipes::download_shopping_cart,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            LoginRequest,
            TokenResponse,
            RegisterRequest,
            SetPasswordRequest,
            UserResponse,
            SubscriptionResponse,
            TagResponse,
            IngredientResponse,
            IngredientAmountRequest,
            CreateRecipeRequest,
            UpdateRecipeRequest,
            RecipeIngredientResponse,
            RecipeResponse,
            ShortRecipeResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Token login and logout"),
        (name = "users", description = "Accounts and subscriptions"),
        (name = "tags", description = "Recipe tags"),
        (name = "ingredients", description = "Ingredient catalog"),
        (name = "recipes", description = "Recipes, favorites and the shopping cart"),
    ),
    info(
        title = "Foodgram API",
        description = "Recipe sharing backend: publish recipes, follow authors, build shopping lists",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
