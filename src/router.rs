use crate::handlers::{
    auth::{login, logout},
    health::health_check,
    ingredients::{get_ingredient, list_ingredients},
    recipes::{
        add_favorite, add_to_shopping_cart, create_recipe, delete_recipe, download_shopping_cart,
        get_recipe, list_recipes, remove_favorite, remove_from_shopping_cart, update_recipe,
    },
    tags::{get_tag, list_tags},
    users::{
        get_user, list_users, me, register, set_password, subscribe, subscriptions, unsubscribe,
    },
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    Router,
    routing::{get, post},
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Token auth
        .route("/api/v1/auth/token/login", post(login))
        .route("/api/v1/auth/token/logout", post(logout))
        // Users and subscriptions
        .route("/api/v1/users", get(list_users).post(register))
        .route("/api/v1/users/me", get(me))
        .route("/api/v1/users/set_password", post(set_password))
        .route("/api/v1/users/subscriptions", get(subscriptions))
        .route("/api/v1/users/:user_id", get(get_user))
        .route(
            "/api/v1/users/:user_id/subscribe",
            post(subscribe).delete(unsubscribe),
        )
        // Catalog
        .route("/api/v1/tags", get(list_tags))
        .route("/api/v1/tags/:tag_id", get(get_tag))
        .route("/api/v1/ingredients", get(list_ingredients))
        .route("/api/v1/ingredients/:ingredient_id", get(get_ingredient))
        // Recipes
        .route("/api/v1/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/api/v1/recipes/download_shopping_cart",
            get(download_shopping_cart),
        )
        .route(
            "/api/v1/recipes/:recipe_id",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route(
            "/api/v1/recipes/:recipe_id/favorite",
            post(add_favorite).delete(remove_favorite),
        )
        .route(
            "/api/v1/recipes/:recipe_id/shopping_cart",
            post(add_to_shopping_cart).delete(remove_from_shopping_cart),
        )
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
