use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use model::entities::ingredient;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, CachedData, ErrorResponse};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IngredientResponse {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

impl From<ingredient::Model> for IngredientResponse {
    fn from(model: ingredient::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            measurement_unit: model.measurement_unit,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IngredientSearchQuery {
    /// Case-insensitive name prefix
    pub search: Option<String>,
}

/// `LIKE` pattern matching names that start with `prefix`.
fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// List ingredients, optionally filtered by name prefix
#[utoipa::path(
    get,
    path = "/api/v1/ingredients",
    tag = "ingredients",
    params(IngredientSearchQuery),
    responses(
        (status = 200, description = "Ingredients ordered by name", body = ApiResponse<Vec<IngredientResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(query): Query<IngredientSearchQuery>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<IngredientResponse>>>), ApiError> {
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let cache_key = format!("ingredients:{}", search.unwrap_or_default().to_lowercase());

    if let Some(CachedData::Ingredients(found)) = state.cache.get(&cache_key).await {
        trace!("Serving {} ingredients from cache", found.len());
        return Ok((
            StatusCode::OK,
            Json(ApiResponse::ok(found, "Ingredients retrieved from cache")),
        ));
    }

    let mut select = ingredient::Entity::find()
        .order_by_asc(ingredient::Column::Name)
        .order_by_asc(ingredient::Column::MeasurementUnit);
    if let Some(prefix) = search {
        select = select.filter(
            Expr::expr(Func::lower(Expr::col(ingredient::Column::Name)))
                .like(LikeExpr::new(prefix_pattern(prefix)).escape('\\')),
        );
    }

    let found: Vec<IngredientResponse> = select
        .all(&state.db)
        .await?
        .into_iter()
        .map(IngredientResponse::from)
        .collect();
    debug!("Found {} ingredients for {:?}", found.len(), search);

    state
        .cache
        .insert(cache_key, CachedData::Ingredients(found.clone()))
        .await;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(found, "Ingredients retrieved successfully")),
    ))
}

/// Get an ingredient by ID
#[utoipa::path(
    get,
    path = "/api/v1/ingredients/{ingredient_id}",
    tag = "ingredients",
    params(("ingredient_id" = i32, Path, description = "Ingredient ID")),
    responses(
        (status = 200, description = "Ingredient found", body = ApiResponse<IngredientResponse>),
        (status = 404, description = "Ingredient not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(ingredient_id): Path<i32>,
) -> Result<(StatusCode, Json<ApiResponse<IngredientResponse>>), ApiError> {
    let found = ingredient::Entity::find_by_id(ingredient_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Ingredient {} not found", ingredient_id)))?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(
            IngredientResponse::from(found),
            "Ingredient retrieved successfully",
        )),
    ))
}

#[cfg(test)]
mod tests {
    use super::prefix_pattern;

    #[test]
    fn test_prefix_pattern_escapes_wildcards() {
        assert_eq!(prefix_pattern("Sal"), "sal%");
        assert_eq!(prefix_pattern("50%_"), "50\\%\\_%");
    }
}
