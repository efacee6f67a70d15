use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use model::entities::tag;
use sea_orm::{EntityTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, CachedData, ErrorResponse};

const TAGS_CACHE_KEY: &str = "tags";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TagResponse {
    pub id: i32,
    pub name: String,
    /// HEX color, e.g. "#E26C2D"
    pub color: String,
    pub slug: String,
}

impl From<tag::Model> for TagResponse {
    fn from(model: tag::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            color: model.color,
            slug: model.slug,
        }
    }
}

/// List all tags
#[utoipa::path(
    get,
    path = "/api/v1/tags",
    tag = "tags",
    responses(
        (status = 200, description = "Tags ordered by name", body = ApiResponse<Vec<TagResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_tags(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<TagResponse>>>), ApiError> {
    if let Some(CachedData::Tags(tags)) = state.cache.get(TAGS_CACHE_KEY).await {
        trace!("Serving {} tags from cache", tags.len());
        return Ok((
            StatusCode::OK,
            Json(ApiResponse::ok(tags, "Tags retrieved from cache")),
        ));
    }

    let tags: Vec<TagResponse> = tag::Entity::find()
        .order_by_asc(tag::Column::Name)
        .all(&state.db)
        .await?
        .into_iter()
        .map(TagResponse::from)
        .collect();
    debug!("Loaded {} tags", tags.len());

    state
        .cache
        .insert(TAGS_CACHE_KEY.to_string(), CachedData::Tags(tags.clone()))
        .await;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(tags, "Tags retrieved successfully")),
    ))
}

/// Get a tag by ID
#[utoipa::path(
    get,
    path = "/api/v1/tags/{tag_id}",
    tag = "tags",
    params(("tag_id" = i32, Path, description = "Tag ID")),
    responses(
        (status = 200, description = "Tag found", body = ApiResponse<TagResponse>),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<i32>,
) -> Result<(StatusCode, Json<ApiResponse<TagResponse>>), ApiError> {
    let found = tag::Entity::find_by_id(tag_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Tag {} not found", tag_id)))?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(TagResponse::from(found), "Tag retrieved successfully")),
    ))
}
