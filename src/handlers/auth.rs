use axum::{extract::State, http::StatusCode, response::Json};
use model::entities::user;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{AuthUser, issue_token, revoke_token, verify_password};
use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Credentials for obtaining a token
#[derive(Deserialize, Serialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// Send as `Authorization: Token <auth_token>`
    pub auth_token: String,
}

/// Exchange email and password for a token
#[utoipa::path(
    post,
    path = "/api/v1/auth/token/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = ApiResponse<TokenResponse>),
        (status = 400, description = "Invalid credentials", body = ErrorResponse),
    )
)]
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TokenResponse>>), ApiError> {
    let found = user::Entity::find()
        .filter(user::Column::Email.eq(request.email.as_str()))
        .one(&state.db)
        .await?;

    let verified = found.filter(|u| verify_password(&request.password, &u.password_hash));
    let Some(account) = verified else {
        warn!("Failed login attempt");
        return Err(ApiError::Validation {
            field: None,
            message: "Unable to log in with provided credentials".to_string(),
        });
    };

    let key = issue_token(&state.db, account.id).await?;
    info!("User {} logged in", account.id);

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(TokenResponse { auth_token: key }, "Logged in")),
    ))
}

/// Revoke the token used for this request
#[utoipa::path(
    post,
    path = "/api/v1/auth/token/logout",
    tag = "auth",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
    )
)]
#[instrument(skip(state, auth), fields(user_id = auth.user.id))]
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> Result<StatusCode, ApiError> {
    revoke_token(&state.db, &auth.token).await?;
    debug!("Token revoked");
    Ok(StatusCode::NO_CONTENT)
}
