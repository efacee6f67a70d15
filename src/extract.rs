//! Request extractors that validate their payload and reject with [`ApiError`].
//!
//! `axum-valid` runs the `validator` rules; its rejection and the inner
//! `Json` / `Query` rejections are turned into a `VALIDATION_ERROR` body.

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Query, Request,
        rejection::{JsonRejection, QueryRejection},
    },
    http::request::Parts,
};
use axum_valid::{Valid, ValidRejection};
use serde::de::DeserializeOwned;
use tracing::debug;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::ApiError;

/// A JSON body that passed its `validator` rules.
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

/// Query parameters that passed their `validator` rules.
#[derive(Debug)]
pub struct ValidQuery<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Valid(Json(value)) = Valid::<Json<T>>::from_request(req, state).await?;
        Ok(ValidJson(value))
    }
}

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Valid(Query(value)) = Valid::<Query<T>>::from_request_parts(parts, state).await?;
        Ok(ValidQuery(value))
    }
}

impl From<ValidRejection<JsonRejection>> for ApiError {
    fn from(rejection: ValidRejection<JsonRejection>) -> Self {
        match rejection {
            ValidRejection::Valid(errors) => from_validation_errors(&errors),
            ValidRejection::Inner(inner) => from_body_text(inner.body_text()),
        }
    }
}

impl From<ValidRejection<QueryRejection>> for ApiError {
    fn from(rejection: ValidRejection<QueryRejection>) -> Self {
        match rejection {
            ValidRejection::Valid(errors) => from_validation_errors(&errors),
            ValidRejection::Inner(inner) => from_body_text(inner.body_text()),
        }
    }
}

fn from_body_text(text: String) -> ApiError {
    debug!("Rejected malformed request: {}", text);
    ApiError::Validation {
        field: missing_field(&text),
        message: text,
    }
}

/// Field named by a serde "missing field `x`" message.
fn missing_field(text: &str) -> Option<String> {
    let (_, rest) = text.split_once("missing field `")?;
    let (field, _) = rest.split_once('`')?;
    Some(field.to_string())
}

/// The alphabetically first failing field, so the answer is stable.
fn from_validation_errors(errors: &ValidationErrors) -> ApiError {
    let mut failures: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .map(|(field, list)| {
            let message = list
                .first()
                .map(describe)
                .unwrap_or_else(|| "Invalid value".to_string());
            (field.to_string(), message)
        })
        .collect();
    failures.sort();

    match failures.into_iter().next() {
        Some((field, message)) => ApiError::Validation {
            field: Some(field),
            message,
        },
        None => ApiError::Validation {
            field: None,
            message: errors.to_string(),
        },
    }
}

fn describe(error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => format!("Invalid value ({})", error.code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Validate)]
    struct Form {
        #[validate(length(max = 3))]
        name: String,
        #[validate(range(min = 1))]
        amount: i32,
    }

    fn parts(error: ApiError) -> (Option<String>, String) {
        match error {
            ApiError::Validation { field, message } => (field, message),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_field_is_named() {
        let text = "Failed to deserialize the JSON body into the target type: \
                    missing field `tags` at line 1 column 42";
        assert_eq!(missing_field(text).as_deref(), Some("tags"));
        assert_eq!(missing_field("expected value at line 1 column 1"), None);
    }

    #[test]
    fn test_first_failing_field_is_reported() {
        let form = Form {
            name: "too long".to_string(),
            amount: 0,
        };
        let errors = form.validate().unwrap_err();

        let (field, message) = parts(from_validation_errors(&errors));
        assert_eq!(field.as_deref(), Some("amount"));
        assert_eq!(message, "Invalid value (range)");
    }

    #[test]
    fn test_body_errors_become_validation_errors() {
        let text = "Expected request with `Content-Type: application/json`".to_string();
        let (field, message) = parts(from_body_text(text));
        assert_eq!(field, None);
        assert!(message.contains("Content-Type"));
    }
}
