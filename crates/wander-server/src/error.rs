//! HTTP error mapping
//!
//! Every error leaves the API as an RFC 7807 problem-detail body with a
//! stable `type` tag and a trace id.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;
use wander_common::{ProblemDetail, WanderError};

/// Standard result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    error: WanderError,
    trace_id: String,
}

impl ApiError {
    pub fn new(error: WanderError) -> Self {
        Self {
            error,
            trace_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(WanderError::Validation(message.into()))
    }

    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(WanderError::not_found(resource, id))
    }

    pub fn problem(&self) -> ProblemDetail {
        ProblemDetail::from_error(&self.error, self.trace_id.clone())
    }
}

impl From<WanderError> for ApiError {
    fn from(error: WanderError) -> Self {
        Self::new(error)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(WanderError::Internal(error.to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let problem = self.problem();
        let status = StatusCode::from_u16(problem.status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(problem)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_422() {
        let error = ApiError::validation("lat must be within [-90, 90]");
        let problem = error.problem();

        assert_eq!(problem.status, 422);
        assert_eq!(problem.error_type, "validation-error");
        assert!(problem.trace_id.is_some());
    }

    #[test]
    fn not_found_maps_to_404_with_extensions() {
        let error = ApiError::not_found("place", "abc-123");
        let problem = error.problem();

        assert_eq!(problem.status, 404);
        assert_eq!(problem.error_type, "not-found");
        assert_eq!(
            problem.extensions.get("identifier"),
            Some(&serde_json::Value::String("abc-123".into()))
        );
    }

    #[test]
    fn internal_maps_to_500() {
        let error = ApiError::from(anyhow::anyhow!("boom"));
        assert_eq!(error.problem().status, 500);
        assert_eq!(error.problem().error_type, "internal-error");
    }
}
