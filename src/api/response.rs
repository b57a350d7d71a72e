//! Response types for the payroll engine API.
//!
//! This module defines the error response structures and the mapping from
//! engine errors to HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Precondition};

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let code = error.code();
        let message = error.to_string();

        let (status, error) = match &error {
            EngineError::ConfigNotFound { .. }
            | EngineError::ConfigParseError { .. }
            | EngineError::InvalidData { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::with_details("CONFIG_ERROR", "Configuration error", message),
            ),
            EngineError::NotFound { .. } => (StatusCode::NOT_FOUND, ApiError::new(code, message)),
            EngineError::PreconditionFailed(Precondition::DuplicateDocument { .. }) => (
                StatusCode::CONFLICT,
                ApiError::with_details(
                    code,
                    message,
                    "Cancel the existing document before running the period again",
                ),
            ),
            EngineError::PreconditionFailed(_) => {
                (StatusCode::BAD_REQUEST, ApiError::new(code, message))
            }
            EngineError::NoActiveContract { .. } | EngineError::AmbiguousContract { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::with_details(
                    code,
                    message,
                    "Check the contracts of the position for the calculation date",
                ),
            ),
            EngineError::Formula { source, .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::with_details(code, message, source.to_string()),
            ),
        };

        ApiErrorResponse { status, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::FormulaError;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("TEST_ERROR", "Test message");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"code\":\"TEST_ERROR\""));
        assert!(json.contains("\"message\":\"Test message\""));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response: ApiErrorResponse = EngineError::NotFound {
            entity: "period",
            id: "9".to_string(),
        }
        .into();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.error.code, "NOT_FOUND");
        assert_eq!(response.error.message, "period not found: 9");
    }

    #[test]
    fn test_duplicate_maps_to_409_and_other_preconditions_to_400() {
        let duplicate: ApiErrorResponse = EngineError::from(Precondition::DuplicateDocument {
            period_id: 1,
            template_code: "MONTHLY_SALARY".to_string(),
            document_number: "ACC-2024-01-001".to_string(),
        })
        .into();
        assert_eq!(duplicate.status, StatusCode::CONFLICT);
        assert_eq!(duplicate.error.code, "DUPLICATE_DOCUMENT");

        let not_draft: ApiErrorResponse = EngineError::from(Precondition::PeriodNotDraft {
            period_id: 1,
            status: "closed".to_string(),
        })
        .into();
        assert_eq!(not_draft.status, StatusCode::BAD_REQUEST);
        assert_eq!(not_draft.error.code, "PERIOD_NOT_DRAFT");
    }

    #[test]
    fn test_calculation_errors_map_to_422() {
        let contract: ApiErrorResponse = EngineError::NoActiveContract {
            position_id: 4,
            instant: Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(),
        }
        .into();
        assert_eq!(contract.status, StatusCode::UNPROCESSABLE_ENTITY);

        let formula: ApiErrorResponse = EngineError::Formula {
            rule_code: "PIT".to_string(),
            position_id: 4,
            source: FormulaError::DivisionByZero,
        }
        .into();
        assert_eq!(formula.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(formula.error.code, "FORMULA_ERROR");
        assert!(formula.error.message.contains("PIT"));
        assert_eq!(formula.error.details.as_deref(), Some("Division by zero"));
    }

    #[test]
    fn test_config_errors_map_to_500() {
        let response: ApiErrorResponse = EngineError::ConfigNotFound {
            path: "engine.yaml".to_string(),
        }
        .into();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.error.code, "CONFIG_ERROR");
    }
}
