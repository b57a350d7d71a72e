//! HTTP request handlers for the payroll engine API.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::{approve, calculate_all, calculate_employee, cancel, document_view, run};
use crate::error::EngineError;

use super::request::{ActorQuery, CalculationDateQuery, RunCalculationRequest};
use super::response::{ApiError, ApiErrorResponse};
use super::state::AppState;

const DEFAULT_ACTOR: &str = "system";

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/calculations/run", post(run_calculation_handler))
        .route("/calculations/:document_id", get(get_document_handler))
        .route("/calculations/:document_id/approve", post(approve_handler))
        .route("/calculations/:document_id/cancel", post(cancel_handler))
        .route("/payroll/calculate-all", get(calculate_all_handler))
        .route("/payroll/calculate/:employee_id", get(calculate_employee_handler))
        .with_state(state)
}

/// Handler for `POST /calculations/run`.
///
/// Runs a template over a period and returns the run summary.
async fn run_calculation_handler(
    State(state): State<AppState>,
    payload: Result<Json<RunCalculationRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing calculation run request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return json_rejection_response(correlation_id, rejection),
    };

    let actor = request.created_by.as_deref().unwrap_or(DEFAULT_ACTOR);
    let start_time = Instant::now();
    match run(
        state.data(),
        state.documents(),
        request.period_id,
        &request.template_code,
        actor,
        Utc::now(),
        &state.settings().formula,
    ) {
        Ok(summary) => {
            info!(
                correlation_id = %correlation_id,
                period_id = request.period_id,
                document_number = %summary.document.document_number,
                employees_processed = summary.employees_processed,
                results_created = summary.results_created,
                failures = summary.failures.len(),
                duration_us = start_time.elapsed().as_micros(),
                "Calculation run completed"
            );
            json_response(StatusCode::CREATED, &summary)
        }
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for `GET /calculations/:document_id`.
async fn get_document_handler(
    State(state): State<AppState>,
    Path(document_id): Path<i64>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, document_id, "Fetching accrual document");

    match document_view(state.data(), state.documents(), document_id) {
        Ok(view) => json_response(StatusCode::OK, &view),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for `POST /calculations/:document_id/approve`.
async fn approve_handler(
    State(state): State<AppState>,
    Path(document_id): Path<i64>,
    Query(query): Query<ActorQuery>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let actor = query.actor.as_deref().unwrap_or(DEFAULT_ACTOR);
    info!(correlation_id = %correlation_id, document_id, actor, "Approving accrual document");

    match approve(state.documents(), document_id, actor, Utc::now()) {
        Ok(document) => json_response(StatusCode::OK, &document),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for `POST /calculations/:document_id/cancel`.
async fn cancel_handler(
    State(state): State<AppState>,
    Path(document_id): Path<i64>,
    Query(query): Query<ActorQuery>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let actor = query.actor.as_deref().unwrap_or(DEFAULT_ACTOR);
    info!(correlation_id = %correlation_id, document_id, actor, "Cancelling accrual document");

    match cancel(state.documents(), document_id, actor, Utc::now()) {
        Ok(document) => json_response(StatusCode::OK, &document),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for `GET /payroll/calculate/:employee_id`.
///
/// Previews every active position of one employee without persisting.
async fn calculate_employee_handler(
    State(state): State<AppState>,
    Path(employee_id): Path<i64>,
    Query(query): Query<CalculationDateQuery>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let settings = state.settings();

    let instant = match query.instant(settings.preview.default_calculation_date) {
        Ok(instant) => instant,
        Err(message) => return invalid_date_response(correlation_id, message),
    };
    info!(correlation_id = %correlation_id, employee_id, %instant, "Previewing employee payroll");

    let start_time = Instant::now();
    match calculate_employee(
        state.data(),
        employee_id,
        instant,
        &settings.preview.rule_codes,
        &settings.formula,
    ) {
        Ok(calculation) => {
            info!(
                correlation_id = %correlation_id,
                employee_id,
                positions = calculation.positions.len(),
                duration_us = start_time.elapsed().as_micros(),
                "Employee payroll preview completed"
            );
            json_response(StatusCode::OK, &calculation)
        }
        Err(err) => error_response(correlation_id, err),
    }
}

/// Handler for `GET /payroll/calculate-all`.
///
/// Previews every active employee; one employee's failure does not stop
/// the others.
async fn calculate_all_handler(
    State(state): State<AppState>,
    Query(query): Query<CalculationDateQuery>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let settings = state.settings();

    let instant = match query.instant(settings.preview.default_calculation_date) {
        Ok(instant) => instant,
        Err(message) => return invalid_date_response(correlation_id, message),
    };
    info!(correlation_id = %correlation_id, %instant, "Previewing payroll for all employees");

    let start_time = Instant::now();
    let bulk = calculate_all(
        state.data(),
        instant,
        &settings.preview.rule_codes,
        &settings.formula,
    );
    info!(
        correlation_id = %correlation_id,
        total_employees = bulk.total_employees,
        duration_us = start_time.elapsed().as_micros(),
        "Bulk payroll preview completed"
    );
    json_response(StatusCode::OK, &bulk)
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

fn error_response(correlation_id: Uuid, err: EngineError) -> Response {
    warn!(
        correlation_id = %correlation_id,
        code = err.code(),
        error = %err,
        "Request failed"
    );
    let api_error: ApiErrorResponse = err.into();
    json_response(api_error.status, &api_error.error)
}

fn invalid_date_response(correlation_id: Uuid, message: String) -> Response {
    warn!(correlation_id = %correlation_id, error = %message, "Invalid calculation date");
    json_response(StatusCode::BAD_REQUEST, &ApiError::validation_error(message))
}

fn json_rejection_response(correlation_id: Uuid, rejection: JsonRejection) -> Response {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    json_response(StatusCode::BAD_REQUEST, &error)
}
