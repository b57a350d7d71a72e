//! HTTP API module for the payroll engine.
//!
//! This module provides the REST endpoints for running and reviewing
//! accrual documents and for ad-hoc payroll previews.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    ActorQuery, CalculationDateQuery, RunCalculationRequest, parse_calculation_date,
};
pub use response::{ApiError, ApiErrorResponse};
pub use state::AppState;
