//! Request types for the payroll engine API.
//!
//! This module defines the JSON bodies and query strings accepted by the
//! calculation and payroll preview endpoints.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request body for `POST /calculations/run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCalculationRequest {
    /// The period to calculate.
    pub period_id: i64,
    /// The template to run.
    #[serde(default = "default_template_code")]
    pub template_code: String,
    /// Who triggered the run.
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Query string for the approve and cancel endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActorQuery {
    /// Who performs the transition.
    #[serde(default)]
    pub actor: Option<String>,
}

/// Query string for the payroll preview endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalculationDateQuery {
    /// An ISO date (`2024-01-15`) or datetime (`2024-01-15T12:00:00Z`).
    #[serde(default)]
    pub calculation_date: Option<String>,
}

impl CalculationDateQuery {
    /// Resolves the requested instant, falling back to `default` at
    /// midnight UTC.
    pub fn instant(&self, default: NaiveDate) -> Result<DateTime<Utc>, String> {
        match self.calculation_date.as_deref() {
            Some(raw) => parse_calculation_date(raw),
            None => Ok(default.and_time(chrono::NaiveTime::MIN).and_utc()),
        }
    }
}

/// Parses a calculation date given as an RFC 3339 datetime, a naive ISO
/// datetime (taken as UTC), or a plain ISO date (taken as midnight UTC).
///
/// # Example
///
/// ```
/// use payroll_engine::api::parse_calculation_date;
///
/// let instant = parse_calculation_date("2024-01-15").unwrap();
/// assert_eq!(instant.to_rfc3339(), "2024-01-15T00:00:00+00:00");
/// assert!(parse_calculation_date("15/01/2024").is_err());
/// ```
pub fn parse_calculation_date(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc())
        .map_err(|_| format!("Invalid calculation_date '{}': expected YYYY-MM-DD", raw))
}

fn default_template_code() -> String {
    "MONTHLY_SALARY".to_string()
}
