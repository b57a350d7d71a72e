//! Calculation period model.
//!
//! This module contains the [`CalculationPeriod`] type which defines the
//! window and the employee scope of a document run.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a calculation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    /// Open for calculation runs.
    #[default]
    Draft,
    /// Results approved, no further runs.
    Approved,
    /// Closed for good.
    Closed,
}

impl std::fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PeriodStatus::Draft => "draft",
            PeriodStatus::Approved => "approved",
            PeriodStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Which employees a period covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodScope {
    /// A single employee.
    Employee(i64),
    /// Every position in one organizational unit.
    OrgUnit(i64),
    /// The whole organization.
    Organization,
}

/// A payroll calculation period.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{CalculationPeriod, PeriodScope, PeriodStatus};
/// use chrono::NaiveDate;
///
/// let period = CalculationPeriod {
///     id: 1,
///     period_code: "2024-01".to_string(),
///     period_name: "January 2024".to_string(),
///     start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
///     period_type: "monthly".to_string(),
///     organizational_unit_id: Some(5),
///     employee_id: None,
///     status: PeriodStatus::Draft,
/// };
///
/// assert_eq!(period.scope(), PeriodScope::OrgUnit(5));
/// assert_eq!(period.calculation_instant().to_rfc3339(), "2024-01-31T00:00:00+00:00");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationPeriod {
    /// Unique identifier for the period.
    pub id: i64,
    /// Short code (e.g., "2024-01").
    pub period_code: String,
    /// Display name.
    pub period_name: String,
    /// First day of the period (inclusive).
    pub start_date: NaiveDate,
    /// Last day of the period (inclusive).
    pub end_date: NaiveDate,
    /// Period kind (e.g., "monthly").
    #[serde(default = "default_period_type")]
    pub period_type: String,
    /// Restricts the period to one organizational unit.
    #[serde(default)]
    pub organizational_unit_id: Option<i64>,
    /// Restricts the period to one employee; takes precedence over the unit.
    #[serde(default)]
    pub employee_id: Option<i64>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: PeriodStatus,
}

impl CalculationPeriod {
    /// Returns the employee scope of the period.
    pub fn scope(&self) -> PeriodScope {
        match (self.employee_id, self.organizational_unit_id) {
            (Some(employee_id), _) => PeriodScope::Employee(employee_id),
            (None, Some(unit_id)) => PeriodScope::OrgUnit(unit_id),
            (None, None) => PeriodScope::Organization,
        }
    }

    /// Returns the instant rules and contracts are resolved at: the start of
    /// the period's last day, in UTC.
    pub fn calculation_instant(&self) -> DateTime<Utc> {
        self.end_date.and_time(chrono::NaiveTime::MIN).and_utc()
    }
}

fn default_period_type() -> String {
    "monthly".to_string()
}
