//! Position, contract and group-membership models.
//!
//! A [`Position`] assigns an employee to an organizational unit for a span
//! of dates. Contracts and group memberships hang off the position and carry
//! their own validity windows.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::{TimeBounded, ValidityWindow};

use super::organization::default_true;

/// A time-bounded assignment of an employee to an organizational unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Unique identifier for the position.
    pub id: i64,
    /// The employee holding the position.
    pub employee_id: i64,
    /// The organizational unit the position belongs to.
    pub organizational_unit_id: i64,
    /// Unique position code (e.g., "POS-001").
    pub position_code: String,
    /// Human-readable job title.
    pub position_name: String,
    /// Fractional full-time equivalent, in (0, 2.0].
    pub employment_rate: Decimal,
    /// First day of the assignment (inclusive).
    pub start_date: NaiveDate,
    /// Last day of the assignment (inclusive), if ended.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Soft lifecycle flag; positions are never deleted.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl TimeBounded for Position {
    type Point = NaiveDate;

    fn validity(&self) -> ValidityWindow<NaiveDate> {
        ValidityWindow::new(self.start_date, self.end_date)
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}

/// How a contract pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    /// Fixed monthly salary.
    Salary,
    /// Paid per hour worked.
    Hourly,
    /// Paid per unit produced.
    Piecework,
    /// Paid per completed task.
    TaskBased,
}

/// The pay terms of a position over an interval of time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// Unique identifier for the contract.
    pub id: i64,
    /// The position this contract belongs to.
    pub position_id: i64,
    /// How the contract pays.
    pub contract_type: ContractType,
    /// The base rate, never negative.
    pub base_rate: Decimal,
    /// ISO currency code.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Start of the contract.
    pub start_datetime: DateTime<Utc>,
    /// End of the contract; strictly after the start when present.
    #[serde(default)]
    pub end_datetime: Option<DateTime<Utc>>,
    /// Whether the contract is active.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl TimeBounded for Contract {
    type Point = DateTime<Utc>;

    fn validity(&self) -> ValidityWindow<DateTime<Utc>> {
        ValidityWindow::new(self.start_datetime, self.end_datetime)
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}

/// A time-bounded membership of a position in a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionGroup {
    /// Unique identifier for the membership.
    pub id: i64,
    /// The member position.
    pub position_id: i64,
    /// The group joined.
    pub group_id: i64,
    /// Start of the membership.
    pub valid_from: DateTime<Utc>,
    /// End of the membership, if any.
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    /// Extra parameters, e.g. `{"children_count": 2}`.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// Number of the supporting document.
    #[serde(default)]
    pub document_number: Option<String>,
    /// Date of the supporting document.
    #[serde(default)]
    pub document_date: Option<NaiveDate>,
    /// Whether the membership is active.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl TimeBounded for PositionGroup {
    type Point = DateTime<Utc>;

    fn validity(&self) -> ValidityWindow<DateTime<Utc>> {
        ValidityWindow::new(self.valid_from, self.valid_until)
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}

pub(crate) fn default_currency() -> String {
    "UAH".to_string()
}
