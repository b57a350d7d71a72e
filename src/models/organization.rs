//! Organizational structure and employee models.
//!
//! This module defines the two classification trees (organizational units
//! and groups) and the [`Employee`] record that positions hang off.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A node in the organizational-unit tree (company, department, team).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    /// Unique identifier for the unit.
    pub id: i64,
    /// The parent unit, or `None` for a root.
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Short unique code (e.g., "SALES_EAST").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Depth in the tree, starting at 1 for roots.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Whether the unit is in use.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A node in the group tree.
///
/// Groups are an arbitrary classification orthogonal to the org-unit tree,
/// such as "disabled employees" or "union members". Positions join groups
/// through time-bounded [`PositionGroup`](super::PositionGroup) memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Unique identifier for the group.
    pub id: i64,
    /// The parent group, or `None` for a root.
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Short unique code (e.g., "UNION_MEMBERS").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Optional free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Depth in the tree, starting at 1 for roots.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Materialized display path, e.g. "Social / Disabled".
    #[serde(default)]
    pub full_path: Option<String>,
    /// Classification of the group (social, professional, administrative).
    #[serde(default)]
    pub group_type: Option<String>,
    /// Whether the group is in use.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Employment status of an employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    /// Currently employed.
    #[default]
    Active,
    /// Employed but on leave.
    OnLeave,
    /// No longer employed.
    Terminated,
}

/// A person employed by the organization.
///
/// Employees connect to org units only through their positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier for the employee.
    pub id: i64,
    /// Unique personnel number (e.g., "EMP001").
    pub personnel_number: String,
    /// Tax identification number.
    #[serde(default)]
    pub tax_number: Option<String>,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Middle name or patronymic.
    #[serde(default)]
    pub middle_name: Option<String>,
    /// Date of birth.
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    /// Date of hire.
    pub hire_date: NaiveDate,
    /// Date of termination, if any.
    #[serde(default)]
    pub termination_date: Option<NaiveDate>,
    /// Employment status.
    #[serde(default)]
    pub status: EmployeeStatus,
    /// Whether the record is active.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Employee {
    /// Returns "first last".
    ///
    /// # Examples
    ///
    /// ```
    /// use payroll_engine::models::{Employee, EmployeeStatus};
    /// use chrono::NaiveDate;
    ///
    /// let employee = Employee {
    ///     id: 1,
    ///     personnel_number: "EMP001".to_string(),
    ///     tax_number: None,
    ///     first_name: "Alex".to_string(),
    ///     last_name: "Storm".to_string(),
    ///     middle_name: None,
    ///     birth_date: None,
    ///     hire_date: NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(),
    ///     termination_date: None,
    ///     status: EmployeeStatus::Active,
    ///     is_active: true,
    /// };
    /// assert_eq!(employee.full_name(), "Alex Storm");
    /// ```
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

pub(crate) fn default_true() -> bool {
    true
}

fn default_level() -> u32 {
    1
}
