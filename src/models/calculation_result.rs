//! Calculation result models for the payroll engine.
//!
//! This module contains the [`PositionCalculationResult`] type and the
//! structures built around it: itemized lines, aggregate totals, per-employee
//! and bulk previews, run summaries and the read projection of a document.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AccrualDocument, AccrualResult, Employee, RuleLevel, RuleSource, RuleType};

/// One applied rule in a position calculation.
///
/// `amount` is the unsigned, rounded formula result; the sign convention is
/// applied only when the line is persisted as an [`AccrualResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// The rule applied.
    pub rule_id: i64,
    /// The rule code.
    pub code: String,
    /// The rule name.
    pub name: String,
    /// What the rule contributes.
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    /// The hierarchy level the rule was found at.
    pub level: RuleLevel,
    /// The id of the scoping entity, `None` for global rules.
    pub source_id: Option<i64>,
    /// Human-readable provenance, e.g. "Group Union members".
    pub source: String,
    /// The formula text evaluated.
    pub formula: String,
    /// The value the formula was evaluated against.
    pub calculation_base: Decimal,
    /// The rounded result.
    pub amount: Decimal,
}

impl LineItem {
    /// Resolver provenance in its persisted form.
    pub fn rule_source(&self) -> RuleSource {
        RuleSource {
            level: self.level,
            source_id: self.source_id,
        }
    }

    /// The amount with the persisted sign convention applied.
    pub fn signed_amount(&self) -> Decimal {
        self.rule_type.signed(self.amount)
    }
}

/// A resolved rule that was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRule {
    /// The rule code.
    pub code: String,
    /// The rule that was skipped.
    pub rule_id: i64,
    /// Why it was skipped.
    pub reason: String,
}

/// Aggregate salary figures for one position.
///
/// `net_salary == gross_salary - total_tax - total_deductions` holds exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryTotals {
    /// Contract base rate times employment rate.
    pub base_salary: Decimal,
    /// Base salary plus all accruals and benefits.
    pub gross_salary: Decimal,
    /// Sum of taxes computed against gross salary.
    pub total_tax: Decimal,
    /// Sum of deductions computed against base salary.
    pub total_deductions: Decimal,
    /// Gross salary less taxes and deductions.
    pub net_salary: Decimal,
}

/// The itemized calculation for one position at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCalculationResult {
    /// The position calculated.
    pub position_id: i64,
    /// The position code.
    pub position_code: String,
    /// The position title.
    pub position_name: String,
    /// The employee holding the position.
    pub employee_id: i64,
    /// The position's organizational unit.
    pub organizational_unit_id: i64,
    /// Fractional full-time equivalent.
    pub employment_rate: Decimal,
    /// The contract the base salary came from.
    pub contract_id: i64,
    /// Currency of the contract.
    pub currency: String,
    /// The instant rules were resolved at.
    pub calculation_instant: DateTime<Utc>,
    /// Accrual and benefit lines, in rule order.
    pub accruals: Vec<LineItem>,
    /// Tax lines, in rule order.
    pub taxes: Vec<LineItem>,
    /// Deduction lines, in rule order.
    pub deductions: Vec<LineItem>,
    /// Rules resolved but not applied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedRule>,
    /// Aggregate figures.
    pub totals: SalaryTotals,
}

impl PositionCalculationResult {
    /// Iterates every line: accruals, then taxes, then deductions.
    pub fn line_items(&self) -> impl Iterator<Item = &LineItem> {
        self.accruals
            .iter()
            .chain(self.taxes.iter())
            .chain(self.deductions.iter())
    }
}

/// A position that could not be calculated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionFailure {
    /// The position that failed.
    pub position_id: i64,
    /// The employee holding the position.
    pub employee_id: i64,
    /// Machine-readable error code, e.g. "NO_ACTIVE_CONTRACT".
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Identifying fields of an employee, for result listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeSummary {
    /// Employee id.
    pub id: i64,
    /// Personnel number.
    pub personnel_number: String,
    /// "first last".
    pub full_name: String,
}

impl From<&Employee> for EmployeeSummary {
    fn from(employee: &Employee) -> Self {
        EmployeeSummary {
            id: employee.id,
            personnel_number: employee.personnel_number.clone(),
            full_name: employee.full_name(),
        }
    }
}

/// Ad-hoc calculation of all of an employee's active positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeCalculation {
    /// The employee.
    pub employee: EmployeeSummary,
    /// The instant rules were resolved at.
    pub calculation_date: DateTime<Utc>,
    /// One entry per calculated position.
    pub positions: Vec<PositionCalculationResult>,
    /// Positions skipped for lack of a usable contract.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<PositionFailure>,
}

/// Outcome of one employee in a bulk preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BulkOutcome {
    /// The employee was calculated.
    Calculated(EmployeeCalculation),
    /// The employee failed; the run continued.
    Failed {
        /// The employee.
        employee: EmployeeSummary,
        /// Machine-readable error code.
        code: String,
        /// Human-readable error message.
        error: String,
    },
}

/// Preview of every active employee, with per-employee failure isolation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCalculation {
    /// The instant rules were resolved at.
    pub calculation_date: DateTime<Utc>,
    /// Number of employees attempted.
    pub total_employees: usize,
    /// One outcome per employee, in id order.
    pub results: Vec<BulkOutcome>,
}

/// What a document run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// The committed document.
    pub document: AccrualDocument,
    /// Number of distinct employees with at least one calculated position.
    pub employees_processed: usize,
    /// Number of positions calculated.
    pub positions_processed: usize,
    /// Number of accrual results persisted.
    pub results_created: usize,
    /// Positions skipped, with reasons.
    pub failures: Vec<PositionFailure>,
}

/// Code and name of a related entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeName {
    /// Short code.
    pub code: String,
    /// Display name.
    pub name: String,
}

/// Persisted results of one employee in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeResults {
    /// The employee.
    pub employee: EmployeeSummary,
    /// The employee's results, in creation order.
    pub results: Vec<AccrualResult>,
    /// Sum of the signed amounts of active results.
    pub total: Decimal,
}

/// Read projection of a document and its results grouped by employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentView {
    /// The document.
    pub document: AccrualDocument,
    /// The period calculated.
    pub period: CodeName,
    /// The template run.
    pub template: CodeName,
    /// Results grouped by employee, in employee id order.
    pub employees: Vec<EmployeeResults>,
}
