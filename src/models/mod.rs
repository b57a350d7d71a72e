//! Core data models for the payroll engine.
//!
//! This module contains the domain entities the engine reads (organization,
//! positions, rules, periods) and the records it produces (accrual documents,
//! results and calculation breakdowns).

mod accrual;
mod calculation_result;
mod organization;
mod period;
mod position;
mod rule;

pub use accrual::{AccrualDocument, AccrualResult, DocumentStatus, ResultStatus, RuleSource};
pub use calculation_result::{
    BulkCalculation, BulkOutcome, CodeName, DocumentView, EmployeeCalculation, EmployeeResults,
    EmployeeSummary, LineItem, PositionCalculationResult, PositionFailure, RunSummary,
    SalaryTotals, SkippedRule,
};
pub use organization::{Employee, EmployeeStatus, Group, OrganizationalUnit};
pub use period::{CalculationPeriod, PeriodScope, PeriodStatus};
pub use position::{Contract, ContractType, Position, PositionGroup};
pub use rule::{
    CalculationRule, CalculationTemplate, CombinationMode, RuleLevel, RuleScope, RuleType,
    TemplateRule,
};
