//! Calculation logic for the payroll engine.
//!
//! This module contains the temporal validity filter, the rule resolver
//! that walks the override hierarchy, the formula evaluator, the two-pass
//! accrual engine for positions, employees and the whole organization, and
//! the document orchestrator that persists period runs.

mod engine;
mod formula;
mod orchestrator;
mod resolver;
mod temporal;

pub use engine::{
    MONEY_SCALE, active_contract, calculate_all, calculate_employee, calculate_position,
    round_money,
};
pub use formula::{BOUND_VARIABLE, Formula, FormulaError, FormulaLimits, evaluate};
pub use orchestrator::{approve, cancel, document_view, run};
pub use resolver::{ResolvedRule, RuleResolver};
pub use temporal::{TimeBounded, ValidityWindow, filter_effective, is_effective_at, is_valid_at};
