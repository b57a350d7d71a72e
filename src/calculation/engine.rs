//! Accrual engine: itemized salary calculation for a position.
//!
//! A position is calculated in two passes over the caller's ordered rule
//! codes. The first pass evaluates accruals, benefits and deductions against
//! the base salary and sums income into gross salary. The second pass
//! evaluates taxes against that gross, so benefit income is taxed.
//!
//! Exclusion groups are shared by both passes. A tax counts as applied after
//! every accrual, benefit and deduction of the position, wherever its code
//! sits in the ordered list.
//!
//! Totals use checked arithmetic. An overflow fails the position with a
//! formula error naming the rule whose amount pushed the total over.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use super::formula::{Formula, FormulaError, FormulaLimits};
use super::resolver::{ResolvedRule, RuleResolver};
use super::temporal::filter_effective;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    BulkCalculation, BulkOutcome, CombinationMode, Contract, EmployeeCalculation,
    EmployeeSummary, LineItem, Position, PositionCalculationResult, PositionFailure, RuleType,
    SalaryTotals, SkippedRule,
};
use crate::store::PayrollRepository;

/// Decimal places money amounts are rounded to.
pub const MONEY_SCALE: u32 = 2;

/// Rounds a money amount half away from zero to [`MONEY_SCALE`] places.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::round_money;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(round_money(Decimal::from_str("10.005").unwrap()), Decimal::from_str("10.01").unwrap());
/// assert_eq!(round_money(Decimal::from_str("-10.005").unwrap()), Decimal::from_str("-10.01").unwrap());
/// ```
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns the single contract of a position in force at `instant`.
///
/// Fails with `NoActiveContract` when there is none and with
/// `AmbiguousContract` when more than one overlaps the instant.
pub fn active_contract<R: PayrollRepository + ?Sized>(
    repo: &R,
    position_id: i64,
    instant: DateTime<Utc>,
) -> EngineResult<&Contract> {
    let active = filter_effective(repo.contracts_for_position(position_id), instant);
    match active.as_slice() {
        [contract] => Ok(*contract),
        [] => Err(EngineError::NoActiveContract {
            position_id,
            instant,
        }),
        many => Err(EngineError::AmbiguousContract {
            position_id,
            count: many.len(),
            instant,
        }),
    }
}

/// Calculates one position at `instant` for the given ordered rule codes.
///
/// Codes that resolve to no rule are skipped silently. A formula failure or
/// an overflowing total aborts the whole position.
pub fn calculate_position<R: PayrollRepository + ?Sized>(
    repo: &R,
    position: &Position,
    instant: DateTime<Utc>,
    rule_codes: &[String],
    limits: &FormulaLimits,
) -> EngineResult<PositionCalculationResult> {
    let contract = active_contract(repo, position.id, instant)?;
    let base_salary = contract
        .base_rate
        .checked_mul(position.employment_rate)
        .map(round_money)
        .ok_or_else(|| EngineError::InvalidData {
            entity: "contract",
            id: contract.id,
            message: "base rate times employment rate overflows".to_string(),
        })?;
    let resolver = RuleResolver::new(repo);

    let mut accruals = Vec::new();
    let mut deductions = Vec::new();
    let mut pending_taxes = Vec::new();
    let mut skipped = Vec::new();
    let mut exclusions = Exclusions::default();

    for code in rule_codes {
        let Some(resolved) = resolver.resolve_for(position, code, instant) else {
            continue;
        };

        match resolved.rule.rule_type {
            RuleType::Tax => pending_taxes.push(resolved),
            RuleType::Accrual | RuleType::Benefit => {
                if let Some(line) =
                    exclusions.apply(&resolved, base_salary, position.id, limits, &mut skipped)?
                {
                    accruals.push(line);
                }
            }
            RuleType::Deduction => {
                if let Some(line) =
                    exclusions.apply(&resolved, base_salary, position.id, limits, &mut skipped)?
                {
                    deductions.push(line);
                }
            }
        }
    }

    let gross_salary = total(base_salary, &accruals, position.id)?;

    let mut taxes = Vec::new();
    for resolved in &pending_taxes {
        if let Some(line) =
            exclusions.apply(resolved, gross_salary, position.id, limits, &mut skipped)?
        {
            taxes.push(line);
        }
    }

    let total_tax = total(Decimal::ZERO, &taxes, position.id)?;
    let total_deductions = total(Decimal::ZERO, &deductions, position.id)?;
    let net_salary = withhold(gross_salary, &taxes, position.id)
        .and_then(|net| withhold(net, &deductions, position.id))?;

    debug!(
        position_id = position.id,
        %base_salary,
        %gross_salary,
        %net_salary,
        lines = accruals.len() + taxes.len() + deductions.len(),
        "Position calculated"
    );

    Ok(PositionCalculationResult {
        position_id: position.id,
        position_code: position.position_code.clone(),
        position_name: position.position_name.clone(),
        employee_id: position.employee_id,
        organizational_unit_id: position.organizational_unit_id,
        employment_rate: position.employment_rate,
        contract_id: contract.id,
        currency: contract.currency.clone(),
        calculation_instant: instant,
        accruals,
        taxes,
        deductions,
        skipped,
        totals: SalaryTotals {
            base_salary,
            gross_salary,
            total_tax,
            total_deductions,
            net_salary,
        },
    })
}

/// Calculates every position an employee holds at `instant`.
///
/// Positions without a usable contract are reported in `failures` and the
/// rest are still calculated. Fails with `NotFound` when the employee does
/// not exist or holds no active position.
pub fn calculate_employee<R: PayrollRepository + ?Sized>(
    repo: &R,
    employee_id: i64,
    instant: DateTime<Utc>,
    rule_codes: &[String],
    limits: &FormulaLimits,
) -> EngineResult<EmployeeCalculation> {
    let employee = repo
        .employee(employee_id)
        .ok_or_else(|| EngineError::NotFound {
            entity: "employee",
            id: employee_id.to_string(),
        })?;

    let positions = filter_effective(repo.positions_for_employee(employee_id), instant.date_naive());
    if positions.is_empty() {
        return Err(EngineError::NotFound {
            entity: "active position for employee",
            id: employee_id.to_string(),
        });
    }

    let mut calculated = Vec::with_capacity(positions.len());
    let mut failures = Vec::new();
    for position in positions {
        match calculate_position(repo, position, instant, rule_codes, limits) {
            Ok(result) => calculated.push(result),
            Err(err) if err.is_position_scoped() => failures.push(PositionFailure {
                position_id: position.id,
                employee_id,
                code: err.code().to_string(),
                message: err.to_string(),
            }),
            Err(err) => return Err(err),
        }
    }

    Ok(EmployeeCalculation {
        employee: EmployeeSummary::from(employee),
        calculation_date: instant,
        positions: calculated,
        failures,
    })
}

/// Calculates every active employee, isolating failures per employee.
///
/// An employee whose calculation fails for any reason gets a `Failed`
/// outcome and the run moves on to the next employee.
pub fn calculate_all<R: PayrollRepository + ?Sized>(
    repo: &R,
    instant: DateTime<Utc>,
    rule_codes: &[String],
    limits: &FormulaLimits,
) -> BulkCalculation {
    let employees: Vec<_> = repo.employees().into_iter().filter(|e| e.is_active).collect();

    let results = employees
        .iter()
        .map(
            |employee| match calculate_employee(repo, employee.id, instant, rule_codes, limits) {
                Ok(calculation) => BulkOutcome::Calculated(calculation),
                Err(err) => {
                    debug!(employee_id = employee.id, error = %err, "Employee calculation failed");
                    BulkOutcome::Failed {
                        employee: EmployeeSummary::from(*employee),
                        code: err.code().to_string(),
                        error: err.to_string(),
                    }
                }
            },
        )
        .collect();

    BulkCalculation {
        calculation_date: instant,
        total_employees: employees.len(),
        results,
    }
}

/// Exclusion groups claimed by rules already applied to a position.
///
/// One instance spans both passes, so taxes see the groups claimed by every
/// accrual, benefit and deduction.
#[derive(Debug, Default)]
struct Exclusions {
    claimed: HashSet<String>,
}

impl Exclusions {
    /// Evaluates `resolved` against `base` unless it is an exclusive rule
    /// whose exclusion group is already claimed, in which case it is
    /// recorded in `skipped`.
    fn apply(
        &mut self,
        resolved: &ResolvedRule,
        base: Decimal,
        position_id: i64,
        limits: &FormulaLimits,
        skipped: &mut Vec<SkippedRule>,
    ) -> EngineResult<Option<LineItem>> {
        let rule = &resolved.rule;

        if rule.combination_mode == CombinationMode::Exclusive {
            if let Some(group) = rule.exclusion_groups.iter().find(|g| self.claimed.contains(*g)) {
                skipped.push(SkippedRule {
                    code: rule.code.clone(),
                    rule_id: rule.id,
                    reason: format!("exclusion group '{}' already applied", group),
                });
                return Ok(None);
            }
        }

        let line = evaluate_line(resolved, base, position_id, limits)?;
        self.claimed.extend(rule.exclusion_groups.iter().cloned());
        Ok(Some(line))
    }
}

fn evaluate_line(
    resolved: &ResolvedRule,
    base: Decimal,
    position_id: i64,
    limits: &FormulaLimits,
) -> EngineResult<LineItem> {
    let rule = &resolved.rule;
    let raw = Formula::parse(&rule.formula, limits)
        .and_then(|formula| formula.evaluate(base))
        .map_err(|source| EngineError::Formula {
            rule_code: rule.code.clone(),
            position_id,
            source,
        })?;

    let capped = match rule.max_combined_amount {
        Some(cap) if raw > cap => cap,
        _ => raw,
    };

    Ok(LineItem {
        rule_id: rule.id,
        code: rule.code.clone(),
        name: rule.name.clone(),
        rule_type: rule.rule_type,
        level: resolved.level,
        source_id: resolved.source_id,
        source: resolved.source.clone(),
        formula: rule.formula.clone(),
        calculation_base: base,
        amount: round_money(capped),
    })
}

/// Adds the line amounts onto `start`.
fn total(start: Decimal, lines: &[LineItem], position_id: i64) -> EngineResult<Decimal> {
    lines.iter().try_fold(start, |acc, line| {
        acc.checked_add(line.amount)
            .ok_or_else(|| overflow(line, position_id))
    })
}

/// Subtracts the line amounts from `start`.
fn withhold(start: Decimal, lines: &[LineItem], position_id: i64) -> EngineResult<Decimal> {
    lines.iter().try_fold(start, |acc, line| {
        acc.checked_sub(line.amount)
            .ok_or_else(|| overflow(line, position_id))
    })
}

fn overflow(line: &LineItem, position_id: i64) -> EngineError {
    EngineError::Formula {
        rule_code: line.code.clone(),
        position_id,
        source: FormulaError::Overflow,
    }
}
