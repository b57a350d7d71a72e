//! Document runs over a calculation period.
//!
//! A run calculates every position in the period's scope with the rules of
//! one template and commits a single accrual document holding all of the
//! resulting lines. Nothing is committed unless every position either
//! succeeds or fails for lack of a usable contract.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::engine::calculate_position;
use super::formula::{FormulaError, FormulaLimits};
use super::temporal::filter_effective;
use crate::error::{EngineError, EngineResult, Precondition};
use crate::models::{
    AccrualDocument, CalculationPeriod, CodeName, DocumentStatus, DocumentView, EmployeeResults,
    EmployeeSummary, PeriodScope, PeriodStatus, Position, PositionFailure, ResultStatus,
    RunSummary,
};
use crate::store::{DocumentStore, NewDocument, NewResult, PayrollRepository};

/// Runs `template_code` over the period `period_id` and commits the document.
///
/// Fails with `NotFound` for an unknown period, with `PeriodNotDraft` when
/// the period is not open, with `NotFound` for an unknown or inactive
/// template, and with
/// `DuplicateDocument` when a non-cancelled document already exists for the
/// pair. Positions without a usable contract are listed in the summary; any
/// other calculation error aborts the run.
pub fn run<R, S>(
    repo: &R,
    store: &S,
    period_id: i64,
    template_code: &str,
    actor: &str,
    now: DateTime<Utc>,
    limits: &FormulaLimits,
) -> EngineResult<RunSummary>
where
    R: PayrollRepository + ?Sized,
    S: DocumentStore + ?Sized,
{
    let period = repo.period(period_id).ok_or_else(|| EngineError::NotFound {
        entity: "period",
        id: period_id.to_string(),
    })?;
    if period.status != PeriodStatus::Draft {
        return Err(Precondition::PeriodNotDraft {
            period_id,
            status: period.status.to_string(),
        }
        .into());
    }

    let template = repo
        .template_by_code(template_code)
        .filter(|t| t.is_active)
        .ok_or_else(|| EngineError::NotFound {
            entity: "template",
            id: template_code.to_string(),
        })?;

    if let Some(existing) = store.find_open_document(period.id, template.id) {
        return Err(Precondition::DuplicateDocument {
            period_id,
            template_code: template.code.clone(),
            document_number: existing.document_number,
        }
        .into());
    }

    let positions = positions_in_scope(repo, period)?;
    let instant = period.calculation_instant();
    let rule_codes = template.ordered_rule_codes();

    info!(
        period_id,
        template_code = %template.code,
        positions = positions.len(),
        %instant,
        "Starting document run"
    );

    let mut employees = BTreeSet::new();
    let mut results = Vec::new();
    let mut failures = Vec::new();
    let mut positions_processed = 0;

    for position in &positions {
        match calculate_position(repo, position, instant, &rule_codes, limits) {
            Ok(calculation) => {
                positions_processed += 1;
                employees.insert(position.employee_id);
                results.extend(calculation.line_items().map(|line| NewResult {
                    position_id: position.id,
                    employee_id: position.employee_id,
                    organizational_unit_id: position.organizational_unit_id,
                    rule_id: line.rule_id,
                    rule_code: line.code.clone(),
                    rule_name: line.name.clone(),
                    rule_source: line.rule_source(),
                    amount: line.signed_amount(),
                    calculation_base: line.calculation_base,
                    currency: calculation.currency.clone(),
                }));
            }
            Err(err) if err.is_position_scoped() => {
                warn!(period_id, position_id = position.id, error = %err, "Position skipped");
                failures.push(PositionFailure {
                    position_id: position.id,
                    employee_id: position.employee_id,
                    code: err.code().to_string(),
                    message: err.to_string(),
                });
            }
            Err(err) => {
                warn!(period_id, position_id = position.id, error = %err, "Document run aborted");
                return Err(err);
            }
        }
    }

    let results_created = results.len();
    let document = store.commit_document(NewDocument {
        period_id: period.id,
        period_code: period.period_code.clone(),
        template_id: template.id,
        template_code: template.code.clone(),
        organizational_unit_id: period.organizational_unit_id,
        employee_id: period.employee_id,
        calculation_date: now,
        created_by: actor.to_string(),
        results,
    })?;

    Ok(RunSummary {
        document,
        employees_processed: employees.len(),
        positions_processed,
        results_created,
        failures,
    })
}

/// Positions in the period's scope that are in force on its end date.
fn positions_in_scope<'r, R: PayrollRepository + ?Sized>(
    repo: &'r R,
    period: &CalculationPeriod,
) -> EngineResult<Vec<&'r Position>> {
    let candidates = match period.scope() {
        PeriodScope::Employee(employee_id) => {
            repo.employee(employee_id).ok_or_else(|| EngineError::NotFound {
                entity: "employee",
                id: employee_id.to_string(),
            })?;
            repo.positions_for_employee(employee_id)
        }
        PeriodScope::OrgUnit(unit_id) => {
            repo.org_unit(unit_id).ok_or_else(|| EngineError::NotFound {
                entity: "organizational unit",
                id: unit_id.to_string(),
            })?;
            repo.positions_in_unit(unit_id)
                .into_iter()
                .filter(|p| repo.employee(p.employee_id).is_some_and(|e| e.is_active))
                .collect()
        }
        PeriodScope::Organization => repo
            .employees()
            .into_iter()
            .filter(|e| e.is_active)
            .flat_map(|e| repo.positions_for_employee(e.id))
            .collect(),
    };

    Ok(filter_effective(candidates, period.end_date))
}

/// Builds the read projection of a document: its results grouped by
/// employee, each group with the sum of its active signed amounts.
pub fn document_view<R, S>(repo: &R, store: &S, document_id: i64) -> EngineResult<DocumentView>
where
    R: PayrollRepository + ?Sized,
    S: DocumentStore + ?Sized,
{
    let document = find_document(store, document_id)?;
    let period = repo
        .period(document.period_id)
        .ok_or_else(|| EngineError::NotFound {
            entity: "period",
            id: document.period_id.to_string(),
        })?;
    let template = repo
        .template_by_code(&document.template_code)
        .ok_or_else(|| EngineError::NotFound {
            entity: "template",
            id: document.template_code.clone(),
        })?;

    let mut grouped: BTreeMap<i64, Vec<_>> = BTreeMap::new();
    for result in store.results_for_document(document_id) {
        grouped.entry(result.employee_id).or_default().push(result);
    }

    let employees = grouped
        .into_iter()
        .map(|(employee_id, results)| -> EngineResult<EmployeeResults> {
            let employee = repo
                .employee(employee_id)
                .ok_or_else(|| EngineError::NotFound {
                    entity: "employee",
                    id: employee_id.to_string(),
                })?;
            let total = results
                .iter()
                .filter(|r| r.status == ResultStatus::Active)
                .try_fold(Decimal::ZERO, |acc, r| {
                    acc.checked_add(r.amount).ok_or_else(|| EngineError::Formula {
                        rule_code: r.rule_code.clone(),
                        position_id: r.position_id,
                        source: FormulaError::Overflow,
                    })
                })?;
            Ok(EmployeeResults {
                employee: EmployeeSummary::from(employee),
                results,
                total,
            })
        })
        .collect::<EngineResult<Vec<_>>>()?;

    Ok(DocumentView {
        document,
        period: CodeName {
            code: period.period_code.clone(),
            name: period.period_name.clone(),
        },
        template: CodeName {
            code: template.code.clone(),
            name: template.name.clone(),
        },
        employees,
    })
}

/// Approves a document that is in review.
pub fn approve<S: DocumentStore + ?Sized>(
    store: &S,
    document_id: i64,
    actor: &str,
    now: DateTime<Utc>,
) -> EngineResult<AccrualDocument> {
    store.transition_document(document_id, DocumentStatus::Approved, actor, now)
}

/// Cancels a document and its results, freeing its period and template for
/// a new run.
pub fn cancel<S: DocumentStore + ?Sized>(
    store: &S,
    document_id: i64,
    actor: &str,
    now: DateTime<Utc>,
) -> EngineResult<AccrualDocument> {
    store.transition_document(document_id, DocumentStatus::Cancelled, actor, now)
}

fn find_document<S: DocumentStore + ?Sized>(
    store: &S,
    document_id: i64,
) -> EngineResult<AccrualDocument> {
    store.document(document_id).ok_or_else(|| EngineError::NotFound {
        entity: "document",
        id: document_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RuleScope, RuleType};
    use crate::store::fixtures::{at, data, dataset, dec, rule};
    use crate::store::{InMemoryDocumentStore, PayrollData, PayrollDataset};

    fn now() -> DateTime<Utc> {
        at(2024, 2, 1)
    }

    fn build(configure: impl FnOnce(&mut PayrollDataset)) -> PayrollData {
        let mut ds = dataset();
        configure(&mut ds);
        PayrollData::new(ds).unwrap()
    }

    fn run_monthly(data: &PayrollData, store: &InMemoryDocumentStore, period_id: i64) -> EngineResult<RunSummary> {
        run(
            data,
            store,
            period_id,
            "MONTHLY_SALARY",
            "system",
            now(),
            &FormulaLimits::default(),
        )
    }

    #[test]
    fn test_run_commits_signed_results() {
        let data = data();
        let store = InMemoryDocumentStore::new();
        let summary = run_monthly(&data, &store, 1).unwrap();

        assert_eq!(summary.document.document_number, "ACC-2024-01-001");
        assert_eq!(summary.document.status, DocumentStatus::InReview);
        // Employee 3 has no calculated position.
        assert_eq!(summary.employees_processed, 2);
        assert_eq!(summary.positions_processed, 2);
        // Position 1: BONUS, PIT, UNION_FEE. Position 2: PIT, UNION_FEE.
        assert_eq!(summary.results_created, 5);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].position_id, 3);

        let results = store.results_for_document(summary.document.id);
        let pit = results
            .iter()
            .find(|r| r.position_id == 1 && r.rule_code == "PIT")
            .unwrap();
        assert_eq!(pit.amount, dec("-3960.00"));
        assert_eq!(pit.calculation_base, dec("22000.00"));
        assert_eq!(pit.rule_source.source_type(), "global");

        let bonus = results.iter().find(|r| r.rule_code == "BONUS").unwrap();
        assert_eq!(bonus.amount, dec("2000"));
        assert_eq!(bonus.rule_source.source_id, Some(1));
    }

    #[test]
    fn test_second_run_is_rejected() {
        let data = data();
        let store = InMemoryDocumentStore::new();
        run_monthly(&data, &store, 1).unwrap();

        let second = run_monthly(&data, &store, 1);
        assert!(matches!(
            second,
            Err(EngineError::PreconditionFailed(Precondition::DuplicateDocument { .. }))
        ));
        assert!(store.document(2).is_none());
    }

    #[test]
    fn test_rerun_after_cancel() {
        let data = data();
        let store = InMemoryDocumentStore::new();
        let first = run_monthly(&data, &store, 1).unwrap();
        cancel(&store, first.document.id, "accountant", now()).unwrap();

        let second = run_monthly(&data, &store, 1).unwrap();
        assert_eq!(second.document.document_number, "ACC-2024-01-002");
    }

    #[test]
    fn test_closed_period_is_rejected() {
        let data = data();
        let store = InMemoryDocumentStore::new();
        let result = run_monthly(&data, &store, 2);

        match result {
            Err(EngineError::PreconditionFailed(Precondition::PeriodNotDraft { status, .. })) => {
                assert_eq!(status, "closed");
            }
            other => panic!("Expected PeriodNotDraft, got {:?}", other),
        }
    }

    #[test]
    fn test_closed_period_is_reported_before_unknown_template() {
        let data = data();
        let store = InMemoryDocumentStore::new();
        let result = run(&data, &store, 2, "NOPE", "system", now(), &FormulaLimits::default());

        assert!(matches!(
            result,
            Err(EngineError::PreconditionFailed(Precondition::PeriodNotDraft { period_id: 2, .. }))
        ));
    }

    #[test]
    fn test_employee_without_calculated_position_is_not_processed() {
        let data = build(|ds| ds.periods[0].employee_id = Some(3));
        let store = InMemoryDocumentStore::new();
        let summary = run_monthly(&data, &store, 1).unwrap();

        assert_eq!(summary.employees_processed, 0);
        assert_eq!(summary.positions_processed, 0);
        assert_eq!(summary.results_created, 0);
        assert_eq!(summary.failures.len(), 1);
    }

    #[test]
    fn test_unknown_period_and_template() {
        let data = data();
        let store = InMemoryDocumentStore::new();
        assert!(matches!(
            run_monthly(&data, &store, 99),
            Err(EngineError::NotFound { entity: "period", .. })
        ));
        assert!(matches!(
            run(&data, &store, 1, "NOPE", "system", now(), &FormulaLimits::default()),
            Err(EngineError::NotFound { entity: "template", .. })
        ));
    }

    #[test]
    fn test_formula_error_commits_nothing() {
        let data = build(|ds| {
            ds.rules
                .push(rule(9, RuleScope::Position(2), "PIT", RuleType::Tax, "base_salary / 0"));
        });
        let store = InMemoryDocumentStore::new();
        let result = run_monthly(&data, &store, 1);

        assert!(matches!(result, Err(EngineError::Formula { position_id: 2, .. })));
        assert!(store.document(1).is_none());
        assert!(store.find_open_document(1, 1).is_none());
    }

    #[test]
    fn test_employee_scoped_period() {
        let data = build(|ds| ds.periods[0].employee_id = Some(2));
        let store = InMemoryDocumentStore::new();
        let summary = run_monthly(&data, &store, 1).unwrap();

        assert_eq!(summary.employees_processed, 1);
        assert_eq!(summary.results_created, 2);
        assert_eq!(summary.document.employee_id, Some(2));
    }

    #[test]
    fn test_unit_scoped_period_excludes_other_units() {
        let data = build(|ds| {
            ds.periods[0].organizational_unit_id = Some(2);
            ds.positions[1].organizational_unit_id = 1;
        });
        let store = InMemoryDocumentStore::new();
        let summary = run_monthly(&data, &store, 1).unwrap();

        assert_eq!(summary.employees_processed, 1);
        assert_eq!(summary.positions_processed, 1);
        assert_eq!(summary.failures[0].employee_id, 3);
    }

    #[test]
    fn test_document_view_groups_by_employee() {
        let data = data();
        let store = InMemoryDocumentStore::new();
        let summary = run_monthly(&data, &store, 1).unwrap();

        let view = document_view(&data, &store, summary.document.id).unwrap();
        assert_eq!(view.period.code, "2024-01");
        assert_eq!(view.template.code, "MONTHLY_SALARY");
        assert_eq!(view.employees.len(), 2);
        assert_eq!(view.employees[0].employee.personnel_number, "EMP001");
        // 2000 - 3960 - 200
        assert_eq!(view.employees[0].total, dec("-2160.00"));
        assert_eq!(view.employees[1].results.len(), 2);
    }

    #[test]
    fn test_cancelled_results_do_not_count() {
        let data = data();
        let store = InMemoryDocumentStore::new();
        let summary = run_monthly(&data, &store, 1).unwrap();
        cancel(&store, summary.document.id, "accountant", now()).unwrap();

        let view = document_view(&data, &store, summary.document.id).unwrap();
        assert_eq!(view.document.status, DocumentStatus::Cancelled);
        assert!(view.employees.iter().all(|e| e.total.is_zero()));
    }

    #[test]
    fn test_approve_then_cancel_is_rejected() {
        let data = data();
        let store = InMemoryDocumentStore::new();
        let summary = run_monthly(&data, &store, 1).unwrap();

        let approved = approve(&store, summary.document.id, "chief", now()).unwrap();
        assert_eq!(approved.status, DocumentStatus::Approved);
        assert!(matches!(
            cancel(&store, summary.document.id, "chief", now()),
            Err(EngineError::PreconditionFailed(Precondition::InvalidTransition { .. }))
        ));
    }

    #[test]
    fn test_unknown_document() {
        let data = data();
        let store = InMemoryDocumentStore::new();
        assert!(matches!(
            document_view(&data, &store, 5),
            Err(EngineError::NotFound { entity: "document", .. })
        ));
    }
}
