//! Shared test fixtures: a small organization with three employees in one
//! sales unit.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use super::{PayrollData, PayrollDataset};
use crate::models::{
    CalculationPeriod, CalculationRule, CalculationTemplate, CombinationMode, Contract,
    ContractType, Employee, EmployeeStatus, Group, OrganizationalUnit, PeriodStatus, Position,
    PositionGroup, RuleScope, RuleType, TemplateRule,
};

pub(crate) fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub(crate) fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub(crate) fn rule(
    id: i64,
    scope: RuleScope,
    code: &str,
    rule_type: RuleType,
    formula: &str,
) -> CalculationRule {
    CalculationRule {
        id,
        scope,
        code: code.to_string(),
        name: format!("{} rule", code),
        rule_type,
        formula: formula.to_string(),
        valid_from: at(2024, 1, 1),
        valid_until: None,
        is_active: true,
        version: 1,
        replaces_rule_id: None,
        combination_mode: CombinationMode::Cumulative,
        priority: 0,
        exclusion_groups: Vec::new(),
        max_combined_amount: None,
    }
}

pub(crate) fn contract(id: i64, position_id: i64, base_rate: &str) -> Contract {
    Contract {
        id,
        position_id,
        contract_type: ContractType::Salary,
        base_rate: dec(base_rate),
        currency: "UAH".to_string(),
        start_datetime: at(2023, 1, 1),
        end_datetime: None,
        is_active: true,
        notes: None,
    }
}

pub(crate) fn membership(id: i64, position_id: i64, group_id: i64) -> PositionGroup {
    PositionGroup {
        id,
        position_id,
        group_id,
        valid_from: at(2024, 1, 1),
        valid_until: None,
        metadata: None,
        document_number: None,
        document_date: None,
        is_active: true,
    }
}

fn unit(id: i64, parent_id: Option<i64>, code: &str, name: &str, level: u32) -> OrganizationalUnit {
    OrganizationalUnit {
        id,
        parent_id,
        code: code.to_string(),
        name: name.to_string(),
        level,
        is_active: true,
    }
}

fn group(id: i64, code: &str, name: &str) -> Group {
    Group {
        id,
        parent_id: None,
        code: code.to_string(),
        name: name.to_string(),
        description: None,
        level: 1,
        full_path: None,
        group_type: None,
        is_active: true,
    }
}

fn employee(id: i64, first_name: &str, last_name: &str) -> Employee {
    Employee {
        id,
        personnel_number: format!("EMP{:03}", id),
        tax_number: None,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        middle_name: None,
        birth_date: None,
        hire_date: date(2023, 1, 1),
        termination_date: None,
        status: EmployeeStatus::Active,
        is_active: true,
    }
}

fn position(id: i64, employee_id: i64, rate: &str) -> Position {
    Position {
        id,
        employee_id,
        organizational_unit_id: 2,
        position_code: format!("POS-{:03}", id),
        position_name: "Sales manager".to_string(),
        employment_rate: dec(rate),
        start_date: date(2023, 1, 1),
        end_date: None,
        is_active: true,
    }
}

fn period(id: i64, code: &str, start: NaiveDate, end: NaiveDate, status: PeriodStatus) -> CalculationPeriod {
    CalculationPeriod {
        id,
        period_code: code.to_string(),
        period_name: code.to_string(),
        start_date: start,
        end_date: end,
        period_type: "monthly".to_string(),
        organizational_unit_id: None,
        employee_id: None,
        status,
    }
}

/// Three employees in SALES. Position 3 has no contract.
pub(crate) fn dataset() -> PayrollDataset {
    PayrollDataset {
        org_units: vec![
            unit(1, None, "COMPANY", "Company", 1),
            unit(2, Some(1), "SALES", "Sales", 2),
        ],
        groups: vec![group(1, "UNION", "Union members"), group(2, "DISABLED", "Disabled")],
        employees: vec![
            employee(1, "Alex", "Storm"),
            employee(2, "Mira", "Vale"),
            employee(3, "Oren", "Pike"),
        ],
        positions: vec![position(1, 1, "1.0"), position(2, 2, "0.5"), position(3, 3, "1.0")],
        contracts: vec![contract(1, 1, "20000"), contract(2, 2, "18000")],
        memberships: Vec::new(),
        rules: vec![
            rule(1, RuleScope::Global, "PIT", RuleType::Tax, "base_salary * 0.18"),
            rule(2, RuleScope::Position(1), "BONUS", RuleType::Accrual, "2000"),
            rule(3, RuleScope::Global, "UNION_FEE", RuleType::Deduction, "base_salary * 0.01"),
        ],
        templates: vec![CalculationTemplate {
            id: 1,
            code: "MONTHLY_SALARY".to_string(),
            name: "Monthly salary".to_string(),
            description: None,
            is_active: true,
            rules: vec![
                TemplateRule {
                    rule_code: "BONUS".to_string(),
                    execution_order: 1,
                    is_active: true,
                },
                TemplateRule {
                    rule_code: "PIT".to_string(),
                    execution_order: 2,
                    is_active: true,
                },
                TemplateRule {
                    rule_code: "UNION_FEE".to_string(),
                    execution_order: 3,
                    is_active: true,
                },
            ],
        }],
        periods: vec![
            period(1, "2024-01", date(2024, 1, 1), date(2024, 1, 31), PeriodStatus::Draft),
            period(2, "2023-12", date(2023, 12, 1), date(2023, 12, 31), PeriodStatus::Closed),
        ],
    }
}

pub(crate) fn data() -> PayrollData {
    PayrollData::new(dataset()).unwrap()
}

pub(crate) fn codes(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| c.to_string()).collect()
}
