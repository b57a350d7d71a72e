//! Performance benchmarks for the payroll engine.
//!
//! This benchmark suite covers:
//! - Rule resolution for a single code
//! - Formula parsing and evaluation
//! - A single position calculation
//! - An employee preview through the HTTP router
//! - A full document run for the bundled organization
//! - Bulk previews over synthetic organizations of growing size
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use chrono::{TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;
use serde_json::json;

use payroll_engine::api::{AppState, create_router};
use payroll_engine::calculation::{
    Formula, FormulaLimits, RuleResolver, calculate_all, calculate_position, run,
};
use payroll_engine::config::ConfigLoader;
use payroll_engine::store::{InMemoryDocumentStore, PayrollData, PayrollDataset, PayrollRepository};

use axum::{body::Body, http::Request};
use tower::ServiceExt;

fn load_config() -> ConfigLoader {
    ConfigLoader::load("./config/payroll").expect("Failed to load config")
}

/// Builds an organization of `employees` people, each with one position in
/// one of ten units, a contract, and every third one in the union group.
fn synthetic_data(employees: i64) -> PayrollData {
    let units: Vec<_> = (1..=10)
        .map(|id| {
            let parent = if id == 1 { None } else { Some(1) };
            let level = if id == 1 { 1 } else { 2 };
            serde_json::from_value(json!({
                "id": id, "parent_id": parent, "code": format!("UNIT_{}", id),
                "name": format!("Unit {}", id), "level": level
            }))
            .unwrap()
        })
        .collect();

    let mut dataset = PayrollDataset {
        org_units: units,
        groups: vec![
            serde_json::from_value(json!({ "id": 1, "code": "UNION", "name": "Union members" }))
                .unwrap(),
        ],
        ..PayrollDataset::default()
    };

    for id in 1..=employees {
        dataset.employees.push(
            serde_json::from_value(json!({
                "id": id, "personnel_number": format!("EMP{:05}", id),
                "first_name": "Bench", "last_name": format!("Employee {}", id),
                "hire_date": "2022-01-01"
            }))
            .unwrap(),
        );
        dataset.positions.push(
            serde_json::from_value(json!({
                "id": id, "employee_id": id, "organizational_unit_id": 1 + id % 10,
                "position_code": format!("POS-{:05}", id), "position_name": "Engineer",
                "employment_rate": "1.0", "start_date": "2022-01-01"
            }))
            .unwrap(),
        );
        dataset.contracts.push(
            serde_json::from_value(json!({
                "id": id, "position_id": id, "contract_type": "salary",
                "base_rate": format!("{}.00", 15000 + id * 10),
                "start_datetime": "2022-01-01T00:00:00Z"
            }))
            .unwrap(),
        );
        if id % 3 == 0 {
            dataset.memberships.push(
                serde_json::from_value(json!({
                    "id": id, "position_id": id, "group_id": 1,
                    "valid_from": "2023-01-01T00:00:00Z"
                }))
                .unwrap(),
            );
        }
    }

    dataset.rules = vec![
        json!({ "id": 1, "scope": "global", "code": "PIT", "name": "Personal income tax",
                "rule_type": "tax", "formula": "base_salary * 0.18",
                "valid_from": "2024-01-01T00:00:00Z" }),
        json!({ "id": 2, "scope": { "org_unit": 2 }, "code": "IT_BONUS", "name": "IT allowance",
                "rule_type": "accrual", "formula": "base_salary * 0.10",
                "valid_from": "2024-01-01T00:00:00Z" }),
        json!({ "id": 3, "scope": { "group": 1 }, "code": "UNION_FEE", "name": "Union fee",
                "rule_type": "deduction", "formula": "round(base_salary * 0.01, 2)",
                "valid_from": "2024-01-01T00:00:00Z" }),
    ]
    .into_iter()
    .map(|rule| serde_json::from_value(rule).unwrap())
    .collect();

    PayrollData::new(dataset).expect("Synthetic dataset is valid")
}

fn codes(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

/// Benchmark: Resolving one code that falls through to the global level.
///
/// Target: < 10μs mean
fn bench_rule_resolution(c: &mut Criterion) {
    let config = load_config();
    let resolver = RuleResolver::new(config.data());
    let instant = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();

    c.bench_function("resolve_global_fallthrough", |b| {
        b.iter(|| black_box(resolver.resolve(black_box(2), "PIT", instant).unwrap()))
    });
}

/// Benchmark: Parsing and evaluating a formula with a function call.
fn bench_formula(c: &mut Criterion) {
    let limits = FormulaLimits::default();
    let base = Decimal::new(2_000_000, 2);

    c.bench_function("formula_parse_and_evaluate", |b| {
        b.iter(|| {
            let formula = Formula::parse(black_box("min(base_salary * 0.2, 1500)"), &limits).unwrap();
            black_box(formula.evaluate(base).unwrap())
        })
    });
}

/// Benchmark: One position through the full rule set.
///
/// Target: < 100μs mean
fn bench_single_position(c: &mut Criterion) {
    let config = load_config();
    let data = config.data();
    let settings = config.settings();
    let position = data.position(8).expect("position 8 exists");
    let instant = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();

    c.bench_function("single_position", |b| {
        b.iter(|| {
            black_box(
                calculate_position(
                    data,
                    position,
                    instant,
                    &settings.preview.rule_codes,
                    &settings.formula,
                )
                .unwrap(),
            )
        })
    });
}

/// Benchmark: Employee preview through the HTTP router.
///
/// Target: < 1ms mean
fn bench_employee_preview(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let router = create_router(AppState::new(load_config()));

    c.bench_function("employee_preview", |b| {
        b.to_async(&rt).iter(|| async {
            let router = router.clone();
            let response = router
                .oneshot(
                    Request::builder()
                        .uri("/payroll/calculate/2?calculation_date=2024-01-31")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            black_box(response)
        })
    });
}

/// Benchmark: Document run for the whole bundled organization.
///
/// Each iteration commits into a fresh store so no run hits the duplicate
/// check.
fn bench_document_run(c: &mut Criterion) {
    let config = load_config();
    let data = config.data();
    let limits = &config.settings().formula;
    let now = Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap();

    c.bench_function("document_run_organization", |b| {
        b.iter(|| {
            let store = InMemoryDocumentStore::new();
            black_box(run(data, &store, 1, "MONTHLY_SALARY", "bench", now, limits).unwrap())
        })
    });
}

/// Benchmark: Bulk preview over organizations of growing size.
fn bench_scaling(c: &mut Criterion) {
    let rule_codes = codes(&["IT_BONUS", "UNION_FEE", "PIT"]);
    let limits = FormulaLimits::default();
    let instant = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();

    let mut group = c.benchmark_group("calculate_all");

    for employees in [10i64, 100, 1000].iter() {
        let data = synthetic_data(*employees);

        group.throughput(Throughput::Elements(*employees as u64));
        if *employees >= 1000 {
            // Reduce sample size for large organizations to keep benchmark time reasonable
            group.sample_size(10);
        }
        group.bench_with_input(
            BenchmarkId::new("employees", employees),
            employees,
            |b, _| b.iter(|| black_box(calculate_all(&data, instant, &rule_codes, &limits))),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_rule_resolution,
    bench_formula,
    bench_single_position,
    bench_employee_preview,
    bench_document_run,
    bench_scaling,
);
criterion_main!(benches);
