//! In-memory implementations of the storage seams.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::repository::{DocumentStore, NewDocument, PayrollRepository};
use crate::config::validate_dataset;
use crate::error::{EngineError, EngineResult, Precondition};
use crate::models::{
    AccrualDocument, AccrualResult, CalculationPeriod, CalculationRule, CalculationTemplate,
    Contract, DocumentStatus, Employee, Group, OrganizationalUnit, Position, PositionGroup,
    ResultStatus, RuleScope,
};

/// The raw entity collections a [`PayrollData`] is built from.
#[derive(Debug, Clone, Default)]
pub struct PayrollDataset {
    /// Organizational units.
    pub org_units: Vec<OrganizationalUnit>,
    /// Classification groups.
    pub groups: Vec<Group>,
    /// Employees.
    pub employees: Vec<Employee>,
    /// Positions.
    pub positions: Vec<Position>,
    /// Contracts.
    pub contracts: Vec<Contract>,
    /// Position-group memberships.
    pub memberships: Vec<PositionGroup>,
    /// Calculation rules.
    pub rules: Vec<CalculationRule>,
    /// Calculation templates.
    pub templates: Vec<CalculationTemplate>,
    /// Calculation periods.
    pub periods: Vec<CalculationPeriod>,
}

/// A validated, indexed dataset implementing [`PayrollRepository`].
#[derive(Debug, Clone)]
pub struct PayrollData {
    org_units: BTreeMap<i64, OrganizationalUnit>,
    groups: BTreeMap<i64, Group>,
    employees: BTreeMap<i64, Employee>,
    positions: BTreeMap<i64, Position>,
    contracts: BTreeMap<i64, Vec<Contract>>,
    memberships: BTreeMap<i64, Vec<PositionGroup>>,
    rules: HashMap<(RuleScope, String), Vec<CalculationRule>>,
    templates: HashMap<String, CalculationTemplate>,
    periods: BTreeMap<i64, CalculationPeriod>,
}

impl PayrollData {
    /// Validates `dataset` and indexes it.
    ///
    /// Fails with `InvalidData` when an entity violates its invariants.
    pub fn new(mut dataset: PayrollDataset) -> EngineResult<Self> {
        validate_dataset(&mut dataset)?;

        let mut contracts: BTreeMap<i64, Vec<Contract>> = BTreeMap::new();
        for contract in dataset.contracts {
            contracts.entry(contract.position_id).or_default().push(contract);
        }
        contracts.values_mut().for_each(|c| c.sort_by_key(|c| c.id));

        let mut memberships: BTreeMap<i64, Vec<PositionGroup>> = BTreeMap::new();
        for membership in dataset.memberships {
            memberships
                .entry(membership.position_id)
                .or_default()
                .push(membership);
        }
        memberships.values_mut().for_each(|m| m.sort_by_key(|m| m.id));

        let mut rules: HashMap<(RuleScope, String), Vec<CalculationRule>> = HashMap::new();
        for rule in dataset.rules {
            rules
                .entry((rule.scope, rule.code.clone()))
                .or_default()
                .push(rule);
        }
        rules.values_mut().for_each(|r| r.sort_by_key(|r| r.id));

        let data = PayrollData {
            org_units: dataset.org_units.into_iter().map(|u| (u.id, u)).collect(),
            groups: dataset.groups.into_iter().map(|g| (g.id, g)).collect(),
            employees: dataset.employees.into_iter().map(|e| (e.id, e)).collect(),
            positions: dataset.positions.into_iter().map(|p| (p.id, p)).collect(),
            contracts,
            memberships,
            rules,
            templates: dataset
                .templates
                .into_iter()
                .map(|t| (t.code.clone(), t))
                .collect(),
            periods: dataset.periods.into_iter().map(|p| (p.id, p)).collect(),
        };

        debug!(
            employees = data.employees.len(),
            positions = data.positions.len(),
            rule_codes = data.rules.len(),
            "Indexed payroll data"
        );

        Ok(data)
    }
}

impl PayrollRepository for PayrollData {
    fn employees(&self) -> Vec<&Employee> {
        self.employees.values().collect()
    }

    fn employee(&self, id: i64) -> Option<&Employee> {
        self.employees.get(&id)
    }

    fn position(&self, id: i64) -> Option<&Position> {
        self.positions.get(&id)
    }

    fn positions_for_employee(&self, employee_id: i64) -> Vec<&Position> {
        self.positions
            .values()
            .filter(|p| p.employee_id == employee_id)
            .collect()
    }

    fn positions_in_unit(&self, unit_id: i64) -> Vec<&Position> {
        self.positions
            .values()
            .filter(|p| p.organizational_unit_id == unit_id)
            .collect()
    }

    fn contracts_for_position(&self, position_id: i64) -> Vec<&Contract> {
        self.contracts
            .get(&position_id)
            .map(|c| c.iter().collect())
            .unwrap_or_default()
    }

    fn memberships_for_position(&self, position_id: i64) -> Vec<&PositionGroup> {
        self.memberships
            .get(&position_id)
            .map(|m| m.iter().collect())
            .unwrap_or_default()
    }

    fn group(&self, id: i64) -> Option<&Group> {
        self.groups.get(&id)
    }

    fn org_unit(&self, id: i64) -> Option<&OrganizationalUnit> {
        self.org_units.get(&id)
    }

    fn rules(&self, scope: RuleScope, code: &str) -> Vec<&CalculationRule> {
        self.rules
            .get(&(scope, code.to_string()))
            .map(|r| r.iter().collect())
            .unwrap_or_default()
    }

    fn period(&self, id: i64) -> Option<&CalculationPeriod> {
        self.periods.get(&id)
    }

    fn template_by_code(&self, code: &str) -> Option<&CalculationTemplate> {
        self.templates.get(code)
    }
}

#[derive(Debug, Default)]
struct DocumentTables {
    documents: BTreeMap<i64, AccrualDocument>,
    results: Vec<AccrualResult>,
}

impl DocumentTables {
    fn open_document(&self, period_id: i64, template_id: i64) -> Option<&AccrualDocument> {
        self.documents.values().find(|d| {
            d.period_id == period_id
                && d.template_id == template_id
                && d.status != DocumentStatus::Cancelled
        })
    }
}

/// Accrual documents and results held in memory behind one mutex.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    tables: Mutex<DocumentTables>,
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DocumentTables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn find_open_document(&self, period_id: i64, template_id: i64) -> Option<AccrualDocument> {
        self.lock().open_document(period_id, template_id).cloned()
    }

    fn commit_document(&self, new: NewDocument) -> EngineResult<AccrualDocument> {
        let mut tables = self.lock();

        if let Some(existing) = tables.open_document(new.period_id, new.template_id) {
            return Err(Precondition::DuplicateDocument {
                period_id: new.period_id,
                template_code: new.template_code,
                document_number: existing.document_number.clone(),
            }
            .into());
        }

        let document_id = tables.documents.len() as i64 + 1;
        let sequence = tables
            .documents
            .values()
            .filter(|d| d.period_id == new.period_id)
            .count()
            + 1;

        let mut document = AccrualDocument {
            id: document_id,
            document_number: format!("ACC-{}-{:03}", new.period_code, sequence),
            period_id: new.period_id,
            template_id: new.template_id,
            template_code: new.template_code,
            organizational_unit_id: new.organizational_unit_id,
            employee_id: new.employee_id,
            status: DocumentStatus::Draft,
            calculation_date: new.calculation_date,
            approved_date: None,
            approved_by: None,
            cancelled_date: None,
            cancelled_by: None,
            created_by: new.created_by,
        };
        let creator = document.created_by.clone();
        document.transition(DocumentStatus::InReview, &creator, new.calculation_date)?;

        let results_created = new.results.len();
        for line in new.results {
            let id = tables.results.len() as i64 + 1;
            tables.results.push(AccrualResult {
                id,
                document_id,
                position_id: line.position_id,
                employee_id: line.employee_id,
                organizational_unit_id: line.organizational_unit_id,
                rule_id: line.rule_id,
                rule_code: line.rule_code,
                rule_name: line.rule_name,
                rule_source: line.rule_source,
                amount: line.amount,
                calculation_base: line.calculation_base,
                currency: line.currency,
                status: ResultStatus::Active,
                created_at: new.calculation_date,
            });
        }
        tables.documents.insert(document_id, document.clone());

        info!(
            document_id,
            document_number = %document.document_number,
            results_created,
            "Committed accrual document"
        );

        Ok(document)
    }

    fn document(&self, id: i64) -> Option<AccrualDocument> {
        self.lock().documents.get(&id).cloned()
    }

    fn results_for_document(&self, document_id: i64) -> Vec<AccrualResult> {
        self.lock()
            .results
            .iter()
            .filter(|r| r.document_id == document_id)
            .cloned()
            .collect()
    }

    fn transition_document(
        &self,
        document_id: i64,
        next: DocumentStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> EngineResult<AccrualDocument> {
        let mut tables = self.lock();

        let document = tables
            .documents
            .get_mut(&document_id)
            .ok_or_else(|| EngineError::NotFound {
                entity: "document",
                id: document_id.to_string(),
            })?;
        document.transition(next, actor, at)?;
        let document = document.clone();

        if next == DocumentStatus::Cancelled {
            tables
                .results
                .iter_mut()
                .filter(|r| r.document_id == document_id)
                .for_each(|r| r.status = ResultStatus::Cancelled);
        }

        info!(
            document_id,
            status = %document.status,
            actor,
            "Document transitioned"
        );

        Ok(document)
    }
}
