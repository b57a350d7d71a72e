//! Storage seams consumed and produced by the engine.
//!
//! [`PayrollRepository`] is the read side: organization, positions, rules,
//! periods and templates. [`DocumentStore`] is the write side, which owns
//! accrual documents and their results.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::EngineResult;
use crate::models::{
    AccrualDocument, AccrualResult, CalculationPeriod, CalculationRule, CalculationTemplate,
    Contract, DocumentStatus, Employee, Group, OrganizationalUnit, Position, PositionGroup,
    RuleScope, RuleSource,
};

/// Read-only access to the entities the engine consumes.
///
/// Collections are returned in ascending id order.
pub trait PayrollRepository: Send + Sync {
    /// All employees.
    fn employees(&self) -> Vec<&Employee>;

    /// Looks up an employee.
    fn employee(&self, id: i64) -> Option<&Employee>;

    /// Looks up a position.
    fn position(&self, id: i64) -> Option<&Position>;

    /// All positions held by an employee, regardless of validity.
    fn positions_for_employee(&self, employee_id: i64) -> Vec<&Position>;

    /// All positions in exactly this organizational unit.
    fn positions_in_unit(&self, unit_id: i64) -> Vec<&Position>;

    /// All contracts of a position, regardless of validity.
    fn contracts_for_position(&self, position_id: i64) -> Vec<&Contract>;

    /// All group memberships of a position, regardless of validity.
    fn memberships_for_position(&self, position_id: i64) -> Vec<&PositionGroup>;

    /// Looks up a group.
    fn group(&self, id: i64) -> Option<&Group>;

    /// Looks up an organizational unit.
    fn org_unit(&self, id: i64) -> Option<&OrganizationalUnit>;

    /// All rules attached to exactly `scope` with the given code.
    fn rules(&self, scope: RuleScope, code: &str) -> Vec<&CalculationRule>;

    /// Looks up a calculation period.
    fn period(&self, id: i64) -> Option<&CalculationPeriod>;

    /// Looks up a template by its code.
    fn template_by_code(&self, code: &str) -> Option<&CalculationTemplate>;
}

/// A result line waiting to be committed with its document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResult {
    /// The position calculated.
    pub position_id: i64,
    /// The employee holding the position.
    pub employee_id: i64,
    /// The position's organizational unit.
    pub organizational_unit_id: i64,
    /// The rule applied.
    pub rule_id: i64,
    /// The rule code.
    pub rule_code: String,
    /// The rule name.
    pub rule_name: String,
    /// Resolver provenance.
    pub rule_source: RuleSource,
    /// Signed amount.
    pub amount: Decimal,
    /// The value the formula was evaluated against.
    pub calculation_base: Decimal,
    /// ISO currency code.
    pub currency: String,
}

/// A document and all of its results, committed as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    /// The period calculated.
    pub period_id: i64,
    /// The period code, used in the document number.
    pub period_code: String,
    /// The template run.
    pub template_id: i64,
    /// The template code.
    pub template_code: String,
    /// Org-unit scope copied from the period.
    pub organizational_unit_id: Option<i64>,
    /// Employee scope copied from the period.
    pub employee_id: Option<i64>,
    /// When the calculation ran.
    pub calculation_date: DateTime<Utc>,
    /// Who triggered the run.
    pub created_by: String,
    /// The result lines.
    pub results: Vec<NewResult>,
}

/// Write access to accrual documents.
pub trait DocumentStore: Send + Sync {
    /// Returns the non-cancelled document for a period and template, if any.
    fn find_open_document(&self, period_id: i64, template_id: i64) -> Option<AccrualDocument>;

    /// Inserts a document and all of its results atomically.
    ///
    /// The duplicate check and the insert happen under one lock, so two
    /// concurrent commits for the same period and template cannot both
    /// succeed. Fails with `DuplicateDocument` when a non-cancelled document
    /// already exists. The committed document is `in_review`.
    fn commit_document(&self, new: NewDocument) -> EngineResult<AccrualDocument>;

    /// Looks up a document.
    fn document(&self, id: i64) -> Option<AccrualDocument>;

    /// All results of a document, in creation order.
    fn results_for_document(&self, document_id: i64) -> Vec<AccrualResult>;

    /// Moves a document through its workflow.
    ///
    /// Cancelling a document also cancels its results.
    fn transition_document(
        &self,
        document_id: i64,
        next: DocumentStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> EngineResult<AccrualDocument>;
}
