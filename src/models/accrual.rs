//! Accrual document and result models.
//!
//! An [`AccrualDocument`] groups the [`AccrualResult`] records produced by
//! one calculation run. Results are append-only; the only field that ever
//! changes after creation is their status.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineResult, Precondition};

use super::RuleLevel;

/// Workflow status of an accrual document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Created, not yet calculated.
    Draft,
    /// Calculated and awaiting approval.
    InReview,
    /// Approved for payment.
    Approved,
    /// Withdrawn; frees the period/template pair for a re-run.
    Cancelled,
}

impl DocumentStatus {
    /// Returns true when the workflow allows moving to `next`.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_engine::models::DocumentStatus;
    ///
    /// assert!(DocumentStatus::Draft.can_transition_to(DocumentStatus::InReview));
    /// assert!(DocumentStatus::InReview.can_transition_to(DocumentStatus::Approved));
    /// assert!(!DocumentStatus::Approved.can_transition_to(DocumentStatus::Cancelled));
    /// ```
    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, next),
            (Draft, InReview) | (Draft, Cancelled) | (InReview, Approved) | (InReview, Cancelled)
        )
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::InReview => "in_review",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A calculation run over one period and template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualDocument {
    /// Unique identifier, assigned by the store.
    pub id: i64,
    /// Unique document number, e.g. "ACC-2024-01-001".
    pub document_number: String,
    /// The period calculated.
    pub period_id: i64,
    /// The template run.
    pub template_id: i64,
    /// The template code, kept for display.
    pub template_code: String,
    /// Org-unit scope copied from the period.
    pub organizational_unit_id: Option<i64>,
    /// Employee scope copied from the period.
    pub employee_id: Option<i64>,
    /// Workflow status.
    pub status: DocumentStatus,
    /// When the calculation ran.
    pub calculation_date: DateTime<Utc>,
    /// When the document was approved.
    pub approved_date: Option<DateTime<Utc>>,
    /// Who approved the document.
    pub approved_by: Option<String>,
    /// When the document was cancelled.
    pub cancelled_date: Option<DateTime<Utc>>,
    /// Who cancelled the document.
    pub cancelled_by: Option<String>,
    /// Who created the document.
    pub created_by: String,
}

impl AccrualDocument {
    /// Moves the document to `next`, stamping approval or cancellation.
    pub fn transition(
        &mut self,
        next: DocumentStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> EngineResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(Precondition::InvalidTransition {
                document_id: self.id,
                from: self.status.to_string(),
                to: next.to_string(),
            }
            .into());
        }

        match next {
            DocumentStatus::Approved => {
                self.approved_date = Some(at);
                self.approved_by = Some(actor.to_string());
            }
            DocumentStatus::Cancelled => {
                self.cancelled_date = Some(at);
                self.cancelled_by = Some(actor.to_string());
            }
            DocumentStatus::Draft | DocumentStatus::InReview => {}
        }
        self.status = next;
        Ok(())
    }
}

/// Status of a single accrual result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Counts towards the document totals.
    Active,
    /// Superseded or withdrawn.
    Cancelled,
}

/// Where in the override hierarchy a rule was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSource {
    /// The hierarchy level that matched.
    pub level: RuleLevel,
    /// The id of the position, group or unit; `None` for global rules.
    pub source_id: Option<i64>,
}

impl RuleSource {
    /// The persisted `rule_source_type` string.
    pub fn source_type(&self) -> &'static str {
        self.level.source_type()
    }
}

/// One rule's computed effect on one position, for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualResult {
    /// Unique identifier, assigned by the store.
    pub id: i64,
    /// The owning document.
    pub document_id: i64,
    /// The position calculated.
    pub position_id: i64,
    /// The employee holding the position.
    pub employee_id: i64,
    /// The position's organizational unit.
    pub organizational_unit_id: i64,
    /// The rule applied.
    pub rule_id: i64,
    /// The code of the rule applied.
    pub rule_code: String,
    /// The name of the rule applied.
    pub rule_name: String,
    /// Resolver provenance.
    pub rule_source: RuleSource,
    /// Signed amount: positive for accruals/benefits, negative for taxes/deductions.
    pub amount: Decimal,
    /// The value the formula was evaluated against.
    pub calculation_base: Decimal,
    /// ISO currency code.
    pub currency: String,
    /// Result status.
    pub status: ResultStatus,
    /// When the result was created.
    pub created_at: DateTime<Utc>,
}
