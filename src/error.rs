//! Error types for the payroll engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while loading payroll data,
//! resolving rules, and running accrual calculations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::calculation::FormulaError;

/// A precondition that must hold before a document can be created or moved
/// through its workflow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Precondition {
    /// The calculation period is not in draft status.
    #[error("Period {period_id} must be in draft status (current: {status})")]
    PeriodNotDraft {
        /// The period that was requested.
        period_id: i64,
        /// The status the period is currently in.
        status: String,
    },

    /// A non-cancelled document already exists for this period and template.
    #[error(
        "Document {document_number} already exists for period {period_id} and template '{template_code}'"
    )]
    DuplicateDocument {
        /// The period of the conflicting document.
        period_id: i64,
        /// The template of the conflicting document.
        template_code: String,
        /// The number of the existing document.
        document_number: String,
    },

    /// The document cannot move from its current status to the requested one.
    #[error("Document {document_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The document being transitioned.
        document_id: i64,
        /// The current status.
        from: String,
        /// The requested status.
        to: String,
    },
}

/// The main error type for the payroll engine.
///
/// # Example
///
/// ```
/// use payroll_engine::error::EngineError;
///
/// let error = EngineError::NotFound {
///     entity: "period",
///     id: "42".to_string(),
/// };
/// assert_eq!(error.to_string(), "period not found: 42");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A loaded entity violates one of its invariants.
    #[error("Invalid {entity} {id}: {message}")]
    InvalidData {
        /// The kind of entity (e.g. "contract").
        entity: &'static str,
        /// The identifier of the offending record.
        id: i64,
        /// A description of the violated invariant.
        message: String,
    },

    /// A period, template, employee, position or document does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity that was looked up.
        entity: &'static str,
        /// The identifier or code that was looked up.
        id: String,
    },

    /// The request conflicts with the current state of the data.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(#[from] Precondition),

    /// The position has no active contract at the calculation instant.
    #[error("No active contract for position {position_id} at {instant}")]
    NoActiveContract {
        /// The position being calculated.
        position_id: i64,
        /// The calculation instant.
        instant: DateTime<Utc>,
    },

    /// More than one contract is active for the position at the same instant.
    #[error("Position {position_id} has {count} contracts active at {instant}")]
    AmbiguousContract {
        /// The position being calculated.
        position_id: i64,
        /// The number of simultaneously active contracts.
        count: usize,
        /// The calculation instant.
        instant: DateTime<Utc>,
    },

    /// A rule formula failed to parse or evaluate.
    #[error("Formula error in rule '{rule_code}' for position {position_id}: {source}")]
    Formula {
        /// The code of the rule whose formula failed.
        rule_code: String,
        /// The position being calculated.
        position_id: i64,
        /// The underlying evaluator error.
        #[source]
        source: FormulaError,
    },
}

impl EngineError {
    /// Returns true for errors that are scoped to a single position and may be
    /// skipped by callers that isolate failures per position.
    pub fn is_position_scoped(&self) -> bool {
        matches!(
            self,
            EngineError::NoActiveContract { .. } | EngineError::AmbiguousContract { .. }
        )
    }

    /// A stable, machine-readable code for the error.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::ConfigNotFound { .. } => "CONFIG_NOT_FOUND",
            EngineError::ConfigParseError { .. } => "CONFIG_PARSE_ERROR",
            EngineError::InvalidData { .. } => "INVALID_DATA",
            EngineError::NotFound { .. } => "NOT_FOUND",
            EngineError::PreconditionFailed(Precondition::PeriodNotDraft { .. }) => {
                "PERIOD_NOT_DRAFT"
            }
            EngineError::PreconditionFailed(Precondition::DuplicateDocument { .. }) => {
                "DUPLICATE_DOCUMENT"
            }
            EngineError::PreconditionFailed(Precondition::InvalidTransition { .. }) => {
                "INVALID_TRANSITION"
            }
            EngineError::NoActiveContract { .. } => "NO_ACTIVE_CONTRACT",
            EngineError::AmbiguousContract { .. } => "AMBIGUOUS_CONTRACT",
            EngineError::Formula { .. } => "FORMULA_ERROR",
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
