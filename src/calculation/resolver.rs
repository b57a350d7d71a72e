//! Rule resolution across the override hierarchy.
//!
//! For a position, a rule code and an instant, the resolver checks four
//! levels in a fixed order and returns the first match:
//!
//! 1. rules attached to the position itself
//! 2. rules attached to a group the position belongs to at the instant,
//!    groups visited in ascending id order
//! 3. rules attached to the position's organizational unit
//! 4. global rules
//!
//! Within one level, the candidates are narrowed to those effective at the
//! instant, rules superseded by another candidate (via `replaces_rule_id`)
//! are dropped, and the rest are ordered by highest priority, then highest
//! version, then lowest id.
//!
//! Finding no rule is not an error: it means the code does not apply.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::temporal::filter_effective;
use crate::error::{EngineError, EngineResult};
use crate::models::{CalculationRule, Position, RuleLevel, RuleScope, RuleSource};
use crate::store::PayrollRepository;

/// A matched rule together with where in the hierarchy it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRule {
    /// The rule to evaluate.
    pub rule: CalculationRule,
    /// The level that matched.
    pub level: RuleLevel,
    /// The id of the position, group or unit; `None` for global rules.
    pub source_id: Option<i64>,
    /// Human-readable provenance, e.g. "Org Unit Platform".
    pub source: String,
}

impl ResolvedRule {
    /// Provenance in its persisted form.
    pub fn rule_source(&self) -> RuleSource {
        RuleSource {
            level: self.level,
            source_id: self.source_id,
        }
    }
}

/// Resolves rule codes against a repository.
///
/// The resolver holds no state of its own, so repeated calls with the same
/// arguments over unchanged data return the same rule.
pub struct RuleResolver<'a, R: PayrollRepository + ?Sized> {
    repo: &'a R,
}

impl<'a, R: PayrollRepository + ?Sized> RuleResolver<'a, R> {
    /// Creates a resolver over `repo`.
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// Resolves `code` for the position with id `position_id` at `instant`.
    ///
    /// Returns `Ok(None)` when no level has an applicable rule, and
    /// `NotFound` when the position does not exist.
    pub fn resolve(
        &self,
        position_id: i64,
        code: &str,
        instant: DateTime<Utc>,
    ) -> EngineResult<Option<ResolvedRule>> {
        let position = self
            .repo
            .position(position_id)
            .ok_or_else(|| EngineError::NotFound {
                entity: "position",
                id: position_id.to_string(),
            })?;
        Ok(self.resolve_for(position, code, instant))
    }

    /// Resolves `code` for an already loaded position.
    pub fn resolve_for(
        &self,
        position: &Position,
        code: &str,
        instant: DateTime<Utc>,
    ) -> Option<ResolvedRule> {
        let resolved = self
            .at_position(position, code, instant)
            .or_else(|| self.at_groups(position, code, instant))
            .or_else(|| self.at_org_unit(position, code, instant))
            .or_else(|| self.at_global(code, instant));

        match &resolved {
            Some(r) => debug!(
                position_id = position.id,
                rule_code = code,
                rule_id = r.rule.id,
                level = ?r.level,
                "Rule resolved"
            ),
            None => debug!(position_id = position.id, rule_code = code, "No applicable rule"),
        }

        resolved
    }

    fn at_position(
        &self,
        position: &Position,
        code: &str,
        instant: DateTime<Utc>,
    ) -> Option<ResolvedRule> {
        let rule = select(self.repo.rules(RuleScope::Position(position.id), code), instant)?;
        Some(ResolvedRule {
            rule: rule.clone(),
            level: RuleLevel::Position,
            source_id: Some(position.id),
            source: format!("Position {}", position.position_code),
        })
    }

    fn at_groups(
        &self,
        position: &Position,
        code: &str,
        instant: DateTime<Utc>,
    ) -> Option<ResolvedRule> {
        let mut group_ids: Vec<i64> =
            filter_effective(self.repo.memberships_for_position(position.id), instant)
                .into_iter()
                .map(|m| m.group_id)
                .collect();
        group_ids.sort_unstable();
        group_ids.dedup();

        group_ids.into_iter().find_map(|group_id| {
            let rule = select(self.repo.rules(RuleScope::Group(group_id), code), instant)?;
            let name = self
                .repo
                .group(group_id)
                .map(|g| g.name.clone())
                .unwrap_or_else(|| group_id.to_string());
            Some(ResolvedRule {
                rule: rule.clone(),
                level: RuleLevel::Group,
                source_id: Some(group_id),
                source: format!("Group {}", name),
            })
        })
    }

    fn at_org_unit(
        &self,
        position: &Position,
        code: &str,
        instant: DateTime<Utc>,
    ) -> Option<ResolvedRule> {
        let unit_id = position.organizational_unit_id;
        let rule = select(self.repo.rules(RuleScope::OrgUnit(unit_id), code), instant)?;
        let name = self
            .repo
            .org_unit(unit_id)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| unit_id.to_string());
        Some(ResolvedRule {
            rule: rule.clone(),
            level: RuleLevel::OrgUnit,
            source_id: Some(unit_id),
            source: format!("Org Unit {}", name),
        })
    }

    fn at_global(&self, code: &str, instant: DateTime<Utc>) -> Option<ResolvedRule> {
        let rule = select(self.repo.rules(RuleScope::Global, code), instant)?;
        Some(ResolvedRule {
            rule: rule.clone(),
            level: RuleLevel::Global,
            source_id: None,
            source: "Global rule".to_string(),
        })
    }
}

/// Picks the winning rule among the candidates of one scope.
fn select(candidates: Vec<&CalculationRule>, instant: DateTime<Utc>) -> Option<&CalculationRule> {
    let effective = filter_effective(candidates, instant);
    let superseded: HashSet<i64> = effective.iter().filter_map(|r| r.replaces_rule_id).collect();

    let current: Vec<&CalculationRule> = effective
        .iter()
        .copied()
        .filter(|r| !superseded.contains(&r.id))
        .collect();
    // A replacement cycle leaves nothing current; fall back to every candidate.
    let pool = if current.is_empty() { effective } else { current };

    pool.into_iter().min_by(|a, b| precedence(a, b))
}

fn precedence(a: &CalculationRule, b: &CalculationRule) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.version.cmp(&a.version))
        .then_with(|| a.id.cmp(&b.id))
}
