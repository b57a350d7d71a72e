//! Calculation rule and template models.
//!
//! A [`CalculationRule`] carries a formula and a [`RuleScope`]. The same rule
//! code may exist at several scopes at once, which is what makes override
//! resolution meaningful.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::{TimeBounded, ValidityWindow};

use super::organization::default_true;

/// Which entity a rule is attached to.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{RuleLevel, RuleScope};
///
/// assert_eq!(RuleScope::Group(4).level(), RuleLevel::Group);
/// assert_eq!(RuleScope::Global.level(), RuleLevel::Global);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    /// Applies to a single position.
    Position(i64),
    /// Applies to every member of a group.
    Group(i64),
    /// Applies to every position in an organizational unit.
    OrgUnit(i64),
    /// Applies to everyone.
    Global,
}

impl RuleScope {
    /// Returns the hierarchy level this scope resolves at.
    pub fn level(&self) -> RuleLevel {
        match self {
            RuleScope::Position(_) => RuleLevel::Position,
            RuleScope::Group(_) => RuleLevel::Group,
            RuleScope::OrgUnit(_) => RuleLevel::OrgUnit,
            RuleScope::Global => RuleLevel::Global,
        }
    }

    /// Returns the id of the scoping entity, `None` for global rules.
    pub fn scope_id(&self) -> Option<i64> {
        match self {
            RuleScope::Position(id) | RuleScope::Group(id) | RuleScope::OrgUnit(id) => Some(*id),
            RuleScope::Global => None,
        }
    }
}

/// A level of the override hierarchy, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleLevel {
    /// Position-specific override.
    Position,
    /// Group-specific override.
    Group,
    /// Organizational-unit default.
    OrgUnit,
    /// Organization-wide default.
    Global,
}

impl RuleLevel {
    /// The source type string persisted on accrual results.
    pub fn source_type(&self) -> &'static str {
        match self {
            RuleLevel::Position => "position",
            RuleLevel::Group => "group",
            RuleLevel::OrgUnit => "organizational_unit",
            RuleLevel::Global => "global",
        }
    }
}

/// What a rule contributes to the salary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Adds to gross salary.
    Accrual,
    /// Subtracted from gross, computed against base salary.
    Deduction,
    /// Subtracted from gross, computed against gross salary.
    Tax,
    /// Adds to gross salary, like an accrual.
    Benefit,
}

impl RuleType {
    /// Returns true for rules that add to gross salary.
    pub fn is_income(&self) -> bool {
        matches!(self, RuleType::Accrual | RuleType::Benefit)
    }

    /// Applies the persisted sign convention: positive for income, negative
    /// for taxes and deductions.
    pub fn signed(&self, amount: Decimal) -> Decimal {
        if self.is_income() { amount } else { -amount }
    }
}

/// How a rule combines with other rules applied to the same position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CombinationMode {
    /// Always applies alongside other rules.
    #[default]
    Cumulative,
    /// Skipped when an earlier applied rule shares an exclusion group.
    /// Taxes count as applied after every other rule type.
    Exclusive,
}

/// A configurable calculation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRule {
    /// Unique identifier for the rule.
    pub id: i64,
    /// The entity the rule is attached to.
    pub scope: RuleScope,
    /// Rule code, shared across scope levels (e.g., "PIT").
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// What the rule contributes.
    pub rule_type: RuleType,
    /// Arithmetic formula over `base_salary`.
    pub formula: String,
    /// Start of validity.
    pub valid_from: DateTime<Utc>,
    /// End of validity (inclusive), if any.
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    /// Whether the rule is enabled.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Version number, higher wins a tie.
    #[serde(default = "default_version")]
    pub version: u32,
    /// The rule this one supersedes.
    #[serde(default)]
    pub replaces_rule_id: Option<i64>,
    /// How the rule combines with others.
    #[serde(default)]
    pub combination_mode: CombinationMode,
    /// Higher priority wins a tie within one scope level.
    #[serde(default)]
    pub priority: i32,
    /// Exclusion groups used by [`CombinationMode::Exclusive`].
    #[serde(default)]
    pub exclusion_groups: Vec<String>,
    /// Upper bound on the evaluated amount.
    #[serde(default)]
    pub max_combined_amount: Option<Decimal>,
}

impl TimeBounded for CalculationRule {
    type Point = DateTime<Utc>;

    fn validity(&self) -> ValidityWindow<DateTime<Utc>> {
        ValidityWindow::new(self.valid_from, self.valid_until)
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}

/// One rule slot in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRule {
    /// The rule code to resolve.
    pub rule_code: String,
    /// Position in the execution order.
    pub execution_order: u32,
    /// Disabled slots are skipped.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A named, ordered set of rule codes run together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationTemplate {
    /// Unique identifier for the template.
    pub id: i64,
    /// Unique template code (e.g., "MONTHLY_SALARY").
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the template can be run.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// The rule slots.
    #[serde(default)]
    pub rules: Vec<TemplateRule>,
}

impl CalculationTemplate {
    /// Returns the active rule codes sorted by execution order.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_engine::models::{CalculationTemplate, TemplateRule};
    ///
    /// let template = CalculationTemplate {
    ///     id: 1,
    ///     code: "MONTHLY_SALARY".to_string(),
    ///     name: "Monthly salary".to_string(),
    ///     description: None,
    ///     is_active: true,
    ///     rules: vec![
    ///         TemplateRule { rule_code: "PIT".to_string(), execution_order: 2, is_active: true },
    ///         TemplateRule { rule_code: "BONUS".to_string(), execution_order: 1, is_active: true },
    ///         TemplateRule { rule_code: "OLD".to_string(), execution_order: 3, is_active: false },
    ///     ],
    /// };
    /// assert_eq!(template.ordered_rule_codes(), vec!["BONUS", "PIT"]);
    /// ```
    pub fn ordered_rule_codes(&self) -> Vec<String> {
        let mut slots: Vec<&TemplateRule> = self.rules.iter().filter(|r| r.is_active).collect();
        slots.sort_by_key(|r| r.execution_order);
        slots.into_iter().map(|r| r.rule_code.clone()).collect()
    }
}

fn default_version() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_scope_deserializes_as_tagged_variant() {
        let scope: RuleScope = serde_yaml::from_str("group: 4").unwrap();
        assert_eq!(scope, RuleScope::Group(4));

        let scope: RuleScope = serde_yaml::from_str("org_unit: 7").unwrap();
        assert_eq!(scope, RuleScope::OrgUnit(7));

        let scope: RuleScope = serde_yaml::from_str("global").unwrap();
        assert_eq!(scope, RuleScope::Global);
    }

    #[test]
    fn test_rule_level_serialization() {
        assert_eq!(
            serde_json::to_string(&RuleLevel::OrgUnit).unwrap(),
            "\"ORG_UNIT\""
        );
        assert_eq!(RuleLevel::OrgUnit.source_type(), "organizational_unit");
    }

    #[test]
    fn test_levels_order_by_precedence() {
        assert!(RuleLevel::Position < RuleLevel::Group);
        assert!(RuleLevel::Group < RuleLevel::OrgUnit);
        assert!(RuleLevel::OrgUnit < RuleLevel::Global);
    }

    #[test]
    fn test_sign_convention() {
        let amount = Decimal::from_str("100.00").unwrap();
        assert_eq!(RuleType::Accrual.signed(amount), amount);
        assert_eq!(RuleType::Benefit.signed(amount), amount);
        assert_eq!(RuleType::Tax.signed(amount), -amount);
        assert_eq!(RuleType::Deduction.signed(amount), -amount);
    }

    #[test]
    fn test_rule_deserializes_with_defaults() {
        let yaml = r#"
id: 10
scope: global
code: PIT
name: Personal income tax
rule_type: tax
formula: "base_salary * 0.18"
valid_from: "2024-01-01T00:00:00Z"
"#;
        let rule: CalculationRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.scope, RuleScope::Global);
        assert_eq!(rule.version, 1);
        assert_eq!(rule.priority, 0);
        assert_eq!(rule.combination_mode, CombinationMode::Cumulative);
        assert!(rule.exclusion_groups.is_empty());
        assert!(rule.is_active);
    }
}
