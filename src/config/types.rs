//! Configuration types for the payroll engine.
//!
//! This module contains the strongly-typed structures that the YAML
//! configuration files deserialize into: engine settings plus one file
//! structure per group of entities.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calculation::FormulaLimits;
use crate::models::{
    CalculationPeriod, CalculationRule, CalculationTemplate, Contract, Employee, Group,
    OrganizationalUnit, Position, PositionGroup,
};

/// Engine settings (`engine.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerSettings,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Bounds on formula size.
    #[serde(default)]
    pub formula: FormulaLimits,
    /// Settings for ad-hoc payroll previews.
    #[serde(default)]
    pub preview: PreviewSettings,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address to listen on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Plain,
    /// One JSON object per line.
    Json,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Settings for ad-hoc payroll previews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSettings {
    /// Rule codes evaluated by previews, in order.
    #[serde(default = "default_rule_codes")]
    pub rule_codes: Vec<String>,
    /// Date used when a preview request names none.
    #[serde(default = "default_calculation_date")]
    pub default_calculation_date: NaiveDate,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            rule_codes: default_rule_codes(),
            default_calculation_date: default_calculation_date(),
        }
    }
}

/// Organization file structure (`organization.yaml`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationConfig {
    /// Organizational units.
    #[serde(default)]
    pub org_units: Vec<OrganizationalUnit>,
    /// Classification groups.
    #[serde(default)]
    pub groups: Vec<Group>,
    /// Employees.
    #[serde(default)]
    pub employees: Vec<Employee>,
    /// Positions.
    #[serde(default)]
    pub positions: Vec<Position>,
    /// Contracts.
    #[serde(default)]
    pub contracts: Vec<Contract>,
    /// Position-group memberships.
    #[serde(default)]
    pub memberships: Vec<PositionGroup>,
}

/// Rules file structure (`rules.yaml`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesConfig {
    /// Calculation rules.
    #[serde(default)]
    pub rules: Vec<CalculationRule>,
}

/// Templates file structure (`templates.yaml`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplatesConfig {
    /// Calculation templates.
    #[serde(default)]
    pub templates: Vec<CalculationTemplate>,
}

/// Periods file structure (`periods.yaml`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeriodsConfig {
    /// Calculation periods.
    #[serde(default)]
    pub periods: Vec<CalculationPeriod>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rule_codes() -> Vec<String> {
    [
        "PIT",
        "MIL_TAX",
        "ESV",
        "IT_BONUS",
        "CLASS_BONUS",
        "YOUNG_BONUS",
        "DEPUTY_BONUS",
        "PERSONAL_BONUS",
        "SOCIAL_BENEFIT",
        "UNION_FEE",
    ]
    .iter()
    .map(|code| code.to_string())
    .collect()
}

fn default_calculation_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default()
}
