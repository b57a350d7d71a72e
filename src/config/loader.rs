//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading engine
//! settings and payroll data from YAML files.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::store::{PayrollData, PayrollDataset, PayrollRepository};

use super::types::{EngineSettings, OrganizationConfig, PeriodsConfig, RulesConfig, TemplatesConfig};

/// Loads and provides access to engine settings and payroll data.
///
/// # Directory Structure
///
/// ```text
/// config/payroll/
/// ├── engine.yaml        # Server, logging, formula limits, preview rule codes
/// ├── organization.yaml  # Units, groups, employees, positions, contracts, memberships
/// ├── rules.yaml         # Calculation rules
/// ├── templates.yaml     # Calculation templates
/// └── periods.yaml       # Calculation periods
/// ```
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::ConfigLoader;
/// use payroll_engine::store::PayrollRepository;
///
/// let loader = ConfigLoader::load("./config/payroll")?;
/// println!("Employees: {}", loader.data().employees().len());
/// # Ok::<(), payroll_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    settings: EngineSettings,
    data: PayrollData,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Returns an error if any file is missing (`ConfigNotFound`), contains
    /// invalid YAML (`ConfigParseError`), or holds data that violates an
    /// entity invariant (`InvalidData`).
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let settings = Self::load_yaml::<EngineSettings>(&path.join("engine.yaml"))?;
        let organization = Self::load_yaml::<OrganizationConfig>(&path.join("organization.yaml"))?;
        let rules = Self::load_yaml::<RulesConfig>(&path.join("rules.yaml"))?;
        let templates = Self::load_yaml::<TemplatesConfig>(&path.join("templates.yaml"))?;
        let periods = Self::load_yaml::<PeriodsConfig>(&path.join("periods.yaml"))?;

        let data = PayrollData::new(PayrollDataset {
            org_units: organization.org_units,
            groups: organization.groups,
            employees: organization.employees,
            positions: organization.positions,
            contracts: organization.contracts,
            memberships: organization.memberships,
            rules: rules.rules,
            templates: templates.templates,
            periods: periods.periods,
        })?;

        info!(
            path = %path.display(),
            employees = data.employees().len(),
            "Loaded payroll configuration"
        );

        Ok(Self { settings, data })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Returns the loaded payroll data.
    pub fn data(&self) -> &PayrollData {
        &self.data
    }

    /// Splits the loader into its settings and data.
    pub fn into_parts(self) -> (EngineSettings, PayrollData) {
        (self.settings, self.data)
    }
}
