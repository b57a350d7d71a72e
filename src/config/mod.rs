//! Configuration loading and management for the payroll engine.
//!
//! This module loads engine settings and the payroll dataset (organization,
//! rules, templates, periods) from YAML files and validates the dataset
//! before it is handed to the engine.
//!
//! # Example
//!
//! ```no_run
//! use payroll_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/payroll").unwrap();
//! println!("Listening on {}", config.settings().server.bind_addr);
//! ```

mod loader;
mod types;
mod validation;

pub use loader::ConfigLoader;
pub use types::{
    EngineSettings, LogFormat, LoggingSettings, OrganizationConfig, PeriodsConfig,
    PreviewSettings, RulesConfig, ServerSettings, TemplatesConfig,
};
pub use validation::{PATH_SEPARATOR, validate_dataset};
