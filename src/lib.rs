//! Payroll Rule Resolution and Accrual Engine
//!
//! This crate resolves hierarchical calculation rules (position, group,
//! organizational unit, global) at a point in time, evaluates their formulas
//! against an employee's salary, and persists the results of a period run as
//! an accrual document.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
