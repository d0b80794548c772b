//! Automation engine for the hausbus controller
//!
//! Provides the logic lifecycle/dispatch engine, the library of stateful
//! automation rules, and the trigger-based schedule engine with
//! restart-safe persistence.

pub mod controller;
pub mod engine;
pub mod error;
pub mod logic;
pub mod persistence;
pub mod rules;
pub mod schedule;
pub mod services;
pub mod statistics;
pub mod trigger;

#[cfg(test)]
mod testutil;

pub use controller::{Controller, ControllerBuilder};
pub use engine::LogicEngine;
pub use error::AutomationError;
pub use logic::{Logic, LogicContext};
pub use schedule::{ScheduleEngine, TaskRegistry};
pub use trigger::Trigger;
