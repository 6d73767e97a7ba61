//! Interop scenario as an explicit state machine
//!
//! A [`ScenarioPlan`] describes the role, messages and timing of one run;
//! [`ScenarioRunner`] executes it through a driver and reports each step.

mod config;
mod runner;
mod state;

pub use config::{Messages, PollPolicy, Role, ScenarioPlan};
pub use runner::{FailureReason, Outcome, ScenarioReport, ScenarioRunner};
pub use state::ScenarioState;
