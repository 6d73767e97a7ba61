//! Scripted interoperability driver for a terminal chat client
//!
//! Steers one chat TUI session through a remote-control automation
//! transport: keys in, screen snapshots out. A scenario connects the client,
//! publishes its key material, joins a group with a peer, exchanges a
//! message and reports the outcome.

pub mod cli;
pub mod commands;
pub mod common;
pub mod driver;
pub mod report;
pub mod scenario;
pub mod transport;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use driver::{Driver, DriverTiming, PublicKey};
pub use scenario::{Outcome, ScenarioPlan, ScenarioReport, ScenarioRunner, ScenarioState};
pub use transport::{Key, SessionId, Transport};
