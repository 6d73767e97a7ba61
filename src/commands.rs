//! CLI command definitions
//!
//! Defines the clap commands for the interop driver CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Selects the session a command drives
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Automation session id (default: defaults.session from config.toml)
    #[arg(long, short)]
    pub session: Option<String>,

    /// Drive a simulated in-memory client instead of the automation transport
    #[arg(long)]
    pub mock: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the interop scenario against a session
    Run {
        #[command(flatten)]
        target: SessionArgs,

        /// YAML scenario plan (default: reference joiner flow)
        #[arg(long)]
        scenario: Option<PathBuf>,

        /// Relay address passed to /connect, overrides the plan
        #[arg(long)]
        relay: Option<String>,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,

        /// Show state changes and every poll attempt
        #[arg(long, short)]
        verbose: bool,

        /// Leave the session open when the run ends
        #[arg(long)]
        keep_session: bool,
    },

    /// Print the client's public key
    #[command(alias = "pk")]
    Pubkey {
        #[command(flatten)]
        target: SessionArgs,
    },

    /// Check once for a pending invite
    Invites {
        #[command(flatten)]
        target: SessionArgs,
    },

    /// Print the current screen of the session
    Snapshot {
        #[command(flatten)]
        target: SessionArgs,
    },

    /// Send a chat message to the current group
    Send {
        #[command(flatten)]
        target: SessionArgs,

        /// Message text
        text: String,
    },

    /// Send raw keys, e.g. `keys Down Enter` or `keys "/help" Enter`
    Keys {
        #[command(flatten)]
        target: SessionArgs,

        /// Key names (Enter, Space, Tab, Escape, Up, Down, Backspace) or literal text
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Close the automation session
    Close {
        #[command(flatten)]
        target: SessionArgs,
    },

    /// Check a scenario plan and print the effective settings
    Validate {
        /// Path to the YAML scenario plan
        path: PathBuf,
    },

    /// View the log file
    Logs {
        /// Number of lines to show (default: 50)
        #[arg(long, short = 'n', default_value = "50")]
        lines: usize,

        /// Clear the log file
        #[arg(long)]
        clear: bool,
    },
}
