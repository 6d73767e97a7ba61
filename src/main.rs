//! Interop driver CLI
//!
//! Runs the chat TUI interop scenario, or single driver operations, against
//! a remote-controlled terminal session.

use clap::Parser;
use commands::Commands;
use tui_interop::{cli, commands, common::logging};

#[derive(Parser)]
#[command(name = "tui-interop", about = "Scripted interop driver for the chat TUI")]
#[command(version, long_about = None)]
struct Cli {
    /// Also write logs to the log file (see `tui-interop logs`)
    #[arg(long, global = true)]
    log_file: bool,

    /// Debug-level logging on stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Held until exit so buffered file logs are flushed
    let guard = logging::init(cli.debug, cli.log_file);

    if let Err(e) = cli::dispatch(cli.command).await {
        tracing::debug!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        drop(guard);
        std::process::exit(1);
    }
}
