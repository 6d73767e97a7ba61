//! CLI command handling
//!
//! Builds the transport and driver for a command and formats output.

use std::sync::Arc;

use colored::Colorize;

use crate::commands::{Commands, SessionArgs};
use crate::common::config::Config;
use crate::common::{logging, paths, Error, Result};
use crate::driver::{Driver, DriverTiming};
use crate::report::{ConsoleReporter, JsonReporter, Reporter};
use crate::scenario::{Outcome, ScenarioPlan, ScenarioReport, ScenarioRunner};
use crate::transport::{
    CommandTransport, Key, MockScript, MockTransport, SessionId, Transport,
};

/// Session id used for `--mock` runs when none is given
const MOCK_SESSION: &str = "mock";

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            target,
            scenario,
            relay,
            json,
            verbose,
            keep_session,
        } => {
            let config = Config::load()?;

            let mut plan = match scenario.or_else(|| config.defaults.scenario.clone()) {
                Some(path) => ScenarioPlan::load(&path)?,
                None => ScenarioPlan::default(),
            };
            if relay.is_some() {
                plan.relay = relay;
            } else if plan.relay.is_none() {
                plan.relay = config.defaults.relay.clone();
            }
            if keep_session {
                plan.close_session = false;
            }

            let driver = build_driver(&target, &config, plan.timing.clone())?;
            let reporter: Arc<dyn Reporter> = if json {
                Arc::new(JsonReporter)
            } else {
                Arc::new(ConsoleReporter::new(verbose))
            };

            let report = ScenarioRunner::new(driver, plan, reporter).run().await?;
            if json {
                println!("{}", serde_json::to_string(&report)?);
            } else {
                print_report(&report);
            }

            match report.outcome {
                Outcome::Succeeded => Ok(()),
                Outcome::Failed { reason } => Err(Error::ScenarioFailed(reason.to_string())),
            }
        }

        Commands::Pubkey { target } => {
            let config = Config::load()?;
            let mut driver = build_driver(&target, &config, DriverTiming::default())?;

            let key = driver.get_public_key().await?;
            println!("{}", key);
            Ok(())
        }

        Commands::Invites { target } => {
            let config = Config::load()?;
            let driver = build_driver(&target, &config, DriverTiming::default())?;

            if driver.has_pending_invite().await? {
                println!("{} Pending invite", "✓".green());
            } else {
                println!("No pending invites");
            }
            Ok(())
        }

        Commands::Snapshot { target } => {
            let config = Config::load()?;
            let driver = build_driver(&target, &config, DriverTiming::default())?;

            print!("{}", driver.snapshot().await?);
            Ok(())
        }

        Commands::Send { target, text } => {
            let config = Config::load()?;
            let driver = build_driver(&target, &config, DriverTiming::default())?;

            driver.send_message(&text).await?;
            println!("Sent: {}", text);
            Ok(())
        }

        Commands::Keys { target, keys } => {
            let config = Config::load()?;
            let driver = build_driver(&target, &config, DriverTiming::default())?;

            let keys: Vec<Key> = keys.iter().map(|k| Key::parse(k)).collect();
            driver.send_keys(&keys).await?;
            println!("Sent {} key(s)", keys.len());
            Ok(())
        }

        Commands::Close { target } => {
            let config = Config::load()?;
            let driver = build_driver(&target, &config, DriverTiming::default())?;

            driver.close().await?;
            println!("Session {} closed", driver.session().id());
            Ok(())
        }

        Commands::Validate { path } => {
            let plan = ScenarioPlan::load(&path)?;

            println!(
                "{} {} ({})",
                "✓".green(),
                plan.name.white().bold(),
                plan.role.name()
            );
            if let Some(description) = &plan.description {
                println!("  {}", description.dimmed());
            }
            println!();
            print!("{}", serde_yaml::to_string(&plan)?);
            Ok(())
        }

        Commands::Logs { lines, clear } => {
            if clear {
                logging::truncate_log()?;
                println!("Log file cleared");
                return Ok(());
            }

            let Some(path) = paths::log_path() else {
                println!("No log directory available on this platform");
                return Ok(());
            };
            if !path.exists() {
                println!("No log file at {}", path.display());
                println!("Run with --log-file to write one.");
                return Ok(());
            }

            let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;
            let all: Vec<&str> = content.lines().collect();
            for line in &all[all.len().saturating_sub(lines)..] {
                println!("{}", line);
            }
            Ok(())
        }
    }
}

/// Build a driver for the session selected on the command line
fn build_driver(target: &SessionArgs, config: &Config, timing: DriverTiming) -> Result<Driver> {
    let session = resolve_session(target, config)?;
    let transport: Arc<dyn Transport> = if target.mock {
        Arc::new(MockTransport::new(MockScript::default()))
    } else {
        Arc::new(CommandTransport::from_config(config)?)
    };
    Ok(Driver::new(transport, session, timing))
}

/// Session id from `--session`, then config, then the mock default
fn resolve_session(target: &SessionArgs, config: &Config) -> Result<SessionId> {
    match (&target.session, &config.defaults.session) {
        (Some(id), _) | (None, Some(id)) => Ok(SessionId::new(id.as_str())),
        (None, None) if target.mock => Ok(SessionId::new(MOCK_SESSION)),
        (None, None) => Err(Error::SessionMissing),
    }
}

fn print_report(report: &ScenarioReport) {
    println!("Session:       {}", report.session);
    if let Some(key) = &report.public_key {
        println!("Public key:    {}", key);
    }
    println!("Invite checks: {}", report.invite_checks);
    println!("Reply checks:  {}", report.reply_checks);
    println!("Final state:   {}", report.final_state);
    println!(
        "Elapsed:       {:.1}s",
        report.elapsed_ms as f64 / 1000.0
    );
}
