//! Transport backed by an external automation CLI
//!
//! Each operation spawns the configured program once, e.g.
//! `ht-mcp send-keys <session> Enter` or `ht-mcp take-snapshot <session>`.

use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;

use crate::common::config::{Config, TransportConfig};
use crate::common::{Error, Result};

use super::{Key, SessionId, Transport};

/// Runs the automation tool as a subprocess per operation
#[derive(Debug, Clone)]
pub struct CommandTransport {
    program: PathBuf,
    settings: TransportConfig,
}

impl CommandTransport {
    pub fn new(program: PathBuf, settings: TransportConfig) -> Self {
        Self { program, settings }
    }

    /// Build from configuration, locating the program on PATH
    pub fn from_config(config: &Config) -> Result<Self> {
        let program = config.transport_program()?;
        Ok(Self::new(program, config.transport.clone()))
    }

    async fn invoke(&self, op: &str, subcommand: &str, args: &[&str]) -> Result<Output> {
        tracing::trace!(program = %self.program.display(), subcommand, ?args, "Invoking transport");

        let output = TokioCommand::new(&self.program)
            .args(&self.settings.args)
            .arg(subcommand)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                Error::transport(op, format!("failed to run {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            return Err(Error::transport(
                op,
                format!(
                    "exit code {:?}: {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        Ok(output)
    }
}

#[async_trait]
impl Transport for CommandTransport {
    async fn send_keys(&self, session: &SessionId, keys: &[Key]) -> Result<()> {
        let delay = Duration::from_millis(self.settings.key_delay_ms);

        for (i, key) in keys.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.invoke(
                "send-keys",
                &self.settings.send_keys_command,
                &[session.as_str(), key.as_wire()],
            )
            .await?;
        }

        Ok(())
    }

    async fn snapshot(&self, session: &SessionId) -> Result<String> {
        let output = self
            .invoke("snapshot", &self.settings.snapshot_command, &[session.as_str()])
            .await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn close(&self, session: &SessionId) -> Result<()> {
        self.invoke("close", &self.settings.close_command, &[session.as_str()])
            .await?;
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn transport_for(program: &str, args: &[&str]) -> CommandTransport {
        let settings = TransportConfig {
            args: args.iter().map(|s| s.to_string()).collect(),
            key_delay_ms: 0,
            ..TransportConfig::default()
        };
        CommandTransport::new(PathBuf::from(program), settings)
    }

    #[tokio::test]
    async fn test_snapshot_returns_stdout() {
        // `sh -c 'echo ...' <subcommand> <session>` ignores the trailing arguments
        let transport = transport_for("/bin/sh", &["-c", "echo 'Hex: screen'"]);
        let text = transport.snapshot(&SessionId::new("s1")).await.unwrap();
        assert_eq!(text.trim(), "Hex: screen");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_transport_error() {
        let transport = transport_for("/bin/sh", &["-c", "echo nope >&2; exit 3"]);
        let err = transport
            .send_keys(&SessionId::new("s1"), &[Key::Enter])
            .await
            .unwrap_err();

        match err {
            Error::Transport { op, message } => {
                assert_eq!(op, "send-keys");
                assert!(message.contains("nope"));
            }
            other => panic!("Expected Transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_transport_error() {
        let transport = transport_for("/does/not/exist/ht", &[]);
        let err = transport.close(&SessionId::new("s1")).await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
    }
}
