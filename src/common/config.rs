//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Automation transport settings
    #[serde(default)]
    pub transport: TransportConfig,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,
}

/// How to reach the external automation tool
#[derive(Debug, Deserialize, Clone)]
pub struct TransportConfig {
    /// Program name or path of the automation CLI
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before every subcommand
    #[serde(default)]
    pub args: Vec<String>,

    /// Subcommand used to deliver one key
    #[serde(default = "default_send_keys")]
    pub send_keys_command: String,

    /// Subcommand used to capture the screen
    #[serde(default = "default_snapshot")]
    pub snapshot_command: String,

    /// Subcommand used to end the session
    #[serde(default = "default_close")]
    pub close_command: String,

    /// Delay between individual keys
    #[serde(default = "default_key_delay")]
    pub key_delay_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            send_keys_command: default_send_keys(),
            snapshot_command: default_snapshot(),
            close_command: default_close(),
            key_delay_ms: default_key_delay(),
        }
    }
}

fn default_program() -> String {
    "ht-mcp".to_string()
}
fn default_send_keys() -> String {
    "send-keys".to_string()
}
fn default_snapshot() -> String {
    "take-snapshot".to_string()
}
fn default_close() -> String {
    "close-session".to_string()
}
fn default_key_delay() -> u64 {
    100
}

/// Default settings
#[derive(Debug, Deserialize, Default)]
pub struct Defaults {
    /// Session to drive when `--session` is not given
    pub session: Option<String>,

    /// Relay address passed to `/connect`
    pub relay: Option<String>,

    /// Scenario plan used by `run` when `--scenario` is not given
    pub scenario: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Resolve the transport program to an executable path
    ///
    /// Paths are used as given; bare names are searched on PATH
    pub fn transport_program(&self) -> Result<PathBuf> {
        let program = Path::new(&self.transport.program);
        if program.components().count() > 1 {
            return Ok(program.to_path_buf());
        }
        which::which(program).map_err(|_| Error::TransportNotFound {
            program: self.transport.program.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.transport.program, "ht-mcp");
        assert_eq!(config.transport.send_keys_command, "send-keys");
        assert_eq!(config.transport.key_delay_ms, 100);
        assert!(config.defaults.session.is_none());
    }

    #[test]
    fn test_partial_transport_section() {
        let config: Config = toml::from_str(
            r#"
            [transport]
            program = "/opt/ht/bin/ht"
            args = ["--quiet"]
            key_delay_ms = 20

            [defaults]
            session = "abc123"
            relay = "ws://localhost:8080"
            "#,
        )
        .unwrap();

        assert_eq!(config.transport.program, "/opt/ht/bin/ht");
        assert_eq!(config.transport.args, vec!["--quiet".to_string()]);
        assert_eq!(config.transport.key_delay_ms, 20);
        assert_eq!(config.transport.snapshot_command, "take-snapshot");
        assert_eq!(config.defaults.session.as_deref(), Some("abc123"));
        assert_eq!(config.defaults.relay.as_deref(), Some("ws://localhost:8080"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[transport]\nclose_command = \"kill-session\"").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.transport.close_command, "kill-session");
    }

    #[test]
    fn test_load_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[transport\nprogram = ").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_explicit_program_path_is_not_searched() {
        let config: Config = toml::from_str("[transport]\nprogram = \"/does/not/exist/ht\"").unwrap();
        assert_eq!(
            config.transport_program().unwrap(),
            PathBuf::from("/does/not/exist/ht")
        );
    }
}
