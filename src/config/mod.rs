//! Configuration management for the Morpheus CLI
//!
//! Everything the CLI persists lives under one home directory
//! (`MORPHEUS_CLI_HOME`, else `~/.morpheus`): `config.toml`, the remote
//! appliance list, credentials, shell history and the startup scripts.
//! Temporary shell sessions point this at a private sandbox copy.

pub mod loader;
pub mod prompt;
pub mod remotes;

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

use crate::error::{Error, Result};
use crate::logging;

/// Environment variable overriding the CLI home directory
pub const HOME_ENV: &str = "MORPHEUS_CLI_HOME";

/// Default home directory name under the user's home
pub const DEFAULT_HOME_DIR: &str = ".morpheus";

/// Startup script holding user aliases
pub const PROFILE_FILE: &str = ".morpheus_profile";

/// Startup script with arbitrary commands
pub const RC_FILE: &str = ".morpheusrc";

/// Default prompt template
pub const DEFAULT_PROMPT: &str = "${CYAN}morpheus${RESET}[$REMOTE]> ";

/// Resolve the CLI home directory
pub fn morpheus_home() -> Result<PathBuf> {
    if let Some(home) = env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_HOME_DIR))
        .ok_or(Error::HomeDirectoryNotFound)
}

/// Main configuration structure, stored as `config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Initial log level (`off`, `error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,

    /// Interactive shell configuration
    pub shell: ShellConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            shell: ShellConfig::default(),
        }
    }
}

/// Interactive shell configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Prompt template, see [`prompt::PromptFormatter`]
    pub prompt: String,

    /// History log file name, relative to the home directory
    pub history_file: String,

    /// Default page size for `history`
    pub max_history: usize,

    /// Use ANSI colors
    pub coloring: bool,

    /// Print elapsed time after every command
    pub benchmark: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            history_file: "shell_history".to_string(),
            max_history: 25,
            coloring: true,
            benchmark: false,
        }
    }
}

/// Settings commands may change while a shell is running.
///
/// The shell snapshots these before each command and restores them
/// afterwards unless the command owns the setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub log_level: LevelFilter,
    pub coloring: bool,
    pub benchmark: bool,
}

impl RuntimeSettings {
    /// Derive settings from a loaded configuration
    pub fn from_config(config: &Config) -> Self {
        let log_level = logging::parse_level(&config.log_level).unwrap_or(LevelFilter::WARN);
        Self {
            log_level,
            coloring: config.shell.coloring,
            benchmark: config.shell.benchmark,
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
