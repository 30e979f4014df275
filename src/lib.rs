//! morpheus-cli - command-line client and interactive shell for the
//! Morpheus appliance REST API
//!
//! ## Module Organization
//!
//! ### Commands
//!
//! - [`registry`] - The [`Handler`] trait and the command registry
//! - [`commands`] - Built-in command handlers
//! - [`dispatch`] - Runs one tokenized line against the registry
//! - [`options`] - Shared flag groups and payload maps
//!
//! ### Remote API
//!
//! - [`api`] - HTTP client, dry runs and per-resource interfaces
//! - [`render`] - Table, JSON, YAML and CSV output
//!
//! ### Shell
//!
//! - [`shell`] - Read-eval-print loop, completion and line input
//! - [`session`] - Session contexts and the sandbox stack
//! - [`history`] - Numbered command history log
//! - [`aliases`] - User command aliases
//!
//! ### Utilities
//!
//! - [`config`] - Configuration files, remotes and prompt templates
//! - [`logging`] - `tracing` subscriber with a reloadable level
//! - [`ansi`] - ANSI color helpers
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use morpheus_cli::{dispatch, CommandRegistry, SessionContext};
//!
//! # fn main() -> morpheus_cli::Result<()> {
//! let home = morpheus_cli::config::morpheus_home()?;
//! let session = SessionContext::load(&home)?;
//! let registry = CommandRegistry::standard();
//! let tokens = dispatch::split_line("certificates list --max 5")?;
//! # let _ = (session, registry, tokens);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Everything runs on one thread: the shell reads a line, dispatches it on
//! a current-thread tokio runtime and renders the result before prompting
//! again. Ctrl-C is raced against the running command, so it aborts the
//! command and never the shell.

#![allow(unexpected_cfgs)]

#[macro_use]
extern crate tracing;

pub mod aliases;
pub mod ansi;
pub mod api;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod logging;
pub mod options;
pub mod registry;
pub mod render;
pub mod session;
pub mod shell;

// Re-exports for core functionality
pub use commands::CommandContext;
pub use config::{Config, RuntimeSettings};
pub use dispatch::Outcome;
pub use error::{Error, Result};
pub use history::{HistoryEntry, HistoryLog};
pub use registry::{CommandRegistry, Handler, Subcommand};
pub use session::{SessionContext, SessionStack};
pub use shell::{Shell, ShellArgs, ShellIo};

// Version information
/// The current version of morpheus-cli from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The package name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// The package description from Cargo.toml
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
