//! Error types and Result aliases for the Morpheus CLI

use std::path::PathBuf;

use thiserror::Error as ThisError;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Exit code for a confirmation the user declined
pub const EXIT_ABORTED: i32 = 9;

/// Exit code for a command interrupted with Ctrl-C
pub const EXIT_INTERRUPTED: i32 = 130;

/// Main error type for the Morpheus CLI
#[derive(Debug, ThisError)]
pub enum Error {
    // === User input errors ===
    /// Bad flags or argument counts; carries the usage text
    #[error("{0}")]
    Usage(String),

    /// `-h/--help` was requested; carries the rendered help
    #[error("{0}")]
    HelpRequested(String),

    /// No handler is registered under this name
    #[error("'{0}' is not a recognized command")]
    UnknownCommand(String),

    /// Shell-word tokenization failed (e.g. unterminated quote)
    #[error("Failed to parse input: {0}")]
    Parse(String),

    /// `!N` referenced an entry that is not in the history log
    #[error("Command not found in history: {0}")]
    HistoryEntryNotFound(String),

    /// User alias lookup failed
    #[error("Alias '{0}' not found")]
    AliasNotFound(String),

    /// The user declined a confirmation prompt
    #[error("Aborted by user")]
    Aborted,

    // === Registry errors ===
    /// A command name or alias was registered twice
    #[error("Command '{0}' is already registered")]
    DuplicateCommand(String),

    // === Remote API errors ===
    /// The appliance answered with a non-2xx status
    #[error("{status}: {message}")]
    Api { status: u16, message: String },

    /// A lookup by id or name came back empty
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// No remote was selected and none was passed with `--remote`
    #[error("No remote appliance is active. Use `remote add` or `remote use` first")]
    NoActiveRemote,

    /// Named remote is not configured
    #[error("Remote appliance '{0}' not found")]
    RemoteNotFound(String),

    /// Named remote already exists
    #[error("Remote appliance '{0}' already exists")]
    RemoteExists(String),

    // === Shell control ===
    /// Ctrl-C while a command was running
    #[error("Command aborted")]
    Interrupted,

    /// A command asked the process to exit
    #[error("{}", message.as_deref().unwrap_or("exit requested"))]
    Exit { code: i32, message: Option<String> },

    // === Local errors ===
    /// History log file has not been created yet
    #[error("History file does not exist: {}", .0.display())]
    HistoryFileMissing(PathBuf),

    /// History numbers must strictly increase
    #[error("History entry {number} is not newer than {last}")]
    HistoryOutOfOrder { number: u64, last: u64 },

    /// Temporary session directory could not be created or removed
    #[error("Sandbox error: {0}")]
    Sandbox(String),

    /// Failed to load configuration file
    #[error("Failed to load config from '{}': {reason}", path.display())]
    ConfigLoadFailed { path: PathBuf, reason: String },

    /// Configuration validation failed
    #[error("Configuration validation failed for '{field}': {reason}")]
    ConfigValidationFailed { field: String, reason: String },

    /// Could not determine where session files live
    #[error("Could not find home directory")]
    HomeDirectoryNotFound,

    // === I/O and serialization errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Regex compilation error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Line editor error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    // === Generic fallback (use sparingly) ===
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Process exit code this error maps to
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::HelpRequested(_) => 0,
            Error::Aborted => EXIT_ABORTED,
            Error::Interrupted => EXIT_INTERRUPTED,
            Error::Exit { code, .. } => *code,
            _ => 1,
        }
    }

    /// Whether the message should be printed as usage text rather than an alert
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_) | Error::HelpRequested(_))
    }

    /// Build the "not found" variant for a resource label
    pub fn not_found(resource: impl Into<String>) -> Self {
        Error::NotFound {
            resource: resource.into(),
        }
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
