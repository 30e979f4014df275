//! Configuration File Loading
//!
//! Loads `config.{toml,json}` from a CLI home directory, falling back to
//! defaults when the file is missing, and saves it back as TOML.

use super::Config;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Base name of the configuration file
const CONFIG_FILE_STEM: &str = "config";

/// Configuration file loader bound to one home directory
pub struct ConfigLoader {
    /// Directory searched for the configuration file
    home: PathBuf,
    /// Supported configuration file formats, in lookup order
    supported_formats: Vec<ConfigFormat>,
    /// Path the configuration was loaded from (if any)
    current_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    fn extension(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Json => "JSON",
        }
    }
}

impl ConfigLoader {
    /// Create a loader for the given home directory
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            supported_formats: vec![ConfigFormat::Toml, ConfigFormat::Json],
            current_path: None,
        }
    }

    /// Load the configuration, using defaults when no file exists
    pub fn load(&mut self) -> Result<Config> {
        for format in self.supported_formats.clone() {
            let path = self.path_for_format(format);
            if !path.exists() {
                continue;
            }
            let config = self.load_config_file(&path, format)?;
            self.validate_config(&config)?;
            debug!("Loaded configuration from {}", path.display());
            self.current_path = Some(path);
            return Ok(config);
        }

        debug!("No configuration in {}, using defaults", self.home.display());
        Ok(Config::default())
    }

    /// Load the configuration, logging and falling back to defaults on error
    pub fn load_or_default(&mut self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                warn!("{}. Using default configuration", e);
                Config::default()
            }
        }
    }

    /// Save configuration to the current path or `config.toml`
    pub fn save(&self, config: &Config) -> Result<PathBuf> {
        let path = self
            .current_path
            .clone()
            .unwrap_or_else(|| self.path_for_format(ConfigFormat::Toml));
        self.save_to_path(config, &path)?;
        Ok(path)
    }

    /// Save configuration to a specific path, format chosen by extension
    pub fn save_to_path(&self, config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(config)?,
            _ => toml::to_string_pretty(config)?,
        };

        fs::write(path, content)?;
        Ok(())
    }

    /// Load a specific configuration file
    fn load_config_file(&self, path: &Path, format: ConfigFormat) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let parsed = match format {
            ConfigFormat::Toml => toml::from_str(&content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(&content).map_err(|e| e.to_string()),
        };

        parsed.map_err(|reason| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: format!("invalid {}: {}", format.label(), reason),
        })
    }

    fn path_for_format(&self, format: ConfigFormat) -> PathBuf {
        self.home
            .join(CONFIG_FILE_STEM)
            .with_extension(format.extension())
    }

    /// Validate configuration
    fn validate_config(&self, config: &Config) -> Result<()> {
        crate::logging::parse_level(&config.log_level).map_err(|_| {
            Error::ConfigValidationFailed {
                field: "log_level".to_string(),
                reason: format!("unknown level '{}'", config.log_level),
            }
        })?;

        if config.shell.prompt.is_empty() {
            return Err(Error::ConfigValidationFailed {
                field: "shell.prompt".to_string(),
                reason: "Prompt cannot be empty".to_string(),
            });
        }

        if config.shell.history_file.trim().is_empty() {
            return Err(Error::ConfigValidationFailed {
                field: "shell.history_file".to_string(),
                reason: "History file name cannot be empty".to_string(),
            });
        }

        // Sandboxes copy the log by name, so it must live directly in the home
        if !is_plain_file_name(&config.shell.history_file) {
            return Err(Error::ConfigValidationFailed {
                field: "shell.history_file".to_string(),
                reason: format!(
                    "'{}' must be a file name inside the home directory",
                    config.shell.history_file
                ),
            });
        }

        if config.shell.max_history == 0 {
            return Err(Error::ConfigValidationFailed {
                field: "shell.max_history".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the current configuration file path
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }
}

/// A single normal path component: no separators, no `.` or `..`
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}
