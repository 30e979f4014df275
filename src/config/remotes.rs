//! Remote appliance list and stored credentials
//!
//! `appliances.toml` holds the configured remotes and which one is active;
//! `credentials.toml` holds their access tokens. Both are written with
//! owner-only permissions.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Remote appliance list file, relative to the home directory
pub const APPLIANCES_FILE: &str = "appliances.toml";

/// Access token file, relative to the home directory
pub const CREDENTIALS_FILE: &str = "credentials.toml";

/// One configured appliance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Skip TLS certificate verification for this appliance
    #[serde(default)]
    pub insecure: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Appliances {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active: Option<String>,
    #[serde(default)]
    remotes: BTreeMap<String, RemoteEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    tokens: BTreeMap<String, String>,
}

/// The active remote, resolved from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRemote {
    pub name: String,
    pub entry: RemoteEntry,
}

/// Remote appliances and their tokens for one home directory
#[derive(Debug)]
pub struct RemoteStore {
    home: PathBuf,
    appliances: Appliances,
    tokens: BTreeMap<String, Zeroizing<String>>,
}

impl RemoteStore {
    /// Load remotes from `home`. Missing files mean no remotes.
    pub fn load(home: &Path) -> Result<Self> {
        let appliances = read_toml::<Appliances>(&home.join(APPLIANCES_FILE))?.unwrap_or_default();
        let credentials =
            read_toml::<CredentialsFile>(&home.join(CREDENTIALS_FILE))?.unwrap_or_default();

        let tokens = credentials
            .tokens
            .into_iter()
            .map(|(name, token)| (name, Zeroizing::new(token)))
            .collect();

        Ok(Self {
            home: home.to_path_buf(),
            appliances,
            tokens,
        })
    }

    /// An empty store rooted at `home`
    pub fn empty(home: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
            appliances: Appliances::default(),
            tokens: BTreeMap::new(),
        }
    }

    /// Write both files back to the home directory
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.home)?;
        write_private(
            &self.home.join(APPLIANCES_FILE),
            &toml::to_string_pretty(&self.appliances)?,
        )?;

        let credentials = CredentialsFile {
            tokens: self
                .tokens
                .iter()
                .map(|(name, token)| (name.clone(), token.as_str().to_string()))
                .collect(),
        };
        let content = Zeroizing::new(toml::to_string_pretty(&credentials)?);
        write_private(&self.home.join(CREDENTIALS_FILE), &content)?;
        Ok(())
    }

    /// Configured remotes, ordered by name
    pub fn list(&self) -> impl Iterator<Item = (&str, &RemoteEntry)> {
        self.appliances
            .remotes
            .iter()
            .map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn get(&self, name: &str) -> Option<&RemoteEntry> {
        self.appliances.remotes.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.appliances.remotes.is_empty()
    }

    /// Add a remote, failing if the name is taken
    pub fn add(&mut self, name: &str, entry: RemoteEntry, token: Option<String>) -> Result<()> {
        if self.appliances.remotes.contains_key(name) {
            return Err(Error::RemoteExists(name.to_string()));
        }
        self.appliances.remotes.insert(name.to_string(), entry);
        if let Some(token) = token {
            self.tokens.insert(name.to_string(), Zeroizing::new(token));
        }
        Ok(())
    }

    /// Remove a remote and its token. Clears the active marker if needed.
    pub fn remove(&mut self, name: &str) -> Result<RemoteEntry> {
        let entry = self
            .appliances
            .remotes
            .remove(name)
            .ok_or_else(|| Error::RemoteNotFound(name.to_string()))?;
        self.tokens.remove(name);
        if self.appliances.active.as_deref() == Some(name) {
            self.appliances.active = None;
        }
        Ok(entry)
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        if !self.appliances.remotes.contains_key(name) {
            return Err(Error::RemoteNotFound(name.to_string()));
        }
        self.appliances.active = Some(name.to_string());
        Ok(())
    }

    pub fn clear_active(&mut self) -> Option<String> {
        self.appliances.active.take()
    }

    pub fn active_name(&self) -> Option<&str> {
        self.appliances.active.as_deref()
    }

    /// The active remote, if it is still configured
    pub fn active(&self) -> Option<ActiveRemote> {
        let name = self.appliances.active.as_deref()?;
        self.resolve(name)
    }

    /// Look up a remote by name
    pub fn resolve(&self, name: &str) -> Option<ActiveRemote> {
        self.appliances.remotes.get(name).map(|entry| ActiveRemote {
            name: name.to_string(),
            entry: entry.clone(),
        })
    }

    pub fn token(&self, name: &str) -> Option<&str> {
        self.tokens.get(name).map(|t| t.as_str())
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    toml::from_str(&content)
        .map(Some)
        .map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Write `content` to `path`, truncating, with mode 0600 on Unix
pub(crate) fn write_private(path: &Path, content: &str) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
