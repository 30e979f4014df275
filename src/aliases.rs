//! User command aliases
//!
//! An alias replaces the first word of an input line with a stored command.
//! Aliases persist as `alias add NAME 'COMMAND'` lines in the profile
//! script, which is replayed when a shell starts.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Alias name to command text, plus whether changes are written back
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
    autosave: bool,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `alias add/remove` rewrite the profile
    pub fn autosave(&self) -> bool {
        self.autosave
    }

    pub fn set_autosave(&mut self, autosave: bool) {
        self.autosave = autosave;
    }

    pub fn add(&mut self, name: &str, command: &str) -> Result<()> {
        if name.is_empty() || name.contains(char::is_whitespace) || name.starts_with('!') {
            return Err(Error::Usage(format!("Invalid alias name '{}'", name)));
        }
        if command.trim().is_empty() {
            return Err(Error::Usage(format!("Alias '{}' needs a command", name)));
        }
        self.entries.insert(name.to_string(), command.trim().to_string());
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<String> {
        self.entries
            .remove(name)
            .ok_or_else(|| Error::AliasNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace a leading alias in `line`. Expansion is a single level so
    /// an alias naming itself cannot loop.
    pub fn expand_line(&self, line: &str) -> Option<String> {
        let trimmed = line.trim_start();
        let (first, rest) = match trimmed.find(char::is_whitespace) {
            Some(idx) => (&trimmed[..idx], &trimmed[idx..]),
            None => (trimmed, ""),
        };
        self.get(first)
            .map(|command| format!("{}{}", command, rest))
    }

    /// Rewrite the profile: keep its non-alias lines and append one
    /// `alias add` line per alias.
    pub fn save_profile(&self, path: &Path) -> Result<()> {
        let existing = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let mut content: String = existing
            .lines()
            .filter(|line| !line.trim_start().starts_with("alias add "))
            .map(|line| format!("{}\n", line))
            .collect();

        for (name, command) in &self.entries {
            let quoted = shlex::try_quote(command)
                .map_err(|e| Error::Other(format!("Cannot save alias '{}': {}", name, e)))?;
            content.push_str(&format!("alias add {} {}\n", name, quoted));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        debug!("Saved {} aliases to {}", self.entries.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_and_expand() {
        let mut aliases = AliasTable::new();
        aliases.add("certs", "certificates list").unwrap();

        assert_eq!(
            aliases.expand_line("certs --max 5").as_deref(),
            Some("certificates list --max 5")
        );
        assert_eq!(aliases.expand_line("certificates list"), None);
        assert_eq!(
            aliases.expand_line("certs").as_deref(),
            Some("certificates list")
        );
    }

    #[test]
    fn test_invalid_names() {
        let mut aliases = AliasTable::new();
        assert!(aliases.add("two words", "whoami").is_err());
        assert!(aliases.add("!1", "whoami").is_err());
        assert!(aliases.add("me", "  ").is_err());
        assert!(matches!(aliases.remove("me"), Err(Error::AliasNotFound(_))));
    }

    #[test]
    fn test_save_profile_keeps_other_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".morpheus_profile");
        fs::write(&path, "# my profile\nalias add old 'remote list'\ncoloring off\n").unwrap();

        let mut aliases = AliasTable::new();
        aliases.add("me", "whoami --json").unwrap();
        aliases.save_profile(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "# my profile");
        assert_eq!(lines[1], "coloring off");
        assert_eq!(
            shlex::split(lines[2]).unwrap(),
            vec!["alias", "add", "me", "whoami --json"]
        );
    }
}
