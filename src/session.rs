//! Session contexts and the sandbox stack
//!
//! A [`SessionContext`] is everything a command needs to know about where
//! it runs: the home directory, its configuration, the remote appliances,
//! the history log and the user's aliases. The shell keeps a
//! [`SessionStack`]; `shell -Z` pushes a context rooted in a private copy
//! of the home directory and `exit` pops it, deleting the copy.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::aliases::AliasTable;
use crate::config::loader::ConfigLoader;
use crate::config::prompt::PromptVars;
use crate::config::remotes::{RemoteStore, APPLIANCES_FILE, CREDENTIALS_FILE};
use crate::config::{Config, PROFILE_FILE, RC_FILE};
use crate::error::{Error, Result};
use crate::history::HistoryLog;

/// Files copied into a sandbox that is not clean
const SANDBOX_FILES: [&str; 5] = [
    "config.toml",
    "config.json",
    APPLIANCES_FILE,
    CREDENTIALS_FILE,
    PROFILE_FILE,
];

/// Marker for a context rooted in a temporary directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    pub dir: PathBuf,
    /// Started without copying the parent's files
    pub clean: bool,
}

impl Sandbox {
    /// Short name shown in prompts, e.g. `shell-1a2b3c4d`
    pub fn label(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// State for one shell session rooted at a home directory
#[derive(Debug)]
pub struct SessionContext {
    pub home: PathBuf,
    pub config: Config,
    pub remotes: RemoteStore,
    pub history: HistoryLog,
    pub aliases: AliasTable,
    /// Skip TLS verification for every remote (`insecure`, `-I`)
    pub insecure: bool,
    pub sandbox: Option<Sandbox>,
}

impl SessionContext {
    /// Build a context from the files under `home`
    pub fn load(home: &Path) -> Result<Self> {
        let mut context = Self {
            home: home.to_path_buf(),
            config: Config::default(),
            remotes: RemoteStore::empty(home),
            history: HistoryLog::open(home.join(&Config::default().shell.history_file)),
            aliases: AliasTable::new(),
            insecure: false,
            sandbox: None,
        };
        context.reinitialize()?;
        Ok(context)
    }

    /// Re-read configuration, remotes and history from disk.
    ///
    /// Aliases are not touched; they come from replaying the profile.
    pub fn reinitialize(&mut self) -> Result<()> {
        fs::create_dir_all(&self.home)?;

        self.config = ConfigLoader::new(&self.home).load_or_default();

        self.remotes = match RemoteStore::load(&self.home) {
            Ok(store) => store,
            Err(e) => {
                warn!("{}. Starting without remotes", e);
                RemoteStore::empty(&self.home)
            }
        };

        self.history = HistoryLog::load(self.home.join(&self.config.shell.history_file))?;

        debug!(
            "Session at {} loaded: {} remotes, {} history entries",
            self.home.display(),
            self.remotes.list().count(),
            self.history.len()
        );
        Ok(())
    }

    pub fn profile_path(&self) -> PathBuf {
        self.home.join(PROFILE_FILE)
    }

    pub fn rc_path(&self) -> PathBuf {
        self.home.join(RC_FILE)
    }

    /// Username on the active remote
    pub fn username(&self) -> Option<String> {
        self.remotes.active().and_then(|remote| remote.entry.username)
    }

    /// `user@appliance` label written into history lines
    pub fn context_label(&self) -> String {
        match self.remotes.active() {
            Some(remote) => format!(
                "{}@{}",
                remote.entry.username.as_deref().unwrap_or("anonymous"),
                remote.name
            ),
            None => "anonymous@none".to_string(),
        }
    }

    /// Values for prompt placeholders
    pub fn prompt_vars(&self) -> PromptVars {
        let cwd = std::env::current_dir().unwrap_or_else(|_| self.home.clone());
        let mut vars = PromptVars::with_host(&cwd);

        let active = self.remotes.active();
        vars.set(
            "REMOTE",
            active.as_ref().map(|r| r.name.clone()).unwrap_or_default(),
        );
        vars.set(
            "REMOTE_URL",
            active.as_ref().map(|r| r.entry.url.clone()).unwrap_or_default(),
        );
        vars.set("USERNAME", self.username().unwrap_or_default());
        vars.set(
            "SANDBOX",
            self.sandbox.as_ref().map(Sandbox::label).unwrap_or_default(),
        );
        vars.set("MORPHEUS_HOME", self.home.display().to_string());
        vars
    }
}

/// Stack of session contexts; the bottom entry is the real home
#[derive(Debug)]
pub struct SessionStack {
    stack: Vec<SessionContext>,
}

impl SessionStack {
    pub fn new(root: SessionContext) -> Self {
        Self { stack: vec![root] }
    }

    pub fn current(&self) -> &SessionContext {
        // The stack always holds the root context
        &self.stack[self.stack.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut SessionContext {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Create a sandbox under the current home and make it current
    pub fn push_sandbox(&mut self, clean: bool) -> Result<&mut SessionContext> {
        let parent = self.current();
        let id = Uuid::new_v4().simple().to_string();
        let dir = parent
            .home
            .join("tmp")
            .join(format!("shell-{}", &id[..8]));

        fs::create_dir_all(&dir)
            .map_err(|e| Error::Sandbox(format!("cannot create {}: {}", dir.display(), e)))?;

        let context = match Self::populate_sandbox(parent, &dir, clean) {
            Ok(context) => context,
            Err(e) => {
                if let Err(cleanup) = remove_sandbox_dir(&dir) {
                    warn!("{}", cleanup);
                }
                return Err(e);
            }
        };

        info!(
            "Entered {} sandbox {}",
            if clean { "clean" } else { "temporary" },
            dir.display()
        );
        self.stack.push(context);
        Ok(self.current_mut())
    }

    /// Leave the current sandbox and delete its directory.
    ///
    /// Returns `None` at the root, which is never popped.
    pub fn pop(&mut self) -> Result<Option<SessionContext>> {
        if self.stack.len() == 1 {
            return Ok(None);
        }
        let context = self.stack.pop();
        if let Some(sandbox) = context.as_ref().and_then(|c| c.sandbox.as_ref()) {
            remove_sandbox_dir(&sandbox.dir)?;
            info!("Removed sandbox {}", sandbox.dir.display());
        }
        Ok(context)
    }

    /// Copy the parent's files into `dir` and load a context rooted there
    fn populate_sandbox(parent: &SessionContext, dir: &Path, clean: bool) -> Result<SessionContext> {
        if !clean {
            let mut files: Vec<&str> = SANDBOX_FILES.to_vec();
            files.push(&parent.config.shell.history_file);
            for name in files {
                let source = parent.home.join(name);
                let target = dir.join(name);
                if source.is_file() && source != target {
                    fs::copy(&source, &target).map_err(|e| {
                        Error::Sandbox(format!("cannot copy {}: {}", source.display(), e))
                    })?;
                }
            }
        }

        let mut context = SessionContext::load(dir)?;
        context.insecure = parent.insecure;
        context.sandbox = Some(Sandbox {
            dir: dir.to_path_buf(),
            clean,
        });
        Ok(context)
    }
}

/// Delete a sandbox directory, and its `tmp` parent once that is empty
fn remove_sandbox_dir(dir: &Path) -> Result<()> {
    fs::remove_dir_all(dir)
        .map_err(|e| Error::Sandbox(format!("cannot remove {}: {}", dir.display(), e)))?;

    if let Some(tmp) = dir.parent() {
        let empty = fs::read_dir(tmp)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if empty {
            if let Err(e) = fs::remove_dir(tmp) {
                debug!("Keeping {}: {}", tmp.display(), e);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::remotes::RemoteEntry;
    use tempfile::TempDir;

    fn home_with_remote(dir: &TempDir) -> SessionContext {
        let mut session = SessionContext::load(dir.path()).unwrap();
        session
            .remotes
            .add(
                "prod",
                RemoteEntry {
                    url: "https://prod.test".into(),
                    username: Some("admin".into()),
                    insecure: false,
                },
                Some("token".into()),
            )
            .unwrap();
        session.remotes.set_active("prod").unwrap();
        session.remotes.save().unwrap();
        session
    }

    #[test]
    fn test_context_label() {
        let temp_dir = TempDir::new().unwrap();
        let session = SessionContext::load(temp_dir.path()).unwrap();
        assert_eq!(session.context_label(), "anonymous@none");

        let session = home_with_remote(&temp_dir);
        assert_eq!(session.context_label(), "admin@prod");
        let vars = session.prompt_vars();
        assert_eq!(vars.get("REMOTE"), Some("prod"));
        assert_eq!(vars.get("REMOTE_URL"), Some("https://prod.test"));
        assert_eq!(vars.get("SANDBOX"), Some(""));
    }

    #[test]
    fn test_sandbox_copies_files() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = home_with_remote(&temp_dir);
        session.history.record("whoami", "admin@prod").unwrap();

        let mut stack = SessionStack::new(session);
        let sandbox = stack.push_sandbox(false).unwrap();
        assert!(sandbox.home.starts_with(temp_dir.path().join("tmp")));
        assert_eq!(sandbox.context_label(), "admin@prod");
        assert_eq!(sandbox.history.len(), 1);
        assert_eq!(stack.depth(), 2);

        let dir = stack.current().home.clone();
        stack.pop().unwrap();
        assert!(!dir.exists());
        assert!(!temp_dir.path().join("tmp").exists());
        assert_eq!(stack.depth(), 1);
        assert!(stack.pop().unwrap().is_none());
    }

    #[test]
    fn test_clean_sandbox_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let session = home_with_remote(&temp_dir);
        let mut stack = SessionStack::new(session);

        let sandbox = stack.push_sandbox(true).unwrap();
        assert!(sandbox.remotes.is_empty());
        assert!(sandbox.history.is_empty());
        assert_eq!(sandbox.context_label(), "anonymous@none");
        assert!(sandbox.sandbox.as_ref().unwrap().clean);
    }

    #[test]
    fn test_nested_pop_keeps_outer_sandbox() {
        let temp_dir = TempDir::new().unwrap();
        let mut stack = SessionStack::new(home_with_remote(&temp_dir));

        stack.push_sandbox(false).unwrap();
        let outer = stack.current().home.clone();
        stack.push_sandbox(false).unwrap();
        assert!(outer.join("tmp").is_dir());

        stack.pop().unwrap();
        assert!(outer.is_dir());
        assert!(!outer.join("tmp").exists());
        assert!(temp_dir.path().join("tmp").is_dir());

        stack.pop().unwrap();
        assert!(!temp_dir.path().join("tmp").exists());
    }
}
