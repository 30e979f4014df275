//! Command registry
//!
//! The registry is built once at startup and maps command names and
//! aliases to their [`Handler`]. The shell and the process entry point
//! both dispatch through it.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::commands::CommandContext;
use crate::error::{Error, Result};

/// One subcommand of a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subcommand {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
}

impl Subcommand {
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            aliases: &[],
            description,
        }
    }

    pub const fn with_aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    fn matches(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

/// A top-level command
#[async_trait(?Send)]
pub trait Handler {
    fn name(&self) -> &'static str;

    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn description(&self) -> &'static str;

    /// Subcommands, in the order they are listed in usage text.
    /// Empty for commands that take their arguments directly.
    fn subcommands(&self) -> &'static [Subcommand] {
        &[]
    }

    /// Run the command. `subcommand` is the canonical subcommand name
    /// when the handler has subcommands; `args` are the remaining words.
    async fn handle(
        &self,
        ctx: &mut CommandContext<'_>,
        subcommand: Option<&str>,
        args: &[String],
    ) -> Result<i32>;

    /// Look up a subcommand by name or alias
    fn find_subcommand(&self, name: &str) -> Option<&'static Subcommand> {
        self.subcommands().iter().find(|sub| sub.matches(name))
    }

    /// Usage text listing the subcommands
    fn usage(&self) -> String {
        let mut usage = format!("Usage: morpheus {}", self.name());
        if self.subcommands().is_empty() {
            usage.push_str(" [options]\n");
            usage.push_str(&format!("\n{}\n", self.description()));
            return usage;
        }

        usage.push_str(" [command] [options]\n");
        usage.push_str(&format!("\n{}\n\nCommands:\n", self.description()));
        let width = self
            .subcommands()
            .iter()
            .map(|s| s.name.len())
            .max()
            .unwrap_or(0);
        for sub in self.subcommands() {
            usage.push_str(&format!(
                "    {:width$}  {}\n",
                sub.name,
                sub.description,
                width = width
            ));
        }
        usage
    }
}

/// Registered handlers, indexed by name and alias
#[derive(Default)]
pub struct CommandRegistry {
    handlers: Vec<Box<dyn Handler>>,
    index: HashMap<&'static str, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Fails if its name or any alias is taken.
    pub fn register(&mut self, handler: Box<dyn Handler>) -> Result<()> {
        let names: Vec<&'static str> = std::iter::once(handler.name())
            .chain(handler.aliases().iter().copied())
            .collect();

        for (i, name) in names.iter().enumerate() {
            if self.index.contains_key(name) || names[..i].contains(name) {
                return Err(Error::DuplicateCommand(name.to_string()));
            }
        }

        let slot = self.handlers.len();
        for name in names {
            self.index.insert(name, slot);
        }
        trace!("Registered command '{}'", handler.name());
        self.handlers.push(handler);
        Ok(())
    }

    /// Exact lookup by name or alias
    pub fn resolve(&self, name: &str) -> Option<&dyn Handler> {
        self.index
            .get(name)
            .map(|&slot| self.handlers[slot].as_ref())
    }

    /// Every command name followed by its `"command subcommand"` strings,
    /// in registration order
    pub fn list_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for handler in &self.handlers {
            names.push(handler.name().to_string());
            for sub in handler.subcommands() {
                names.push(format!("{} {}", handler.name(), sub.name));
            }
        }
        names
    }

    /// Command names in registration order
    pub fn command_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// `(alias, command)` pairs
    pub fn aliases(&self) -> Vec<(&'static str, &'static str)> {
        self.handlers
            .iter()
            .flat_map(|h| h.aliases().iter().map(move |a| (*a, h.name())))
            .collect()
    }

    pub fn handlers(&self) -> impl Iterator<Item = &dyn Handler> {
        self.handlers.iter().map(|h| h.as_ref())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
