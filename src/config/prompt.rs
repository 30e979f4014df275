//! Prompt Formatting
//!
//! Renders the shell prompt from a template with `$VAR` or `${VAR}`
//! placeholders. Variables come from the current session (`$REMOTE`,
//! `$USERNAME`, ...) and the host (`$HOSTNAME`, `$PWD`, ...). Color names
//! such as `$CYAN` or `${RESET}` expand to ANSI codes while coloring is on.
//!
//! Unknown placeholders render as the empty string, so a template like
//! `[$REMOTE]` shows `[]` when no remote is active. `$$` is a literal `$`.

use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use crate::ansi::Color;

/// Values available to prompt placeholders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptVars {
    values: BTreeMap<String, String>,
}

impl PromptVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variables describing the local host: `$USER`, `$HOSTNAME`, `$HOME`
    /// and `$PWD` (with the home directory shown as `~`)
    pub fn with_host(working_dir: &Path) -> Self {
        let mut vars = Self::new();

        let user = env::var("USER")
            .or_else(|_| env::var("USERNAME"))
            .unwrap_or_else(|_| "user".to_string());
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string());
        let home = dirs::home_dir();

        let pwd = match home.as_deref() {
            Some(home) if working_dir == home => "~".to_string(),
            Some(home) => match working_dir.strip_prefix(home) {
                Ok(stripped) => format!("~/{}", stripped.display()),
                Err(_) => working_dir.display().to_string(),
            },
            None => working_dir.display().to_string(),
        };

        vars.set("USER", user);
        vars.set("HOSTNAME", hostname);
        vars.set(
            "HOME",
            home.map(|h| h.display().to_string()).unwrap_or_default(),
        );
        vars.set("PWD", pwd);
        vars
    }

    /// Set a variable. Empty values are kept and render as nothing.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Prompt formatter that handles variable substitution
#[derive(Debug, Clone)]
pub struct PromptFormatter {
    /// The format template
    format: String,
}

impl PromptFormatter {
    /// Create a new prompt formatter with the given format string
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    /// Render the prompt by substituting variables
    pub fn render(&self, vars: &PromptVars, coloring: bool) -> String {
        let mut result = String::with_capacity(self.format.len());
        let mut chars = self.format.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }

            match chars.peek().copied() {
                Some('$') => {
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if closed {
                        result.push_str(&resolve(&name, vars, coloring));
                    } else {
                        // Unterminated brace: keep the text as typed
                        result.push_str("${");
                        result.push_str(&name);
                    }
                }
                Some(n) if is_name_start(n) => {
                    let mut name = String::new();
                    while let Some(&n) = chars.peek() {
                        if !is_name_char(n) {
                            break;
                        }
                        name.push(n);
                        chars.next();
                    }
                    result.push_str(&resolve(&name, vars, coloring));
                }
                _ => result.push('$'),
            }
        }

        result
    }

    /// Update the format template
    pub fn set_format(&mut self, format: impl Into<String>) {
        self.format = format.into();
    }

    /// Get the current format template
    pub fn format(&self) -> &str {
        &self.format
    }
}

impl Default for PromptFormatter {
    fn default() -> Self {
        Self::new(super::DEFAULT_PROMPT)
    }
}

fn resolve(name: &str, vars: &PromptVars, coloring: bool) -> String {
    if let Some(value) = vars.get(name) {
        return value.to_string();
    }
    match Color::from_name(name) {
        Some(color) if coloring => color.code().to_string(),
        _ => String::new(),
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
