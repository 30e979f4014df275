//! Command and path completion for the shell
//!
//! Candidates are whole command prefixes (`certificates`, `certificates list`,
//! built-ins and aliases) matched against the text before the cursor. When
//! nothing matches, the last word is completed as a file path.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rustyline::completion::{Completer, Pair};
use rustyline::Context;
use rustyline_derive::{Helper, Highlighter, Hinter, Validator};

/// Most suggestions returned for one completion request
const MAX_SUGGESTIONS: usize = 50;

/// Completion provider for shell commands and paths
#[derive(Debug, Clone, Default)]
pub struct CompletionProvider {
    /// Command prefixes, in registration order
    candidates: Vec<String>,
}

/// Completion result containing suggestions
#[derive(Debug, Clone)]
pub struct CompletionResult {
    /// List of completion suggestions
    pub suggestions: Vec<CompletionItem>,
    /// Byte offset in the line where the replacement starts
    pub start: usize,
    /// The prefix that was matched
    pub prefix: String,
    /// Type of completion
    pub completion_type: CompletionType,
}

/// Individual completion item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    /// Text that replaces the prefix
    pub text: String,
    /// Display label (directories get a trailing `/`)
    pub label: String,
    pub item_type: CompletionItemType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionType {
    Command,
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionItemType {
    Command,
    Directory,
    File,
    Symlink,
}

impl CompletionProvider {
    pub fn new(candidates: Vec<String>) -> Self {
        let mut provider = Self::default();
        provider.set_candidates(candidates);
        provider
    }

    /// Replace the candidate list, dropping duplicates
    pub fn set_candidates(&mut self, candidates: Vec<String>) {
        self.candidates.clear();
        for candidate in candidates {
            if !self.candidates.contains(&candidate) {
                self.candidates.push(candidate);
            }
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Completions for `line`, which ends at the cursor
    pub fn get_completions(&self, line: &str, working_dir: &Path) -> CompletionResult {
        let start = line.len() - line.trim_start().len();
        let typed = &line[start..];

        let result = self.complete_command(typed, start);
        if !result.is_empty() {
            return result;
        }

        let word_start = line
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        self.complete_path(&line[word_start..], word_start, working_dir)
    }

    /// Candidates that start with everything typed so far
    fn complete_command(&self, typed: &str, start: usize) -> CompletionResult {
        let suggestions = self
            .candidates
            .iter()
            .filter(|candidate| candidate.starts_with(typed))
            .take(MAX_SUGGESTIONS)
            .map(|candidate| CompletionItem {
                text: candidate.clone(),
                label: candidate.clone(),
                item_type: CompletionItemType::Command,
            })
            .collect();

        CompletionResult {
            suggestions,
            start,
            prefix: typed.to_string(),
            completion_type: CompletionType::Command,
        }
    }

    /// Complete the file or directory named by `word`
    fn complete_path(&self, word: &str, word_start: usize, working_dir: &Path) -> CompletionResult {
        let (dir_path, file_prefix) = parse_path_prefix(word, working_dir);
        let mut suggestions = Vec::new();

        // A bare `~` has nothing to complete until the `/` is typed
        let listable = word != "~" && word.ends_with(file_prefix.as_str());
        if let Some(entries) = listable.then(|| fs::read_dir(&dir_path).ok()).flatten() {
            for entry in entries.flatten() {
                let Ok(filename) = entry.file_name().into_string() else {
                    continue;
                };
                // Hidden files only when asked for
                if filename.starts_with('.') && !file_prefix.starts_with('.') {
                    continue;
                }
                if !filename.starts_with(&file_prefix) {
                    continue;
                }

                let item_type = match entry.file_type() {
                    Ok(t) if t.is_symlink() => CompletionItemType::Symlink,
                    Ok(t) if t.is_dir() => CompletionItemType::Directory,
                    _ => CompletionItemType::File,
                };
                let (text, label) = if item_type == CompletionItemType::Directory {
                    (format!("{}/", filename), format!("{}/", filename))
                } else {
                    (filename.clone(), filename)
                };
                suggestions.push(CompletionItem {
                    text,
                    label,
                    item_type,
                });
            }
        }

        // Directories first, then alphabetical
        suggestions.sort_by(|a, b| {
            let a_dir = a.item_type != CompletionItemType::Directory;
            let b_dir = b.item_type != CompletionItemType::Directory;
            a_dir
                .cmp(&b_dir)
                .then_with(|| a.text.to_lowercase().cmp(&b.text.to_lowercase()))
        });
        suggestions.truncate(MAX_SUGGESTIONS);

        CompletionResult {
            suggestions,
            start: word_start + word.len().saturating_sub(file_prefix.len()),
            prefix: file_prefix,
            completion_type: CompletionType::Path,
        }
    }
}

/// Split a path prefix into the directory to read and the filename prefix
fn parse_path_prefix(prefix: &str, working_dir: &Path) -> (PathBuf, String) {
    if prefix.is_empty() {
        return (working_dir.to_path_buf(), String::new());
    }

    let path = Path::new(prefix);
    let expanded = match prefix.strip_prefix('~') {
        Some(rest) => match env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest.trim_start_matches('/')),
            None => path.to_path_buf(),
        },
        None if path.is_absolute() => path.to_path_buf(),
        None => working_dir.join(path),
    };

    if prefix.ends_with('/') || prefix.ends_with(std::path::MAIN_SEPARATOR) {
        return (expanded, String::new());
    }
    match expanded.parent() {
        Some(parent) => {
            let filename = expanded
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            (parent.to_path_buf(), filename)
        }
        None => (expanded, String::new()),
    }
}

impl CompletionResult {
    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.suggestions.len()
    }

    /// Longest prefix shared by every suggestion, if it extends the typed text
    pub fn get_common_prefix(&self) -> Option<String> {
        let first = &self.suggestions.first()?.text;
        let mut common = first.as_str();
        for item in &self.suggestions[1..] {
            let shared = common
                .char_indices()
                .zip(item.text.chars())
                .find(|((_, a), b)| a != b)
                .map(|((idx, _), _)| idx)
                .unwrap_or_else(|| common.len().min(item.text.len()));
            common = &common[..shared];
        }

        (common.len() > self.prefix.len()).then(|| common.to_string())
    }
}

/// rustyline helper: completion from a [`CompletionProvider`], defaults
/// for highlighting, hints and validation
#[derive(Helper, Highlighter, Hinter, Validator)]
pub struct ShellHelper {
    pub provider: CompletionProvider,
}

impl ShellHelper {
    pub fn new(provider: CompletionProvider) -> Self {
        Self { provider }
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let working_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let result = self.provider.get_completions(&line[..pos], &working_dir);
        let pairs = result
            .suggestions
            .into_iter()
            .map(|item| Pair {
                display: item.label,
                replacement: item.text,
            })
            .collect();
        Ok((result.start, pairs))
    }
}
