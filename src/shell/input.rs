//! Line input for the shell
//!
//! [`EditorReader`] wraps a rustyline editor for interactive use;
//! [`ScriptedReader`] replays fixed lines for tests and piped input.

use std::collections::VecDeque;

use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, EditMode, Editor};

use super::completion::{CompletionProvider, ShellHelper};
use crate::error::Result;

/// What one read produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C at the prompt
    Interrupted,
    /// Ctrl-D or end of input
    Eof,
}

/// Source of shell input lines
pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;

    /// Refresh completion candidates before the next read
    fn set_candidates(&mut self, _candidates: Vec<String>) {}

    /// Make `line` available to up-arrow recall
    fn add_history(&mut self, _line: &str) {}
}

/// Interactive reader with line editing, recall and tab completion
pub struct EditorReader {
    editor: Editor<ShellHelper, DefaultHistory>,
}

impl EditorReader {
    /// Create an editor whose recall starts with `history`
    pub fn new<'h>(history: impl IntoIterator<Item = &'h str>) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .auto_add_history(false)
            .build();

        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(ShellHelper::new(CompletionProvider::default())));
        for line in history {
            editor.add_history_entry(line)?;
        }
        Ok(Self { editor })
    }
}

impl LineReader for EditorReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(e) => Err(e.into()),
        }
    }

    fn set_candidates(&mut self, candidates: Vec<String>) {
        if let Some(helper) = self.editor.helper_mut() {
            helper.provider.set_candidates(candidates);
        }
    }

    fn add_history(&mut self, line: &str) {
        if let Err(e) = self.editor.add_history_entry(line) {
            debug!("Failed to add recall entry: {}", e);
        }
    }
}

/// Reader that hands out prepared lines, then end of input
#[derive(Debug, Clone, Default)]
pub struct ScriptedReader {
    lines: VecDeque<String>,
    prompts: Vec<String>,
}

impl ScriptedReader {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }

    /// Prompts shown so far
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl LineReader for ScriptedReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        self.prompts.push(prompt.to_string());
        Ok(match self.lines.pop_front() {
            Some(line) => ReadOutcome::Line(line),
            None => ReadOutcome::Eof,
        })
    }
}
