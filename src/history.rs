//! Persistent shell history log
//!
//! Every logged input line is appended to `<home>/shell_history` as
//!
//! ```text
//! <context> -- : (cmd <N>) <command text>
//! ```
//!
//! where `<context>` names the user and appliance the command ran against
//! and `N` increases strictly. Loading reads the file back into a map from
//! number to text, skipping lines that do not match the format.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<ctx>.*?) -- : \(cmd (?P<num>\d+)\) (?P<text>.*)$")
        .expect("valid history line pattern")
});

/// One numbered history entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub number: u64,
    pub text: String,
}

/// Append-only command history backed by a file
#[derive(Debug)]
pub struct HistoryLog {
    /// Path to the history file
    path: PathBuf,
    /// In-memory copy of the log
    entries: BTreeMap<u64, String>,
    /// Highest number seen so far
    last_number: u64,
}

impl HistoryLog {
    /// Bind a log to `path` without touching the filesystem
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
            last_number: 0,
        }
    }

    /// Bind to `path` and read any existing entries
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let mut log = Self::open(path);
        log.load_all()?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file, replacing the in-memory entries.
    ///
    /// A missing file is an empty history. The highest number found
    /// becomes the counter for the next append.
    pub fn load_all(&mut self) -> Result<BTreeMap<u64, String>> {
        self.entries.clear();
        self.last_number = 0;

        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut skipped = 0usize;
        for line in reader.lines() {
            let line = line?;
            match parse_line(&line) {
                Some((number, text)) => {
                    self.entries.insert(number, text);
                    self.last_number = self.last_number.max(number);
                }
                None if line.trim().is_empty() => {}
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(
                "Skipped {} unreadable history lines in {}",
                skipped,
                self.path.display()
            );
        }

        Ok(self.entries.clone())
    }

    /// Append entry `number`. The number must be greater than every
    /// number already logged.
    pub fn append(&mut self, number: u64, text: &str, context: &str) -> Result<()> {
        if number <= self.last_number {
            return Err(Error::HistoryOutOfOrder {
                number,
                last: self.last_number,
            });
        }

        // Keep one entry per line
        let text = text.replace(['\r', '\n'], " ");
        let line = format!("{} -- : (cmd {}) {}\n", context, number, text);

        let mut file = self.open_for_append()?;
        file.write_all(line.as_bytes())?;

        self.entries.insert(number, text);
        self.last_number = number;
        Ok(())
    }

    /// Log `text` with the next number, unless it is a `history` command
    /// identical to the last logged entry. Returns the number used.
    pub fn record(&mut self, text: &str, context: &str) -> Result<Option<u64>> {
        if text.contains("history") {
            if let Some(last) = self.last() {
                if last.text == text {
                    return Ok(None);
                }
            }
        }

        let number = self.next_number();
        self.append(number, text, context)?;
        Ok(Some(number))
    }

    pub fn next_number(&self) -> u64 {
        self.last_number + 1
    }

    /// The most recently logged entry
    pub fn last(&self) -> Option<HistoryEntry> {
        self.entries
            .iter()
            .next_back()
            .map(|(number, text)| HistoryEntry {
                number: *number,
                text: text.clone(),
            })
    }

    pub fn get(&self, number: u64) -> Option<&str> {
        self.entries.get(&number).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One page of entries, most recent first unless `reverse`.
    ///
    /// `phrase` keeps entries whose text contains it or whose number
    /// equals it.
    pub fn paginate(
        &self,
        phrase: Option<&str>,
        offset: usize,
        max: usize,
        reverse: bool,
    ) -> Vec<HistoryEntry> {
        let matches = |number: u64, text: &str| match phrase {
            Some(phrase) if !phrase.is_empty() => {
                text.contains(phrase) || number.to_string() == phrase
            }
            _ => true,
        };

        let filtered = self
            .entries
            .iter()
            .filter(|(n, t)| matches(**n, t.as_str()));
        let to_entry = |(number, text): (&u64, &String)| HistoryEntry {
            number: *number,
            text: text.clone(),
        };

        if reverse {
            filtered.skip(offset).take(max).map(to_entry).collect()
        } else {
            filtered.rev().skip(offset).take(max).map(to_entry).collect()
        }
    }

    /// Number of entries `phrase` matches, for page footers
    pub fn count_matching(&self, phrase: Option<&str>) -> usize {
        self.paginate(phrase, 0, usize::MAX, true).len()
    }

    /// Truncate the log and reset the counter
    pub fn flush(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Err(Error::HistoryFileMissing(self.path.clone()));
        }
        File::create(&self.path)?;
        self.entries.clear();
        self.last_number = 0;
        info!("Flushed history log {}", self.path.display());
        Ok(())
    }

    /// Create the file with owner-only permissions if it does not exist
    pub fn ensure_file(&self) -> Result<()> {
        self.open_for_append().map(|_| ())
    }

    fn open_for_append(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        Ok(options.open(&self.path)?)
    }
}

fn parse_line(line: &str) -> Option<(u64, String)> {
    let caps = LINE_REGEX.captures(line)?;
    let number = caps.name("num")?.as_str().parse().ok()?;
    Some((number, caps.name("text")?.as_str().to_string()))
}
