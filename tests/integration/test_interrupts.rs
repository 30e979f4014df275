//! Integration tests for Ctrl-C handling
//!
//! Kept in their own test binary: the signal goes to the whole process
//! and would abort commands running in unrelated tests.

#![cfg(unix)]

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::io::{self, BufReader, Read};
use std::process::Command;
use std::thread;
use std::time::Duration;

use morpheus_cli::error::EXIT_INTERRUPTED;
use morpheus_cli::{dispatch, CommandContext, CommandRegistry, RuntimeSettings, SessionContext};
use test_utils::home_with_remote;

/// Answers `y`, but only after Ctrl-C was pressed while it was blocked
struct InterruptedAnswer {
    answer: &'static [u8],
    signalled: bool,
}

impl Read for InterruptedAnswer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.signalled {
            self.signalled = true;
            let status = Command::new("kill")
                .arg("-INT")
                .arg(std::process::id().to_string())
                .status()?;
            assert!(status.success());
            thread::sleep(Duration::from_millis(50));
        }
        let n = self.answer.len().min(buf.len());
        buf[..n].copy_from_slice(&self.answer[..n]);
        self.answer = &self.answer[n..];
        Ok(n)
    }
}

#[tokio::test]
async fn test_ctrl_c_at_confirmation_aborts_command() {
    let home = home_with_remote();
    let registry = CommandRegistry::standard();
    let mut session = SessionContext::load(home.path()).unwrap();
    let mut settings = RuntimeSettings {
        coloring: false,
        ..RuntimeSettings::default()
    };
    let mut input = BufReader::new(InterruptedAnswer {
        answer: b"y\n",
        signalled: false,
    });
    let mut out = Vec::new();
    let mut err = Vec::new();

    let tokens = dispatch::split_line("remote remove local").unwrap();
    let mut ctx = CommandContext {
        session: &mut session,
        settings: &mut settings,
        log: None,
        input: &mut input,
        out: &mut out,
        err: &mut err,
    };
    let outcome = dispatch::execute(&registry, &mut ctx, &tokens).await;

    assert_eq!(outcome.code, EXIT_INTERRUPTED);
    assert!(String::from_utf8_lossy(&err).contains("Command aborted"));

    // The `y` typed after Ctrl-C did not go through
    assert!(session.remotes.get("local").is_some());
    let reloaded = SessionContext::load(home.path()).unwrap();
    assert!(reloaded.remotes.get("local").is_some());
}
