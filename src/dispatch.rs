//! Command dispatch
//!
//! Runs one tokenized command line against the registry. Used for direct
//! process invocation and for every non-built-in shell line.
//!
//! Each command runs in isolation: Ctrl-C aborts only the command,
//! runtime settings it changes are rolled back (unless it is one of the
//! setting commands) and every error is reported here and turned into an
//! exit code, so a failing line never takes the caller down with it.

use std::time::{Duration, Instant};

use crate::ansi::{self, Color};
use crate::commands::{CommandContext, SETTING_COMMANDS};
use crate::error::{Error, Result};
use crate::registry::{CommandRegistry, Handler};

/// Program name accepted (and dropped) as the first word of a line
pub const PROGRAM_NAME: &str = "morpheus";

/// Per-line flag that times one command
pub const BENCHMARK_FLAG: &str = "--benchmark";

/// Exit code and message of one dispatched line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub code: i32,
    pub message: Option<String>,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            code: 0,
            message: None,
        }
    }

    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Split a line into shell words, dropping a leading `morpheus`
pub fn split_line(line: &str) -> Result<Vec<String>> {
    let mut tokens = shlex::split(line)
        .ok_or_else(|| Error::Parse("unterminated quote or trailing escape".to_string()))?;
    if tokens.first().map(String::as_str) == Some(PROGRAM_NAME) {
        tokens.remove(0);
    }
    Ok(tokens)
}

/// Run `tokens` as a registered command and report the result
pub async fn execute(
    registry: &CommandRegistry,
    ctx: &mut CommandContext<'_>,
    tokens: &[String],
) -> Outcome {
    let mut force_benchmark = false;
    let mut tokens: Vec<&str> = tokens
        .iter()
        .map(String::as_str)
        .filter(|token| {
            let flag = *token == BENCHMARK_FLAG;
            force_benchmark |= flag;
            !flag
        })
        .collect();

    if tokens.first() == Some(&"benchmark") && tokens.get(1) == Some(&"exec") {
        force_benchmark = true;
        tokens.drain(..2);
        if tokens.is_empty() {
            return report(
                ctx,
                Error::Usage("Usage: morpheus benchmark exec COMMAND [options]".to_string()),
            );
        }
    }

    let Some(&name) = tokens.first() else {
        return Outcome::success();
    };
    let Some(handler) = registry.resolve(name) else {
        return report(ctx, Error::UnknownCommand(name.to_string()));
    };

    let (subcommand, args) = match select_subcommand(handler, &tokens[1..]) {
        Ok(Selection::Usage) => {
            return match write!(ctx.out, "{}", handler.usage()) {
                Ok(()) => Outcome::success(),
                Err(e) => report(ctx, e.into()),
            };
        }
        Ok(Selection::Run(subcommand, args)) => (subcommand, args),
        Err(e) => return report(ctx, e),
    };
    let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();

    let snapshot = *ctx.settings;
    debug!(
        "Dispatching {} {} {:?}",
        handler.name(),
        subcommand.unwrap_or_default(),
        args
    );

    let started = Instant::now();
    let result = tokio::select! {
        result = handler.handle(ctx, subcommand, &args) => result,
        _ = interrupted() => Err(Error::Interrupted),
    };
    let elapsed = started.elapsed();

    if !SETTING_COMMANDS.contains(&handler.name()) && *ctx.settings != snapshot {
        debug!("Restoring settings changed by {}", handler.name());
        if ctx.settings.log_level != snapshot.log_level {
            if let Some(log) = ctx.log {
                if let Err(e) = log.set_level(snapshot.log_level) {
                    warn!("{}", e);
                }
            }
        }
        *ctx.settings = snapshot;
    }

    let outcome = match result {
        Ok(code) => Outcome {
            code,
            message: None,
        },
        Err(e) => report(ctx, e),
    };

    if (snapshot.benchmark || force_benchmark) && handler.name() != "benchmark" {
        let line = format!("Command completed in {}", format_elapsed(elapsed));
        let painted = ansi::paint(&line, Color::Magenta, ctx.settings.coloring);
        if let Err(e) = writeln!(ctx.out, "{}", painted) {
            warn!("Failed to print timing: {}", e);
        }
    }
    outcome
}

enum Selection<'t> {
    /// Print the handler's usage
    Usage,
    Run(Option<&'static str>, &'t [&'t str]),
}

/// Pick the subcommand out of `rest` with a table lookup
fn select_subcommand<'t>(handler: &dyn Handler, rest: &'t [&'t str]) -> Result<Selection<'t>> {
    if handler.subcommands().is_empty() {
        return Ok(Selection::Run(None, rest));
    }
    match rest.first() {
        None | Some(&"-h") | Some(&"--help") | Some(&"help") => Ok(Selection::Usage),
        Some(&word) => match handler.find_subcommand(word) {
            Some(sub) => Ok(Selection::Run(Some(sub.name), &rest[1..])),
            None => Err(Error::Usage(format!(
                "'{}' is not a {} command\n\n{}",
                word,
                handler.name(),
                handler.usage().trim_end()
            ))),
        },
    }
}

/// Print `error` where it belongs and turn it into an outcome
pub fn report(ctx: &mut CommandContext<'_>, error: Error) -> Outcome {
    let code = error.exit_code();
    let message = error.to_string();
    let written = match &error {
        Error::HelpRequested(text) => writeln!(ctx.out, "{}", text),
        Error::Usage(text) => writeln!(ctx.err, "{}", text),
        Error::Exit { message: None, .. } => Ok(()),
        Error::Exit {
            message: Some(text),
            ..
        } => writeln!(ctx.out, "{}", text),
        _ => writeln!(
            ctx.err,
            "{}",
            ansi::paint(&message, Color::Red, ctx.settings.coloring)
        ),
    };
    if let Err(e) = written {
        warn!("Failed to report error: {}", e);
    }

    debug!("Command failed with exit code {}: {}", code, message);
    match error {
        Error::HelpRequested(_) => Outcome::success(),
        Error::Exit { code, message } => Outcome { code, message },
        _ => Outcome::failure(code, message),
    }
}

/// How long [`InterruptListener::triggered`] lets the runtime deliver a
/// signal that is already pending
const SIGNAL_GRACE: Duration = Duration::from_millis(25);

/// Ctrl-C listener that is registered as soon as it is created.
///
/// Blocking reads hold up the runtime, so a Ctrl-C pressed during one is
/// only seen once the read returns; a listener created beforehand still
/// has it queued.
pub struct InterruptListener {
    #[cfg(unix)]
    signal: tokio::signal::unix::Signal,
    #[cfg(windows)]
    signal: tokio::signal::windows::CtrlC,
}

impl InterruptListener {
    /// Start listening. `None` if the signal cannot be watched.
    pub fn new() -> Option<Self> {
        #[cfg(unix)]
        let signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt());
        #[cfg(windows)]
        let signal = tokio::signal::windows::ctrl_c();

        match signal {
            Ok(signal) => Some(Self { signal }),
            Err(e) => {
                debug!("Cannot watch for Ctrl-C: {}", e);
                None
            }
        }
    }

    /// Whether Ctrl-C arrived since the listener was created
    pub async fn triggered(&mut self) -> bool {
        matches!(
            tokio::time::timeout(SIGNAL_GRACE, self.signal.recv()).await,
            Ok(Some(()))
        )
    }
}

/// Resolves on Ctrl-C. Never resolves if the signal cannot be watched.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        debug!("Cannot watch for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// `250ms`, `1.532s`
pub fn format_elapsed(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("{}ms", elapsed.as_millis())
    } else {
        format!("{:.3}s", elapsed.as_secs_f64())
    }
}
