//! Commands that change runtime settings: `log-level`, `debug`,
//! `coloring` and `benchmark`.
//!
//! These are the only commands whose changes outlive the line that ran
//! them; the dispatcher restores settings after every other command.

use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

use super::{parse_args, CommandContext};
use crate::error::{Error, Result};
use crate::logging;
use crate::registry::{Handler, Subcommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Toggle {
    On,
    Off,
}

impl Toggle {
    fn enabled(self) -> bool {
        self == Toggle::On
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

/// Apply `level` to the settings and the live subscriber
fn apply_level(ctx: &mut CommandContext<'_>, level: LevelFilter) -> Result<()> {
    ctx.settings.log_level = level;
    if let Some(log) = ctx.log {
        log.set_level(level)?;
    }
    Ok(())
}

#[derive(Debug, Parser)]
struct LogLevelArgs {
    /// off, error, warn, info, debug or trace
    level: Option<String>,
}

pub struct LogLevelCommand;

#[async_trait(?Send)]
impl Handler for LogLevelCommand {
    fn name(&self) -> &'static str {
        "log-level"
    }

    fn description(&self) -> &'static str {
        "Print or change the log level"
    }

    async fn handle(
        &self,
        ctx: &mut CommandContext<'_>,
        _subcommand: Option<&str>,
        args: &[String],
    ) -> Result<i32> {
        let args: LogLevelArgs = parse_args("log-level", args)?;
        match args.level {
            Some(level) => {
                let level = logging::parse_level(&level)?;
                apply_level(ctx, level)?;
                writeln!(ctx.out, "Log level set to {}", level)?;
            }
            None => writeln!(ctx.out, "Log level is {}", ctx.settings.log_level)?,
        }
        Ok(0)
    }
}

#[derive(Debug, Parser)]
struct ToggleArgs {
    #[arg(value_enum)]
    state: Option<Toggle>,
}

pub struct DebugCommand;

#[async_trait(?Send)]
impl Handler for DebugCommand {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn description(&self) -> &'static str {
        "Turn debug logging on or off"
    }

    async fn handle(
        &self,
        ctx: &mut CommandContext<'_>,
        _subcommand: Option<&str>,
        args: &[String],
    ) -> Result<i32> {
        let args: ToggleArgs = parse_args("debug", args)?;
        let enabled = args.state.unwrap_or(Toggle::On).enabled();
        let level = if enabled {
            LevelFilter::DEBUG
        } else {
            LevelFilter::WARN
        };
        apply_level(ctx, level)?;
        writeln!(ctx.out, "Debug logging {}", on_off(enabled))?;
        Ok(0)
    }
}

pub struct ColoringCommand;

#[async_trait(?Send)]
impl Handler for ColoringCommand {
    fn name(&self) -> &'static str {
        "coloring"
    }

    fn description(&self) -> &'static str {
        "Print or change whether output uses ANSI colors"
    }

    async fn handle(
        &self,
        ctx: &mut CommandContext<'_>,
        _subcommand: Option<&str>,
        args: &[String],
    ) -> Result<i32> {
        let args: ToggleArgs = parse_args("coloring", args)?;
        if let Some(state) = args.state {
            ctx.settings.coloring = state.enabled();
        }
        writeln!(ctx.out, "Coloring is {}", on_off(ctx.settings.coloring))?;
        Ok(0)
    }
}

static BENCHMARK_SUBCOMMANDS: [Subcommand; 4] = [
    Subcommand::new("on", "Time every command"),
    Subcommand::new("off", "Stop timing commands"),
    Subcommand::new("status", "Print whether timing is on"),
    Subcommand::new("exec", "Time a single command"),
];

#[derive(Debug, Parser)]
struct NoArgs {}

pub struct BenchmarkCommand;

#[async_trait(?Send)]
impl Handler for BenchmarkCommand {
    fn name(&self) -> &'static str {
        "benchmark"
    }

    fn description(&self) -> &'static str {
        "Time command execution"
    }

    fn subcommands(&self) -> &'static [Subcommand] {
        &BENCHMARK_SUBCOMMANDS
    }

    async fn handle(
        &self,
        ctx: &mut CommandContext<'_>,
        subcommand: Option<&str>,
        args: &[String],
    ) -> Result<i32> {
        match subcommand.unwrap_or_default() {
            "on" | "off" => {
                let name = format!("benchmark {}", subcommand.unwrap_or_default());
                parse_args::<NoArgs>(&name, args)?;
                ctx.settings.benchmark = subcommand == Some("on");
                writeln!(ctx.out, "Benchmarking {}", on_off(ctx.settings.benchmark))?;
            }
            "status" => {
                parse_args::<NoArgs>("benchmark status", args)?;
                writeln!(ctx.out, "Benchmarking is {}", on_off(ctx.settings.benchmark))?;
            }
            // The dispatcher runs `benchmark exec` itself
            "exec" => {
                return Err(Error::Usage(
                    "Usage: morpheus benchmark exec COMMAND [options]".to_string(),
                ))
            }
            other => return Err(Error::Usage(format!("Unknown subcommand '{}'", other))),
        }
        Ok(0)
    }
}
