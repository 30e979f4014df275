//! morpheus - Morpheus appliance CLI
//!
//! `morpheus COMMAND [SUBCOMMAND] [options]` runs one command and exits
//! with its exit code. `morpheus` alone, or `morpheus shell [flags]`,
//! starts the interactive shell.

use std::env;
use std::io::{self, BufReader, Write};
use std::process;

use anyhow::Context;
use tracing::{debug, info};

use morpheus_cli::commands::parse_args;
use morpheus_cli::config::morpheus_home;
use morpheus_cli::shell::EditorReader;
use morpheus_cli::{
    dispatch, logging, CommandContext, CommandRegistry, Error, RuntimeSettings, SessionContext,
    Shell, ShellArgs, ShellIo, NAME, VERSION,
};

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let code = match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{:#}", e);
            1
        }
    };
    process::exit(code);
}

fn run(args: Vec<String>) -> anyhow::Result<i32> {
    let registry = CommandRegistry::standard();
    match args.first().map(String::as_str) {
        Some("-h") | Some("--help") | Some("help") => {
            print_usage(&registry)?;
            return Ok(0);
        }
        Some("-v") | Some("--version") | Some("version") => {
            println!("{} {}", NAME, VERSION);
            return Ok(0);
        }
        _ => {}
    }

    let home = morpheus_home()?;
    let session = SessionContext::load(&home)
        .with_context(|| format!("Failed to load session from {}", home.display()))?;
    let mut settings = RuntimeSettings::from_config(&session.config);
    let log = logging::init(settings.log_level);
    debug!("{} v{} using {}", NAME, VERSION, home.display());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    if args.is_empty() || args[0] == "shell" {
        let shell_args: ShellArgs = match parse_args("morpheus shell", args.get(1..).unwrap_or(&[])) {
            Ok(shell_args) => shell_args,
            Err(e @ Error::HelpRequested(_)) => {
                println!("{}", e);
                return Ok(0);
            }
            Err(e) => {
                eprintln!("{}", e);
                return Ok(e.exit_code());
            }
        };

        // Seed up-arrow recall with the logged history, oldest first
        let recall: Vec<String> = session
            .history
            .paginate(None, 0, usize::MAX, true)
            .into_iter()
            .map(|entry| entry.text)
            .collect();
        let reader = EditorReader::new(recall.iter().map(String::as_str))?;

        let mut shell = Shell::new(
            registry,
            session,
            settings,
            log,
            Box::new(reader),
            ShellIo::stdio(),
        );
        let code = runtime.block_on(shell.run(&shell_args))?;
        info!("Shell exited with code {}", code);
        return Ok(code);
    }

    let mut session = session;
    let mut input = BufReader::with_capacity(1, io::stdin());
    let mut out = io::stdout();
    let mut err = io::stderr();
    let mut ctx = CommandContext {
        session: &mut session,
        settings: &mut settings,
        log: log.as_ref(),
        input: &mut input,
        out: &mut out,
        err: &mut err,
    };
    let outcome = runtime.block_on(dispatch::execute(&registry, &mut ctx, &args));
    out.flush()?;
    Ok(outcome.code)
}

fn print_usage(registry: &CommandRegistry) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "Usage: morpheus [command] [options]")?;
    writeln!(out)?;
    writeln!(out, "Commands:")?;
    let width = registry
        .command_names()
        .iter()
        .map(|name| name.len())
        .max()
        .unwrap_or(0)
        .max("shell".len());
    for handler in registry.handlers() {
        writeln!(
            out,
            "    {:width$}  {}",
            handler.name(),
            handler.description()
        )?;
    }
    writeln!(out, "    {:width$}  Start the interactive shell", "shell")?;
    writeln!(out)?;
    writeln!(out, "Run 'morpheus COMMAND --help' for details on a command.")?;
    Ok(())
}
