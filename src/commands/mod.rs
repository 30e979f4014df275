//! Command handlers
//!
//! Every top-level command implements [`Handler`] and is registered in
//! [`CommandRegistry::standard`]. Handlers parse their own flags with
//! [`parse_args`], talk to the appliance through [`crate::api`] and print
//! through [`crate::render`].

pub mod alias;
pub mod certificates;
pub mod cypher;
pub mod datastores;
pub mod execute_schedules;
pub mod incidents;
pub mod packages;
pub mod remote;
pub mod resource;
pub mod settings;
pub mod whoami;

use std::io::{BufRead, Write};

use clap::error::ErrorKind;
use clap::{ColorChoice, Parser};

use crate::api::ApiClient;
use crate::config::RuntimeSettings;
use crate::dispatch::InterruptListener;
use crate::error::{Error, Result};
use crate::logging::LogHandle;
use crate::options::RemoteOptions;
use crate::registry::{CommandRegistry, Handler};
use crate::session::SessionContext;

/// Commands that own a runtime setting; the shell keeps their changes
pub const SETTING_COMMANDS: [&str; 4] = ["log-level", "debug", "coloring", "benchmark"];

/// Everything a handler may touch while it runs
pub struct CommandContext<'a> {
    pub session: &'a mut SessionContext,
    pub settings: &'a mut RuntimeSettings,
    pub log: Option<&'a LogHandle>,
    /// Answers to confirmation prompts
    pub input: &'a mut dyn BufRead,
    pub out: &'a mut dyn Write,
    pub err: &'a mut dyn Write,
}

impl CommandContext<'_> {
    pub fn coloring(&self) -> bool {
        self.settings.coloring
    }

    /// Client for the remote selected by `--remote`, else the active one
    pub fn api(&self, remote: &RemoteOptions) -> Result<ApiClient> {
        ApiClient::from_session(&*self.session, remote.remote.as_deref(), remote.dry_run)
    }

    /// Ask `question`; anything but `y`/`yes` aborts.
    ///
    /// A Ctrl-C pressed while waiting for the answer aborts the command
    /// with [`Error::Interrupted`], whatever was typed.
    pub async fn confirm(&mut self, question: &str) -> Result<()> {
        write!(self.out, "{} (y/N) ", question)?;
        self.out.flush()?;

        let mut listener = InterruptListener::new();
        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        if let Some(listener) = listener.as_mut() {
            if listener.triggered().await {
                writeln!(self.out)?;
                return Err(Error::Interrupted);
            }
        }

        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Ok(()),
            _ => Err(Error::Aborted),
        }
    }
}

impl CommandRegistry {
    /// Registry with every built-in command
    pub fn standard() -> Self {
        let handlers: Vec<Box<dyn Handler>> = vec![
            Box::new(remote::RemoteCommand),
            Box::new(whoami::WhoamiCommand),
            Box::new(certificates::CertificatesCommand),
            Box::new(datastores::DatastoresCommand),
            Box::new(cypher::CypherCommand),
            Box::new(execute_schedules::ExecuteSchedulesCommand),
            Box::new(incidents::IncidentsCommand),
            Box::new(packages::PackagesCommand),
            Box::new(alias::AliasCommand),
            Box::new(settings::LogLevelCommand),
            Box::new(settings::DebugCommand),
            Box::new(settings::ColoringCommand),
            Box::new(settings::BenchmarkCommand),
        ];

        let mut registry = CommandRegistry::new();
        for handler in handlers {
            let name = handler.name();
            if let Err(e) = registry.register(handler) {
                // Names are fixed at compile time, so a clash is a bug here
                panic!("failed to register built-in command '{}': {}", name, e);
            }
        }
        registry
    }
}

/// Parse `args` (without the command words) into `T`.
///
/// `-h/--help` yields [`Error::HelpRequested`] carrying the help text;
/// any other parse failure is [`Error::Usage`].
pub fn parse_args<T: Parser>(name: &str, args: &[String]) -> Result<T> {
    let mut command = T::command()
        .name(name.to_string())
        .no_binary_name(true)
        .color(ColorChoice::Never);

    let matches = command
        .try_get_matches_from_mut(args)
        .map_err(clap_error)?;
    T::from_arg_matches(&matches).map_err(clap_error)
}

fn clap_error(e: clap::Error) -> Error {
    let text = e.render().to_string().trim_end().to_string();
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Error::HelpRequested(text),
        _ => Error::Usage(text),
    }
}
