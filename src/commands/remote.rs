//! `remote`: configure the appliances commands talk to

use async_trait::async_trait;
use clap::Parser;
use serde_json::{json, Value};

use super::{parse_args, CommandContext};
use crate::config::remotes::RemoteEntry;
use crate::error::{Error, Result};
use crate::options::{ConfirmOptions, OutputOptions};
use crate::registry::{Handler, Subcommand};
use crate::render::{self, col, Column, Format};

const COLUMNS: [Column; 5] = [
    col("", "marker"),
    col("NAME", "name"),
    col("URL", "url"),
    col("USERNAME", "username"),
    col("INSECURE", "insecure"),
];

static SUBCOMMANDS: [Subcommand; 6] = [
    Subcommand::new("list", "List configured remote appliances"),
    Subcommand::new("add", "Add a remote appliance"),
    Subcommand::new("use", "Make a remote the active one"),
    Subcommand::new("unuse", "Clear the active remote"),
    Subcommand::new("remove", "Remove a remote appliance").with_aliases(&["delete"]),
    Subcommand::new("current", "Print the active remote"),
];

#[derive(Debug, Parser)]
struct ListArgs {
    #[command(flatten)]
    output: OutputOptions,
}

#[derive(Debug, Parser)]
struct AddArgs {
    /// Name for the appliance
    name: String,
    /// Appliance URL, e.g. `https://morpheus.example.com`
    url: String,
    /// Username shown in prompts and history
    #[arg(short = 'u', long)]
    username: Option<String>,
    /// API access token
    #[arg(long)]
    token: Option<String>,
    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,
    /// Make it the active remote
    #[arg(long = "use")]
    use_it: bool,
}

#[derive(Debug, Parser)]
struct NameArgs {
    /// Remote name
    name: String,
}

#[derive(Debug, Parser)]
struct RemoveArgs {
    /// Remote name
    name: String,
    #[command(flatten)]
    confirm: ConfirmOptions,
}

#[derive(Debug, Parser)]
struct NoArgs {}

pub struct RemoteCommand;

impl RemoteCommand {
    fn list(&self, ctx: &mut CommandContext<'_>, args: ListArgs) -> Result<i32> {
        let remotes = &ctx.session.remotes;
        let active = remotes.active_name();
        let rows: Vec<Value> = remotes
            .list()
            .map(|(name, entry)| {
                json!({
                    "marker": if Some(name) == active { "=>" } else { "" },
                    "name": name,
                    "url": entry.url,
                    "username": entry.username,
                    "insecure": entry.insecure,
                })
            })
            .collect();

        let format = args.output.format();
        match format {
            Format::Json | Format::Yaml => {
                let value = json!({ "remotes": rows, "active": active });
                render::print_structured(ctx.out, &value, format)?;
            }
            Format::Csv => render::print_csv(ctx.out, &rows, &COLUMNS[1..])?,
            Format::Table => {
                render::print_title(ctx.out, "Morpheus Appliances", ctx.settings.coloring)?;
                if rows.is_empty() {
                    writeln!(ctx.out, "No remote appliances configured. See `remote add`.")?;
                } else {
                    render::print_table(ctx.out, &rows, &COLUMNS, ctx.settings.coloring)?;
                }
            }
        }
        Ok(0)
    }

    fn add(&self, ctx: &mut CommandContext<'_>, args: AddArgs) -> Result<i32> {
        let url = args.url.trim_end_matches('/').to_string();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(Error::Usage(format!(
                "Invalid URL '{}'. Expected http:// or https://",
                args.url
            )));
        }

        let remotes = &mut ctx.session.remotes;
        let entry = RemoteEntry {
            url,
            username: args.username,
            insecure: args.insecure,
        };
        remotes.add(&args.name, entry, args.token)?;
        if args.use_it || remotes.active_name().is_none() {
            remotes.set_active(&args.name)?;
        }
        remotes.save()?;
        info!("Added remote {}", args.name);

        writeln!(ctx.out, "Added remote {}", args.name)?;
        Ok(0)
    }

    fn use_remote(&self, ctx: &mut CommandContext<'_>, args: NameArgs) -> Result<i32> {
        let remotes = &mut ctx.session.remotes;
        remotes.set_active(&args.name)?;
        remotes.save()?;
        writeln!(ctx.out, "Using remote {}", args.name)?;
        Ok(0)
    }

    fn unuse(&self, ctx: &mut CommandContext<'_>) -> Result<i32> {
        let remotes = &mut ctx.session.remotes;
        match remotes.clear_active() {
            Some(name) => {
                remotes.save()?;
                writeln!(ctx.out, "No longer using remote {}", name)?;
            }
            None => writeln!(ctx.out, "No active remote")?,
        }
        Ok(0)
    }

    async fn remove(&self, ctx: &mut CommandContext<'_>, args: RemoveArgs) -> Result<i32> {
        if ctx.session.remotes.get(&args.name).is_none() {
            return Err(Error::RemoteNotFound(args.name));
        }
        if !args.confirm.yes {
            ctx.confirm(&format!(
                "Are you sure you want to remove the remote {}?",
                args.name
            ))
            .await?;
        }

        let remotes = &mut ctx.session.remotes;
        remotes.remove(&args.name)?;
        remotes.save()?;
        writeln!(ctx.out, "Removed remote {}", args.name)?;
        Ok(0)
    }

    fn current(&self, ctx: &mut CommandContext<'_>) -> Result<i32> {
        match ctx.session.remotes.active() {
            Some(remote) => {
                writeln!(ctx.out, "{} {}", remote.name, remote.entry.url)?;
                Ok(0)
            }
            None => Err(Error::NoActiveRemote),
        }
    }
}

#[async_trait(?Send)]
impl Handler for RemoteCommand {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn description(&self) -> &'static str {
        "Manage remote appliances"
    }

    fn subcommands(&self) -> &'static [Subcommand] {
        &SUBCOMMANDS
    }

    async fn handle(
        &self,
        ctx: &mut CommandContext<'_>,
        subcommand: Option<&str>,
        args: &[String],
    ) -> Result<i32> {
        match subcommand.unwrap_or_default() {
            "list" => self.list(ctx, parse_args("remote list", args)?),
            "add" => self.add(ctx, parse_args("remote add", args)?),
            "use" => self.use_remote(ctx, parse_args("remote use", args)?),
            "unuse" => {
                parse_args::<NoArgs>("remote unuse", args)?;
                self.unuse(ctx)
            }
            "remove" => self.remove(ctx, parse_args("remote remove", args)?).await,
            "current" => {
                parse_args::<NoArgs>("remote current", args)?;
                self.current(ctx)
            }
            other => Err(Error::Usage(format!("Unknown subcommand '{}'", other))),
        }
    }
}
