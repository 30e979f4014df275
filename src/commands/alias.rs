//! `alias`: user shortcuts for longer command lines

use async_trait::async_trait;
use clap::Parser;
use serde_json::{json, Value};

use super::{parse_args, CommandContext};
use crate::error::{Error, Result};
use crate::options::OutputOptions;
use crate::registry::{Handler, Subcommand};
use crate::render::{self, col, Column, Format};

const COLUMNS: [Column; 2] = [col("ALIAS", "name"), col("COMMAND", "command")];

static SUBCOMMANDS: [Subcommand; 3] = [
    Subcommand::new("add", "Define an alias"),
    Subcommand::new("remove", "Delete an alias").with_aliases(&["delete"]),
    Subcommand::new("list", "List aliases"),
];

#[derive(Debug, Parser)]
struct AddArgs {
    /// Alias name
    name: String,
    /// Command the alias expands to
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[derive(Debug, Parser)]
struct RemoveArgs {
    /// Alias name
    name: String,
}

#[derive(Debug, Parser)]
struct ListArgs {
    #[command(flatten)]
    output: OutputOptions,
}

pub struct AliasCommand;

impl AliasCommand {
    /// Persist aliases unless a startup script is being replayed
    fn autosave(&self, ctx: &mut CommandContext<'_>) -> Result<()> {
        if ctx.session.aliases.autosave() {
            let path = ctx.session.profile_path();
            ctx.session.aliases.save_profile(&path)?;
        }
        Ok(())
    }

    fn add(&self, ctx: &mut CommandContext<'_>, args: AddArgs) -> Result<i32> {
        let command = args.command.join(" ");
        if command.split_whitespace().next() == Some(args.name.as_str()) {
            return Err(Error::Usage(format!(
                "Alias '{}' cannot expand to itself",
                args.name
            )));
        }
        ctx.session.aliases.add(&args.name, &command)?;
        self.autosave(ctx)?;
        debug!("alias {} => {}", args.name, command);
        Ok(0)
    }

    fn remove(&self, ctx: &mut CommandContext<'_>, args: RemoveArgs) -> Result<i32> {
        ctx.session.aliases.remove(&args.name)?;
        self.autosave(ctx)?;
        writeln!(ctx.out, "Removed alias {}", args.name)?;
        Ok(0)
    }

    fn list(&self, ctx: &mut CommandContext<'_>, args: ListArgs) -> Result<i32> {
        let rows: Vec<Value> = ctx
            .session
            .aliases
            .iter()
            .map(|(name, command)| json!({ "name": name, "command": command }))
            .collect();

        let format = args.output.format();
        match format {
            Format::Json | Format::Yaml => {
                render::print_structured(ctx.out, &json!({ "aliases": rows }), format)?
            }
            Format::Csv => render::print_csv(ctx.out, &rows, &COLUMNS)?,
            Format::Table => {
                render::print_title(ctx.out, "Morpheus Aliases", ctx.settings.coloring)?;
                if rows.is_empty() {
                    writeln!(ctx.out, "No aliases defined.")?;
                } else {
                    render::print_table(ctx.out, &rows, &COLUMNS, ctx.settings.coloring)?;
                }
            }
        }
        Ok(0)
    }
}

#[async_trait(?Send)]
impl Handler for AliasCommand {
    fn name(&self) -> &'static str {
        "alias"
    }

    fn description(&self) -> &'static str {
        "Manage command aliases"
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
            "add" => self.add(ctx, parse_args("alias add", args)?),
            "remove" => self.remove(ctx, parse_args("alias remove", args)?),
            "list" => self.list(ctx, parse_args("alias list", args)?),
            other => Err(Error::Usage(format!("Unknown subcommand '{}'", other))),
        }
    }
}
