//! `incidents`: monitoring incidents raised by checks and apps

use async_trait::async_trait;
use clap::Parser;
use serde_json::json;

use super::resource::{self, record_id, GetArgs, Located, ResourceSpec};
use super::{parse_args, CommandContext};
use crate::api::resources::{Endpoint, ResourceInterface};
use crate::api::Reply;
use crate::error::{Error, Result};
use crate::options::{ConfirmOptions, ListOptions, OutputOptions, RemoteOptions};
use crate::registry::{Handler, Subcommand};
use crate::render::{self, col, Column, Format};

const COLUMNS: [Column; 6] = [
    col("ID", "id"),
    col("SEVERITY", "severity"),
    col("NAME", "name"),
    col("STATUS", "status"),
    col("STARTED", "startDate"),
    col("ENDED", "endDate"),
];

const DETAIL_COLUMNS: [Column; 9] = [
    col("ID", "id"),
    col("Name", "name"),
    col("Severity", "severity"),
    col("Status", "status"),
    col("Visibility", "visibility"),
    col("Comment", "comment"),
    col("Resolution", "resolution"),
    col("Started", "startDate"),
    col("Ended", "endDate"),
];

const SPEC: ResourceSpec = ResourceSpec {
    endpoint: Endpoint {
        path: "/api/monitoring/incidents",
        singular: "incident",
        plural: "incidents",
    },
    label: "Incident",
    plural_label: "Incidents",
    columns: &COLUMNS,
    detail_columns: &DETAIL_COLUMNS,
};

static SUBCOMMANDS: [Subcommand; 4] = [
    Subcommand::new("list", "List incidents"),
    Subcommand::new("get", "Get incident details"),
    Subcommand::new("close", "Close an incident"),
    Subcommand::new("reopen", "Reopen a closed incident"),
];

#[derive(Debug, Parser)]
struct ListArgs {
    /// Only incidents with this status, e.g. `open` or `closed`
    #[arg(long)]
    status: Option<String>,
    /// Only incidents with this severity: info, warning or critical
    #[arg(long)]
    severity: Option<String>,
    #[command(flatten)]
    list: ListOptions,
    #[command(flatten)]
    output: OutputOptions,
    #[command(flatten)]
    remote: RemoteOptions,
}

#[derive(Debug, Parser)]
struct StatusArgs {
    /// Incident ID
    #[arg(value_name = "ID")]
    key: String,
    #[command(flatten)]
    confirm: ConfirmOptions,
    #[command(flatten)]
    output: OutputOptions,
    #[command(flatten)]
    remote: RemoteOptions,
}

pub struct IncidentsCommand;

impl IncidentsCommand {
    async fn list(&self, ctx: &mut CommandContext<'_>, args: ListArgs) -> Result<i32> {
        let mut query = args.list.to_query();
        if let Some(status) = args.status {
            query.push(("status".to_string(), status));
        }
        if let Some(severity) = args.severity {
            query.push(("severity".to_string(), severity));
        }

        let client = ctx.api(&args.remote)?;
        let api = ResourceInterface::new(&client, SPEC.endpoint);
        let format = args.output.format();
        match api.list(query).await? {
            Reply::DryRun(request) => {
                render::print_dry_run(ctx.out, &request, format, ctx.settings.coloring)?
            }
            Reply::Json(response) if !args.output.quiet => {
                let rows = crate::api::resources::records(&response, SPEC.endpoint.plural);
                render::print_list(
                    ctx.out,
                    &response,
                    rows,
                    &COLUMNS,
                    format,
                    SPEC.plural_label,
                    ctx.settings.coloring,
                )?;
            }
            _ => {}
        }
        Ok(0)
    }

    /// Move an incident to `status`; `verb` is what the user asked for
    async fn set_status(
        &self,
        ctx: &mut CommandContext<'_>,
        args: StatusArgs,
        status: &str,
        verb: &str,
    ) -> Result<i32> {
        let client = ctx.api(&args.remote)?;
        let api = ResourceInterface::new(&client, SPEC.endpoint);
        let format = args.output.format();

        let record = match resource::locate(ctx, &api, &SPEC, &args.key, format).await? {
            Located::Record(record) => record,
            Located::Previewed => return Ok(0),
        };
        let id = record_id(&SPEC, &record)?;

        if !args.confirm.yes && !client.is_dry_run() {
            ctx.confirm(&format!("Are you sure you want to {} incident {}?", verb, id))
                .await?;
        }

        let body = json!({ "incident": { "status": status } });
        match api.update(id, body).await? {
            Reply::DryRun(request) => {
                render::print_dry_run(ctx.out, &request, format, ctx.settings.coloring)?
            }
            Reply::Json(response) if matches!(format, Format::Json | Format::Yaml) => {
                render::print_structured(ctx.out, &response, format)?
            }
            _ if args.output.quiet => {}
            _ => writeln!(ctx.out, "Incident {} is now {}", id, status)?,
        }
        Ok(0)
    }
}

#[async_trait(?Send)]
impl Handler for IncidentsCommand {
    fn name(&self) -> &'static str {
        "incidents"
    }

    fn description(&self) -> &'static str {
        "View and manage monitoring incidents"
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
            "list" => self.list(ctx, parse_args("incidents list", args)?).await,
            "get" => {
                let args: GetArgs = parse_args("incidents get", args)?;
                resource::get(ctx, &SPEC, args).await
            }
            "close" => {
                let args = parse_args("incidents close", args)?;
                self.set_status(ctx, args, "closed", "close").await
            }
            "reopen" => {
                let args = parse_args("incidents reopen", args)?;
                self.set_status(ctx, args, "open", "reopen").await
            }
            other => Err(Error::Usage(format!("Unknown subcommand '{}'", other))),
        }
    }
}
