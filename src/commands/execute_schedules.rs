//! `execute-schedules`: cron schedules that drive jobs and power states

use async_trait::async_trait;
use clap::{Args, Parser};
use serde_json::{Map, Value};

use super::resource::{self, put, GetArgs, ListArgs, RemoveArgs, ResourceSpec};
use super::{parse_args, CommandContext};
use crate::api::resources::Endpoint;
use crate::error::{Error, Result};
use crate::options::{OutputOptions, PayloadOptions, RemoteOptions};
use crate::registry::{Handler, Subcommand};
use crate::render::{col, Column};

const COLUMNS: [Column; 6] = [
    col("ID", "id"),
    col("NAME", "name"),
    col("DESCRIPTION", "description"),
    col("SCHEDULE", "cron"),
    col("TIMEZONE", "scheduleTimezone"),
    col("ENABLED", "enabled"),
];

const DETAIL_COLUMNS: [Column; 8] = [
    col("ID", "id"),
    col("Name", "name"),
    col("Description", "description"),
    col("Type", "scheduleType"),
    col("Schedule", "cron"),
    col("Time Zone", "scheduleTimezone"),
    col("Enabled", "enabled"),
    col("Created", "dateCreated"),
];

const SPEC: ResourceSpec = ResourceSpec {
    endpoint: Endpoint {
        path: "/api/execute-schedules",
        singular: "schedule",
        plural: "schedules",
    },
    label: "Schedule",
    plural_label: "Schedules",
    columns: &COLUMNS,
    detail_columns: &DETAIL_COLUMNS,
};

static SUBCOMMANDS: [Subcommand; 5] = [
    Subcommand::new("list", "List execute schedules"),
    Subcommand::new("get", "Get schedule details"),
    Subcommand::new("add", "Add a schedule"),
    Subcommand::new("update", "Update a schedule"),
    Subcommand::new("remove", "Delete a schedule").with_aliases(&["delete"]),
];

#[derive(Debug, Args)]
struct ScheduleFields {
    /// Description
    #[arg(long)]
    description: Option<String>,

    /// Cron expression, e.g. `0 0 * * *`
    #[arg(long, value_name = "EXPRESSION")]
    cron: Option<String>,

    /// Time zone the expression is evaluated in
    #[arg(long = "time-zone", value_name = "ZONE")]
    time_zone: Option<String>,

    /// Schedule type: execute, start or stop
    #[arg(long = "type", value_name = "TYPE")]
    kind: Option<String>,

    /// Enable or disable the schedule
    #[arg(long)]
    enabled: Option<bool>,
}

impl ScheduleFields {
    fn into_map(self, name: Option<String>) -> Map<String, Value> {
        let mut map = Map::new();
        put(&mut map, "name", name);
        put(&mut map, "description", self.description);
        put(&mut map, "cron", self.cron);
        put(&mut map, "scheduleTimezone", self.time_zone);
        put(&mut map, "scheduleType", self.kind);
        put(&mut map, "enabled", self.enabled);
        map
    }
}

#[derive(Debug, Parser)]
struct AddArgs {
    /// Schedule name
    name: Option<String>,
    #[command(flatten)]
    fields: ScheduleFields,
    #[command(flatten)]
    payload: PayloadOptions,
    #[command(flatten)]
    output: OutputOptions,
    #[command(flatten)]
    remote: RemoteOptions,
}

#[derive(Debug, Parser)]
struct UpdateArgs {
    /// ID or name
    #[arg(value_name = "ID|NAME")]
    key: String,
    /// New name
    #[arg(long)]
    name: Option<String>,
    #[command(flatten)]
    fields: ScheduleFields,
    #[command(flatten)]
    payload: PayloadOptions,
    #[command(flatten)]
    output: OutputOptions,
    #[command(flatten)]
    remote: RemoteOptions,
}

pub struct ExecuteSchedulesCommand;

#[async_trait(?Send)]
impl Handler for ExecuteSchedulesCommand {
    fn name(&self) -> &'static str {
        "execute-schedules"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["schedules"]
    }

    fn description(&self) -> &'static str {
        "View and manage execute schedules"
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
            "list" => {
                let args: ListArgs = parse_args("execute-schedules list", args)?;
                resource::list(ctx, &SPEC, args).await
            }
            "get" => {
                let args: GetArgs = parse_args("execute-schedules get", args)?;
                resource::get(ctx, &SPEC, args).await
            }
            "add" => {
                let args: AddArgs = parse_args("execute-schedules add", args)?;
                if args.payload.is_empty() && (args.name.is_none() || args.fields.cron.is_none()) {
                    return Err(Error::Usage(
                        "execute-schedules add requires a NAME and --cron, or --payload"
                            .to_string(),
                    ));
                }
                let typed = args.fields.into_map(args.name);
                resource::create(ctx, &SPEC, typed, &args.payload, &args.output, &args.remote)
                    .await
            }
            "update" => {
                let args: UpdateArgs = parse_args("execute-schedules update", args)?;
                let typed = args.fields.into_map(args.name);
                resource::update(
                    ctx,
                    &SPEC,
                    &args.key,
                    typed,
                    &args.payload,
                    &args.output,
                    &args.remote,
                )
                .await
            }
            "remove" => {
                let args: RemoveArgs = parse_args("execute-schedules remove", args)?;
                resource::remove(ctx, &SPEC, args).await
            }
            other => Err(Error::Usage(format!("Unknown subcommand '{}'", other))),
        }
    }
}
