//! `datastores`: storage targets for virtual images and backups

use async_trait::async_trait;
use clap::{Args, Parser};
use serde_json::{json, Map, Value};

use super::resource::{self, put, GetArgs, ListArgs, RemoveArgs, ResourceSpec};
use super::{parse_args, CommandContext};
use crate::api::resources::Endpoint;
use crate::error::{Error, Result};
use crate::options::{OutputOptions, PayloadOptions, RemoteOptions};
use crate::registry::{Handler, Subcommand};
use crate::render::{col, Column};

const COLUMNS: [Column; 5] = [
    col("ID", "id"),
    col("NAME", "name"),
    col("TYPE", "type"),
    col("CLOUD", "zone.name"),
    col("ENABLED", "enabled"),
];

const DETAIL_COLUMNS: [Column; 8] = [
    col("ID", "id"),
    col("Name", "name"),
    col("Type", "type"),
    col("Cloud", "zone.name"),
    col("Storage Server", "storageServer.name"),
    col("Visibility", "visibility"),
    col("Active", "active"),
    col("Enabled", "enabled"),
];

const SPEC: ResourceSpec = ResourceSpec {
    endpoint: Endpoint {
        path: "/api/data-stores",
        singular: "datastore",
        plural: "datastores",
    },
    label: "Datastore",
    plural_label: "Datastores",
    columns: &COLUMNS,
    detail_columns: &DETAIL_COLUMNS,
};

static SUBCOMMANDS: [Subcommand; 5] = [
    Subcommand::new("list", "List datastores"),
    Subcommand::new("get", "Get datastore details"),
    Subcommand::new("add", "Add a datastore"),
    Subcommand::new("update", "Update a datastore"),
    Subcommand::new("remove", "Delete a datastore").with_aliases(&["delete"]),
];

#[derive(Debug, Args)]
struct DatastoreFields {
    /// Datastore type code, e.g. `generic`
    #[arg(short = 't', long = "type", value_name = "CODE")]
    kind: Option<String>,

    /// Cloud (zone) ID
    #[arg(long, value_name = "ID")]
    cloud: Option<u64>,

    /// Visibility: private or public
    #[arg(long)]
    visibility: Option<String>,

    /// Enable or disable the datastore
    #[arg(long)]
    enabled: Option<bool>,
}

impl DatastoreFields {
    fn into_map(self, name: Option<String>) -> Map<String, Value> {
        let mut map = Map::new();
        put(&mut map, "name", name);
        put(&mut map, "type", self.kind);
        put(&mut map, "zone", self.cloud.map(|id| json!({ "id": id })));
        put(&mut map, "visibility", self.visibility);
        put(&mut map, "enabled", self.enabled);
        map
    }
}

#[derive(Debug, Parser)]
struct AddArgs {
    /// Datastore name
    name: Option<String>,
    #[command(flatten)]
    fields: DatastoreFields,
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
    fields: DatastoreFields,
    #[command(flatten)]
    payload: PayloadOptions,
    #[command(flatten)]
    output: OutputOptions,
    #[command(flatten)]
    remote: RemoteOptions,
}

pub struct DatastoresCommand;

#[async_trait(?Send)]
impl Handler for DatastoresCommand {
    fn name(&self) -> &'static str {
        "datastores"
    }

    fn description(&self) -> &'static str {
        "View and manage datastores"
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
            "list" => resource::list(ctx, &SPEC, parse_args::<ListArgs>("datastores list", args)?).await,
            "get" => resource::get(ctx, &SPEC, parse_args::<GetArgs>("datastores get", args)?).await,
            "add" => {
                let args: AddArgs = parse_args("datastores add", args)?;
                if args.name.is_none() && args.payload.is_empty() {
                    return Err(Error::Usage(
                        "datastores add requires a NAME or --payload".to_string(),
                    ));
                }
                let typed = args.fields.into_map(args.name);
                resource::create(ctx, &SPEC, typed, &args.payload, &args.output, &args.remote)
                    .await
            }
            "update" => {
                let args: UpdateArgs = parse_args("datastores update", args)?;
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
                resource::remove(ctx, &SPEC, parse_args::<RemoveArgs>("datastores remove", args)?)
                    .await
            }
            other => Err(Error::Usage(format!("Unknown subcommand '{}'", other))),
        }
    }
}
