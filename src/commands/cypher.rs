//! `cypher`: the appliance's key/value secret store
//!
//! Keys are paths such as `secret/db-password`; the mount (`secret`,
//! `password`, `uuid`, ...) decides how the appliance treats the value.

use async_trait::async_trait;
use clap::Parser;
use reqwest::Method;
use serde_json::{json, Value};

use super::resource::put;
use super::{parse_args, CommandContext};
use crate::api::resources::records;
use crate::api::{Lookup, Reply};
use crate::error::{Error, Result};
use crate::options::{ConfirmOptions, ListOptions, OutputOptions, PayloadOptions, RemoteOptions};
use crate::registry::{Handler, Subcommand};
use crate::render::{self, col, Column, Format};

const BASE_PATH: &str = "/api/cypher";

const COLUMNS: [Column; 5] = [
    col("ID", "id"),
    col("KEY", "itemKey"),
    col("LEASE REMAINING", "leaseTimeout"),
    col("EXPIRES", "expireDate"),
    col("LAST ACCESSED", "lastAccessed"),
];

const DETAIL_COLUMNS: [Column; 5] = [
    col("Key", "itemKey"),
    col("Type", "type"),
    col("Lease Duration", "lease_duration"),
    col("Expires", "expireDate"),
    col("Value", "data"),
];

static SUBCOMMANDS: [Subcommand; 4] = [
    Subcommand::new("list", "List cypher keys"),
    Subcommand::new("get", "Read a cypher key"),
    Subcommand::new("put", "Store a value under a key").with_aliases(&["set"]),
    Subcommand::new("remove", "Delete a cypher key").with_aliases(&["delete"]),
];

#[derive(Debug, Parser)]
struct ListArgs {
    /// Only keys under this path, e.g. `secret/`
    #[arg(value_name = "PATH")]
    prefix: Option<String>,
    #[command(flatten)]
    list: ListOptions,
    #[command(flatten)]
    output: OutputOptions,
    #[command(flatten)]
    remote: RemoteOptions,
}

#[derive(Debug, Parser)]
struct GetArgs {
    /// Key path
    key: String,
    /// Print only the decrypted value
    #[arg(long)]
    value: bool,
    #[command(flatten)]
    output: OutputOptions,
    #[command(flatten)]
    remote: RemoteOptions,
}

#[derive(Debug, Parser)]
struct PutArgs {
    /// Key path
    key: String,
    /// Value to store
    value: Option<String>,
    /// Lease time to live, e.g. `30m`, `12h`, `0` for none
    #[arg(long)]
    ttl: Option<String>,
    #[command(flatten)]
    payload: PayloadOptions,
    #[command(flatten)]
    output: OutputOptions,
    #[command(flatten)]
    remote: RemoteOptions,
}

#[derive(Debug, Parser)]
struct RemoveArgs {
    /// Key path
    key: String,
    #[command(flatten)]
    confirm: ConfirmOptions,
    #[command(flatten)]
    output: OutputOptions,
    #[command(flatten)]
    remote: RemoteOptions,
}

fn key_path(key: &str) -> String {
    format!("{}/{}", BASE_PATH, key.trim_start_matches('/'))
}

pub struct CypherCommand;

impl CypherCommand {
    async fn list(&self, ctx: &mut CommandContext<'_>, args: ListArgs) -> Result<i32> {
        let client = ctx.api(&args.remote)?;
        let path = match &args.prefix {
            Some(prefix) => key_path(prefix),
            None => BASE_PATH.to_string(),
        };
        let spec = client
            .request(Method::GET, &path)
            .query(args.list.to_query());
        let format = args.output.format();

        match client.execute(spec).await? {
            Reply::DryRun(request) => {
                render::print_dry_run(ctx.out, &request, format, ctx.settings.coloring)?
            }
            Reply::Json(response) if !args.output.quiet => {
                let rows = records(&response, "cyphers");
                render::print_list(
                    ctx.out,
                    &response,
                    rows,
                    &COLUMNS,
                    format,
                    "Cypher Keys",
                    ctx.settings.coloring,
                )?;
            }
            _ => {}
        }
        Ok(0)
    }

    async fn get(&self, ctx: &mut CommandContext<'_>, args: GetArgs) -> Result<i32> {
        let client = ctx.api(&args.remote)?;
        let spec = client.request(Method::GET, &key_path(&args.key));
        let format = args.output.format();

        let lookup: Lookup<Reply> = client.execute(spec).await.into();
        let response = match lookup.into_result(|| format!("Cypher key {}", args.key))? {
            Reply::DryRun(request) => {
                render::print_dry_run(ctx.out, &request, format, ctx.settings.coloring)?;
                return Ok(0);
            }
            reply => reply.into_json(),
        };

        if args.output.quiet {
            return Ok(0);
        }
        if args.value {
            writeln!(ctx.out, "{}", render::cell_text(response.get("data")))?;
            return Ok(0);
        }

        match format {
            Format::Json | Format::Yaml => render::print_structured(ctx.out, &response, format)?,
            _ => {
                let mut record = response.get("cypher").cloned().unwrap_or_else(|| json!({}));
                if let Value::Object(map) = &mut record {
                    map.entry("itemKey").or_insert_with(|| json!(args.key));
                    for key in ["type", "lease_duration", "data"] {
                        if let Some(value) = response.get(key) {
                            map.insert(key.to_string(), value.clone());
                        }
                    }
                }
                if format == Format::Csv {
                    render::print_csv(ctx.out, std::slice::from_ref(&record), &DETAIL_COLUMNS)?;
                } else {
                    render::print_title(ctx.out, "Cypher Key", ctx.settings.coloring)?;
                    render::print_detail(ctx.out, &record, &DETAIL_COLUMNS)?;
                }
            }
        }
        Ok(0)
    }

    async fn put(&self, ctx: &mut CommandContext<'_>, args: PutArgs) -> Result<i32> {
        let mut typed = serde_json::Map::new();
        put(&mut typed, "value", args.value);
        let payload = args.payload.payload_map()?;
        if typed.is_empty() && payload.is_empty() {
            return Err(Error::Usage(
                "cypher put requires a VALUE or --payload".to_string(),
            ));
        }

        // Cypher bodies are not wrapped in a resource key
        let mut body = typed;
        body.extend(payload);

        let client = ctx.api(&args.remote)?;
        let mut query = Vec::new();
        if let Some(ttl) = args.ttl {
            query.push(("ttl".to_string(), ttl));
        }
        let spec = client
            .request(Method::PUT, &key_path(&args.key))
            .query(query)
            .json(Value::Object(body));
        let format = args.output.format();

        match client.execute(spec).await? {
            Reply::DryRun(request) => {
                render::print_dry_run(ctx.out, &request, format, ctx.settings.coloring)?
            }
            Reply::Json(response) if matches!(format, Format::Json | Format::Yaml) => {
                render::print_structured(ctx.out, &response, format)?
            }
            _ if args.output.quiet => {}
            _ => writeln!(ctx.out, "Wrote cypher key {}", args.key)?,
        }
        Ok(0)
    }

    async fn remove(&self, ctx: &mut CommandContext<'_>, args: RemoveArgs) -> Result<i32> {
        let client = ctx.api(&args.remote)?;
        if !args.confirm.yes && !client.is_dry_run() {
            ctx.confirm(&format!(
                "Are you sure you want to delete the cypher key {}?",
                args.key
            ))
            .await?;
        }

        let spec = client.request(Method::DELETE, &key_path(&args.key));
        let format = args.output.format();
        let lookup: Lookup<Reply> = client.execute(spec).await.into();

        match lookup.into_result(|| format!("Cypher key {}", args.key))? {
            Reply::DryRun(request) => {
                render::print_dry_run(ctx.out, &request, format, ctx.settings.coloring)?
            }
            Reply::Json(response) if matches!(format, Format::Json | Format::Yaml) => {
                render::print_structured(ctx.out, &response, format)?
            }
            _ if args.output.quiet => {}
            _ => writeln!(ctx.out, "Cypher key {} removed", args.key)?,
        }
        Ok(0)
    }
}

#[async_trait(?Send)]
impl Handler for CypherCommand {
    fn name(&self) -> &'static str {
        "cypher"
    }

    fn description(&self) -> &'static str {
        "Read and write secrets in the cypher store"
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
            "list" => self.list(ctx, parse_args("cypher list", args)?).await,
            "get" => self.get(ctx, parse_args("cypher get", args)?).await,
            "put" => self.put(ctx, parse_args("cypher put", args)?).await,
            "remove" => self.remove(ctx, parse_args("cypher remove", args)?).await,
            other => Err(Error::Usage(format!("Unknown subcommand '{}'", other))),
        }
    }
}
