//! Shared list/get/add/update/remove flows for `/api/<resource>` commands
//!
//! Resource commands describe themselves with a [`ResourceSpec`] and
//! delegate the common subcommands here.

use clap::Parser;
use serde_json::{Map, Value};

use super::CommandContext;
use crate::api::resources::{records, Endpoint, ResourceInterface};
use crate::api::{Lookup, Reply};
use crate::error::{Error, Result};
use crate::options::{ConfirmOptions, ListOptions, OutputOptions, PayloadOptions, RemoteOptions};
use crate::render::{self, Column, Format};

/// Description of one resource type
#[derive(Debug, Clone, Copy)]
pub struct ResourceSpec {
    pub endpoint: Endpoint,
    /// Singular display name, e.g. `Certificate`
    pub label: &'static str,
    /// Plural display name, e.g. `Certificates`
    pub plural_label: &'static str,
    pub columns: &'static [Column],
    pub detail_columns: &'static [Column],
}

#[derive(Debug, Parser)]
pub struct ListArgs {
    #[command(flatten)]
    pub list: ListOptions,
    #[command(flatten)]
    pub output: OutputOptions,
    #[command(flatten)]
    pub remote: RemoteOptions,
}

#[derive(Debug, Parser)]
pub struct GetArgs {
    /// ID or name
    #[arg(value_name = "ID|NAME")]
    pub key: String,
    #[command(flatten)]
    pub output: OutputOptions,
    #[command(flatten)]
    pub remote: RemoteOptions,
}

#[derive(Debug, Parser)]
pub struct RemoveArgs {
    /// ID or name
    #[arg(value_name = "ID|NAME")]
    pub key: String,
    #[command(flatten)]
    pub confirm: ConfirmOptions,
    #[command(flatten)]
    pub output: OutputOptions,
    #[command(flatten)]
    pub remote: RemoteOptions,
}

/// Result of resolving an id or name to a record
pub enum Located {
    Record(Value),
    /// Dry run: the lookup request was printed instead of sent
    Previewed,
}

pub async fn list(ctx: &mut CommandContext<'_>, spec: &ResourceSpec, args: ListArgs) -> Result<i32> {
    let client = ctx.api(&args.remote)?;
    let api = ResourceInterface::new(&client, spec.endpoint);
    let reply = api.list(args.list.to_query()).await?;
    let format = args.output.format();

    match reply {
        Reply::DryRun(request) => render::print_dry_run(ctx.out, &request, format, ctx.settings.coloring)?,
        Reply::Json(response) => {
            if !args.output.quiet {
                let rows = records(&response, spec.endpoint.plural);
                render::print_list(
                    ctx.out,
                    &response,
                    rows,
                    spec.columns,
                    format,
                    spec.plural_label,
                    ctx.settings.coloring,
                )?;
            }
        }
        Reply::Bytes(_) => return Err(unexpected_reply(spec)),
    }
    Ok(0)
}

pub async fn get(ctx: &mut CommandContext<'_>, spec: &ResourceSpec, args: GetArgs) -> Result<i32> {
    let client = ctx.api(&args.remote)?;
    let api = ResourceInterface::new(&client, spec.endpoint);
    let format = args.output.format();

    let record = match api.find(&args.key).await {
        Lookup::Found(Reply::Json(record)) => record,
        Lookup::Found(Reply::DryRun(request)) => {
            render::print_dry_run(ctx.out, &request, format, ctx.settings.coloring)?;
            return Ok(0);
        }
        Lookup::Found(Reply::Bytes(_)) => return Err(unexpected_reply(spec)),
        Lookup::NotFound => return Err(not_found(spec, &args.key)),
        Lookup::Error(e) => return Err(e),
    };

    if !args.output.quiet {
        print_record(ctx, spec, &record, format)?;
    }
    Ok(0)
}

/// Create a record from typed flag values merged with the payload map
pub async fn create(
    ctx: &mut CommandContext<'_>,
    spec: &ResourceSpec,
    typed: Map<String, Value>,
    payload: &PayloadOptions,
    output: &OutputOptions,
    remote: &RemoteOptions,
) -> Result<i32> {
    let body = crate::options::build(spec.endpoint.singular, typed, payload.payload_map()?);
    let client = ctx.api(remote)?;
    let api = ResourceInterface::new(&client, spec.endpoint);
    let reply = api.create(body).await?;
    finish_write(ctx, spec, reply, output, "created")
}

/// Update the record `key` with typed values merged with the payload map
pub async fn update(
    ctx: &mut CommandContext<'_>,
    spec: &ResourceSpec,
    key: &str,
    typed: Map<String, Value>,
    payload: &PayloadOptions,
    output: &OutputOptions,
    remote: &RemoteOptions,
) -> Result<i32> {
    let payload_map = payload.payload_map()?;
    if typed.is_empty() && payload_map.is_empty() {
        return Err(Error::Usage(format!(
            "Nothing to update. Pass {} fields as options or with --payload",
            spec.label.to_lowercase()
        )));
    }

    let client = ctx.api(remote)?;
    let api = ResourceInterface::new(&client, spec.endpoint);
    let record = match locate(ctx, &api, spec, key, output.format()).await? {
        Located::Record(record) => record,
        Located::Previewed => return Ok(0),
    };
    let id = record_id(spec, &record)?;

    let body = crate::options::build(spec.endpoint.singular, typed, payload_map);
    let reply = api.update(id, body).await?;
    finish_write(ctx, spec, reply, output, "updated")
}

pub async fn remove(ctx: &mut CommandContext<'_>, spec: &ResourceSpec, args: RemoveArgs) -> Result<i32> {
    let client = ctx.api(&args.remote)?;
    let api = ResourceInterface::new(&client, spec.endpoint);
    let format = args.output.format();

    let record = match locate(ctx, &api, spec, &args.key, format).await? {
        Located::Record(record) => record,
        Located::Previewed => return Ok(0),
    };
    let id = record_id(spec, &record)?;
    let name = display_name(&record, id);

    if !args.confirm.yes && !client.is_dry_run() {
        ctx.confirm(&format!(
            "Are you sure you want to delete the {} {}?",
            spec.label.to_lowercase(),
            name
        ))
        .await?;
    }

    match api.destroy(id, Vec::new()).await? {
        Reply::DryRun(request) => render::print_dry_run(ctx.out, &request, format, ctx.settings.coloring)?,
        Reply::Json(response) if matches!(format, Format::Json | Format::Yaml) => {
            render::print_structured(ctx.out, &response, format)?
        }
        _ if args.output.quiet => {}
        _ => writeln!(ctx.out, "{} {} removed", spec.label, name)?,
    }
    Ok(0)
}

/// Resolve `key` to a record for a write. In dry-run mode a numeric id is
/// used as is and a name prints its lookup request.
pub async fn locate(
    ctx: &mut CommandContext<'_>,
    api: &ResourceInterface<'_>,
    spec: &ResourceSpec,
    key: &str,
    format: Format,
) -> Result<Located> {
    if api.client().is_dry_run() {
        if let Ok(id) = key.parse::<u64>() {
            return Ok(Located::Record(serde_json::json!({ "id": id })));
        }
    }

    match api.find(key).await {
        Lookup::Found(Reply::Json(record)) => Ok(Located::Record(record)),
        Lookup::Found(Reply::DryRun(request)) => {
            render::print_dry_run(ctx.out, &request, format, ctx.settings.coloring)?;
            Ok(Located::Previewed)
        }
        Lookup::Found(Reply::Bytes(_)) => Err(unexpected_reply(spec)),
        Lookup::NotFound => Err(not_found(spec, key)),
        Lookup::Error(e) => Err(e),
    }
}

/// Print one record as a detail view, or JSON/YAML/CSV
pub fn print_record(
    ctx: &mut CommandContext<'_>,
    spec: &ResourceSpec,
    record: &Value,
    format: Format,
) -> Result<()> {
    match format {
        Format::Json | Format::Yaml => {
            let mut wrapped = Map::new();
            wrapped.insert(spec.endpoint.singular.to_string(), record.clone());
            render::print_structured(ctx.out, &Value::Object(wrapped), format)
        }
        Format::Csv => render::print_csv(ctx.out, std::slice::from_ref(record), spec.detail_columns),
        Format::Table => {
            render::print_title(ctx.out, &format!("{} Details", spec.label), ctx.settings.coloring)?;
            render::print_detail(ctx.out, record, spec.detail_columns)
        }
    }
}

fn finish_write(
    ctx: &mut CommandContext<'_>,
    spec: &ResourceSpec,
    reply: Reply,
    output: &OutputOptions,
    verb: &str,
) -> Result<i32> {
    let format = output.format();
    match reply {
        Reply::DryRun(request) => render::print_dry_run(ctx.out, &request, format, ctx.settings.coloring)?,
        Reply::Json(response) => match format {
            Format::Json | Format::Yaml => render::print_structured(ctx.out, &response, format)?,
            _ if output.quiet => {}
            _ => match response.get(spec.endpoint.singular) {
                Some(record) => {
                    writeln!(ctx.out, "{} {}", spec.label, verb)?;
                    print_record(ctx, spec, record, format)?;
                }
                None => writeln!(ctx.out, "{} {}", spec.label, verb)?,
            },
        },
        Reply::Bytes(_) => return Err(unexpected_reply(spec)),
    }
    Ok(0)
}

/// Numeric `id` of a record
pub fn record_id(spec: &ResourceSpec, record: &Value) -> Result<u64> {
    record
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::Other(format!("{} record has no id", spec.label)))
}

fn display_name(record: &Value, id: u64) -> String {
    match record.get("name").and_then(Value::as_str) {
        Some(name) => format!("'{}'", name),
        None => id.to_string(),
    }
}

pub fn not_found(spec: &ResourceSpec, key: &str) -> Error {
    Error::not_found(format!("{} {}", spec.label, key))
}

fn unexpected_reply(spec: &ResourceSpec) -> Error {
    Error::Other(format!(
        "Unexpected non-JSON response from {}",
        spec.endpoint.path
    ))
}

/// Insert `value` under `key` when present
pub fn put<T: Into<Value>>(map: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}
