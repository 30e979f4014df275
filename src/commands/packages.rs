//! `packages`: installable `.morpkg` bundles of library items
//!
//! Package files are opaque here. `install` uploads the bytes as they are
//! and `export` writes back whatever the appliance returns.

use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use clap::Parser;
use reqwest::Method;
use serde_json::json;

use super::{parse_args, CommandContext};
use crate::api::resources::records;
use crate::api::{Lookup, Reply};
use crate::error::{Error, Result};
use crate::options::{ConfirmOptions, ListOptions, OutputOptions, RemoteOptions};
use crate::registry::{Handler, Subcommand};
use crate::render::{self, col, Column, Format};

const BASE_PATH: &str = "/api/packages";

const OCTET_STREAM: &str = "application/octet-stream";

const COLUMNS: [Column; 5] = [
    col("CODE", "code"),
    col("NAME", "name"),
    col("VERSION", "version"),
    col("DESCRIPTION", "description"),
    col("INSTALLED", "dateCreated"),
];

static SUBCOMMANDS: [Subcommand; 4] = [
    Subcommand::new("list", "List installed packages"),
    Subcommand::new("install", "Install a package file"),
    Subcommand::new("export", "Download a package file"),
    Subcommand::new("remove", "Uninstall a package").with_aliases(&["uninstall"]),
];

#[derive(Debug, Parser)]
struct ListArgs {
    #[command(flatten)]
    list: ListOptions,
    #[command(flatten)]
    output: OutputOptions,
    #[command(flatten)]
    remote: RemoteOptions,
}

#[derive(Debug, Parser)]
struct InstallArgs {
    /// Package file (`.morpkg`)
    file: PathBuf,
    #[command(flatten)]
    output: OutputOptions,
    #[command(flatten)]
    remote: RemoteOptions,
}

#[derive(Debug, Parser)]
struct ExportArgs {
    /// Package code
    code: String,
    /// Package version, defaults to the installed one
    #[arg(long)]
    version: Option<String>,
    /// Destination file, defaults to `<code>.morpkg`
    #[arg(short = 'f', long, value_name = "FILE")]
    file: Option<PathBuf>,
    /// Replace the destination file if it exists
    #[arg(long)]
    overwrite: bool,
    #[command(flatten)]
    output: OutputOptions,
    #[command(flatten)]
    remote: RemoteOptions,
}

#[derive(Debug, Parser)]
struct RemoveArgs {
    /// Package code
    code: String,
    #[command(flatten)]
    confirm: ConfirmOptions,
    #[command(flatten)]
    output: OutputOptions,
    #[command(flatten)]
    remote: RemoteOptions,
}

pub struct PackagesCommand;

impl PackagesCommand {
    async fn list(&self, ctx: &mut CommandContext<'_>, args: ListArgs) -> Result<i32> {
        let client = ctx.api(&args.remote)?;
        let spec = client
            .request(Method::GET, BASE_PATH)
            .query(args.list.to_query());
        let format = args.output.format();

        match client.execute(spec).await? {
            Reply::DryRun(request) => {
                render::print_dry_run(ctx.out, &request, format, ctx.settings.coloring)?
            }
            Reply::Json(response) if !args.output.quiet => {
                let rows = records(&response, "packages");
                render::print_list(
                    ctx.out,
                    &response,
                    rows,
                    &COLUMNS,
                    format,
                    "Packages",
                    ctx.settings.coloring,
                )?;
            }
            _ => {}
        }
        Ok(0)
    }

    async fn install(&self, ctx: &mut CommandContext<'_>, args: InstallArgs) -> Result<i32> {
        let data = fs::read(&args.file).map_err(|e| {
            Error::Usage(format!("Cannot read {}: {}", args.file.display(), e))
        })?;
        debug!("Uploading {} ({} bytes)", args.file.display(), data.len());

        let client = ctx.api(&args.remote)?;
        let spec = client
            .request(Method::POST, &format!("{}/install", BASE_PATH))
            .bytes(OCTET_STREAM, data);
        let format = args.output.format();

        match client.execute(spec).await? {
            Reply::DryRun(request) => {
                render::print_dry_run(ctx.out, &request, format, ctx.settings.coloring)?
            }
            Reply::Json(response) if matches!(format, Format::Json | Format::Yaml) => {
                render::print_structured(ctx.out, &response, format)?
            }
            _ if args.output.quiet => {}
            _ => writeln!(ctx.out, "Installed package {}", args.file.display())?,
        }
        Ok(0)
    }

    async fn export(&self, ctx: &mut CommandContext<'_>, args: ExportArgs) -> Result<i32> {
        let destination = args
            .file
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.morpkg", args.code)));
        if destination.exists() && !args.overwrite {
            return Err(Error::Usage(format!(
                "{} already exists. Use --overwrite to replace it",
                destination.display()
            )));
        }

        let mut body = json!({ "code": args.code });
        if let Some(version) = &args.version {
            body["version"] = json!(version);
        }

        let client = ctx.api(&args.remote)?;
        let spec = client
            .request(Method::POST, &format!("{}/export", BASE_PATH))
            .json(body);
        let format = args.output.format();

        let data = match client.execute(spec).await? {
            Reply::DryRun(request) => {
                render::print_dry_run(ctx.out, &request, format, ctx.settings.coloring)?;
                return Ok(0);
            }
            Reply::Bytes(data) => data,
            // Some appliances label the archive as JSON; keep the raw text
            Reply::Json(value) => serde_json::to_vec(&value)?,
        };

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&destination, &data)?;
        info!("Exported package {} to {}", args.code, destination.display());

        if !args.output.quiet {
            writeln!(
                ctx.out,
                "Exported package {} to {} ({} bytes)",
                args.code,
                destination.display(),
                data.len()
            )?;
        }
        Ok(0)
    }

    async fn remove(&self, ctx: &mut CommandContext<'_>, args: RemoveArgs) -> Result<i32> {
        let client = ctx.api(&args.remote)?;
        if !args.confirm.yes && !client.is_dry_run() {
            ctx.confirm(&format!(
                "Are you sure you want to uninstall the package {}?",
                args.code
            ))
            .await?;
        }

        let spec = client.request(Method::DELETE, &format!("{}/{}", BASE_PATH, args.code));
        let format = args.output.format();
        let lookup: Lookup<Reply> = client.execute(spec).await.into();

        match lookup.into_result(|| format!("Package {}", args.code))? {
            Reply::DryRun(request) => {
                render::print_dry_run(ctx.out, &request, format, ctx.settings.coloring)?
            }
            Reply::Json(response) if matches!(format, Format::Json | Format::Yaml) => {
                render::print_structured(ctx.out, &response, format)?
            }
            _ if args.output.quiet => {}
            _ => writeln!(ctx.out, "Package {} removed", args.code)?,
        }
        Ok(0)
    }
}

#[async_trait(?Send)]
impl Handler for PackagesCommand {
    fn name(&self) -> &'static str {
        "packages"
    }

    fn description(&self) -> &'static str {
        "Install, export and remove packages"
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
            "list" => self.list(ctx, parse_args("packages list", args)?).await,
            "install" => self.install(ctx, parse_args("packages install", args)?).await,
            "export" => self.export(ctx, parse_args("packages export", args)?).await,
            "remove" => self.remove(ctx, parse_args("packages remove", args)?).await,
            other => Err(Error::Usage(format!("Unknown subcommand '{}'", other))),
        }
    }
}
