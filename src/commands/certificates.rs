//! `certificates`: SSL certificates stored on the appliance

use std::fs;
use std::path::PathBuf;

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

const COLUMNS: [Column; 5] = [
    col("ID", "id"),
    col("NAME", "name"),
    col("DOMAIN", "domainName"),
    col("TYPE", "certType"),
    col("WILDCARD", "wildcard"),
];

const DETAIL_COLUMNS: [Column; 8] = [
    col("ID", "id"),
    col("Name", "name"),
    col("Description", "description"),
    col("Domain", "domainName"),
    col("Type", "certType"),
    col("Wildcard", "wildcard"),
    col("Created", "dateCreated"),
    col("Updated", "lastUpdated"),
];

const SPEC: ResourceSpec = ResourceSpec {
    endpoint: Endpoint {
        path: "/api/certificates",
        singular: "certificate",
        plural: "certificates",
    },
    label: "Certificate",
    plural_label: "Certificates",
    columns: &COLUMNS,
    detail_columns: &DETAIL_COLUMNS,
};

static SUBCOMMANDS: [Subcommand; 5] = [
    Subcommand::new("list", "List certificates"),
    Subcommand::new("get", "Get certificate details"),
    Subcommand::new("add", "Add a certificate"),
    Subcommand::new("update", "Update a certificate"),
    Subcommand::new("remove", "Delete a certificate").with_aliases(&["delete"]),
];

/// Certificate fields shared by `add` and `update`
#[derive(Debug, Args)]
struct CertificateFields {
    /// Description
    #[arg(long)]
    description: Option<String>,

    /// Domain name the certificate covers
    #[arg(long = "domain-name", value_name = "DOMAIN")]
    domain_name: Option<String>,

    /// PEM certificate file
    #[arg(long = "cert-file", value_name = "FILE")]
    cert_file: Option<PathBuf>,

    /// PEM private key file
    #[arg(long = "key-file", value_name = "FILE")]
    key_file: Option<PathBuf>,

    /// Wildcard certificate
    #[arg(long)]
    wildcard: Option<bool>,
}

impl CertificateFields {
    fn into_map(self, name: Option<String>) -> Result<Map<String, Value>> {
        let mut map = Map::new();
        put(&mut map, "name", name);
        put(&mut map, "description", self.description);
        put(&mut map, "domainName", self.domain_name);
        put(&mut map, "certFile", read_pem(self.cert_file)?);
        put(&mut map, "keyFile", read_pem(self.key_file)?);
        put(&mut map, "wildcard", self.wildcard);
        Ok(map)
    }
}

#[derive(Debug, Parser)]
struct AddArgs {
    /// Certificate name
    name: Option<String>,
    #[command(flatten)]
    fields: CertificateFields,
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
    fields: CertificateFields,
    #[command(flatten)]
    payload: PayloadOptions,
    #[command(flatten)]
    output: OutputOptions,
    #[command(flatten)]
    remote: RemoteOptions,
}

fn read_pem(path: Option<PathBuf>) -> Result<Option<String>> {
    path.map(|p| {
        fs::read_to_string(&p)
            .map_err(|e| Error::Usage(format!("Cannot read {}: {}", p.display(), e)))
    })
    .transpose()
}

pub struct CertificatesCommand;

#[async_trait(?Send)]
impl Handler for CertificatesCommand {
    fn name(&self) -> &'static str {
        "certificates"
    }

    fn description(&self) -> &'static str {
        "View and manage SSL certificates"
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
                let args: ListArgs = parse_args("certificates list", args)?;
                resource::list(ctx, &SPEC, args).await
            }
            "get" => {
                let args: GetArgs = parse_args("certificates get", args)?;
                resource::get(ctx, &SPEC, args).await
            }
            "add" => {
                let args: AddArgs = parse_args("certificates add", args)?;
                if args.name.is_none() && args.payload.is_empty() {
                    return Err(Error::Usage(
                        "certificates add requires a NAME or --payload".to_string(),
                    ));
                }
                let typed = args.fields.into_map(args.name)?;
                resource::create(ctx, &SPEC, typed, &args.payload, &args.output, &args.remote)
                    .await
            }
            "update" => {
                let args: UpdateArgs = parse_args("certificates update", args)?;
                let typed = args.fields.into_map(args.name)?;
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
                let args: RemoveArgs = parse_args("certificates remove", args)?;
                resource::remove(ctx, &SPEC, args).await
            }
            other => Err(Error::Usage(format!("Unknown subcommand '{}'", other))),
        }
    }
}
