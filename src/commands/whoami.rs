//! `whoami`: the user and account behind the current token

use async_trait::async_trait;
use clap::Parser;
use reqwest::Method;

use super::{parse_args, CommandContext};
use crate::api::Reply;
use crate::error::Result;
use crate::options::{OutputOptions, RemoteOptions};
use crate::registry::Handler;
use crate::render::{self, col, Column, Format};

const USER_COLUMNS: [Column; 6] = [
    col("ID", "user.id"),
    col("Account", "user.account.name"),
    col("Username", "user.username"),
    col("Name", "user.displayName"),
    col("Email", "user.email"),
    col("Roles", "user.roles"),
];

#[derive(Debug, Parser)]
struct WhoamiArgs {
    /// Print only the username
    #[arg(long)]
    name: bool,
    #[command(flatten)]
    output: OutputOptions,
    #[command(flatten)]
    remote: RemoteOptions,
}

pub struct WhoamiCommand;

#[async_trait(?Send)]
impl Handler for WhoamiCommand {
    fn name(&self) -> &'static str {
        "whoami"
    }

    fn description(&self) -> &'static str {
        "Show the current user of the active remote"
    }

    async fn handle(
        &self,
        ctx: &mut CommandContext<'_>,
        _subcommand: Option<&str>,
        args: &[String],
    ) -> Result<i32> {
        let args: WhoamiArgs = parse_args("whoami", args)?;
        let client = ctx.api(&args.remote)?;
        let spec = client.request(Method::GET, "/api/whoami");
        let format = args.output.format();

        let response = match client.execute(spec).await? {
            Reply::DryRun(request) => {
                render::print_dry_run(ctx.out, &request, format, ctx.settings.coloring)?;
                return Ok(0);
            }
            reply => reply.into_json(),
        };

        if args.output.quiet {
            return Ok(0);
        }
        if args.name {
            let username = render::cell_text(render::lookup(&response, "user.username"));
            writeln!(ctx.out, "{}", username)?;
            return Ok(0);
        }

        match format {
            Format::Json | Format::Yaml => render::print_structured(ctx.out, &response, format)?,
            Format::Csv => {
                render::print_csv(ctx.out, std::slice::from_ref(&response), &USER_COLUMNS)?
            }
            Format::Table => {
                let title = format!("Current User [{}]", client.remote());
                render::print_title(ctx.out, &title, ctx.settings.coloring)?;
                render::print_detail(ctx.out, &response, &USER_COLUMNS)?;
            }
        }
        Ok(0)
    }
}
