// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Command-line interface for the inventory refresher.
//!
//! `run` (the default) keeps the inventory fresh until the process is
//! stopped; `once` executes a single refresh cycle and prints the published
//! snapshot as JSON.

use std::{io, path::PathBuf, process, sync::Arc};

use clap::{ArgAction, Args, Parser, Subcommand};
use gha_inventory::{
    Error, ExporterConfig, OctocrabApi, Overrides, PublishedSnapshot, RateLimitedClient,
    RefreshScheduler, load_config, split_list,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Keeps GitHub repository and workflow inventories fresh for exporters.
#[derive(Debug, Parser,)]
#[command(name = "gha-inventory", version, about = "Refresh GitHub Actions repository inventories")]
struct Cli
{
    #[command(subcommand)]
    command: Option<Command,>,

    #[command(flatten)]
    settings: Settings,
}

#[derive(Debug, Subcommand,)]
/// Supported commands exposed by the CLI.
enum Command
{
    /// Refresh the inventory forever.
    Run,
    /// Run a single refresh cycle and print the snapshot.
    Once(OnceArgs,),
}

#[derive(Debug, Args,)]
struct OnceArgs
{
    /// Output formatted JSON for easier inspection.
    #[arg(long = "pretty", action = ArgAction::SetTrue)]
    pretty: bool,
}

/// Options shared by every command.
#[derive(Debug, Args, Default,)]
struct Settings
{
    /// Optional YAML configuration document.
    #[arg(long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf,>,

    /// GitHub token used for every request.
    #[arg(long = "token", env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    token: Option<String,>,

    /// Comma separated organizations to inventory.
    #[arg(long = "organizations", env = "GITHUB_ORGAS", value_name = "LIST", global = true)]
    organizations: Option<String,>,

    /// Comma separated `owner/name` repositories; overrides organizations.
    #[arg(long = "repositories", env = "GITHUB_REPOS", value_name = "LIST", global = true)]
    repositories: Option<String,>,

    /// Base refresh interval in seconds.
    #[arg(long = "refresh", env = "GITHUB_REFRESH", value_name = "SECONDS", global = true)]
    refresh: Option<u64,>,

    /// GitHub Enterprise Server API base URL.
    #[arg(long = "api-url", env = "GITHUB_API_URL", value_name = "URL", global = true)]
    api_url: Option<String,>,

    /// Enterprise slug.
    #[arg(long = "enterprise-name", env = "ENTERPRISE_NAME", global = true)]
    enterprise_name: Option<String,>,

    /// Comma separated workflow run label fields.
    #[arg(long = "workflow-fields", env = "EXPORT_FIELDS", value_name = "LIST", global = true)]
    workflow_fields: Option<String,>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long = "log-level", default_value = "info", global = true)]
    log_level: String,
}

impl Settings
{
    fn overrides(&self,) -> Overrides
    {
        Overrides {
            organizations:   self.organizations.as_deref().map(split_list,),
            repositories:    self.repositories.as_deref().map(split_list,),
            refresh:         self.refresh,
            enterprise_name: self.enterprise_name.clone(),
            api_url:         self.api_url.clone(),
            workflow_fields: self.workflow_fields.clone(),
        }
    }
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main]
async fn main()
{
    let cli = Cli::parse();
    init_tracing(&cli.settings.log_level,);

    if let Err(error,) = run(cli,).await {
        eprintln!("{}", error.to_display_string());
        process::exit(1,);
    }
}

fn init_tracing(level: &str,)
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level,),);
    tracing_subscriber::fmt().with_env_filter(filter,).with_target(false,).with_writer(io::stderr,).init();
}

/// Executes the CLI using parsed arguments.
///
/// # Errors
///
/// Propagates configuration, validation and client construction errors.
/// Failures inside refresh cycles are logged and never returned.
async fn run(cli: Cli,) -> Result<(), Error,>
{
    let config = resolve_config(&cli.settings,)?;
    let token = require_token(cli.settings.token.as_deref(),)?;
    let api = OctocrabApi::from_token(token, config.github.api_url.as_deref(),)?;
    let client = RateLimitedClient::new(Arc::new(api,),)
        .with_per_page(config.github.per_page,);
    let scheduler = RefreshScheduler::new(client, &config,);

    match cli.command {
        None | Some(Command::Run,) => {
            scheduler.run().await;
            Ok((),)
        }
        Some(Command::Once(args,),) => {
            let report = scheduler.run_cycle().await;
            info!("Cycle finished with {} published repositories", report.published);

            let snapshot = scheduler.reader().load();
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            write_snapshot(&mut handle, &snapshot, args.pretty,)
        }
    }
}

/// Loads the optional configuration file, applies overrides and validates.
fn resolve_config(settings: &Settings,) -> Result<ExporterConfig, Error,>
{
    let document = match settings.config.as_deref() {
        Some(path,) => load_config(path,)?,
        None => ExporterConfig::default(),
    };
    let config = document.apply(settings.overrides(),);
    config.validate()?;
    Ok(config,)
}

fn require_token(token: Option<&str,>,) -> Result<&str, Error,>
{
    token
        .map(str::trim,)
        .filter(|value| !value.is_empty(),)
        .ok_or_else(|| Error::validation("missing GitHub token: pass --token or set GITHUB_TOKEN",),)
}

fn write_snapshot<W: io::Write,>(
    writer: &mut W,
    snapshot: &PublishedSnapshot,
    pretty: bool,
) -> Result<(), Error,>
{
    if pretty {
        serde_json::to_writer_pretty(writer, snapshot,)?;
    } else {
        serde_json::to_writer(writer, snapshot,)?;
    }

    Ok((),)
}
