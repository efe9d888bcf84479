use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use script_bridge::cmd::{self, GenerateArgs, InfoArgs, ListArgs, RunArgs};
use script_bridge::utils;

/// script-bridge - bridge an imaging application's operations into a remote
/// scripting host, and generate the stub scripts that register them.
///
/// Command layout:
///   script-bridge run <COMMAND> [--param k=v ...] [--param-file p.json] [--host "<spec>"] [--json]
///   script-bridge generate <DIR> [--all] [--json]
///   script-bridge list [--json]
///   script-bridge info <NAME> [--json]
///
/// Global flags / env:
///   -v / -vv                 Increase verbosity
///   -q / --quiet             Errors only
///   -c / --catalog PATH      Operation catalog (JSON or YAML)
///   SCRIPT_BRIDGE_CATALOG    Environment fallback if -c not provided
///   SCRIPT_BRIDGE_HOST       Environment fallback for run's --host
///
/// Host specs:
///   Application command (spawned headlessly): e.g. "imaging-app --plugins /opt/plugins"
///   Gateway URL (http/https/ws/wss): recognized, but no transport is
///   implemented yet; session creation against one fails cleanly
///
/// Examples:
///   script-bridge list -c catalog.json
///   script-bridge info op:blur -c catalog.json --json
///   script-bridge run op:blur -c catalog.json --host "imaging-app" --param sigma=2.5 --json
///   script-bridge generate ./stubs -c catalog.json
#[derive(Parser, Debug)]
#[command(
    name = "script-bridge",
    version,
    about = "Bridge imaging operations into a remote scripting host",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Operation catalog file (JSON or YAML)
    #[arg(short = 'c', long = "catalog", global = true, value_name = "PATH")]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch one operation against the execution host
    Run(RunArgs),

    /// Generate stub scripts for eligible operations
    Generate(GenerateArgs),

    /// List catalog operations
    List(ListArgs),

    /// Show one operation's descriptor and parameters
    Info(InfoArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    // Determine effective catalog (CLI flag > SCRIPT_BRIDGE_CATALOG env).
    // Existence is not checked here; each subcommand reports load failures
    // through its own output path so --json keeps its error envelope.
    let catalog = cli.catalog.clone().or_else(|| {
        std::env::var(cmd::shared::CATALOG_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
    });

    match cli.command {
        Commands::Run(args) => cmd::execute_run(args, catalog.as_deref()),
        Commands::Generate(args) => cmd::execute_generate(args, catalog.as_deref()),
        Commands::List(args) => cmd::execute_list(args, catalog.as_deref()),
        Commands::Info(args) => cmd::execute_info(args, catalog.as_deref()),
    }
}
