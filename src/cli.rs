//! CLI argument parsing for the dbt lifecycle.
//!
//! The CLI is thin: every command loads one project config and drives a single
//! `Dbt` through the lifecycle.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "dbtctl",
    version,
    about = "Sync, provision and run dbt projects",
    after_help = "Examples:\n  dbtctl init --config project.yml --connections connections.yml\n  dbtctl run --config project.yml --skip-init\n  dbtctl start --config project.yml --skip-init --wait\n  dbtctl collect --config project.yml",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Cache root for repository checkouts (default: $DBTCTL_HOME or the local data dir)
    #[arg(long, value_name = "DIR", global = true)]
    pub home: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Lifecycle commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Init(InitArgs),
    /// Run `dbt compile` and collect artifacts
    Compile(InvokeArgs),
    /// Run `dbt run --fail-fast` and collect artifacts
    Run(InvokeArgs),
    Start(StartArgs),
    Collect(CollectArgs),
}

/// Project selection shared by every command.
#[derive(Args, Debug)]
pub struct ConfigArg {
    /// Project config (YAML)
    #[arg(long, value_name = "FILE")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
#[command(about = "Sync the repository, provision the runtime and write profiles")]
pub struct InitArgs {
    #[command(flatten)]
    pub project: ConfigArg,

    /// Connection descriptors (YAML list)
    #[arg(long, value_name = "FILE")]
    pub connections: PathBuf,
}

/// Inputs for commands that invoke dbt, initializing first unless skipped.
#[derive(Args, Debug)]
pub struct InvokeArgs {
    #[command(flatten)]
    pub project: ConfigArg,

    /// Connection descriptors (YAML list); required unless --skip-init
    #[arg(long, value_name = "FILE", required_unless_present = "skip_init")]
    pub connections: Option<PathBuf>,

    /// Reuse a previously initialized project instead of running init
    #[arg(long)]
    pub skip_init: bool,
}

#[derive(Args, Debug)]
#[command(
    about = "Dispatch dbt run without waiting for it",
    after_help = "Without --wait, dbt inherits this terminal's stdout and stderr and keeps writing to them after dbtctl exits. Gather its artifacts later with `dbtctl collect`."
)]
pub struct StartArgs {
    #[command(flatten)]
    pub invoke: InvokeArgs,

    /// Wait for the dispatched run, then collect its artifacts
    #[arg(long)]
    pub wait: bool,
}

#[derive(Args, Debug)]
#[command(about = "Collect artifacts from the project's target directory")]
pub struct CollectArgs {
    #[command(flatten)]
    pub project: ConfigArg,
}
