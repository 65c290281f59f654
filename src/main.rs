use anyhow::Result;
use clap::Parser;
use dbtctl::cli::{Command, InvokeArgs, RootArgs};
use dbtctl::config::{load_config, resolve_cache_root};
use dbtctl::profile::load_connections;
use dbtctl::Dbt;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    let cache_root = resolve_cache_root(args.home.as_deref())?;
    match args.command {
        Command::Init(init) => {
            let mut dbt = open(&init.project.config, &cache_root)?;
            let connections = load_connections(&init.connections)?;
            dbt.init(&connections)?;
            print_project(&dbt);
        }
        Command::Compile(invoke) => {
            let mut dbt = prepare(&invoke, &cache_root)?;
            dbt.compile()?;
            print_artifacts(&dbt);
        }
        Command::Run(invoke) => {
            let mut dbt = prepare(&invoke, &cache_root)?;
            dbt.run()?;
            print_artifacts(&dbt);
        }
        Command::Start(start) => {
            let mut dbt = prepare(&start.invoke, &cache_root)?;
            let mut handle = dbt.start()?;
            if start.wait {
                handle.wait()?;
                dbt.collect()?;
                print_artifacts(&dbt);
            } else {
                println!("dispatched dbt run (pid {})", handle.id());
                println!("dbt output follows on this terminal; run `dbtctl collect` once it exits");
            }
        }
        Command::Collect(collect) => {
            let mut dbt = open(&collect.project.config, &cache_root)?;
            dbt.attach()?;
            dbt.collect()?;
            print_artifacts(&dbt);
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open(config_path: &Path, cache_root: &Path) -> Result<Dbt> {
    let config = load_config(config_path)?;
    Ok(Dbt::new(config, cache_root.to_path_buf()))
}

/// Initialize, or attach when `--skip-init` is set.
fn prepare(args: &InvokeArgs, cache_root: &Path) -> Result<Dbt> {
    let mut dbt = open(&args.project.config, cache_root)?;
    match &args.connections {
        Some(connections) if !args.skip_init => {
            let connections = load_connections(connections)?;
            dbt.init(&connections)?;
        }
        _ => dbt.attach()?,
    }
    Ok(dbt)
}

fn print_project(dbt: &Dbt) {
    if let Some(path) = dbt.project_path() {
        println!("project: {}", path.display());
    }
    if let Some(home) = dbt.home_path() {
        println!("profiles: {}", home.display());
    }
    println!("state: {}", dbt.state());
}

fn print_artifacts(dbt: &Dbt) {
    print_project(dbt);
    if let Some(manifest) = dbt.manifest() {
        println!(
            "manifest: {} nodes (dbt {})",
            manifest.node_count(),
            manifest.dbt_version().unwrap_or("unknown")
        );
    }
    if let Some(run_result) = dbt.run_result() {
        let counts = run_result
            .status_counts()
            .into_iter()
            .map(|(status, count)| format!("{status}={count}"))
            .collect::<Vec<_>>();
        println!("results: {}", counts.join(" "));
    }
}
