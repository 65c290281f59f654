//! dbt command-line construction and invocation.
use crate::paths::DBT_ALIAS;
use crate::session::{ProcessHandle, ProcessSession};
use crate::util::path_to_string;
use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;

/// Subcommands the lifecycle issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbtMode {
    Compile,
    /// `run --fail-fast`: the first failing model aborts the batch.
    Run,
}

impl DbtMode {
    pub fn subcommand(self) -> &'static str {
        match self {
            DbtMode::Compile => "compile",
            DbtMode::Run => "run",
        }
    }
}

impl fmt::Display for DbtMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subcommand())
    }
}

/// Flags shared by every invocation of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub profiles_dir: PathBuf,
    pub profile: String,
    pub models: String,
    pub debug: bool,
}

impl Invocation {
    /// Build `[-d] <subcommand> [--fail-fast] --profiles-dir <dir> --profile <name> -m <models>`.
    pub fn args(&self, mode: DbtMode) -> Result<Vec<String>> {
        let mut args = Vec::with_capacity(10);
        if self.debug {
            args.push("-d".to_string());
        }
        args.push(mode.subcommand().to_string());
        if mode == DbtMode::Run {
            args.push("--fail-fast".to_string());
        }
        args.push("--profiles-dir".to_string());
        args.push(path_to_string(&self.profiles_dir, "profiles dir")?);
        args.push("--profile".to_string());
        args.push(self.profile.clone());
        args.push("-m".to_string());
        args.push(self.models.trim().to_string());
        Ok(args)
    }
}

/// Run dbt to completion.
pub fn invoke<S: ProcessSession + ?Sized>(
    session: &mut S,
    invocation: &Invocation,
    mode: DbtMode,
) -> Result<()> {
    let args = invocation.args(mode)?;
    session
        .run(DBT_ALIAS, &args)
        .with_context(|| format!("could not run 'dbt {mode}'"))
}

/// Start `dbt run` without waiting for it.
pub fn dispatch<S: ProcessSession + ?Sized>(
    session: &mut S,
    invocation: &Invocation,
) -> Result<Box<dyn ProcessHandle>> {
    let args = invocation.args(DbtMode::Run)?;
    session
        .spawn(DBT_ALIAS, &args)
        .context("could not start dbt task")
}
