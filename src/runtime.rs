//! Isolated Python runtime for the dbt executable.
//!
//! Provisioning is safe to repeat: `python -m venv` reuses an existing
//! environment and the package install always runs with `-U`, so a stale
//! runtime is moved to the pinned (or latest) version.
use crate::config::ProjectConfig;
use crate::error::DbtError;
use crate::paths::{ProjectPaths, DBT_ALIAS, PROJECT_ALIAS};
use crate::session::ProcessSession;
use crate::util::path_to_string;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Interpreters tried in order when the config does not name one.
const PYTHON_CANDIDATES: [&str; 2] = ["python3", "python"];
const MISSING_VENV_MARKER: &str = "No module named venv";

/// Locate the interpreter used to create the runtime.
pub fn resolve_interpreter(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(name) = configured.map(str::trim).filter(|name| !name.is_empty()) {
        return which::which(name).map_err(|err| {
            DbtError::ProvisioningTool(format!("python interpreter {name:?} not found: {err}"))
                .into()
        });
    }
    PYTHON_CANDIDATES
        .iter()
        .find_map(|candidate| which::which(candidate).ok())
        .ok_or_else(|| {
            DbtError::ProvisioningTool(format!(
                "no python interpreter found on PATH (tried {})",
                PYTHON_CANDIDATES.join(", ")
            ))
            .into()
        })
}

/// The pip requirement for the configured package and optional pin.
pub fn package_spec(package: &str, version: Option<&str>) -> String {
    match version {
        Some(version) => format!("{package}=={version}"),
        None => package.to_string(),
    }
}

/// Create or refresh the runtime under `paths` and register its aliases.
pub fn provision<S: ProcessSession + ?Sized>(
    session: &mut S,
    paths: &ProjectPaths,
    config: &ProjectConfig,
    interpreter: &Path,
) -> Result<()> {
    session.add_alias(DBT_ALIAS, &paths.dbt_executable());
    session.add_alias(PROJECT_ALIAS, paths.root());

    create_venv(session, paths, interpreter)?;
    install_package(session, paths, config)?;
    install_adapters(session, paths, config)?;

    let home = paths.home_dir();
    fs::create_dir_all(&home).map_err(|source| DbtError::Filesystem {
        action: "could not create dbt home folder",
        path: home.clone(),
        source,
    })?;
    Ok(())
}

fn create_venv<S: ProcessSession + ?Sized>(
    session: &mut S,
    paths: &ProjectPaths,
    interpreter: &Path,
) -> Result<()> {
    let interpreter = path_to_string(interpreter, "python interpreter")?;
    let venv = path_to_string(&paths.venv_dir(), "runtime")?;
    let args = vec!["-m".to_string(), "venv".to_string(), venv];
    let Err(err) = session.run(&interpreter, &args) else {
        return Ok(());
    };
    let toolchain_problem = match DbtError::find(&err) {
        Some(DbtError::Spawn { .. }) => Some(format!("could not start {interpreter}")),
        Some(typed)
            if typed
                .stderr()
                .is_some_and(|stderr| stderr.contains(MISSING_VENV_MARKER)) =>
        {
            Some(format!("{interpreter} has no venv module"))
        }
        _ => None,
    };
    match toolchain_problem {
        // The toolchain class must be the root so `DbtError::find` sees it.
        Some(problem) => {
            Err(DbtError::ProvisioningTool(format!("{problem}: {err:#}")).into())
        }
        None => Err(err.context("could not initiate dbt virtual environment")),
    }
}

fn install_package<S: ProcessSession + ?Sized>(
    session: &mut S,
    paths: &ProjectPaths,
    config: &ProjectConfig,
) -> Result<()> {
    let pip = path_to_string(&paths.pip_executable(), "pip")?;
    let spec = package_spec(config.package.trim(), config.dbt_version());
    tracing::debug!("ensuring pip package is '{spec}'");
    let args = vec!["install".to_string(), "-U".to_string(), spec];
    session
        .run(&pip, &args)
        .context("could not install dbt via python pip")
}

fn install_adapters<S: ProcessSession + ?Sized>(
    session: &mut S,
    paths: &ProjectPaths,
    config: &ProjectConfig,
) -> Result<()> {
    if config.adapters.is_empty() {
        return Ok(());
    }
    if !config.install_adapters {
        tracing::info!(
            adapters = %config.adapters.join(","),
            "adapter installation disabled; skipping"
        );
        return Ok(());
    }
    let pip = path_to_string(&paths.pip_executable(), "pip")?;
    let mut args = vec!["install".to_string(), "-U".to_string()];
    args.extend(config.adapters.iter().cloned());
    session
        .run(&pip, &args)
        .context("could not install dbt adapters via python pip")
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
