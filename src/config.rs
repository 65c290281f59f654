//! Project configuration loading and validation.
//!
//! The config document is YAML; every field is optional at parse time and the
//! cross-field rules are enforced by `validate_config` before any mutation.
use crate::error::DbtError;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the cache root.
pub const HOME_ENV: &str = "DBTCTL_HOME";
/// Default pip package providing the dbt executable.
pub const DEFAULT_PACKAGE: &str = "dbt";
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Exact dbt version to install; latest when omitted.
    #[serde(default)]
    pub dbt_version: Option<String>,
    #[serde(default)]
    pub repo_url: Option<String>,
    /// Subdirectory of the repository holding `dbt_project.yml`.
    #[serde(default)]
    pub project_root: String,
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Model selector passed to `-m`.
    #[serde(default)]
    pub models: String,
    #[serde(default)]
    pub debug: bool,
    /// Target schema written into generated profiles.
    #[serde(default)]
    pub schema: String,
    /// Pre-existing local project; takes precedence over `repo_url`.
    #[serde(default)]
    pub project_path: Option<PathBuf>,
    /// Interpreter used to create the runtime.
    #[serde(default)]
    pub python: Option<String>,
    #[serde(default = "default_package")]
    pub package: String,
    /// Database adapter packages installed alongside dbt.
    #[serde(default)]
    pub adapters: Vec<String>,
    /// Adapter installation is off unless explicitly enabled.
    #[serde(default)]
    pub install_adapters: bool,
}

fn default_profile() -> String {
    DEFAULT_PROFILE.to_string()
}

fn default_package() -> String {
    DEFAULT_PACKAGE.to_string()
}

impl ProjectConfig {
    pub fn repo_url(&self) -> Option<&str> {
        self.repo_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn project_path(&self) -> Option<&Path> {
        self.project_path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }

    pub fn dbt_version(&self) -> Option<&str> {
        self.dbt_version
            .as_deref()
            .map(str::trim)
            .filter(|version| !version.is_empty())
    }

    /// The repository subpath with any leading separator removed.
    pub fn project_root(&self) -> &str {
        self.project_root.trim().trim_start_matches('/')
    }
}

/// Parse and validate a YAML config document.
pub fn parse_config(text: &str) -> Result<ProjectConfig> {
    let config: ProjectConfig = serde_yaml::from_str(text)
        .map_err(|err| DbtError::Config(err.to_string()))
        .context("could not parse dbt config")?;
    validate_config(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<ProjectConfig> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    parse_config(&text).with_context(|| format!("load config {}", path.display()))
}

pub fn validate_config(config: &ProjectConfig) -> Result<()> {
    if config.repo_url().is_none() && config.project_path().is_none() {
        return Err(DbtError::Config("either repo_url or project_path must be set".into()).into());
    }
    if config.profile.trim().is_empty() {
        return Err(DbtError::Config("profile must be non-empty".into()).into());
    }
    if config.package.trim().is_empty() {
        return Err(DbtError::Config("package must be non-empty".into()).into());
    }
    if config.project_root().split('/').any(|part| part == "..") {
        return Err(DbtError::Config(format!(
            "project_root must stay inside the repository (got {:?})",
            config.project_root
        ))
        .into());
    }
    if let Some(python) = config.python.as_deref() {
        if python.trim().is_empty() {
            return Err(DbtError::Config("python must be non-empty when set".into()).into());
        }
    }
    if config.install_adapters && config.adapters.is_empty() {
        tracing::warn!("install_adapters is set but no adapters are listed");
    }
    Ok(())
}

/// Resolve the cache root: explicit value, then `$DBTCTL_HOME`, then the
/// user's local data directory.
pub fn resolve_cache_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(value) = std::env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(value));
    }
    let data_dir = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(data_dir.join("dbtctl"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
