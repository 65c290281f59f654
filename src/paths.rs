//! Typed paths into a dbt project layout.
//!
//! Every location the lifecycle touches is derived from the project root so the
//! runtime, credentials and artifacts stay scoped to one project.
use std::path::{Path, PathBuf};

/// Directory holding the isolated Python runtime.
pub const VENV_DIR: &str = ".venv";
/// Directory dbt reads `profiles.yml` from.
pub const DBT_HOME_DIR: &str = ".dbt";
/// Directory dbt writes its artifacts to.
pub const TARGET_DIR: &str = "target";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const RUN_RESULTS_FILE: &str = "run_results.json";
pub const PROFILES_FILE: &str = "profiles.yml";

/// Session alias for the runtime's dbt executable.
pub const DBT_ALIAS: &str = "dbt";
/// Session variable holding the resolved project path.
pub const PROJECT_ALIAS: &str = "$DBT_PROJ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the `.venv/` runtime directory path.
    pub fn venv_dir(&self) -> PathBuf {
        self.root.join(VENV_DIR)
    }

    /// Return the path of an executable inside the runtime.
    pub fn venv_bin(&self, name: &str) -> PathBuf {
        self.venv_dir().join("bin").join(name)
    }

    pub fn dbt_executable(&self) -> PathBuf {
        self.venv_bin("dbt")
    }

    pub fn pip_executable(&self) -> PathBuf {
        self.venv_bin("pip")
    }

    /// Return the `.dbt/` home directory path.
    pub fn home_dir(&self) -> PathBuf {
        self.root.join(DBT_HOME_DIR)
    }

    pub fn profiles_path(&self) -> PathBuf {
        self.home_dir().join(PROFILES_FILE)
    }

    /// Return the `target/` artifacts directory path.
    pub fn target_dir(&self) -> PathBuf {
        self.root.join(TARGET_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.target_dir().join(MANIFEST_FILE)
    }

    pub fn run_results_path(&self) -> PathBuf {
        self.target_dir().join(RUN_RESULTS_FILE)
    }
}
