//! Lifecycle orchestration for one dbt project.
//!
//! `init` takes a project from nothing to `Ready` (sync, provision, profile);
//! `compile`, `run` and `collect` move it to `Collected`. A failed invocation
//! leaves the project `Ready` so it can be retried without re-initializing.
use crate::artifacts::{collect_target, Artifacts, Manifest, RunResult};
use crate::command::{dispatch, invoke, DbtMode, Invocation};
use crate::config::{validate_config, ProjectConfig};
use crate::error::DbtError;
use crate::paths::{ProjectPaths, DBT_ALIAS, PROJECT_ALIAS};
use crate::profile::{ConnectionDescriptor, ProfileGenerator, YamlProfiles};
use crate::repo::{checkout_path, project_path, sync_repo};
use crate::runtime::{provision, resolve_interpreter};
use crate::session::{CommandSession, ProcessHandle, ProcessSession};
use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    /// Project path resolved (checkout synced or local path verified).
    Synced,
    /// Runtime exists and the dbt package is installed.
    Provisioned,
    Ready,
    /// At least one invocation's artifacts have been collected.
    Collected,
}

impl Lifecycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Synced => "synced",
            Lifecycle::Provisioned => "provisioned",
            Lifecycle::Ready => "ready",
            Lifecycle::Collected => "collected",
        }
    }

    fn accepts_commands(self) -> bool {
        matches!(self, Lifecycle::Ready | Lifecycle::Collected)
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Dbt<S: ProcessSession = CommandSession> {
    config: ProjectConfig,
    cache_root: PathBuf,
    session: S,
    profiles: Box<dyn ProfileGenerator>,
    interpreter: Option<PathBuf>,
    state: Lifecycle,
    paths: Option<ProjectPaths>,
    artifacts: Artifacts,
}

impl Dbt<CommandSession> {
    /// Orchestrate `config` with real processes and YAML profiles.
    pub fn new(config: ProjectConfig, cache_root: PathBuf) -> Self {
        let profiles = YamlProfiles::new(&config.profile, &config.schema);
        Self::with_session(config, cache_root, CommandSession::new(), Box::new(profiles))
    }
}

impl<S: ProcessSession> Dbt<S> {
    pub fn with_session(
        config: ProjectConfig,
        cache_root: PathBuf,
        session: S,
        profiles: Box<dyn ProfileGenerator>,
    ) -> Self {
        Self {
            config,
            cache_root,
            session,
            profiles,
            interpreter: None,
            state: Lifecycle::Uninitialized,
            paths: None,
            artifacts: Artifacts::default(),
        }
    }

    /// Use `interpreter` instead of searching PATH during `init`.
    pub fn with_interpreter(mut self, interpreter: PathBuf) -> Self {
        self.interpreter = Some(interpreter);
        self
    }

    /// Sync the project, provision its runtime and write its profile.
    pub fn init(&mut self, connections: &[ConnectionDescriptor]) -> Result<()> {
        let start = Instant::now();
        validate_config(&self.config)?;
        self.state = Lifecycle::Uninitialized;

        let root = match self.config.project_path() {
            Some(path) => {
                let root = existing_dir(path)?;
                self.session.add_alias(PROJECT_ALIAS, &root);
                root
            }
            None => {
                let repo_url = self.config.repo_url().unwrap_or_default().to_string();
                sync_repo(
                    &mut self.session,
                    &self.cache_root,
                    &repo_url,
                    self.config.project_root(),
                )?
            }
        };
        let paths = ProjectPaths::new(root);
        self.paths = Some(paths.clone());
        self.state = Lifecycle::Synced;

        let interpreter = match &self.interpreter {
            Some(interpreter) => interpreter.clone(),
            None => resolve_interpreter(self.config.python.as_deref())?,
        };
        provision(&mut self.session, &paths, &self.config, &interpreter)?;
        self.state = Lifecycle::Provisioned;

        self.profiles
            .generate(connections, &paths.home_dir())
            .context("could not generate dbt profile")?;
        self.session.set_workdir(paths.root());
        self.state = Lifecycle::Ready;

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis(),
            project = %paths.root().display(),
            "dbt project initialized"
        );
        Ok(())
    }

    /// Resume a project a previous `init` already prepared.
    pub fn attach(&mut self) -> Result<()> {
        validate_config(&self.config)?;
        let root = match self.config.project_path() {
            Some(path) => existing_dir(path)?,
            None => {
                let repo_url = self.config.repo_url().unwrap_or_default();
                let checkout = checkout_path(&self.cache_root, repo_url)?;
                existing_dir(&project_path(&checkout, self.config.project_root()))?
            }
        };
        let paths = ProjectPaths::new(root);
        let dbt = paths.dbt_executable();
        if !dbt.is_file() {
            return Err(DbtError::MissingPath(dbt))
                .context("dbt runtime not provisioned; run init first");
        }

        self.session.add_alias(DBT_ALIAS, &dbt);
        self.session.add_alias(PROJECT_ALIAS, paths.root());
        self.session.set_workdir(paths.root());
        tracing::debug!(project = %paths.root().display(), "attached to dbt project");
        self.paths = Some(paths);
        self.state = Lifecycle::Ready;
        Ok(())
    }

    pub fn compile(&mut self) -> Result<()> {
        self.execute(DbtMode::Compile)
    }

    pub fn run(&mut self) -> Result<()> {
        self.execute(DbtMode::Run)
    }

    /// Dispatch `dbt run` and return immediately; artifacts are not collected.
    pub fn start(&mut self) -> Result<Box<dyn ProcessHandle>> {
        let paths = self.ready_paths()?;
        let invocation = self.invocation(&paths);
        dispatch(&mut self.session, &invocation)
    }

    /// Collect artifacts left by a dispatched run.
    pub fn collect(&mut self) -> Result<()> {
        let paths = self.ready_paths()?;
        collect_target(&paths.target_dir(), &mut self.artifacts)
            .context("could not collect dbt artifacts")?;
        self.state = Lifecycle::Collected;
        Ok(())
    }

    fn execute(&mut self, mode: DbtMode) -> Result<()> {
        let paths = self.ready_paths()?;
        let invocation = self.invocation(&paths);
        let start = Instant::now();
        let outcome = invoke(&mut self.session, &invocation, mode).and_then(|()| {
            collect_target(&paths.target_dir(), &mut self.artifacts)
                .with_context(|| format!("could not collect artifacts after 'dbt {mode}'"))
        });
        match outcome {
            Ok(()) => {
                self.state = Lifecycle::Collected;
                tracing::info!(
                    elapsed_ms = start.elapsed().as_millis(),
                    %mode,
                    "dbt invocation complete"
                );
                Ok(())
            }
            Err(err) => {
                self.state = Lifecycle::Ready;
                Err(err)
            }
        }
    }

    fn ready_paths(&self) -> Result<ProjectPaths> {
        match &self.paths {
            Some(paths) if self.state.accepts_commands() => Ok(paths.clone()),
            _ => Err(DbtError::NotReady {
                state: self.state.as_str(),
            }
            .into()),
        }
    }

    fn invocation(&self, paths: &ProjectPaths) -> Invocation {
        Invocation {
            profiles_dir: paths.home_dir(),
            profile: self.config.profile.clone(),
            models: self.config.models.clone(),
            debug: self.config.debug,
        }
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.artifacts.manifest.as_ref()
    }

    pub fn run_result(&self) -> Option<&RunResult> {
        self.artifacts.run_result.as_ref()
    }

    pub fn project_path(&self) -> Option<&Path> {
        self.paths.as_ref().map(ProjectPaths::root)
    }

    /// The profiles directory passed to dbt.
    pub fn home_path(&self) -> Option<PathBuf> {
        self.paths.as_ref().map(ProjectPaths::home_dir)
    }

    pub fn session(&self) -> &S {
        &self.session
    }
}

fn existing_dir(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(DbtError::MissingPath(path.to_path_buf()).into());
    }
    let canonical = fs::canonicalize(path).map_err(|source| DbtError::Filesystem {
        action: "resolve project path",
        path: path.to_path_buf(),
        source,
    })?;
    Ok(canonical)
}

#[cfg(test)]
#[path = "dbt_tests.rs"]
mod tests;
