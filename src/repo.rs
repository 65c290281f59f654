//! Repository synchronization into the local cache.
//!
//! A checkout lives at `<cache_root>/repos/<url path>`. An existing checkout is
//! pulled; a failed pull purges it and falls back to a single fresh clone.
use crate::error::DbtError;
use crate::paths::PROJECT_ALIAS;
use crate::session::ProcessSession;
use crate::util::path_to_string;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Directory under the cache root holding checkouts.
pub const REPOS_DIR: &str = "repos";
const GIT_SUFFIX: &str = ".git";

/// Steps of the pull-then-clone recovery protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    Pull,
    Purge,
    Clone,
    Done,
}

impl SyncStep {
    pub fn start(has_checkout: bool) -> Self {
        if has_checkout {
            SyncStep::Pull
        } else {
            SyncStep::Clone
        }
    }

    /// Advance after the current step ran; `None` aborts the sync.
    pub fn next(self, succeeded: bool) -> Option<SyncStep> {
        match (self, succeeded) {
            (SyncStep::Pull, true) => Some(SyncStep::Done),
            (SyncStep::Pull, false) => Some(SyncStep::Purge),
            (SyncStep::Purge, true) => Some(SyncStep::Clone),
            (SyncStep::Clone, true) => Some(SyncStep::Done),
            (SyncStep::Purge, false) | (SyncStep::Clone, false) => None,
            (SyncStep::Done, _) => Some(SyncStep::Done),
        }
    }
}

/// Derive the checkout path for a repository URL.
///
/// Only the URL path participates; a trailing `.git` is dropped.
pub fn checkout_path(cache_root: &Path, repo_url: &str) -> Result<PathBuf> {
    let url = Url::parse(repo_url)
        .map_err(|err| DbtError::Config(format!("invalid repository URL {repo_url:?}: {err}")))
        .context("could not parse Git URL provided")?;
    let mut segments: Vec<&str> = url
        .path_segments()
        .ok_or_else(|| DbtError::Config(format!("repository URL {repo_url:?} has no path")))?
        .filter(|segment| !segment.is_empty())
        .collect();
    if let Some(last) = segments.last_mut() {
        let name: &str = *last;
        if let Some(stripped) = name.strip_suffix(GIT_SUFFIX) {
            *last = stripped;
        }
    }
    segments.retain(|segment| !segment.is_empty());
    if segments.is_empty() || segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(DbtError::Config(format!(
            "repository URL {repo_url:?} has no usable path"
        ))
        .into());
    }

    let mut path = cache_root.join(REPOS_DIR);
    for segment in segments {
        path.push(segment);
    }
    Ok(path)
}

/// Bring the checkout for `repo_url` up to date and return the project path.
pub fn sync_repo<S: ProcessSession + ?Sized>(
    session: &mut S,
    cache_root: &Path,
    repo_url: &str,
    project_root: &str,
) -> Result<PathBuf> {
    let repo_url = repo_url.trim();
    if repo_url.is_empty() {
        return Err(DbtError::Config("did not provide repository URL".into()).into());
    }
    let checkout = checkout_path(cache_root, repo_url)?;

    let mut step = SyncStep::start(checkout.exists());
    while step != SyncStep::Done {
        let outcome = match step {
            SyncStep::Pull => pull(session, &checkout),
            SyncStep::Purge => purge(&checkout),
            SyncStep::Clone => clone(session, repo_url, &checkout),
            SyncStep::Done => Ok(()),
        };
        step = match (step.next(outcome.is_ok()), outcome) {
            (Some(next), _) => next,
            (None, Err(err)) => return Err(err),
            (None, Ok(())) => {
                return Err(anyhow!("repository sync aborted at {step:?}"));
            }
        };
    }

    let project_path = project_path(&checkout, project_root);
    session.add_alias(PROJECT_ALIAS, &project_path);
    Ok(project_path)
}

/// Join a repository subpath onto the checkout, ignoring a leading separator.
pub fn project_path(checkout: &Path, project_root: &str) -> PathBuf {
    let project_root = project_root.trim().trim_start_matches('/');
    if project_root.is_empty() {
        checkout.to_path_buf()
    } else {
        checkout.join(project_root)
    }
}

/// A failed pull is logged here; the caller falls back to purge and clone.
fn pull<S: ProcessSession + ?Sized>(session: &mut S, checkout: &Path) -> Result<()> {
    session.set_workdir(checkout);
    session.run("git", &["pull".to_string()]).inspect_err(|err| {
        tracing::warn!(
            checkout = %checkout.display(),
            "git pull failed, re-cloning: {err:#}"
        );
    })
}

fn purge(checkout: &Path) -> Result<()> {
    fs::remove_dir_all(checkout).map_err(|source| DbtError::Filesystem {
        action: "remove stale checkout",
        path: checkout.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn clone<S: ProcessSession + ?Sized>(
    session: &mut S,
    repo_url: &str,
    checkout: &Path,
) -> Result<()> {
    let parent = checkout.parent().unwrap_or(checkout);
    fs::create_dir_all(parent).map_err(|source| DbtError::Filesystem {
        action: "create repository cache",
        path: parent.to_path_buf(),
        source,
    })?;
    session.set_workdir(parent);
    let args = vec![
        "clone".to_string(),
        repo_url.to_string(),
        path_to_string(checkout, "checkout")?,
    ];
    if let Err(err) = session.run("git", &args) {
        if checkout.exists() {
            if let Err(cleanup) = fs::remove_dir_all(checkout) {
                tracing::warn!(
                    checkout = %checkout.display(),
                    "remove partial clone: {cleanup}"
                );
            }
        }
        return Err(err.context("could not run 'git clone'"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "repo_tests.rs"]
mod tests;
