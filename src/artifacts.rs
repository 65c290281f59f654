//! Collection of the JSON artifacts dbt writes into `target/`.
//!
//! Both documents are opaque; the accessors below only read well-known keys for
//! summaries and never validate. Read failures propagate; parse failures are
//! logged and leave the previous document in place.
use crate::error::DbtError;
use crate::paths::{MANIFEST_FILE, RUN_RESULTS_FILE};
use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Compiled model graph (`manifest.json`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Manifest(pub Value);

impl Manifest {
    pub fn dbt_version(&self) -> Option<&str> {
        self.0.pointer("/metadata/dbt_version")?.as_str()
    }

    pub fn node_count(&self) -> usize {
        self.0
            .get("nodes")
            .and_then(Value::as_object)
            .map_or(0, |nodes| nodes.len())
    }
}

/// Outcome of the last invocation (`run_results.json`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RunResult(pub Value);

impl RunResult {
    pub fn elapsed_time(&self) -> Option<f64> {
        self.0.get("elapsed_time")?.as_f64()
    }

    /// Count results by their `status` field.
    pub fn status_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        let results = self.0.get("results").and_then(Value::as_array);
        for result in results.into_iter().flatten() {
            let status = result
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            *counts.entry(status.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

/// The latest collected documents; no history is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artifacts {
    pub manifest: Option<Manifest>,
    pub run_result: Option<RunResult>,
}

/// Refresh `artifacts` from `target`.
///
/// A missing or unreadable manifest returns before `run_results.json` is
/// read. Unparseable documents are skipped with a warning.
pub fn collect_target(target: &Path, artifacts: &mut Artifacts) -> Result<()> {
    let manifest_path = target.join(MANIFEST_FILE);
    let bytes = read_artifact(&manifest_path)?;
    match serde_json::from_slice::<Manifest>(&bytes) {
        Ok(manifest) => artifacts.manifest = Some(manifest),
        Err(err) => tracing::warn!(
            path = %manifest_path.display(),
            "ignoring unparseable manifest: {err}"
        ),
    }

    let run_results_path = target.join(RUN_RESULTS_FILE);
    let bytes = read_artifact(&run_results_path)?;
    match serde_json::from_slice::<RunResult>(&bytes) {
        Ok(run_result) => artifacts.run_result = Some(run_result),
        Err(err) => tracing::warn!(
            path = %run_results_path.display(),
            "ignoring unparseable run results: {err}"
        ),
    }
    Ok(())
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path).map_err(|source| DbtError::ArtifactRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(bytes)
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
