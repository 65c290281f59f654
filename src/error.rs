//! Typed failure classes for the dbt lifecycle.
//!
//! Call sites wrap these in `anyhow` context naming the operation; callers that
//! need to branch on the class walk `anyhow::Error::chain` and downcast.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbtError {
    /// Malformed or incomplete configuration; raised before any mutation.
    #[error("invalid config: {0}")]
    Config(String),

    #[error("{action} {}", .path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("project path {} does not exist", .0.display())]
    MissingPath(PathBuf),

    /// The Python toolchain used to build the runtime is missing or too old.
    #[error("{0} (please install a recent version of Python 3 with the venv module)")]
    ProvisioningTool(String),

    #[error("`{command}` exited with {status}{}", stderr_suffix(.stderr))]
    Process {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("spawn `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("read artifact {}", .path.display())]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dbt project is {state}; run init (or attach) first")]
    NotReady { state: &'static str },
}

impl DbtError {
    /// Find the first typed error in an `anyhow` chain.
    pub fn find(err: &anyhow::Error) -> Option<&DbtError> {
        err.chain().find_map(|cause| cause.downcast_ref::<DbtError>())
    }

    /// Stderr captured from a failed process, if this is a process failure.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            DbtError::Process { stderr, .. } => Some(stderr.as_str()),
            _ => None,
        }
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}
