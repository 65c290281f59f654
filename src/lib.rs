//! Lifecycle orchestration for dbt projects.
//!
//! A `Dbt` syncs a project repository into a local cache, provisions an
//! isolated Python runtime holding the dbt executable, writes connection
//! profiles, then runs dbt and collects the JSON artifacts it leaves behind.
pub mod artifacts;
pub mod cli;
pub mod command;
pub mod config;
pub mod dbt;
pub mod error;
pub mod paths;
pub mod profile;
pub mod repo;
pub mod runtime;
pub mod session;
mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use artifacts::{Artifacts, Manifest, RunResult};
pub use config::ProjectConfig;
pub use dbt::{Dbt, Lifecycle};
pub use error::DbtError;
pub use profile::{ConnectionDescriptor, ProfileGenerator, YamlProfiles};
pub use session::{CommandSession, ProcessHandle, ProcessSession};
