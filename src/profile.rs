//! Connection descriptors and dbt profile generation.
//!
//! The orchestrator only depends on `ProfileGenerator`; `YamlProfiles` is the
//! default backend and renders a single dbt profile with one output per
//! connection.
use crate::error::DbtError;
use crate::paths::PROFILES_FILE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Threads written when a connection does not set its own.
const DEFAULT_THREADS: u32 = 1;

/// Connection details for one dbt output.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConnectionDescriptor {
    pub name: String,
    /// Adapter type, e.g. `postgres` or `snowflake`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,
    /// Adapter-specific keys copied verbatim into the output.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Port for writing dbt credentials into the runtime home.
pub trait ProfileGenerator {
    fn generate(&self, connections: &[ConnectionDescriptor], home: &Path) -> Result<()>;
}

/// Load connection descriptors from a YAML (or JSON) list.
pub fn load_connections(path: &Path) -> Result<Vec<ConnectionDescriptor>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read connections {}", path.display()))?;
    let connections: Vec<ConnectionDescriptor> = serde_yaml::from_str(&text)
        .map_err(|err| DbtError::Config(err.to_string()))
        .with_context(|| format!("parse connections {}", path.display()))?;
    Ok(connections)
}

/// Writes `profiles.yml` for a single named profile.
#[derive(Debug, Clone)]
pub struct YamlProfiles {
    profile: String,
    schema: String,
}

impl YamlProfiles {
    pub fn new(profile: &str, schema: &str) -> Self {
        Self {
            profile: profile.to_string(),
            schema: schema.to_string(),
        }
    }

    /// Render the profile document without touching the filesystem.
    pub fn render(&self, connections: &[ConnectionDescriptor]) -> Result<String> {
        validate_connections(connections)?;
        let mut outputs = Mapping::new();
        for connection in connections {
            outputs.insert(
                Value::from(connection.name.clone()),
                Value::Mapping(self.output(connection)),
            );
        }

        let mut profile = Mapping::new();
        profile.insert(
            Value::from("target"),
            Value::from(connections[0].name.clone()),
        );
        profile.insert(Value::from("outputs"), Value::Mapping(outputs));

        let mut document = Mapping::new();
        document.insert(Value::from(self.profile.clone()), Value::Mapping(profile));
        serde_yaml::to_string(&document).context("serialize profiles.yml")
    }

    fn output(&self, connection: &ConnectionDescriptor) -> Mapping {
        let mut output = Mapping::new();
        output.insert(Value::from("type"), Value::from(connection.kind.clone()));
        insert_opt(&mut output, "host", connection.host.clone().map(Value::from));
        insert_opt(&mut output, "port", connection.port.map(Value::from));
        insert_opt(&mut output, "user", connection.user.clone().map(Value::from));
        insert_opt(
            &mut output,
            "password",
            connection.password.clone().map(Value::from),
        );
        insert_opt(
            &mut output,
            database_key(&connection.kind),
            connection.database.clone().map(Value::from),
        );
        let schema = connection
            .schema
            .clone()
            .or_else(|| Some(self.schema.clone()).filter(|schema| !schema.is_empty()));
        insert_opt(&mut output, "schema", schema.map(Value::from));
        output.insert(
            Value::from("threads"),
            Value::from(connection.threads.unwrap_or(DEFAULT_THREADS)),
        );
        for (key, value) in &connection.extra {
            output.insert(Value::from(key.clone()), value.clone());
        }
        output
    }
}

impl ProfileGenerator for YamlProfiles {
    fn generate(&self, connections: &[ConnectionDescriptor], home: &Path) -> Result<()> {
        let text = self.render(connections)?;
        let path = home.join(PROFILES_FILE);
        fs::write(&path, text.as_bytes()).map_err(|source| DbtError::Filesystem {
            action: "write",
            path: path.clone(),
            source,
        })?;
        restrict_permissions(&path)?;
        tracing::info!(
            profile = %self.profile,
            outputs = connections.len(),
            path = %path.display(),
            "wrote dbt profile"
        );
        Ok(())
    }
}

fn validate_connections(connections: &[ConnectionDescriptor]) -> Result<()> {
    if connections.is_empty() {
        return Err(DbtError::Config("at least one connection is required".into()).into());
    }
    let mut seen = BTreeSet::new();
    for connection in connections {
        let name = connection.name.trim();
        if name.is_empty() {
            return Err(DbtError::Config("connection name must be non-empty".into()).into());
        }
        if connection.kind.trim().is_empty() {
            return Err(DbtError::Config(format!("connection {name:?} has no type")).into());
        }
        if !seen.insert(name) {
            return Err(DbtError::Config(format!("duplicate connection name {name:?}")).into());
        }
    }
    Ok(())
}

/// Postgres-family adapters call the database `dbname`.
fn database_key(kind: &str) -> &'static str {
    match kind.to_ascii_lowercase().as_str() {
        "postgres" | "redshift" => "dbname",
        _ => "database",
    }
}

fn insert_opt(output: &mut Mapping, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        output.insert(Value::from(key), value);
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("restrict permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
