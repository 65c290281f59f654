//! Shared test infrastructure for integration tests.
//!
//! Each fixture owns a temporary cache root and a local dbt project, plus a
//! fake Python interpreter whose `-m venv` installs shell-script stand-ins for
//! `pip` and `dbt`.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Fake interpreter: `python -m venv DIR` lays out DIR/bin/{pip,dbt}.
const FAKE_PYTHON: &str = r##"#!/bin/sh
set -e
venv="$3"
mkdir -p "$venv/bin"
cat > "$venv/bin/pip" <<'EOF'
#!/bin/sh
echo "$@" >> "$(dirname "$0")/../pip.log"
EOF
cat > "$venv/bin/dbt" <<'EOF'
#!/bin/sh
echo "$@" > args.txt
mkdir -p target
printf '{"metadata":{"dbt_version":"1.7.4"},"nodes":{"model.proj.my_model":{}}}' > target/manifest.json
printf '{"results":[{"status":"success"}]}' > target/run_results.json
EOF
chmod 755 "$venv/bin/pip" "$venv/bin/dbt"
"##;

const CONNECTIONS: &str = "- name: dev\n  type: postgres\n  host: localhost\n  database: analytics\n";

pub struct TestProject {
    temp: TempDir,
    pub project: PathBuf,
    pub config: PathBuf,
    pub connections: PathBuf,
}

impl TestProject {
    /// Create a local project configured with `extra` config lines.
    pub fn new(extra: &str) -> anyhow::Result<Self> {
        let temp = TempDir::new()?;
        let project = temp.path().join("project");
        std::fs::create_dir_all(&project)?;
        let project = project.canonicalize()?;

        let python = temp.path().join("python3");
        std::fs::write(&python, FAKE_PYTHON)?;
        make_executable(&python)?;

        let config = temp.path().join("project.yml");
        std::fs::write(
            &config,
            format!(
                "project_path: {}\npython: {}\n{extra}",
                project.display(),
                python.display()
            ),
        )?;
        let connections = temp.path().join("connections.yml");
        std::fs::write(&connections, CONNECTIONS)?;

        Ok(Self {
            temp,
            project,
            config,
            connections,
        })
    }

    pub fn cache_root(&self) -> PathBuf {
        self.temp.path().join("cache")
    }

    /// Run the CLI against this project's cache root.
    pub fn dbtctl(&self, args: &[&str]) -> Output {
        dbtctl(&self.cache_root(), args)
    }

    pub fn config_arg(&self) -> String {
        self.config.display().to_string()
    }

    pub fn connections_arg(&self) -> String {
        self.connections.display().to_string()
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.project.join(relative)).unwrap_or_default()
    }
}

pub fn dbtctl(cache_root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dbtctl"))
        .args(["--home", &cache_root.display().to_string()])
        .args(args)
        .env("RUST_LOG", "warn")
        .stdin(Stdio::null())
        .output()
        .expect("spawn dbtctl")
}

/// Check if a host tool is available; skip the test if not.
pub fn skip_if_missing(binary: &str) -> bool {
    let missing = which::which(binary).is_err();
    if missing {
        eprintln!("Skipping: {binary} not available");
    }
    missing
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
