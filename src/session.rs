//! Process session: aliases, working directory and command execution.
//!
//! A session is owned by exactly one orchestrator. Aliases map a logical name
//! to an absolute path: plain names replace the program, `$`-prefixed names are
//! substituted inside arguments.
use crate::error::DbtError;
use crate::util::{format_command_line, stderr_tail};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::Instant;

/// Lines of captured output carried into a process error.
const ERROR_TAIL_LINES: usize = 20;

/// Capability the lifecycle consumes to run external tools.
pub trait ProcessSession {
    fn add_alias(&mut self, name: &str, target: &Path);

    fn alias(&self, name: &str) -> Option<&Path>;

    fn set_workdir(&mut self, dir: &Path);

    fn workdir(&self) -> Option<&Path>;

    /// Run to completion; a non-zero exit is an error.
    fn run(&mut self, program: &str, args: &[String]) -> Result<()>;

    /// Start without waiting; the caller owns the returned handle.
    fn spawn(&mut self, program: &str, args: &[String]) -> Result<Box<dyn ProcessHandle>>;
}

/// A dispatched process the caller may wait on later.
pub trait ProcessHandle: Send {
    fn id(&self) -> u32;

    /// Block until exit; a non-zero exit is an error.
    fn wait(&mut self) -> Result<()>;
}

/// `ProcessSession` backed by `std::process::Command`.
#[derive(Debug, Default)]
pub struct CommandSession {
    workdir: Option<PathBuf>,
    aliases: BTreeMap<String, PathBuf>,
}

impl CommandSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn command(&self, program: &str, args: &[String]) -> (Command, String) {
        let program_path = self
            .aliases
            .get(program)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(program));
        let args: Vec<String> = args.iter().map(|arg| self.expand(arg)).collect();
        let command_line = format_command_line(&program_path.to_string_lossy(), &args);

        let mut command = Command::new(&program_path);
        command.args(&args).stdin(Stdio::null());
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }
        (command, command_line)
    }

    fn expand(&self, arg: &str) -> String {
        let mut expanded = arg.to_string();
        for (name, value) in &self.aliases {
            if name.starts_with('$') && expanded.contains(name.as_str()) {
                expanded = expanded.replace(name.as_str(), &value.to_string_lossy());
            }
        }
        expanded
    }
}

impl ProcessSession for CommandSession {
    fn add_alias(&mut self, name: &str, target: &Path) {
        tracing::debug!(alias = name, target = %target.display(), "register alias");
        self.aliases.insert(name.to_string(), target.to_path_buf());
    }

    fn alias(&self, name: &str) -> Option<&Path> {
        self.aliases.get(name).map(PathBuf::as_path)
    }

    fn set_workdir(&mut self, dir: &Path) {
        self.workdir = Some(dir.to_path_buf());
    }

    fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    fn run(&mut self, program: &str, args: &[String]) -> Result<()> {
        let (mut command, command_line) = self.command(program, args);
        let start = Instant::now();
        let output = command.output().map_err(|source| DbtError::Spawn {
            program: program.to_string(),
            source,
        })?;
        let elapsed_ms = start.elapsed().as_millis();

        tracing::info!(
            elapsed_ms,
            status = %output.status,
            stdout_bytes = output.stdout.len(),
            "{command_line}"
        );
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::debug!(target: "dbtctl::process", "{line}");
        }

        if !output.status.success() {
            return Err(process_error(command_line, &output).into());
        }
        Ok(())
    }

    fn spawn(&mut self, program: &str, args: &[String]) -> Result<Box<dyn ProcessHandle>> {
        let (mut command, command_line) = self.command(program, args);
        let child = command.spawn().map_err(|source| DbtError::Spawn {
            program: program.to_string(),
            source,
        })?;
        tracing::info!(pid = child.id(), "dispatched {command_line}");
        Ok(Box::new(ChildHandle {
            child,
            command: command_line,
        }))
    }
}

fn process_error(command: String, output: &Output) -> DbtError {
    // dbt reports most failures on stdout; fall back to it when stderr is silent.
    let mut detail = stderr_tail(&output.stderr, ERROR_TAIL_LINES);
    if detail.is_empty() {
        detail = stderr_tail(&output.stdout, ERROR_TAIL_LINES);
    }
    DbtError::Process {
        command,
        status: output.status.to_string(),
        stderr: detail,
    }
}

struct ChildHandle {
    child: Child,
    command: String,
}

impl ProcessHandle for ChildHandle {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn wait(&mut self) -> Result<()> {
        let start = Instant::now();
        let status = self.child.wait().map_err(|source| DbtError::Spawn {
            program: self.command.clone(),
            source,
        })?;
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis(),
            %status,
            "{}",
            self.command
        );
        if !status.success() {
            return Err(DbtError::Process {
                command: self.command.clone(),
                status: status.to_string(),
                stderr: String::new(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
