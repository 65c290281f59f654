//! Recording session used by unit tests in place of real processes.
use crate::error::DbtError;
use crate::session::{ProcessHandle, ProcessSession};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub spawned: bool,
}

impl Invocation {
    /// Program and arguments joined by spaces.
    pub fn line(&self) -> String {
        let mut words = vec![self.program.as_str()];
        words.extend(self.args.iter().map(String::as_str));
        words.join(" ")
    }

    pub fn is(&self, program: &str, first_arg: &str) -> bool {
        self.program == program && self.args.first().map(String::as_str) == Some(first_arg)
    }
}

type Responder = Box<dyn FnMut(&Invocation) -> Result<()>>;

pub(crate) struct FakeSession {
    pub invocations: Vec<Invocation>,
    pub aliases: BTreeMap<String, PathBuf>,
    workdir: Option<PathBuf>,
    responder: Responder,
}

impl FakeSession {
    pub fn succeeding() -> Self {
        Self::with_responder(|_| Ok(()))
    }

    pub fn with_responder(responder: impl FnMut(&Invocation) -> Result<()> + 'static) -> Self {
        Self {
            invocations: Vec::new(),
            aliases: BTreeMap::new(),
            workdir: None,
            responder: Box::new(responder),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.invocations.iter().map(Invocation::line).collect()
    }

    pub fn count(&self, program: &str, first_arg: &str) -> usize {
        self.invocations
            .iter()
            .filter(|invocation| invocation.is(program, first_arg))
            .count()
    }

    fn record(&mut self, program: &str, args: &[String], spawned: bool) -> Result<()> {
        let invocation = Invocation {
            program: program.to_string(),
            args: args.to_vec(),
            workdir: self.workdir.clone(),
            spawned,
        };
        self.invocations.push(invocation.clone());
        (self.responder)(&invocation)
    }
}

/// Failure shaped like a real non-zero exit.
pub(crate) fn process_failure(invocation: &Invocation, stderr: &str) -> anyhow::Error {
    DbtError::Process {
        command: invocation.line(),
        status: "exit status: 1".to_string(),
        stderr: stderr.to_string(),
    }
    .into()
}

impl ProcessSession for FakeSession {
    fn add_alias(&mut self, name: &str, target: &Path) {
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
        self.record(program, args, false)
    }

    fn spawn(&mut self, program: &str, args: &[String]) -> Result<Box<dyn ProcessHandle>> {
        self.record(program, args, true)?;
        Ok(Box::new(FinishedHandle))
    }
}

struct FinishedHandle;

impl ProcessHandle for FinishedHandle {
    fn id(&self) -> u32 {
        1
    }

    fn wait(&mut self) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent directory");
    }
    std::fs::write(path, contents.as_bytes()).expect("write file");
}
