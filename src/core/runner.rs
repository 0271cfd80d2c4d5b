// Start of file: /src/core/runner.rs

/*
    * Execution of the setup commands (package index refresh, apt installs, pip).
    * The sequence talks to a `CommandRunner` so tests can record commands
    * instead of running them.
*/

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tracing::debug;

// * A fully described external command
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    // * Shell-like rendering, for logs only
    pub fn display(&self) -> String {
        let mut line: String = String::new();
        for (key, value) in &self.envs {
            line.push_str(&format!("{key}={value} "));
        }
        line.push_str(&self.program);
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

// * How a finished command ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    Exited(i32),
    Signaled(i32),
}

impl Completion {
    pub fn success(&self) -> bool {
        matches!(self, Completion::Exited(0))
    }
}

impl From<ExitStatus> for Completion {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Completion::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Completion::Signaled(signal);
            }
        }

        Completion::Exited(1)
    }
}

/*
    * Runs one command to completion. Errors are reserved for commands that
    * could not be started at all.
*/
pub trait CommandRunner {
    fn run(&self, command: &CommandSpec) -> impl Future<Output = io::Result<Completion>> + Send;
}

// * Runs commands on the host, inheriting stdio so installer output reaches the log stream.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandSpec) -> io::Result<Completion> {
        debug!(command = %command.display(), "Running command");

        let mut cmd: Command = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(command.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        if let Some(dir) = &command.current_dir {
            cmd.current_dir(dir);
        }

        let status: ExitStatus = cmd.status().await?;
        Ok(status.into())
    }
}


// End of file: /src/core/runner.rs
