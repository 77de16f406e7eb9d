//! Shell command spawning.

use std::{path::PathBuf, process::ExitStatus, process::Stdio};

use async_trait::async_trait;
use bytes::Bytes;
use command_group::{AsyncCommandGroup, AsyncGroupChild};
use futures::{StreamExt, stream::BoxStream};
use mqexec_core::{Execution, ExecutionError, Executor};
use tokio::process::Command;

use crate::{
    config::{ExecutorConfig, StderrMode},
    output::output_chunks,
};

/// Shell command parts (interpreter + flag + command line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: PathBuf,
    pub arg: &'static str,
    pub command: String,
}

impl ShellCommand {
    /// Hand `command` to the interpreter selected by `config`.
    ///
    /// The command line is passed as a single argument; the shell does the
    /// word splitting.
    #[must_use]
    pub fn new(config: &ExecutorConfig, command: impl Into<String>) -> Self {
        let (program, arg) = config.shell.command();
        Self {
            program,
            arg,
            command: command.into(),
        }
    }

    fn to_command(&self, stderr: StderrMode) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(self.arg)
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(stderr.stdio())
            .kill_on_drop(true);
        cmd
    }
}

/// Executor that runs payloads through a shell.
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor {
    config: ExecutorConfig,
}

impl ShellExecutor {
    #[must_use]
    pub const fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Spawn `command` and return the running execution.
    ///
    /// # Errors
    /// Returns [`ExecutionError::Spawn`] if the interpreter cannot be started.
    pub fn spawn(&self, command: &str) -> Result<ShellExecution, ExecutionError> {
        let shell_command = ShellCommand::new(&self.config, command);
        tracing::debug!(
            invocation = %mqexec_shell::display_invocation(&shell_command.program, shell_command.arg, command),
            "Spawning command"
        );

        let mut child = shell_command
            .to_command(self.config.stderr)
            .group_spawn()
            .map_err(|source| ExecutionError::Spawn {
                shell: shell_command.program.clone(),
                source,
            })?;
        tracing::debug!(pid = ?child.id(), "Command started");

        let stdout = child
            .inner()
            .stdout
            .take()
            .ok_or(ExecutionError::MissingPipe("stdout"))?;
        let stdout = output_chunks(stdout, self.config.chunk_size);

        let output = if self.config.stderr == StderrMode::Merge {
            let stderr = child
                .inner()
                .stderr
                .take()
                .ok_or(ExecutionError::MissingPipe("stderr"))?;
            futures::stream::select(stdout, output_chunks(stderr, self.config.chunk_size)).boxed()
        } else {
            stdout
        };

        Ok(ShellExecution { child, output })
    }
}

#[async_trait]
impl Executor for ShellExecutor {
    async fn execute(&self, command: &str) -> Result<Box<dyn Execution>, ExecutionError> {
        Ok(Box::new(self.spawn(command)?))
    }
}

/// A spawned shell command and its captured output.
///
/// Dropping it before [`Execution::wait`] kills the process; the runtime
/// reaps it in the background.
pub struct ShellExecution {
    child: AsyncGroupChild,
    output: BoxStream<'static, std::io::Result<Bytes>>,
}

#[async_trait]
impl Execution for ShellExecution {
    async fn next_chunk(&mut self) -> Option<std::io::Result<Bytes>> {
        self.output.next().await
    }

    fn start_kill(&mut self) -> std::io::Result<()> {
        self.child.start_kill()
    }

    async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        // Close our ends first so a child blocked on a full pipe can exit.
        self.output = futures::stream::empty().boxed();
        self.child.wait().await
    }
}
