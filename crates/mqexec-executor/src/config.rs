//! Executor configuration.

use std::{fmt, process::Stdio, str::FromStr};

use mqexec_core::ConfigError;
use mqexec_shell::ShellChoice;

/// Read size used when the operator does not choose one.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Where a command's standard error goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StderrMode {
    /// Shared with the agent's own stderr; never published.
    #[default]
    Inherit,
    /// Captured and published interleaved with stdout.
    Merge,
    /// Thrown away.
    Discard,
}

impl StderrMode {
    pub(crate) fn stdio(self) -> Stdio {
        match self {
            Self::Inherit => Stdio::inherit(),
            Self::Merge => Stdio::piped(),
            Self::Discard => Stdio::null(),
        }
    }
}

impl FromStr for StderrMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inherit" => Ok(Self::Inherit),
            "merge" => Ok(Self::Merge),
            "discard" => Ok(Self::Discard),
            other => Err(format!("unknown stderr mode '{other}' (expected inherit, merge or discard)")),
        }
    }
}

impl fmt::Display for StderrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inherit => "inherit",
            Self::Merge => "merge",
            Self::Discard => "discard",
        })
    }
}

/// How commands are launched and read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub shell: ShellChoice,
    /// Upper bound on the size of a published chunk.
    pub chunk_size: usize,
    pub stderr: StderrMode,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            shell: ShellChoice::System,
            chunk_size: DEFAULT_CHUNK_SIZE,
            stderr: StderrMode::Inherit,
        }
    }
}

impl ExecutorConfig {
    /// # Errors
    /// Returns [`ConfigError::InvalidChunkSize`] for a zero chunk size.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }
        Ok(())
    }
}
