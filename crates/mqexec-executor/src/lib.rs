//! Shell command executor with streamed output.
//!
//! Provides:
//! - `ShellExecutor` - Spawn command payloads through a shell
//! - `output_chunks` / `stream_output` - Bounded, incremental output capture
//! - `ExecutorConfig` - Interpreter, chunk size and stderr routing

pub mod command;
pub mod config;
pub mod output;

pub use command::{ShellCommand, ShellExecution, ShellExecutor};
pub use config::{DEFAULT_CHUNK_SIZE, ExecutorConfig, StderrMode};
pub use output::{output_chunks, stream_output};
