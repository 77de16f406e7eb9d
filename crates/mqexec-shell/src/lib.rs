//! Shell resolution for command payloads.
//!
//! Provides:
//! - `ShellChoice` - Which interpreter receives a command line
//! - Shell detection utilities for Unix and Windows

pub mod shell;

pub use shell::{
    ShellChoice, display_invocation, get_shell_command, login_shell, resolve_executable_path,
};
