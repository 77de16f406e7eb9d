//! MQTT remote command agent.
//!
//! Subscribes to command topics, runs every payload through a shell and
//! streams the command's output to a result topic. Anyone who can publish
//! on a subscribed topic can run commands as the agent's user.

pub mod agent;
pub mod cli;
pub mod config;
pub mod logging;

pub use agent::{SHUTDOWN_GRACE, run};
pub use cli::{CliArgs, LogLevel};
pub use config::{AgentConfig, FileConfig, LoadError};
