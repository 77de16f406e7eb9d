//! Command-line arguments.
//!
//! Every setting left unset here falls back to the config file, then to
//! built-in defaults.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

/// Command-line arguments for `mqexec`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "mqexec",
    version,
    about = "Run shell commands received over MQTT and publish their output.",
    long_about = "Run shell commands received over MQTT and publish their output.\n\n\
        WARNING: there is no authentication. Anyone able to publish on a \
        subscribed topic can run arbitrary commands as this user.",
    disable_help_flag = true
)]
pub struct CliArgs {
    /// Ask the broker to keep the session across reconnects.
    #[arg(short = 'c', long)]
    pub disable_clean_session: bool,

    /// Print connection details and broker log messages.
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Broker host [default: localhost].
    #[arg(short = 'h', long, value_name = "HOST", env = "MQEXEC_HOST")]
    pub host: Option<String>,

    /// Keepalive interval in seconds, 0 disables [default: 60].
    #[arg(short = 'k', long, value_name = "SECS", env = "MQEXEC_KEEPALIVE")]
    pub keepalive: Option<u64>,

    /// Broker port [default: 1883].
    #[arg(short = 'p', long, value_name = "PORT", env = "MQEXEC_PORT")]
    pub port: Option<u16>,

    /// Subscription QoS: 0, 1 or 2 [default: 0].
    #[arg(
        short = 'q',
        long,
        value_name = "LEVEL",
        env = "MQEXEC_QOS",
        allow_negative_numbers = true
    )]
    pub qos: Option<i64>,

    /// Command topic; repeat to subscribe to several [default: shell].
    #[arg(short = 't', long = "topic", value_name = "TOPIC", env = "MQEXEC_TOPIC")]
    pub topics: Vec<String>,

    /// Result topic; the first one receives command output [default: data].
    #[arg(short = 'o', long = "publish-topic", value_name = "TOPIC", env = "MQEXEC_PUBLISH_TOPIC")]
    pub publish_topics: Vec<String>,

    /// Client id [default: <prefix>/<pid>-<hostname>].
    #[arg(short = 'i', long, value_name = "ID", env = "MQEXEC_ID")]
    pub id: Option<String>,

    /// Prefix of the generated client id [default: mqexec].
    #[arg(long, value_name = "PREFIX", env = "MQEXEC_ID_PREFIX")]
    pub id_prefix: Option<String>,

    /// Broker username.
    #[arg(short = 'u', long, value_name = "USER", env = "MQEXEC_USERNAME")]
    pub username: Option<String>,

    /// Broker password.
    #[arg(
        short = 'P',
        long,
        value_name = "PASSWORD",
        env = "MQEXEC_PASSWORD",
        hide_env_values = true
    )]
    pub password: Option<String>,

    /// TOML config file [default: ~/.config/mqexec/config.toml if present].
    #[arg(long, value_name = "PATH", env = "MQEXEC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Kill commands running longer than this many seconds, 0 disables.
    #[arg(long, value_name = "SECS", env = "MQEXEC_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Run at most this many commands at once.
    #[arg(long, value_name = "N", env = "MQEXEC_MAX_CONCURRENT")]
    pub max_concurrent: Option<usize>,

    /// Largest output chunk published at once, in bytes [default: 1024].
    #[arg(long, value_name = "BYTES", env = "MQEXEC_CHUNK_SIZE")]
    pub chunk_size: Option<usize>,

    /// Command stderr: inherit, merge or discard [default: inherit].
    #[arg(long, value_name = "MODE", env = "MQEXEC_STDERR")]
    pub stderr: Option<String>,

    /// Interpreter: system, login or a path [default: system].
    #[arg(long, value_name = "SHELL", env = "MQEXEC_SHELL")]
    pub shell: Option<String>,

    /// Seconds to wait before polling again after a connection error [default: 1].
    #[arg(long, value_name = "SECS", env = "MQEXEC_RECONNECT_DELAY")]
    pub reconnect_delay: Option<u64>,

    /// Logging level. `RUST_LOG` takes precedence when set.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
#[must_use]
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
