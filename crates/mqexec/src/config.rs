//! Configuration resolution.
//!
//! Priority (highest to lowest):
//!
//! 1. CLI flags
//! 2. Environment variables (`MQEXEC_*`, read by clap)
//! 3. TOML file: `--config`, else `~/.config/mqexec/config.toml` when present
//! 4. Compiled-in defaults

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use mqexec_core::{ConfigError, Credentials, QoS, Session, identity};
use mqexec_executor::{ExecutorConfig, StderrMode};
use mqexec_session::{DispatchOptions, EventLoopOptions};
use mqexec_shell::ShellChoice;
use serde::Deserialize;
use thiserror::Error;

use crate::cli::CliArgs;

/// Error raised while loading configuration.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Settings read from the TOML file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub keepalive: Option<u64>,
    pub clean_session: Option<bool>,
    pub qos: Option<i64>,
    pub topics: Vec<String>,
    pub publish_topics: Vec<String>,
    pub id: Option<String>,
    pub id_prefix: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Option<u64>,
    pub max_concurrent: Option<usize>,
    pub chunk_size: Option<usize>,
    pub stderr: Option<String>,
    pub shell: Option<String>,
    pub reconnect_delay: Option<u64>,
    pub debug: Option<bool>,
}

impl FileConfig {
    /// `~/.config/mqexec/config.toml`, or the platform equivalent.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mqexec").join("config.toml"))
    }

    /// # Errors
    /// Returns [`LoadError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `explicit`, or the default file if it exists.
    ///
    /// # Errors
    /// An explicit path must be readable; a missing default file is not an error.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, LoadError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "Loading config file");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}

/// Fully resolved agent settings.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub session: Session,
    pub executor: ExecutorConfig,
    pub dispatch: DispatchOptions,
    pub event_loop: EventLoopOptions,
    pub debug: bool,
}

impl AgentConfig {
    /// Resolve from CLI/environment and the config file.
    ///
    /// # Errors
    /// Returns [`LoadError`] if the file is unusable or a value is invalid.
    pub fn resolve(args: &CliArgs) -> Result<Self, LoadError> {
        let file = FileConfig::discover(args.config.as_deref())?;
        Ok(Self::from_layers(args, file)?)
    }

    /// Merge `args` over `file` over defaults and validate the result.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for the first invalid value.
    pub fn from_layers(args: &CliArgs, file: FileConfig) -> Result<Self, ConfigError> {
        let qos = match args.qos.or(file.qos) {
            Some(level) => QoS::try_from(level)?,
            None => QoS::default(),
        };

        let client_id = match args.id.clone().or(file.id) {
            Some(id) => id,
            None => {
                let prefix = args.id_prefix.clone().or(file.id_prefix);
                identity::default_client_id(prefix.as_deref().unwrap_or(identity::DEFAULT_ID_PREFIX))
            }
        };

        let username = args.username.clone().or(file.username);
        let password = args.password.clone().or(file.password);
        let credentials = match (username, password) {
            (Some(username), password) => Some(Credentials {
                username,
                password: password.unwrap_or_default(),
            }),
            (None, Some(_)) => {
                return Err(ConfigError::InvalidValue {
                    field: "password",
                    message: "a password needs a username".into(),
                });
            }
            (None, None) => None,
        };

        let subscribe = if args.topics.is_empty() { file.topics } else { args.topics.clone() };
        let publish = if args.publish_topics.is_empty() {
            file.publish_topics
        } else {
            args.publish_topics.clone()
        };

        let mut builder = Session::builder(client_id)
            .clean_session(!args.disable_clean_session && file.clean_session.unwrap_or(true))
            .qos(qos)
            .subscribe_all(subscribe)
            .publish_all(publish)
            .credentials(credentials);
        if let Some(host) = args.host.clone().or(file.host) {
            builder = builder.host(host);
        }
        if let Some(port) = args.port.or(file.port) {
            builder = builder.port(port);
        }
        if let Some(secs) = args.keepalive.or(file.keepalive) {
            builder = builder.keepalive_secs(secs);
        }
        let session = builder.build()?;

        let mut executor = ExecutorConfig::default();
        if let Some(mode) = args.stderr.clone().or(file.stderr) {
            executor.stderr = mode
                .parse::<StderrMode>()
                .map_err(|message| ConfigError::InvalidValue { field: "stderr", message })?;
        }
        if let Some(shell) = args.shell.clone().or(file.shell) {
            executor.shell = shell
                .parse::<ShellChoice>()
                .map_err(|message| ConfigError::InvalidValue { field: "shell", message })?;
        }
        if let Some(size) = args.chunk_size.or(file.chunk_size) {
            executor.chunk_size = size;
        }
        executor.validate()?;

        let max_concurrent = args.max_concurrent.or(file.max_concurrent);
        if max_concurrent == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrent",
                message: "must be at least 1".into(),
            });
        }
        let dispatch = DispatchOptions {
            timeout: args
                .timeout
                .or(file.timeout)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            max_concurrent,
        };

        let mut event_loop = EventLoopOptions::default();
        if let Some(secs) = args.reconnect_delay.or(file.reconnect_delay) {
            event_loop.reconnect_delay = Duration::from_secs(secs);
        }

        Ok(Self {
            session,
            executor,
            dispatch,
            event_loop,
            debug: args.debug || file.debug.unwrap_or(false),
        })
    }
}
