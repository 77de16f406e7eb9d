//! Error taxonomy shared across the agent crates.

use std::path::PathBuf;

use thiserror::Error;

/// Invalid startup configuration. Always raised before any network activity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0}: QoS out of range")]
    InvalidQos(i64),
    #[error("Topic must not be empty")]
    EmptyTopic,
    #[error("Publish topic must not contain wildcards: {0}")]
    WildcardPublishTopic(String),
    #[error("Host must not be empty")]
    EmptyHost,
    #[error("Client id must not be empty")]
    EmptyClientId,
    #[error("{0}: keepalive must be 0 or at least 5 seconds")]
    InvalidKeepalive(u64),
    #[error("Chunk size must be at least 1 byte")]
    InvalidChunkSize,
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

/// Failure to establish the broker session.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// OS-level failure (address resolution, socket connect, bind).
    #[error("Connection I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Transport failure that is not an OS error (TLS, protocol state, timeouts).
    #[error("Transport error: {0}")]
    Transport(String),
    /// The broker client could not be constructed.
    #[error("Broker client error: {0}")]
    Client(String),
}

impl From<TransportError> for ConnectError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(e) => Self::Io(e),
            TransportError::Protocol(msg) => Self::Transport(msg),
        }
    }
}

/// Error reported by a broker client request.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Subscribe to '{topic}' failed: {message}")]
    Subscribe { topic: String, message: String },
    #[error("Publish to '{topic}' failed: {message}")]
    Publish { topic: String, message: String },
    #[error("Disconnect failed: {0}")]
    Disconnect(String),
}

/// Error surfaced while polling the broker's network loop.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Command execution error.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Failed to spawn '{}': {source}", .shell.display())]
    Spawn {
        shell: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Child process has no {0} pipe")]
    MissingPipe(&'static str),
    #[error("Failed to kill child process: {0}")]
    Kill(#[source] std::io::Error),
    #[error("Failed to wait for child process: {0}")]
    Wait(#[source] std::io::Error),
}
