//! Capability traits at the seams between session, transport and executor.

use std::process::ExitStatus;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    error::{BrokerError, ConnectError, ExecutionError, TransportError},
    session::{ConnectCode, InboundMessage, QoS, Session},
};

/// Request side of a broker connection.
///
/// Implementations must be safe to call from many tasks at once: results
/// of concurrent executions are published through the same client.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Subscribe to a single topic.
    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), BrokerError>;

    /// Publish a payload. Completion means the request was queued, not delivered.
    async fn publish(
        &self,
        topic: &str,
        payload: Bytes,
        qos: QoS,
        retain: bool,
    ) -> Result<(), BrokerError>;

    /// Politely close the connection.
    async fn disconnect(&self) -> Result<(), BrokerError>;
}

/// Something that happened on the broker connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    /// A connection acknowledgement arrived, successful or not.
    Connected(ConnectCode),
    /// A message arrived on a subscribed topic.
    Message(InboundMessage),
    /// The broker closed the connection.
    Disconnected,
    /// Diagnostic text from the transport.
    Log(String),
}

/// Event side of a broker connection. Polling it drives the network loop.
#[async_trait]
pub trait EventSource: Send {
    /// Wait for the next event.
    ///
    /// # Errors
    /// Returns [`TransportError`] when the connection breaks. Polling again
    /// afterwards asks the transport to reconnect.
    async fn next_event(&mut self) -> Result<BrokerEvent, TransportError>;
}

/// Opens broker connections.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    type Client: BrokerClient + 'static;
    type Events: EventSource + 'static;

    /// Create the client/event pair for `session`.
    ///
    /// # Errors
    /// Returns [`ConnectError`] if the transport cannot be set up.
    async fn connect(&self, session: &Session) -> Result<(Self::Client, Self::Events), ConnectError>;
}

/// Callbacks invoked by the network loop.
#[async_trait]
pub trait BrokerHandler: Send + Sync {
    /// Must not wait on the broker: the network loop that serves those
    /// requests is the caller.
    async fn on_connect(&self, code: ConnectCode);

    /// Must return quickly: the network loop waits for it.
    async fn on_message(&self, message: InboundMessage);

    async fn on_log(&self, text: &str);

    async fn on_disconnect(&self) {}
}

/// A running command whose output is read incrementally.
#[async_trait]
pub trait Execution: Send {
    /// Next chunk of output, `None` once the output is exhausted.
    async fn next_chunk(&mut self) -> Option<std::io::Result<Bytes>>;

    /// Ask the process (and anything it started) to terminate. Does not reap.
    ///
    /// # Errors
    /// Returns error if the signal cannot be delivered.
    fn start_kill(&mut self) -> std::io::Result<()>;

    /// Wait for termination and release the process.
    ///
    /// # Errors
    /// Returns error if waiting fails.
    async fn wait(&mut self) -> std::io::Result<ExitStatus>;
}

/// Launches command text as a process.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Spawn `command` with its output captured.
    ///
    /// # Errors
    /// Returns [`ExecutionError`] if the process cannot be spawned.
    async fn execute(&self, command: &str) -> Result<Box<dyn Execution>, ExecutionError>;
}

/// Picks the topic that receives the output of a command.
pub trait ResultRouter: Send + Sync {
    /// `None` drops the output of this message.
    fn result_topic(&self, message: &InboundMessage) -> Option<String>;
}

/// Every command's output goes to one topic.
#[derive(Debug, Clone)]
pub struct FixedRoute {
    topic: String,
}

impl FixedRoute {
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self { topic: topic.into() }
    }

    /// Route to the session's result topic.
    #[must_use]
    pub fn for_session(session: &Session) -> Self {
        Self::new(session.result_topic())
    }
}

impl ResultRouter for FixedRoute {
    fn result_topic(&self, _message: &InboundMessage) -> Option<String> {
        Some(self.topic.clone())
    }
}

/// Summary of a finished execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    pub success: bool,
    pub timed_out: bool,
    /// Number of output chunks published.
    pub chunks: usize,
    /// Total output bytes published, excluding any timeout notice.
    pub bytes: usize,
}
