//! Broker session description.
//!
//! A [`Session`] is built once at startup and never mutated afterwards.
//! Connection state lives with the session manager, not here.

use std::{fmt, time::Duration};

use bytes::Bytes;

use crate::error::ConfigError;

/// Longest client id an MQTT 3.1 broker is required to accept.
pub const MAX_CLIENT_ID_LEN: usize = 23;

/// Shortest non-zero keepalive the transport accepts.
const MIN_KEEPALIVE_SECS: u64 = 5;

/// Delivery guarantee for a subscription or publication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum QoS {
    /// At most once.
    #[default]
    AtMostOnce = 0,
    /// At least once.
    AtLeastOnce = 1,
    /// Exactly once.
    ExactlyOnce = 2,
}

impl TryFrom<i64> for QoS {
    type Error = ConfigError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(ConfigError::InvalidQos(other)),
        }
    }
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        qos as Self
    }
}

impl fmt::Display for QoS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// Result code carried by a connection acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectCode {
    Success,
    RefusedProtocolVersion,
    BadClientId,
    ServiceUnavailable,
    BadUserNamePassword,
    NotAuthorized,
}

impl ConnectCode {
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Human readable reason, worded the way brokers report it.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::Success => "Connection Accepted.",
            Self::RefusedProtocolVersion => "Connection Refused: unacceptable protocol version.",
            Self::BadClientId => "Connection Refused: identifier rejected.",
            Self::ServiceUnavailable => "Connection Refused: broker unavailable.",
            Self::BadUserNamePassword => "Connection Refused: bad user name or password.",
            Self::NotAuthorized => "Connection Refused: not authorised.",
        }
    }
}

impl fmt::Display for ConnectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Username/password pair presented on connect.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A message delivered on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Bytes,
}

impl InboundMessage {
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Immutable description of the broker session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    client_id: String,
    host: String,
    port: u16,
    keepalive: Duration,
    clean_session: bool,
    qos: QoS,
    subscribe_topics: Vec<String>,
    publish_topics: Vec<String>,
    credentials: Option<Credentials>,
}

impl Session {
    /// Start building a session for `client_id` with the stock defaults.
    #[must_use]
    pub fn builder(client_id: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(client_id)
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub const fn keepalive(&self) -> Duration {
        self.keepalive
    }

    #[must_use]
    pub const fn clean_session(&self) -> bool {
        self.clean_session
    }

    #[must_use]
    pub const fn qos(&self) -> QoS {
        self.qos
    }

    /// Topics subscribed on every successful connect, in order.
    #[must_use]
    pub fn subscribe_topics(&self) -> &[String] {
        &self.subscribe_topics
    }

    #[must_use]
    pub fn publish_topics(&self) -> &[String] {
        &self.publish_topics
    }

    /// Topic that receives command output.
    #[must_use]
    pub fn result_topic(&self) -> &str {
        // Non-empty by construction.
        &self.publish_topics[0]
    }

    #[must_use]
    pub const fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }
}

/// Builder for [`Session`]. Validation happens in [`SessionBuilder::build`].
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    client_id: String,
    host: String,
    port: u16,
    keepalive_secs: u64,
    clean_session: bool,
    qos: QoS,
    subscribe_topics: Vec<String>,
    publish_topics: Vec<String>,
    credentials: Option<Credentials>,
}

impl SessionBuilder {
    pub const DEFAULT_HOST: &'static str = "localhost";
    pub const DEFAULT_PORT: u16 = 1883;
    pub const DEFAULT_KEEPALIVE_SECS: u64 = 60;
    pub const DEFAULT_SUBSCRIBE_TOPIC: &'static str = "shell";
    pub const DEFAULT_PUBLISH_TOPIC: &'static str = "data";

    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            keepalive_secs: Self::DEFAULT_KEEPALIVE_SECS,
            clean_session: true,
            qos: QoS::AtMostOnce,
            subscribe_topics: Vec::new(),
            publish_topics: Vec::new(),
            credentials: None,
        }
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub const fn keepalive_secs(mut self, secs: u64) -> Self {
        self.keepalive_secs = secs;
        self
    }

    #[must_use]
    pub const fn clean_session(mut self, clean: bool) -> Self {
        self.clean_session = clean;
        self
    }

    #[must_use]
    pub const fn qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    /// Append a subscribe topic. Duplicates are kept.
    #[must_use]
    pub fn subscribe(mut self, topic: impl Into<String>) -> Self {
        self.subscribe_topics.push(topic.into());
        self
    }

    #[must_use]
    pub fn subscribe_all<I>(mut self, topics: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.subscribe_topics.extend(topics.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn publish(mut self, topic: impl Into<String>) -> Self {
        self.publish_topics.push(topic.into());
        self
    }

    #[must_use]
    pub fn publish_all<I>(mut self, topics: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.publish_topics.extend(topics.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Validate and freeze the session.
    ///
    /// Empty topic lists fall back to the built-in `shell` / `data` topics.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for an empty host or client id, an empty
    /// topic, a wildcard publish topic, or an unsupported keepalive.
    pub fn build(self) -> Result<Session, ConfigError> {
        let Self {
            client_id,
            host,
            port,
            keepalive_secs,
            clean_session,
            qos,
            mut subscribe_topics,
            mut publish_topics,
            credentials,
        } = self;

        if client_id.is_empty() {
            return Err(ConfigError::EmptyClientId);
        }
        if host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if keepalive_secs != 0 && keepalive_secs < MIN_KEEPALIVE_SECS {
            return Err(ConfigError::InvalidKeepalive(keepalive_secs));
        }

        if subscribe_topics.is_empty() {
            subscribe_topics.push(SessionBuilder::DEFAULT_SUBSCRIBE_TOPIC.to_string());
        }
        if publish_topics.is_empty() {
            publish_topics.push(SessionBuilder::DEFAULT_PUBLISH_TOPIC.to_string());
        }
        if subscribe_topics.iter().any(String::is_empty) || publish_topics.iter().any(String::is_empty) {
            return Err(ConfigError::EmptyTopic);
        }
        if let Some(topic) = publish_topics.iter().find(|t| t.contains(['+', '#'])) {
            return Err(ConfigError::WildcardPublishTopic(topic.clone()));
        }

        Ok(Session {
            client_id,
            host,
            port,
            keepalive: Duration::from_secs(keepalive_secs),
            clean_session,
            qos,
            subscribe_topics,
            publish_topics,
            credentials,
        })
    }
}
