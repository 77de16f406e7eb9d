//! Core abstractions for the publish/subscribe command agent.
//!
//! This crate provides the fundamental building blocks:
//! - `Session` - Immutable broker session description
//! - `InboundMessage`, `ConnectCode`, `QoS` - Broker-facing value types
//! - Error taxonomy shared by every layer
//! - Broker, handler and executor traits

pub mod error;
pub mod identity;
pub mod session;
pub mod traits;

pub use error::{BrokerError, ConfigError, ConnectError, ExecutionError, TransportError};
pub use session::{ConnectCode, Credentials, InboundMessage, QoS, Session, SessionBuilder};
pub use traits::{
    BrokerClient, BrokerConnector, BrokerEvent, BrokerHandler, EventSource, Execution, Executor,
    ExitReport, FixedRoute, ResultRouter,
};
