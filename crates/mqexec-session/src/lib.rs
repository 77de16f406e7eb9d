//! Session lifecycle and message-driven command dispatch.
//!
//! Provides:
//! - `SessionManager` - Connection state, subscriptions, result publishing
//! - `CommandDispatcher` - Inbound payload to execution task
//! - `AgentHandler` - Broker callbacks wired to both
//! - `run_event_loop` - Network loop driver with reconnect pacing

pub mod dispatcher;
pub mod event_loop;
pub mod handler;
pub mod manager;

pub use dispatcher::{CommandDispatcher, DispatchOptions};
pub use event_loop::{EventLoopOptions, run_event_loop};
pub use handler::AgentHandler;
pub use manager::{ConnectionState, SessionManager};
