//! Broker callbacks wired to the session manager and dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use mqexec_core::{BrokerClient, BrokerHandler, ConnectCode, InboundMessage};

use crate::{dispatcher::CommandDispatcher, manager::SessionManager};

/// The agent's [`BrokerHandler`].
pub struct AgentHandler<B>
where
    B: BrokerClient + 'static,
{
    manager: Arc<SessionManager<B>>,
    dispatcher: Arc<CommandDispatcher<B>>,
    broker_logs: bool,
}

impl<B> AgentHandler<B>
where
    B: BrokerClient + 'static,
{
    /// `broker_logs` forwards transport diagnostics to the debug log.
    #[must_use]
    pub const fn new(
        manager: Arc<SessionManager<B>>,
        dispatcher: Arc<CommandDispatcher<B>>,
        broker_logs: bool,
    ) -> Self {
        Self {
            manager,
            dispatcher,
            broker_logs,
        }
    }
}

#[async_trait]
impl<B> BrokerHandler for AgentHandler<B>
where
    B: BrokerClient + 'static,
{
    async fn on_connect(&self, code: ConnectCode) {
        // Subscriptions complete on their own task while the loop keeps polling.
        let _ = self.manager.on_connect(code);
    }

    async fn on_message(&self, message: InboundMessage) {
        // The execution runs on its own task; its handle is not needed here.
        let _ = self.dispatcher.dispatch(message);
    }

    async fn on_log(&self, text: &str) {
        if self.broker_logs {
            tracing::debug!(target: "mqexec::broker", "{text}");
        }
    }

    async fn on_disconnect(&self) {
        self.manager.on_disconnect();
    }
}
