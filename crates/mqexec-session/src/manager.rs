//! Session manager: connection bookkeeping, subscriptions and publishing.

use std::sync::{Arc, Mutex, RwLock};

use bytes::Bytes;
use mqexec_core::{
    BrokerClient, BrokerConnector, ConnectCode, ConnectError, QoS, Session,
};
use tokio::{
    sync::watch,
    task::{AbortHandle, JoinHandle},
};

/// Connection state as seen by the agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Owns the broker client and the immutable session.
pub struct SessionManager<B>
where
    B: BrokerClient,
{
    session: Arc<Session>,
    client: B,
    state: watch::Sender<ConnectionState>,
    subscribed: RwLock<Vec<String>>,
    subscriber: Mutex<Option<AbortHandle>>,
}

impl<B> SessionManager<B>
where
    B: BrokerClient + 'static,
{
    /// Create a manager around an already constructed client.
    #[must_use]
    pub fn new(session: Arc<Session>, client: B) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            session,
            client,
            state,
            subscribed: RwLock::new(Vec::new()),
            subscriber: Mutex::new(None),
        }
    }

    /// Open the broker connection for `session`.
    ///
    /// The connection acknowledgement arrives later through the returned
    /// event source and must be fed to [`SessionManager::on_connect`].
    ///
    /// # Errors
    /// Returns [`ConnectError`] if the transport cannot be set up.
    pub async fn start<C>(
        connector: &C,
        session: Session,
    ) -> Result<(Arc<Self>, C::Events), ConnectError>
    where
        C: BrokerConnector<Client = B>,
    {
        tracing::info!(
            host = session.host(),
            port = session.port(),
            client_id = session.client_id(),
            "Connecting to broker"
        );
        let (client, events) = connector.connect(&session).await?;
        let manager = Arc::new(Self::new(Arc::new(session), client));
        manager.set_state(ConnectionState::Connecting);
        Ok((manager, events))
    }

    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Observe connection state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Topics whose subscription succeeded since the last connect.
    #[must_use]
    pub fn subscribed(&self) -> Vec<String> {
        self.subscribed
            .read()
            .map(|topics| topics.clone())
            .unwrap_or_default()
    }

    /// React to a connection acknowledgement.
    ///
    /// On success every configured topic is subscribed in order on a
    /// separate task, so the caller (the network loop) keeps draining the
    /// request queue that the subscriptions wait on. A failed subscription
    /// is logged and does not stop the remaining ones.
    ///
    /// Returns the subscription task, `None` for a refused connection.
    pub fn on_connect(self: &Arc<Self>, code: ConnectCode) -> Option<JoinHandle<()>> {
        self.cancel_subscriber();

        if !code.is_success() {
            tracing::error!(reason = code.reason(), "Broker refused connection");
            self.set_state(ConnectionState::Disconnected);
            return None;
        }

        tracing::info!(client_id = self.session.client_id(), "Connected to broker");
        self.set_state(ConnectionState::Connected);
        self.replace_subscribed(Vec::new());

        let manager = Arc::clone(self);
        let task = tokio::spawn(async move { manager.subscribe_all().await });
        if let Ok(mut subscriber) = self.subscriber.lock() {
            *subscriber = Some(task.abort_handle());
        }
        Some(task)
    }

    async fn subscribe_all(&self) {
        let qos = self.session.qos();
        for topic in self.session.subscribe_topics() {
            match self.client.subscribe(topic, qos).await {
                Ok(()) => {
                    tracing::info!(%topic, %qos, "Subscribed");
                    if let Ok(mut subscribed) = self.subscribed.write() {
                        subscribed.push(topic.clone());
                    }
                }
                Err(e) => tracing::warn!(%topic, "Subscription failed: {e}"),
            }
        }
    }

    /// React to the connection going away.
    pub fn on_disconnect(&self) {
        if self.state() != ConnectionState::Disconnected {
            tracing::warn!("Disconnected from broker");
        }
        self.cancel_subscriber();
        self.set_state(ConnectionState::Disconnected);
        self.replace_subscribed(Vec::new());
    }

    /// Best-effort publish at QoS 0 without retain.
    ///
    /// Failures are logged and otherwise ignored.
    pub async fn publish(&self, topic: &str, payload: Bytes) {
        let len = payload.len();
        if let Err(e) = self.client.publish(topic, payload, QoS::AtMostOnce, false).await {
            tracing::warn!(%topic, bytes = len, "Publish failed: {e}");
        }
    }

    /// Close the broker connection.
    pub async fn disconnect(&self) {
        if let Err(e) = self.client.disconnect().await {
            tracing::debug!("Disconnect failed: {e}");
        }
        self.on_disconnect();
    }

    /// Stop subscriptions left over from an earlier connection.
    fn cancel_subscriber(&self) {
        if let Some(previous) = self.subscriber.lock().ok().and_then(|mut s| s.take()) {
            previous.abort();
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn replace_subscribed(&self, topics: Vec<String>) {
        if let Ok(mut subscribed) = self.subscribed.write() {
            *subscribed = topics;
        }
    }
}
