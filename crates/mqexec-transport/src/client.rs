//! Request side of the MQTT connection.

use async_trait::async_trait;
use bytes::Bytes;
use mqexec_core::{BrokerClient, BrokerConnector, BrokerError, ConnectError, QoS, Session};
use rumqttc::AsyncClient;

use crate::{events::MqttEvents, options::mqtt_options};

/// Default capacity of the request channel between client and event loop.
pub const DEFAULT_CAPACITY: usize = 64;

pub(crate) const fn to_rumqttc(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

/// Cloneable handle publishing through one event loop.
#[derive(Clone)]
pub struct MqttClient {
    inner: AsyncClient,
}

impl MqttClient {
    #[must_use]
    pub const fn new(inner: AsyncClient) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl BrokerClient for MqttClient {
    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), BrokerError> {
        self.inner
            .subscribe(topic, to_rumqttc(qos))
            .await
            .map_err(|e| BrokerError::Subscribe {
                topic: topic.to_string(),
                message: e.to_string(),
            })
    }

    async fn publish(
        &self,
        topic: &str,
        payload: Bytes,
        qos: QoS,
        retain: bool,
    ) -> Result<(), BrokerError> {
        self.inner
            .publish_bytes(topic, to_rumqttc(qos), retain, payload)
            .await
            .map_err(|e| BrokerError::Publish {
                topic: topic.to_string(),
                message: e.to_string(),
            })
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        self.inner
            .disconnect()
            .await
            .map_err(|e| BrokerError::Disconnect(e.to_string()))
    }
}

/// Opens `rumqttc` client/event-loop pairs.
#[derive(Debug, Clone, Copy)]
pub struct MqttConnector {
    capacity: usize,
}

impl Default for MqttConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MqttConnector {
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Room for every subscription of one connect plus one request, so an
    /// idle agent never waits on its own queue.
    #[must_use]
    pub fn capacity_for(&self, session: &Session) -> usize {
        self.capacity.max(session.subscribe_topics().len() + 1)
    }
}

#[async_trait]
impl BrokerConnector for MqttConnector {
    type Client = MqttClient;
    type Events = MqttEvents;

    async fn connect(&self, session: &Session) -> Result<(MqttClient, MqttEvents), ConnectError> {
        let options = mqtt_options(session);
        let (client, eventloop) = AsyncClient::new(options, self.capacity_for(session));
        tracing::debug!(
            host = session.host(),
            port = session.port(),
            client_id = session.client_id(),
            "MQTT client created"
        );
        Ok((MqttClient::new(client), MqttEvents::new(eventloop)))
    }
}
