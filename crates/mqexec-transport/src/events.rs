//! Event side of the MQTT connection.

use async_trait::async_trait;
use mqexec_core::{BrokerEvent, ConnectCode, EventSource, InboundMessage, TransportError};
use rumqttc::{ConnectReturnCode, ConnectionError, Event, EventLoop, Packet, SubscribeReasonCode};

/// Polls a `rumqttc` event loop. Polling after an error reconnects.
pub struct MqttEvents {
    eventloop: EventLoop,
}

impl MqttEvents {
    #[must_use]
    pub const fn new(eventloop: EventLoop) -> Self {
        Self { eventloop }
    }
}

#[async_trait]
impl EventSource for MqttEvents {
    async fn next_event(&mut self) -> Result<BrokerEvent, TransportError> {
        match self.eventloop.poll().await {
            Ok(event) => Ok(map_event(event)),
            // The broker answered; the outcome is a connect code, not a transport failure.
            Err(ConnectionError::ConnectionRefused(code)) => {
                Ok(BrokerEvent::Connected(map_connect_code(code)))
            }
            Err(ConnectionError::Io(e)) => Err(TransportError::Io(e)),
            Err(e) => Err(TransportError::Protocol(e.to_string())),
        }
    }
}

#[must_use]
pub const fn map_connect_code(code: ConnectReturnCode) -> ConnectCode {
    match code {
        ConnectReturnCode::Success => ConnectCode::Success,
        ConnectReturnCode::RefusedProtocolVersion => ConnectCode::RefusedProtocolVersion,
        ConnectReturnCode::BadClientId => ConnectCode::BadClientId,
        ConnectReturnCode::ServiceUnavailable => ConnectCode::ServiceUnavailable,
        ConnectReturnCode::BadUserNamePassword => ConnectCode::BadUserNamePassword,
        ConnectReturnCode::NotAuthorized => ConnectCode::NotAuthorized,
    }
}

/// Translate one `rumqttc` event.
#[must_use]
pub fn map_event(event: Event) -> BrokerEvent {
    match event {
        Event::Incoming(Packet::ConnAck(ack)) => BrokerEvent::Connected(map_connect_code(ack.code)),
        Event::Incoming(Packet::Publish(publish)) => {
            BrokerEvent::Message(InboundMessage::new(publish.topic, publish.payload))
        }
        Event::Incoming(Packet::Disconnect) => BrokerEvent::Disconnected,
        Event::Incoming(Packet::SubAck(ack))
            if ack.return_codes.contains(&SubscribeReasonCode::Failure) =>
        {
            tracing::warn!(pkid = ack.pkid, "Subscription rejected by broker");
            BrokerEvent::Log(format!("Subscription {} rejected by broker", ack.pkid))
        }
        Event::Incoming(packet) => BrokerEvent::Log(format!("Received {packet:?}")),
        Event::Outgoing(outgoing) => BrokerEvent::Log(format!("Sending {outgoing:?}")),
    }
}
