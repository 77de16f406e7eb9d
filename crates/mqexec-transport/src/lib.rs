//! MQTT transport built on `rumqttc`.
//!
//! Provides:
//! - Session to `MqttOptions` mapping
//! - `MqttClient` - request side, shared by every execution
//! - `MqttEvents` - event side, polled by the network loop
//! - `MqttConnector` - opens the pair

pub mod client;
pub mod events;
pub mod options;

pub use client::{DEFAULT_CAPACITY, MqttClient, MqttConnector};
pub use events::{MqttEvents, map_connect_code, map_event};
pub use options::mqtt_options;
