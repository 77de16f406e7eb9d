//! Session to client options.

use mqexec_core::Session;
use rumqttc::MqttOptions;

/// Largest packet the MQTT remaining-length field can describe.
pub const MAX_PACKET_SIZE: usize = 268_435_455;

/// Build `rumqttc` options for `session`.
#[must_use]
pub fn mqtt_options(session: &Session) -> MqttOptions {
    let mut options = MqttOptions::new(session.client_id(), session.host(), session.port());
    options
        .set_keep_alive(session.keepalive())
        .set_clean_session(session.clean_session())
        .set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);

    if let Some(credentials) = session.credentials() {
        options.set_credentials(credentials.username.clone(), credentials.password.clone());
    }

    options
}
