//! Connect handling against a real `rumqttc` request channel that nobody
//! drains. No broker is contacted: the event loop is never polled.

mod common;

use std::time::Duration;

use bytes::Bytes;
use common::session;
use mqexec_core::ConnectCode;
use mqexec_session::{ConnectionState, SessionManager};
use mqexec_transport::{DEFAULT_CAPACITY, MqttConnector};

#[tokio::test]
async fn connect_ack_with_a_full_request_channel_does_not_block() {
    let connector = MqttConnector::default();
    let (manager, _events) = SessionManager::start(&connector, session(&["cmd"], "out"))
        .await
        .unwrap();

    // Output from running commands fills the channel before the ack is seen.
    for i in 0..DEFAULT_CAPACITY {
        let publish = manager.publish("out", Bytes::from(format!("chunk {i}\n")));
        tokio::time::timeout(Duration::from_secs(1), publish)
            .await
            .expect("channel filled early");
    }

    let task = manager.on_connect(ConnectCode::Success).unwrap();
    assert_eq!(manager.state(), ConnectionState::Connected);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished());
    assert!(manager.subscribed().is_empty());

    manager.on_disconnect();
    assert!(task.await.unwrap_err().is_cancelled());
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}
