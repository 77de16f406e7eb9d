//! Network loop driver.
//!
//! Polls an [`EventSource`] and turns each event into a handler callback.
//! Reconnection itself belongs to the transport: after an error the loop
//! simply waits and polls again.

use std::time::Duration;

use mqexec_core::{BrokerEvent, BrokerHandler, ConnectError, EventSource};
use tokio_util::sync::CancellationToken;

/// Pause between polls after a transport error.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventLoopOptions {
    pub reconnect_delay: Duration,
}

impl Default for EventLoopOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Drive `events` until `shutdown` is cancelled.
///
/// # Errors
/// Returns [`ConnectError`] if the transport fails before the broker has
/// acknowledged a connection even once. Later failures are retried.
pub async fn run_event_loop<E, H>(
    events: &mut E,
    handler: &H,
    options: EventLoopOptions,
    shutdown: CancellationToken,
) -> Result<(), ConnectError>
where
    E: EventSource + ?Sized,
    H: BrokerHandler + ?Sized,
{
    let mut acknowledged = false;

    loop {
        let next = tokio::select! {
            () = shutdown.cancelled() => return Ok(()),
            next = events.next_event() => next,
        };

        match next {
            Ok(BrokerEvent::Connected(code)) => {
                acknowledged = true;
                handler.on_connect(code).await;
                // A refused connection is retried on the next poll.
                if !code.is_success() && pause(&shutdown, options.reconnect_delay).await {
                    return Ok(());
                }
            }
            Ok(BrokerEvent::Message(message)) => handler.on_message(message).await,
            Ok(BrokerEvent::Log(text)) => handler.on_log(&text).await,
            Ok(BrokerEvent::Disconnected) => handler.on_disconnect().await,
            Err(e) if !acknowledged => {
                tracing::error!("Could not connect to broker: {e}");
                return Err(e.into());
            }
            Err(e) => {
                tracing::warn!(
                    retry_in = ?options.reconnect_delay,
                    "Connection error: {e}"
                );
                handler.on_disconnect().await;
                if pause(&shutdown, options.reconnect_delay).await {
                    return Ok(());
                }
            }
        }
    }
}

/// Sleep for `delay`; `true` if shutdown was requested meanwhile.
async fn pause(shutdown: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        () = shutdown.cancelled() => true,
        () = tokio::time::sleep(delay) => false,
    }
}
