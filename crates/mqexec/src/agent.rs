//! Agent wiring: session, dispatcher and network loop.

use std::{sync::Arc, time::Duration};

use mqexec_core::{BrokerClient, BrokerConnector, ConnectError, EventSource, FixedRoute};
use mqexec_executor::ShellExecutor;
use mqexec_session::{AgentHandler, CommandDispatcher, SessionManager, run_event_loop};
use tokio_util::sync::CancellationToken;

use crate::config::AgentConfig;

/// How long running commands may take to finish after shutdown is requested.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Time allowed for the disconnect request to reach the broker.
const FLUSH_TIMEOUT: Duration = Duration::from_millis(500);

/// Run the agent until `shutdown` is cancelled.
///
/// # Errors
/// Returns [`ConnectError`] if the broker cannot be reached at startup.
pub async fn run<C>(
    config: AgentConfig,
    connector: &C,
    shutdown: CancellationToken,
) -> Result<(), ConnectError>
where
    C: BrokerConnector,
{
    let AgentConfig {
        session,
        executor,
        dispatch,
        event_loop,
        debug,
    } = config;

    if debug {
        tracing::info!(
            host = session.host(),
            port = session.port(),
            client_id = session.client_id(),
            topics = ?session.subscribe_topics(),
            result_topic = session.result_topic(),
            "Starting agent"
        );
    }

    let (manager, mut events) = SessionManager::start(connector, session).await?;
    let router = Arc::new(FixedRoute::for_session(manager.session()));
    let dispatcher = Arc::new(CommandDispatcher::new(
        Arc::clone(&manager),
        Arc::new(ShellExecutor::new(executor)),
        router,
        dispatch,
    ));
    let handler = AgentHandler::new(Arc::clone(&manager), Arc::clone(&dispatcher), debug);

    let result = run_event_loop(&mut events, &handler, event_loop, shutdown).await;

    drain(&mut events, &dispatcher).await;

    manager.disconnect().await;
    let _ = tokio::time::timeout(FLUSH_TIMEOUT, async {
        while events.next_event().await.is_ok() {}
    })
    .await;

    tracing::info!("Agent stopped");
    result
}

/// Wait for running commands while still polling, so their output is sent.
async fn drain<E, B>(events: &mut E, dispatcher: &CommandDispatcher<B>)
where
    E: EventSource + ?Sized,
    B: BrokerClient + 'static,
{
    let finished = dispatcher.shutdown(SHUTDOWN_GRACE);
    tokio::pin!(finished);
    let mut polling = true;

    loop {
        tokio::select! {
            _ = &mut finished => return,
            event = events.next_event(), if polling => polling = event.is_ok(),
        }
    }
}
