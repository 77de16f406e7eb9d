//! Command dispatcher: turns inbound messages into executions.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use mqexec_core::{
    BrokerClient, ExecutionError, Executor, ExitReport, InboundMessage, ResultRouter,
};
use mqexec_executor::stream_output;
use tokio::{sync::Semaphore, task::JoinHandle};
use tokio_util::task::TaskTracker;

use crate::manager::SessionManager;

/// Execution limits applied by the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Kill commands that run longer than this. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Run at most this many commands at once. `None` is unbounded.
    pub max_concurrent: Option<usize>,
}

/// Runs every non-empty inbound payload as a shell command.
///
/// There is no authentication here: anyone allowed to publish on a
/// subscribed topic can run commands as this process's user.
pub struct CommandDispatcher<B>
where
    B: BrokerClient + 'static,
{
    manager: Arc<SessionManager<B>>,
    executor: Arc<dyn Executor>,
    router: Arc<dyn ResultRouter>,
    timeout: Option<Duration>,
    permits: Option<Arc<Semaphore>>,
    tracker: TaskTracker,
}

impl<B> CommandDispatcher<B>
where
    B: BrokerClient + 'static,
{
    #[must_use]
    pub fn new(
        manager: Arc<SessionManager<B>>,
        executor: Arc<dyn Executor>,
        router: Arc<dyn ResultRouter>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            manager,
            executor,
            router,
            timeout: options.timeout,
            permits: options
                .max_concurrent
                .map(|limit| Arc::new(Semaphore::new(limit.max(1)))),
            tracker: TaskTracker::new(),
        }
    }

    /// Start executing `message` on its own task.
    ///
    /// Returns `None` when the message is dropped: an empty payload, or a
    /// router that has no result topic for it. Identical payloads are never
    /// de-duplicated.
    pub fn dispatch(
        &self,
        message: InboundMessage,
    ) -> Option<JoinHandle<Result<ExitReport, ExecutionError>>> {
        if message.payload.is_empty() {
            tracing::debug!(topic = %message.topic, "Ignoring empty payload");
            return None;
        }

        let Some(result_topic) = self.router.result_topic(&message) else {
            tracing::debug!(topic = %message.topic, "No result topic, dropping message");
            return None;
        };

        let command = String::from_utf8_lossy(&message.payload).into_owned();
        tracing::info!(topic = %message.topic, %command, "Received command");

        let manager = Arc::clone(&self.manager);
        let executor = Arc::clone(&self.executor);
        let permits = self.permits.clone();
        let timeout = self.timeout;

        Some(self.tracker.spawn(async move {
            let _permit = match permits {
                Some(permits) => permits.acquire_owned().await.ok(),
                None => None,
            };
            let result = run_command(&manager, executor.as_ref(), &result_topic, &command, timeout).await;
            match &result {
                Ok(report) => tracing::info!(
                    %command,
                    code = ?report.code,
                    timed_out = report.timed_out,
                    chunks = report.chunks,
                    bytes = report.bytes,
                    "Command finished"
                ),
                Err(e) => tracing::error!(%command, "Command failed: {e}"),
            }
            result
        }))
    }

    /// Number of executions still running or waiting for a permit.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every dispatched execution has finished.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Wait for in-flight executions, giving up after `grace`.
    ///
    /// Returns `true` if everything finished in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        let finished = tokio::time::timeout(grace, self.tracker.wait()).await.is_ok();
        if !finished {
            tracing::warn!(remaining = self.tracker.len(), "Abandoning running commands");
        }
        finished
    }
}

async fn run_command<B>(
    manager: &Arc<SessionManager<B>>,
    executor: &dyn Executor,
    topic: &str,
    command: &str,
    timeout: Option<Duration>,
) -> Result<ExitReport, ExecutionError>
where
    B: BrokerClient + 'static,
{
    let mut execution = executor.execute(command).await?;
    stream_output(execution.as_mut(), timeout, |chunk: Bytes| {
        let manager = Arc::clone(manager);
        let topic = topic.to_string();
        async move { manager.publish(&topic, chunk).await }
    })
    .await
}
