#![cfg(unix)]

mod common;

use std::{
    sync::{Arc, atomic::Ordering},
    time::Duration,
};

use common::{CountingExecutor, FakeBroker, FakeConnector, session, shell_executor};
use mqexec_core::{ExecutionError, FixedRoute, InboundMessage};
use mqexec_executor::{ExecutorConfig, ShellExecutor};
use mqexec_session::{CommandDispatcher, DispatchOptions, SessionManager};

async fn dispatcher_with(
    broker: &FakeBroker,
    executor: Arc<dyn mqexec_core::Executor>,
    options: DispatchOptions,
) -> CommandDispatcher<FakeBroker> {
    let (connector, _script) = FakeConnector::new(broker.clone());
    let (manager, _events) = SessionManager::start(&connector, session(&["cmd"], "out"))
        .await
        .unwrap();
    let router = Arc::new(FixedRoute::for_session(manager.session()));
    CommandDispatcher::new(manager, executor, router, options)
}

#[tokio::test]
async fn empty_payload_spawns_and_publishes_nothing() {
    let broker = FakeBroker::new();
    let executor = Arc::new(CountingExecutor::default());
    let dispatcher = dispatcher_with(&broker, executor.clone(), DispatchOptions::default()).await;

    assert!(dispatcher.dispatch(InboundMessage::new("cmd", "")).is_none());
    dispatcher.wait_idle().await;

    assert_eq!(executor.launches.load(Ordering::SeqCst), 0);
    assert!(broker.published().is_empty());
}

#[tokio::test]
async fn streamed_chunks_concatenate_to_the_output() {
    let broker = FakeBroker::new();
    let dispatcher = dispatcher_with(&broker, shell_executor(), DispatchOptions::default()).await;

    let report = dispatcher
        .dispatch(InboundMessage::new("cmd", "printf 'line1\\nline2\\n'"))
        .unwrap()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(broker.output_on("out"), b"line1\nline2\n");
    assert_eq!(report.bytes, 12);
    assert_eq!(report.chunks, broker.published().len());
}

#[tokio::test]
async fn small_chunks_keep_order() {
    let broker = FakeBroker::new();
    let executor = Arc::new(ShellExecutor::new(ExecutorConfig {
        chunk_size: 3,
        stderr: mqexec_executor::StderrMode::Discard,
        ..ExecutorConfig::default()
    }));
    let dispatcher = dispatcher_with(&broker, executor, DispatchOptions::default()).await;

    dispatcher
        .dispatch(InboundMessage::new("cmd", "seq 1 50"))
        .unwrap()
        .await
        .unwrap()
        .unwrap();

    let expected: String = (1..=50).map(|n| format!("{n}\n")).collect();
    assert_eq!(broker.output_on("out"), expected.as_bytes());
    assert!(broker.published().iter().all(|p| p.payload.len() <= 3));
}

#[tokio::test]
async fn spawn_failure_publishes_nothing() {
    let broker = FakeBroker::new();
    let executor = Arc::new(ShellExecutor::new(ExecutorConfig {
        shell: mqexec_shell::ShellChoice::Path("/nonexistent/interpreter".into()),
        ..ExecutorConfig::default()
    }));
    let dispatcher = dispatcher_with(&broker, executor, DispatchOptions::default()).await;

    let result = dispatcher
        .dispatch(InboundMessage::new("cmd", "echo hello"))
        .unwrap()
        .await
        .unwrap();

    assert!(matches!(result, Err(ExecutionError::Spawn { .. })));
    assert!(broker.published().is_empty());
}

#[tokio::test]
async fn non_zero_exit_still_publishes_output() {
    let broker = FakeBroker::new();
    let dispatcher = dispatcher_with(&broker, shell_executor(), DispatchOptions::default()).await;

    let report = dispatcher
        .dispatch(InboundMessage::new("cmd", "echo partial; exit 4"))
        .unwrap()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.code, Some(4));
    assert!(!report.success);
    assert_eq!(broker.output_on("out"), b"partial\n");
}

#[tokio::test]
async fn redelivered_payload_runs_twice() {
    let broker = FakeBroker::new();
    let dispatcher = dispatcher_with(&broker, shell_executor(), DispatchOptions::default()).await;

    let message = InboundMessage::new("cmd", "echo again");
    let first = dispatcher.dispatch(message.clone()).unwrap();
    let second = dispatcher.dispatch(message).unwrap();
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(broker.output_on("out"), b"again\nagain\n");
}

#[tokio::test]
async fn back_to_back_messages_both_complete() {
    let broker = FakeBroker::new();
    let dispatcher = dispatcher_with(&broker, shell_executor(), DispatchOptions::default()).await;

    // B finishes first even though A arrived first.
    dispatcher.dispatch(InboundMessage::new("cmd", "sleep 0.2; echo A"));
    dispatcher.dispatch(InboundMessage::new("cmd", "echo B"));
    dispatcher.wait_idle().await;

    let payloads: Vec<_> = broker.published().into_iter().map(|p| p.payload).collect();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0].as_ref(), b"B\n");
    assert_eq!(payloads[1].as_ref(), b"A\n");
    assert_eq!(dispatcher.in_flight(), 0);
}

#[tokio::test]
async fn concurrency_limit_serializes_executions() {
    let broker = FakeBroker::new();
    let options = DispatchOptions {
        max_concurrent: Some(1),
        ..DispatchOptions::default()
    };
    let dispatcher = dispatcher_with(&broker, shell_executor(), options).await;

    dispatcher.dispatch(InboundMessage::new("cmd", "sleep 0.2; echo A"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    dispatcher.dispatch(InboundMessage::new("cmd", "echo B"));
    dispatcher.wait_idle().await;

    assert_eq!(broker.output_on("out"), b"A\nB\n");
}

#[tokio::test]
async fn timeout_publishes_a_terminal_notice() {
    let broker = FakeBroker::new();
    let options = DispatchOptions {
        timeout: Some(Duration::from_secs(1)),
        ..DispatchOptions::default()
    };
    let dispatcher = dispatcher_with(&broker, shell_executor(), options).await;

    let report = dispatcher
        .dispatch(InboundMessage::new("cmd", "echo begin; sleep 30"))
        .unwrap()
        .await
        .unwrap()
        .unwrap();

    assert!(report.timed_out);
    assert_eq!(
        broker.output_on("out"),
        b"begin\nmqexec: command timed out after 1s\n"
    );
}

#[tokio::test]
async fn timeout_covers_a_command_that_outlives_its_stdout() {
    let broker = FakeBroker::new();
    let options = DispatchOptions {
        timeout: Some(Duration::from_secs(1)),
        ..DispatchOptions::default()
    };
    let dispatcher = dispatcher_with(&broker, shell_executor(), options).await;

    let task = dispatcher
        .dispatch(InboundMessage::new("cmd", "echo hi; exec >/dev/null; sleep 30"))
        .unwrap();
    let report = tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .expect("execution still running past its deadline")
        .unwrap()
        .unwrap();

    assert!(report.timed_out);
    assert_eq!(
        broker.output_on("out"),
        b"hi\nmqexec: command timed out after 1s\n"
    );
    assert!(dispatcher.shutdown(Duration::from_secs(1)).await);
}

#[tokio::test]
async fn shutdown_waits_for_running_commands() {
    let broker = FakeBroker::new();
    let dispatcher = dispatcher_with(&broker, shell_executor(), DispatchOptions::default()).await;

    dispatcher.dispatch(InboundMessage::new("cmd", "sleep 0.1; echo done"));

    assert!(dispatcher.shutdown(Duration::from_secs(5)).await);
    assert_eq!(broker.output_on("out"), b"done\n");
}
