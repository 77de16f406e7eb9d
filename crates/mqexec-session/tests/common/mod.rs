#![allow(dead_code)]

use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use mqexec_core::{
    BrokerClient, BrokerConnector, BrokerError, BrokerEvent, ConnectError, EventSource, Execution,
    ExecutionError, Executor, QoS, Session, TransportError,
};
use mqexec_executor::{ExecutorConfig, ShellExecutor, StderrMode};
use tokio::sync::{Semaphore, mpsc};

/// A publish request as seen by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: Bytes,
    pub qos: QoS,
    pub retain: bool,
}

#[derive(Default)]
struct Recorded {
    subscriptions: Vec<(String, QoS)>,
    published: Vec<Published>,
    disconnects: usize,
}

/// A broker client that records every request.
#[derive(Clone, Default)]
pub struct FakeBroker {
    recorded: Arc<Mutex<Recorded>>,
    failing_topics: Arc<Mutex<HashSet<String>>>,
    fail_publish: Arc<Mutex<bool>>,
    subscribe_gate: Arc<Mutex<Option<Arc<Semaphore>>>>,
}

impl FakeBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subscriptions to `topic` fail.
    pub fn fail_subscribe(&self, topic: &str) {
        self.failing_topics.lock().unwrap().insert(topic.to_string());
    }

    /// Make every subscription wait for a permit on the returned gate,
    /// like a request queue that nobody drains.
    pub fn hold_subscriptions(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.subscribe_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn fail_publish(&self) {
        *self.fail_publish.lock().unwrap() = true;
    }

    /// Subscription attempts, successful or not.
    pub fn subscriptions(&self) -> Vec<(String, QoS)> {
        self.recorded.lock().unwrap().subscriptions.clone()
    }

    pub fn published(&self) -> Vec<Published> {
        self.recorded.lock().unwrap().published.clone()
    }

    /// Concatenated payloads published on `topic`.
    pub fn output_on(&self, topic: &str) -> Vec<u8> {
        self.published()
            .into_iter()
            .filter(|p| p.topic == topic)
            .flat_map(|p| p.payload.to_vec())
            .collect()
    }

    pub fn disconnects(&self) -> usize {
        self.recorded.lock().unwrap().disconnects
    }
}

#[async_trait]
impl BrokerClient for FakeBroker {
    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), BrokerError> {
        let gate = self.subscribe_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        self.recorded
            .lock()
            .unwrap()
            .subscriptions
            .push((topic.to_string(), qos));
        if self.failing_topics.lock().unwrap().contains(topic) {
            return Err(BrokerError::Subscribe {
                topic: topic.to_string(),
                message: "not authorised".into(),
            });
        }
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        payload: Bytes,
        qos: QoS,
        retain: bool,
    ) -> Result<(), BrokerError> {
        self.recorded.lock().unwrap().published.push(Published {
            topic: topic.to_string(),
            payload,
            qos,
            retain,
        });
        if *self.fail_publish.lock().unwrap() {
            return Err(BrokerError::Publish {
                topic: topic.to_string(),
                message: "queue full".into(),
            });
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        self.recorded.lock().unwrap().disconnects += 1;
        Ok(())
    }
}

/// Event source fed by the test through a channel.
pub struct ScriptedEvents {
    rx: mpsc::UnboundedReceiver<Result<BrokerEvent, TransportError>>,
}

#[async_trait]
impl EventSource for ScriptedEvents {
    async fn next_event(&mut self) -> Result<BrokerEvent, TransportError> {
        match self.rx.recv().await {
            Some(event) => event,
            // Script exhausted: behave like an idle connection.
            None => std::future::pending().await,
        }
    }
}

pub type EventScript = mpsc::UnboundedSender<Result<BrokerEvent, TransportError>>;

/// Connector handing out a shared [`FakeBroker`] and a scripted event source.
pub struct FakeConnector {
    broker: FakeBroker,
    events: Mutex<Option<ScriptedEvents>>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(broker: FakeBroker) -> (Self, EventScript) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            broker,
            events: Mutex::new(Some(ScriptedEvents { rx })),
            connects: AtomicUsize::new(0),
        };
        (connector, tx)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerConnector for FakeConnector {
    type Client = FakeBroker;
    type Events = ScriptedEvents;

    async fn connect(&self, _session: &Session) -> Result<(FakeBroker, ScriptedEvents), ConnectError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let events = self
            .events
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ConnectError::Client("already connected".into()))?;
        Ok((self.broker.clone(), events))
    }
}

/// Executor that counts launches and never spawns anything.
#[derive(Default)]
pub struct CountingExecutor {
    pub launches: AtomicUsize,
}

#[async_trait]
impl Executor for CountingExecutor {
    async fn execute(&self, command: &str) -> Result<Box<dyn Execution>, ExecutionError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Err(ExecutionError::Spawn {
            shell: command.into(),
            source: std::io::Error::other("counting only"),
        })
    }
}

pub fn shell_executor() -> Arc<ShellExecutor> {
    Arc::new(ShellExecutor::new(ExecutorConfig {
        stderr: StderrMode::Discard,
        ..ExecutorConfig::default()
    }))
}

pub fn session(subscribe: &[&str], publish: &str) -> Session {
    Session::builder("mqexec/test")
        .subscribe_all(subscribe.iter().copied())
        .publish(publish)
        .qos(QoS::AtLeastOnce)
        .build()
        .unwrap()
}

/// Poll `check` until it holds or a few seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    check()
}
