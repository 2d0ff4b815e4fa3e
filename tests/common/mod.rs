//! Scripted vehicle link and recording sinks shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fleetvisor::{
    Action, BusClient, BusError, Command, CommandError, Connection, Connectivity, Credential,
    DeviceDescriptor, Domain, FailureReport, LinkError, Session, SessionRef, StatusSink,
    SupervisorConfig, Transport, WAKE_DOMAINS,
};
use tokio_util::sync::CancellationToken;

/// One observable call on the link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Connect(String),
    WakeSession(String),
    FullSession(String),
    Execute(String, Action),
    Close(String),
}

#[derive(Default)]
struct Script {
    connect_failures: HashMap<String, u32>,
    wake_failures: HashMap<String, u32>,
    unreachable: HashSet<String>,
    rejected: HashSet<&'static str>,
    hang_on_close: bool,
}

/// Transport whose behavior is scripted per address.
#[derive(Clone, Default)]
pub struct MockTransport {
    calls: Arc<Mutex<Vec<Call>>>,
    script: Arc<Mutex<Script>>,
    links: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` connects to `address` fail.
    pub fn fail_connects(&self, address: &str, n: u32) {
        self.script
            .lock()
            .unwrap()
            .connect_failures
            .insert(address.to_string(), n);
    }

    /// Every connect to `address` fails.
    pub fn unreachable(&self, address: &str) {
        self.script
            .lock()
            .unwrap()
            .unreachable
            .insert(address.to_string());
    }

    /// The next `n` restricted sessions on `address` are rejected.
    pub fn fail_wake_sessions(&self, address: &str, n: u32) {
        self.script
            .lock()
            .unwrap()
            .wake_failures
            .insert(address.to_string(), n);
    }

    /// Sessions reject every action named `name`.
    pub fn reject_action(&self, name: &'static str) {
        self.script.lock().unwrap().rejected.insert(name);
    }

    /// `Connection::close` never completes.
    pub fn hang_on_close(&self) {
        self.script.lock().unwrap().hang_on_close = true;
    }

    /// Makes the current connection to `address` report a terminal error.
    pub fn drop_link(&self, address: &str) {
        if let Some(token) = self.links.lock().unwrap().get(address) {
            token.cancel();
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    /// Consumes one scripted failure from `map`, if any is left.
    fn take_failure(map: &mut HashMap<String, u32>, address: &str) -> bool {
        match map.get_mut(address) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(
        &self,
        address: &str,
        _ctx: CancellationToken,
    ) -> Result<Box<dyn Connection>, LinkError> {
        self.record(Call::Connect(address.to_string()));
        let (fail, hang) = {
            let mut script = self.script.lock().unwrap();
            let fail = script.unreachable.contains(address)
                || MockTransport::take_failure(&mut script.connect_failures, address);
            (fail, script.hang_on_close)
        };
        if fail {
            return Err(LinkError::Connect {
                address: address.to_string(),
                reason: "out of range".into(),
            });
        }

        let lost = CancellationToken::new();
        self.links
            .lock()
            .unwrap()
            .insert(address.to_string(), lost.clone());
        Ok(Box::new(MockConnection {
            address: address.to_string(),
            transport: self.clone(),
            lost,
            hang_on_close: hang,
        }))
    }
}

struct MockConnection {
    address: String,
    transport: MockTransport,
    lost: CancellationToken,
    hang_on_close: bool,
}

#[async_trait]
impl Connection for MockConnection {
    async fn start_session(
        &self,
        _credential: &Credential,
        domains: &[Domain],
        _ctx: CancellationToken,
    ) -> Result<SessionRef, LinkError> {
        if domains == WAKE_DOMAINS {
            self.transport
                .record(Call::WakeSession(self.address.clone()));
            let mut script = self.transport.script.lock().unwrap();
            if MockTransport::take_failure(&mut script.wake_failures, &self.address) {
                return Err(LinkError::Session {
                    reason: "key not enrolled".into(),
                });
            }
        } else {
            self.transport
                .record(Call::FullSession(self.address.clone()));
        }
        Ok(Arc::new(MockSession {
            address: self.address.clone(),
            transport: self.transport.clone(),
        }))
    }

    async fn closed(&self) -> LinkError {
        self.lost.cancelled().await;
        LinkError::Disconnected {
            reason: "link lost".into(),
        }
    }

    async fn close(&self) {
        self.transport.record(Call::Close(self.address.clone()));
        if self.hang_on_close {
            std::future::pending::<()>().await;
        }
    }
}

struct MockSession {
    address: String,
    transport: MockTransport,
}

#[async_trait]
impl Session for MockSession {
    async fn execute(&self, action: Action, _ctx: CancellationToken) -> Result<(), LinkError> {
        self.transport
            .record(Call::Execute(self.address.clone(), action));
        if self.transport.script.lock().unwrap().rejected.contains(action.name()) {
            return Err(LinkError::Rejected {
                reason: "vehicle busy".into(),
            });
        }
        Ok(())
    }
}

/// What a [`RecordingSink`] saw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Report {
    Connectivity(String, Connectivity),
    Failed(String, FailureReport),
}

#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<Report>>,
}

impl RecordingSink {
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    pub fn connectivity(&self, device: &str) -> Vec<Connectivity> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                Report::Connectivity(d, c) if d == device => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self, device: &str) -> Vec<FailureReport> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                Report::Failed(d, f) if d == device => Some(f),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl StatusSink for RecordingSink {
    async fn connectivity_changed(&self, device: &str, status: Connectivity) {
        self.reports
            .lock()
            .unwrap()
            .push(Report::Connectivity(device.to_string(), status));
    }

    async fn command_failed(&self, device: &str, report: &FailureReport) {
        self.reports
            .lock()
            .unwrap()
            .push(Report::Failed(device.to_string(), report.clone()));
    }
}

/// Bus client that records every publication and subscription.
#[derive(Default)]
pub struct RecordingClient {
    published: Mutex<Vec<(String, String, bool)>>,
    subscribed: Mutex<Vec<String>>,
}

impl RecordingClient {
    pub fn published(&self) -> Vec<(String, String, bool)> {
        self.published.lock().unwrap().clone()
    }

    pub fn published_on(&self, topic: &str) -> Vec<String> {
        self.published()
            .into_iter()
            .filter(|(t, _, _)| t == topic)
            .map(|(_, p, _)| p)
            .collect()
    }

    pub fn subscribed(&self) -> Vec<String> {
        self.subscribed.lock().unwrap().clone()
    }
}

#[async_trait]
impl BusClient for RecordingClient {
    async fn publish(&self, topic: &str, payload: &[u8], retained: bool) -> Result<(), BusError> {
        self.published.lock().unwrap().push((
            topic.to_string(),
            String::from_utf8_lossy(payload).into_owned(),
            retained,
        ));
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), BusError> {
        self.subscribed.lock().unwrap().push(topic.to_string());
        Ok(())
    }
}

/// Shared execution log written by test commands.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// A command that logs `label` and succeeds.
    pub fn ok(&self, label: &'static str) -> Command {
        let journal = self.clone();
        Command::from_fn(label, move |_session: SessionRef, _ctx| {
            let journal = journal.clone();
            async move {
                journal.0.lock().unwrap().push(label.to_string());
                Ok::<(), CommandError>(())
            }
        })
    }

    /// A command that logs `label` and always fails.
    pub fn failing(&self, label: &'static str) -> Command {
        let journal = self.clone();
        Command::from_fn(label, move |_session: SessionRef, _ctx| {
            let journal = journal.clone();
            async move {
                journal.0.lock().unwrap().push(label.to_string());
                Err::<(), CommandError>(CommandError::Fail {
                    reason: format!("{label} refused"),
                })
            }
        })
    }
}

pub fn descriptor(id: &str) -> DeviceDescriptor {
    DeviceDescriptor::new(
        id,
        format!("addr-{id}"),
        Credential::from_bytes(b"private key".to_vec()),
    )
}

pub fn address(id: &str) -> String {
    format!("addr-{id}")
}

pub fn config() -> SupervisorConfig {
    SupervisorConfig {
        grace: Duration::from_secs(1),
        ..SupervisorConfig::default()
    }
}

/// Polls `cond` every 10ms of (paused) time, up to a minute.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..6_000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}
