//! Test doubles for the protocol transport and the discovery endpoint
//!
//! [`MockTransport`] records every call and answers from scripted responses,
//! [`MockConnector`] hands it out together with an event channel the test
//! feeds, and [`serve_http_once`] stands in for the `/json/list` endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::transport::{Connector, EventReceiver, EventSender, Transport};
use crate::{RelayError, Result};

#[derive(Default)]
struct MockState {
    calls: Mutex<Vec<(String, Value)>>,
    timeline: Mutex<Vec<String>>,
    responses: Mutex<HashMap<String, Value>>,
    failures: Mutex<Vec<ScriptedFailure>>,
    delay: Mutex<Option<Duration>>,
    closed: AtomicBool,
    disposals: AtomicUsize,
}

struct ScriptedFailure {
    method: String,
    needle: Option<String>,
    error: RelayError,
}

/// Recording transport; clones share state
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every future `method` call with `result`
    pub fn respond(&self, method: &str, result: Value) {
        self.state.responses.lock().insert(method.to_string(), result);
    }

    /// Fail the next `method` call with `error`
    pub fn fail(&self, method: &str, error: RelayError) {
        self.state.failures.lock().push(ScriptedFailure { method: method.to_string(), needle: None, error });
    }

    /// Fail the next `method` call whose params mention `needle`
    pub fn fail_matching(&self, method: &str, needle: &str, error: RelayError) {
        self.state.failures.lock().push(ScriptedFailure {
            method: method.to_string(),
            needle: Some(needle.to_string()),
            error,
        });
    }

    /// Make every call take `delay` before answering
    pub fn set_delay(&self, delay: Duration) {
        *self.state.delay.lock() = Some(delay);
    }

    /// Simulate the peer hanging up
    pub fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.state.calls.lock().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls().into_iter().filter(|(m, _)| m == method).map(|(_, p)| p).collect()
    }

    /// Evaluated expressions, in call order
    pub fn expressions(&self) -> Vec<String> {
        self.calls_to("Runtime.evaluate")
            .into_iter()
            .filter_map(|p| p["expression"].as_str().map(str::to_string))
            .collect()
    }

    /// `start:<method>` / `end:<method>` markers, in order
    pub fn timeline(&self) -> Vec<String> {
        self.state.timeline.lock().clone()
    }

    pub fn disposals(&self) -> usize {
        self.state.disposals.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        if self.is_closed() {
            return Err(RelayError::SessionClosed);
        }

        let rendered = params.to_string();
        self.state.calls.lock().push((method.to_string(), params));
        self.state.timeline.lock().push(format!("start:{}", method));

        let delay = *self.state.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.state.timeline.lock().push(format!("end:{}", method));

        let failure = {
            let mut failures = self.state.failures.lock();
            failures
                .iter()
                .position(|f| {
                    f.method == method && f.needle.as_deref().is_none_or(|n| rendered.contains(n))
                })
                .map(|i| failures.remove(i).error)
        };
        if let Some(error) = failure {
            return Err(error);
        }
        Ok(self.state.responses.lock().get(method).cloned().unwrap_or(Value::Null))
    }

    fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    async fn dispose(&self) -> Result<()> {
        self.state.disposals.fetch_add(1, Ordering::SeqCst);
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector handing out one [`MockTransport`]
pub struct MockConnector {
    transport: MockTransport,
    events: Mutex<Option<EventReceiver>>,
    addresses: Arc<Mutex<Vec<String>>>,
    refuse: bool,
}

impl MockConnector {
    /// Returns the connector, a handle on its transport, and the sender
    /// feeding the session's inbound events
    pub fn new() -> (Self, MockTransport, EventSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = MockTransport::new();
        let connector = Self {
            transport: transport.clone(),
            events: Mutex::new(Some(rx)),
            addresses: Arc::new(Mutex::new(Vec::new())),
            refuse: false,
        };
        (connector, transport, tx)
    }

    /// Connector whose every connect attempt fails
    pub fn refusing() -> Self {
        let (mut connector, _, _) = Self::new();
        connector.refuse = true;
        connector
    }

    /// Shared list of addresses passed to `connect`
    pub fn addresses(&self) -> Arc<Mutex<Vec<String>>> {
        self.addresses.clone()
    }
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, address: &str) -> Result<(MockTransport, EventReceiver)> {
        self.addresses.lock().push(address.to_string());
        if self.refuse {
            return Err(RelayError::connection_failed(format!("refused {}", address)));
        }
        let events = self
            .events
            .lock()
            .take()
            .ok_or_else(|| RelayError::connection_failed("mock connector already used"))?;
        Ok((self.transport.clone(), events))
    }
}

/// Serve a single HTTP response and return the `/json/list` URL pointing at it
pub async fn serve_http_once(status: &str, body: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&chunk[..n]),
            }
        }
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    format!("http://{}/json/list", addr)
}
