//! WebSocket transport for the remote-debugging protocol

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use super::protocol::{ProtocolEvent, ProtocolMessage, ProtocolRequest};
use super::{Connector, EventReceiver, EventSender, Transport};
use crate::{RelayError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Call waiting for its response frame
struct PendingRequest {
    method: String,
    tx: oneshot::Sender<Result<Value>>,
}

type PendingMap = Arc<Mutex<HashMap<u64, PendingRequest>>>;

/// Opens [`WsTransport`] sessions
#[derive(Debug, Clone)]
pub struct WsConnector {
    request_timeout: Duration,
}

impl WsConnector {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait::async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self, address: &str) -> Result<(WsTransport, EventReceiver)> {
        WsTransport::connect(address, self.request_timeout).await
    }
}

/// Protocol session over a single WebSocket.
///
/// A background task reads every frame: responses complete the matching
/// pending call, events are forwarded in arrival order to the
/// [`EventReceiver`] returned from [`WsTransport::connect`].
pub struct WsTransport {
    address: String,
    ws_tx: tokio::sync::Mutex<WsSink>,
    request_id: AtomicU64,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    request_timeout: Duration,
    recv_task: JoinHandle<()>,
}

impl WsTransport {
    /// Connect to a `webSocketDebuggerUrl`
    pub async fn connect(address: &str, request_timeout: Duration) -> Result<(Self, EventReceiver)> {
        debug!("Opening devtools WebSocket {}", address);
        let (ws_stream, _) = tokio_tungstenite::connect_async(address).await.map_err(|e| {
            RelayError::connection_failed_with_source(format!("WebSocket {}", address), Box::new(e))
        })?;

        let (ws_sink, ws_source) = ws_stream.split();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let recv_task = {
            let pending = pending.clone();
            let closed = closed.clone();
            tokio::spawn(async move {
                Self::receive_loop(ws_source, pending, event_tx, closed).await;
            })
        };

        info!("Connected to devtools endpoint {}", address);

        let transport = Self {
            address: address.to_string(),
            ws_tx: tokio::sync::Mutex::new(ws_sink),
            request_id: AtomicU64::new(1),
            pending,
            closed,
            request_timeout,
            recv_task,
        };
        Ok((transport, event_rx))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn receive_loop(
        mut ws_source: WsSource,
        pending: PendingMap,
        events: EventSender,
        closed: Arc<AtomicBool>,
    ) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("devtools recv: {}", text.as_str());
                    match serde_json::from_str::<ProtocolMessage>(text.as_str()) {
                        Ok(frame) => Self::route_frame(frame, &pending, &events),
                        Err(e) => warn!("Failed to parse protocol frame: {}", e),
                    }
                }
                Ok(Message::Close(frame)) => {
                    debug!("devtools WebSocket closed by peer: {:?}", frame);
                    break;
                }
                Err(e) => {
                    error!("devtools WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        closed.store(true, Ordering::SeqCst);
        // Dropping the senders wakes every waiting call with SessionClosed
        let abandoned = pending.lock().drain().count();
        if abandoned > 0 {
            debug!("Abandoned {} in-flight protocol calls", abandoned);
        }
    }

    fn route_frame(frame: ProtocolMessage, pending: &PendingMap, events: &EventSender) {
        if let Some(id) = frame.id {
            let Some(request) = pending.lock().remove(&id) else {
                trace!("Response for unknown request {}", id);
                return;
            };
            let result = match frame.error {
                Some(err) => Err(RelayError::protocol(request.method, err.code, err.message)),
                None => Ok(frame.result.unwrap_or(Value::Null)),
            };
            let _ = request.tx.send(result);
        } else if let Some(method) = frame.method {
            // Receiver gone means nobody is listening anymore; not an error
            let _ = events.send(ProtocolEvent::new(method, frame.params));
        }
    }
}

#[async_trait::async_trait]
impl Transport for WsTransport {
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        if self.is_closed() {
            return Err(RelayError::SessionClosed);
        }

        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let json = serde_json::to_string(&ProtocolRequest { id, method, params })?;
        trace!("devtools send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { method: method.to_string(), tx });

        let sent = {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(json.into())).await
        };
        if let Err(e) = sent {
            self.pending.lock().remove(&id);
            return Err(e.into());
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RelayError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(RelayError::timeout(method, self.request_timeout))
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.recv_task.is_finished()
    }

    async fn dispose(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) && self.recv_task.is_finished() {
            return Ok(());
        }

        debug!("Disposing devtools session {}", self.address);
        let result = {
            let mut ws = self.ws_tx.lock().await;
            match ws.send(Message::Close(None)).await {
                Ok(()) => ws.close().await,
                Err(e) => Err(e),
            }
        };
        self.recv_task.abort();
        self.pending.lock().clear();

        match result {
            Ok(()) => Ok(()),
            // Peer already hung up; the session is gone either way
            Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed)
            | Err(tokio_tungstenite::tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}
