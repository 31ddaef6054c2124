//! Client lifecycle controller
//!
//! [`CdpClient::entry`] drives one debugging session from start to finish:
//!
//! ```text
//! Idle -> Connecting -> Subscribing -> Running -> Closing -> Closed
//!             |              |            |
//!             +--> Failed    +------------+--> Closing -> Failed
//! ```
//!
//! Discovery or connect failures end in `Failed` before any handler is
//! registered. Once a session is open, teardown always runs, whether the run
//! signal fired, the target hung up, or a step failed.

use std::sync::Arc;

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::buffer::SampleBuffer;
use crate::config::RelayConfig;
use crate::decoder::TelemetryDecoder;
use crate::discovery::EndpointDiscovery;
use crate::driver::{Driver, DriverHandle};
use crate::gate::{ContextSlot, ContextTracker, ScriptLoadGate};
use crate::router::EventRouter;
use crate::subscriber::EventSubscriber;
use crate::transport::{Connector, DomainCommands, Transport, WsConnector};
use crate::types::{ClientState, ExecutionContextId, Position, SubscriptionSet};
use crate::{RelayError, Result};


/// An open debugging session
struct Session<T> {
    transport: Arc<T>,
    driver: DriverHandle,
}

/// Relays telemetry from one devtools target into a [`SampleBuffer`]
pub struct CdpClient<C: Connector = WsConnector> {
    config: RelayConfig,
    connector: C,
    discovery: EndpointDiscovery,
    running: CancellationToken,
    buffer: SampleBuffer,
    state: watch::Sender<ClientState>,
    context: ContextSlot,
    session: Mutex<Option<Session<C::Transport>>>,
}

impl CdpClient<WsConnector> {
    /// Client over the WebSocket transport.
    ///
    /// `running` is the run signal: cancelling it ends the session.
    pub fn new(config: RelayConfig, running: CancellationToken) -> Self {
        let connector = WsConnector::new(config.request_timeout());
        Self::with_connector(config, running, connector)
    }
}

impl<C: Connector> CdpClient<C> {
    pub fn with_connector(config: RelayConfig, running: CancellationToken, connector: C) -> Self {
        let discovery = EndpointDiscovery::new(config.discovery_url.clone());
        let buffer = SampleBuffer::new(config.buffer_capacity);
        let (state, _) = watch::channel(ClientState::Idle);
        Self {
            config,
            connector,
            discovery,
            running,
            buffer,
            state,
            context: ContextSlot::new(),
            session: Mutex::new(None),
        }
    }

    /// Shared handle on the decoded samples
    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn state(&self) -> ClientState {
        *self.state.borrow()
    }

    /// Current state, then every transition
    pub fn state_updates(&self) -> impl Stream<Item = ClientState> + Send + 'static {
        WatchStream::new(self.state.subscribe())
    }

    /// Context the telemetry script runs in, once the bridge is ready
    pub fn context(&self) -> Option<ExecutionContextId> {
        self.context.current()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Run one session until the run signal fires or the target goes away.
    ///
    /// Returns every sample still buffered at shutdown, in arrival order. A
    /// cancelled run signal is a normal stop, not an error.
    pub async fn entry(&self, subscriptions: impl Into<SubscriptionSet>) -> Result<Vec<Position>> {
        let subscriptions = subscriptions.into();
        let started = self.state.send_if_modified(|state| {
            if *state == ClientState::Idle {
                *state = ClientState::Connecting;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(RelayError::connection_failed(format!(
                "client already used (state {})",
                self.state()
            )));
        }

        let transport = match self.connect().await {
            Ok(transport) => transport,
            Err(e) => {
                error!("Failed to open debugging session: {}", e);
                self.set_state(ClientState::Failed);
                return Err(e);
            }
        };

        let outcome = self.run(&transport, &subscriptions).await;
        let samples = self.close().await;

        match outcome {
            Ok(()) | Err(RelayError::Cancelled) => {
                self.set_state(ClientState::Closed);
                Ok(samples)
            }
            Err(e) => {
                error!("Session ended with error: {}", e);
                self.set_state(ClientState::Failed);
                Err(e)
            }
        }
    }

    /// Tear the session down and drain the buffer.
    ///
    /// Stops event dispatch, disposes the transport (failures are logged) and
    /// returns every buffered sample after logging it. Does nothing but drain
    /// when no session is open.
    pub async fn close(&self) -> Vec<Position> {
        let session = self.session.lock().take();
        if let Some(session) = session {
            self.set_state(ClientState::Closing);
            let dispatched = session.driver.shutdown().await;
            debug!("Dispatched {} protocol events", dispatched);
            if let Err(e) = session.transport.dispose().await {
                warn!("Failed to dispose debugging session: {}", e);
            }
        }

        let samples = self.buffer.drain();
        for sample in &samples {
            info!("{}", sample);
        }
        info!("Drained {} samples ({} dropped)", samples.len(), self.buffer.dropped());
        samples
    }

    /// Discover the target, open the transport and start event dispatch
    async fn connect(&self) -> Result<Arc<C::Transport>> {
        let address = self.discovery.discover().await?;
        info!("Connecting to {}", address);
        let (transport, events) = self.connector.connect(&address).await?;
        let transport = Arc::new(transport);

        let mut router = EventRouter::new();
        router
            .register(TelemetryDecoder::new(self.buffer.clone(), &self.config.binding_name))
            .register(ScriptLoadGate::new(
                transport.clone(),
                self.context.clone(),
                &self.config.script_marker,
                &self.config.binding_name,
                &self.config.bridge_function,
            ))
            .register(ContextTracker::new(self.context.clone()));

        let driver = Driver::spawn(events, router, self.running.child_token());
        *self.session.lock() = Some(Session { transport: transport.clone(), driver });
        Ok(transport)
    }

    async fn run(&self, transport: &Arc<C::Transport>, subscriptions: &SubscriptionSet) -> Result<()> {
        self.set_state(ClientState::Subscribing);
        tokio::try_join!(
            transport.runtime_enable(),
            transport.page_enable(),
            transport.debugger_enable()
        )?;
        debug!("Runtime, Page and Debugger domains enabled");

        let subscriber =
            EventSubscriber::new(transport.clone(), self.context.clone(), &self.config.bridge_function);
        let subscribed = self.subscribe(&subscriber, subscriptions).await?;

        self.set_state(ClientState::Running);
        info!("Relaying telemetry");
        self.idle(transport.as_ref(), &subscriber, subscriptions, subscribed).await
    }

    /// Send the set once the gate is ready, retrying once on a stale context.
    ///
    /// Returns the context the set was delivered to, `None` for an empty set.
    async fn subscribe(
        &self,
        subscriber: &EventSubscriber<C::Transport>,
        subscriptions: &SubscriptionSet,
    ) -> Result<Option<ExecutionContextId>> {
        if subscriptions.is_empty() {
            info!("No subscriptions requested");
            return Ok(None);
        }

        let mut retried = false;
        loop {
            let context = self.context.wait_ready(self.config.ready_timeout(), &self.running).await?;
            match subscriber.subscribe_all(subscriptions).await {
                Ok(sent) => {
                    info!(context = context.get(), "Subscribed to {} streams", sent);
                    return Ok(Some(context));
                }
                Err(RelayError::StaleContext { context_id }) if !retried => {
                    warn!(context_id, "Context went away while subscribing, waiting for the script to reload");
                    self.context.clear_if(ExecutionContextId(context_id));
                    retried = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Liveness checks until the run signal fires or the transport closes.
    ///
    /// When the page reloads the telemetry script, the gate publishes a new
    /// context; the subscription set is re-sent there before idling resumes.
    async fn idle(
        &self,
        transport: &C::Transport,
        subscriber: &EventSubscriber<C::Transport>,
        subscriptions: &SubscriptionSet,
        mut subscribed: Option<ExecutionContextId>,
    ) -> Result<()> {
        let interval = self.config.idle_interval();
        let mut contexts = self.context.subscribe();
        loop {
            if transport.is_closed() {
                warn!("Debugging session closed by the target");
                return Ok(());
            }

            let current = *contexts.borrow_and_update();
            if let Some(context) = current {
                if current != subscribed && !subscriptions.is_empty() {
                    info!(context = context.get(), "Telemetry script reloaded, re-sending subscriptions");
                    self.set_state(ClientState::Subscribing);
                    subscribed = self.subscribe(subscriber, subscriptions).await?;
                    self.set_state(ClientState::Running);
                    continue;
                }
            }

            tokio::select! {
                _ = self.running.cancelled() => {
                    info!("Stop requested");
                    return Ok(());
                }
                Ok(()) = contexts.changed() => {}
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    fn set_state(&self, next: ClientState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!("Client state {} -> {}", previous, next);
        }
    }
}
