//! Driver spawns and manages the protocol event dispatch task

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::router::EventRouter;
use crate::transport::EventReceiver;

/// Handle to a running dispatch task
pub struct DriverHandle {
    /// Cancels the dispatch task
    pub cancel: CancellationToken,
    task: JoinHandle<u64>,
}

impl DriverHandle {
    /// Stop dispatching and wait for the task to finish.
    ///
    /// Returns how many events were dispatched.
    pub async fn shutdown(self) -> u64 {
        self.cancel.cancel();
        self.task.await.unwrap_or_default()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Driver spawns the task that feeds inbound events to the router
///
/// One task owns the event receiver, so handlers observe events strictly in
/// the order the transport delivered them and never run concurrently with
/// each other.
pub struct Driver;

impl Driver {
    /// Spawn the dispatch task for `events`.
    ///
    /// The task ends when `cancel` fires or the event stream closes. Events
    /// already queued when `cancel` fires are still dispatched.
    pub fn spawn(events: EventReceiver, router: EventRouter, cancel: CancellationToken) -> DriverHandle {
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move { Self::dispatch_task(events, router, task_cancel).await });
        DriverHandle { cancel, task }
    }

    async fn dispatch_task(
        mut events: EventReceiver,
        router: EventRouter,
        cancel: CancellationToken,
    ) -> u64 {
        info!("Event dispatch task started");
        let mut event_count = 0u64;

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => {
                    // Flush what the transport already delivered
                    while let Ok(event) = events.try_recv() {
                        event_count += 1;
                        router.dispatch(&event).await;
                    }
                    debug!("Event dispatch cancelled");
                    break;
                }
                event = events.recv() => event,
            };

            match event {
                Some(event) => {
                    event_count += 1;
                    trace!("Event {}: {}", event_count, event.method);
                    router.dispatch(&event).await;
                }
                None => {
                    debug!("Protocol event stream ended");
                    break;
                }
            }
        }

        info!("Event dispatch task ended (dispatched {} events)", event_count);
        event_count
    }
}
