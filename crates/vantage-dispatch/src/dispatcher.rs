use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::{DispatchError, DispatchResult};
use crate::event::Event;
use crate::registry::HandlerRegistry;
use crate::ttl_cache::SharedTtlCache;

/// The deadline the dispatcher waits for in-flight handlers to return once
/// cancellation fires, before declaring termination regardless.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

/// Shared counters tracking whether the session is "done": the queue is
/// empty, every handler's in-flight count is zero, and nothing is scheduled
/// (§4.2 point 5).
#[derive(Default)]
struct Accounting {
    pending_events: AtomicUsize,
    in_flight_handlers: AtomicUsize,
    idle: Notify,
}

impl Accounting {
    fn is_idle(&self) -> bool {
        self.pending_events.load(Ordering::SeqCst) == 0
            && self.in_flight_handlers.load(Ordering::SeqCst) == 0
    }

    fn maybe_notify_idle(&self) {
        if self.is_idle() {
            self.idle.notify_waiters();
        }
    }
}

/// Handle given to handlers (and held by the `Dispatcher` itself) so events
/// can be enqueued without blocking on their own completion (point 4 of the
/// dispatch semantics).
#[derive(Clone)]
pub struct DispatchHandle {
    tx: UnboundedSender<Event>,
    accounting: Arc<Accounting>,
}

impl DispatchHandle {
    /// Enqueues `event` for dispatch. Non-blocking: the event is scheduled,
    /// not awaited.
    pub fn dispatch_event(&self, event: Event) -> DispatchResult<()> {
        self.accounting
            .pending_events
            .fetch_add(1, Ordering::SeqCst);
        if self.tx.send(event).is_err() {
            self.accounting
                .pending_events
                .fetch_sub(1, Ordering::SeqCst);
            return Err(DispatchError::Other(anyhow::anyhow!(
                "dispatcher loop has shut down"
            )));
        }
        Ok(())
    }
}

/// Owns the handler registry and the event queue loop.
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    handle: DispatchHandle,
    cancel: CancellationToken,
}

impl Dispatcher {
    /// Spawns the dispatch loop and returns a `Dispatcher` handle plus the
    /// background task's join handle (kept alive for the session).
    pub fn spawn(
        registry: HandlerRegistry,
        ttl_cache: SharedTtlCache,
        cancel: CancellationToken,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let (tx, rx) = unbounded_channel();
        let registry = Arc::new(registry);
        let accounting = Arc::new(Accounting::default());
        let handle = DispatchHandle {
            tx,
            accounting: Arc::clone(&accounting),
        };

        let loop_handle = tokio::spawn(run_loop(
            Arc::clone(&registry),
            ttl_cache,
            rx,
            accounting,
            handle.clone(),
            cancel.clone(),
        ));

        (
            Dispatcher {
                registry,
                handle,
                cancel,
            },
            loop_handle,
        )
    }

    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    /// `DispatchEvent(e)` from the outside (e.g. seeding the session).
    pub fn dispatch_event(&self, event: Event) -> DispatchResult<()> {
        self.handle.dispatch_event(event)
    }

    /// Blocks until the queue is empty and no handler is in flight.
    pub async fn run_until_drained(&self) {
        loop {
            if self.handle.accounting.is_idle() {
                return;
            }
            self.handle.accounting.idle.notified().await;
        }
    }

    /// Fires the cancellation token and waits for in-flight handlers to
    /// drain, up to [SHUTDOWN_DEADLINE].
    pub async fn shutdown(&self) -> DispatchResult<()> {
        self.cancel.cancel();
        tokio::time::timeout(SHUTDOWN_DEADLINE, self.run_until_drained())
            .await
            .map_err(|_| DispatchError::DrainTimedOut)
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }
}

async fn run_loop(
    registry: Arc<HandlerRegistry>,
    ttl_cache: SharedTtlCache,
    mut rx: UnboundedReceiver<Event>,
    accounting: Arc<Accounting>,
    handle: DispatchHandle,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("dispatcher observed cancellation, no further events accepted");
                break;
            }
            event = rx.recv() => {
                let Some(event) = event else { break };
                process_event(
                    Arc::clone(&registry),
                    Arc::clone(&ttl_cache),
                    event,
                    handle.clone(),
                    cancel.clone(),
                )
                .await;
                accounting.pending_events.fetch_sub(1, Ordering::SeqCst);
                accounting.maybe_notify_idle();
            }
        }
    }
}

/// Dispatches one event through its priority buckets, highest first; every
/// handler in a bucket must complete before the next bucket starts.
async fn process_event(
    registry: Arc<HandlerRegistry>,
    ttl_cache: SharedTtlCache,
    event: Event,
    handle: DispatchHandle,
    cancel: CancellationToken,
) {
    for (priority, handlers) in registry.buckets_for(event.entity_kind) {
        if cancel.is_cancelled() {
            return;
        }
        trace!(
            priority,
            handlers = handlers.len(),
            "dispatching priority bucket"
        );
        let mut joinset = JoinSet::new();
        for registered in handlers {
            let handler = Arc::clone(&registered.handler);
            let semaphore = Arc::clone(&registered.semaphore);
            let event = event.clone();
            let cancel = cancel.clone();
            let ttl_cache = Arc::clone(&ttl_cache);
            let handle = handle.clone();
            let accounting = Arc::clone(&handle.accounting);
            joinset.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                accounting.in_flight_handlers.fetch_add(1, Ordering::SeqCst);

                let suppressed = ttl_cache
                    .monitored_within_ttl(
                        event.entity,
                        event.entity_kind,
                        handler.event_type(),
                        handler.plugin_name(),
                    )
                    .await;
                ttl_cache
                    .mark_monitored(event.entity, handler.plugin_name())
                    .await;

                let name = event.name.clone();
                if let Err(error) = handler
                    .handle(event, handle, suppressed, cancel)
                    .await
                {
                    warn!(handler = handler.handler_name(), %name, %error, "handler returned an error");
                }

                accounting.in_flight_handlers.fetch_sub(1, Ordering::SeqCst);
                accounting.maybe_notify_idle();
            });
        }
        while joinset.join_next().await.is_some() {}
    }
}
