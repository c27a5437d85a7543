use super::{DispatchError, EventHandler, EventType, IdentityEvent};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, error, Instrument};

/// Fan-out dispatcher
///
/// Constructed once and shared explicitly (`Arc<EventDispatcher>`) between the
/// orchestrator and the modules that register handlers. Each handler runs on
/// its own spawned task, so dropping the publishing request never truncates
/// delivery.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: RwLock<HashMap<EventType, Vec<Arc<dyn EventHandler>>>>,
    in_flight: Arc<InFlight>,
}

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Decrements the in-flight counter when the handler task ends, panics included.
struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, event_type: EventType, handler: Arc<dyn EventHandler>) {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        debug!(event_type = event_type.as_str(), handler = handler.name(), "Registering event handler");
        handlers.entry(event_type).or_default().push(handler);
    }

    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&event_type)
            .map_or(0, Vec::len)
    }

    /// Handler tasks spawned but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::Acquire)
    }

    /// Publish `event` to every handler registered for its type.
    ///
    /// Returns once the handler tasks are spawned. Handler failures are logged
    /// and never reported here.
    pub fn dispatch(&self, event: IdentityEvent) -> Result<(), DispatchError> {
        event.validate()?;
        let runtime = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;

        let event_type = event.event_type();
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&event_type)
            .cloned()
            .unwrap_or_default();

        if handlers.is_empty() {
            debug!(event_type = event_type.as_str(), "No handlers registered for event");
            return Ok(());
        }

        let event = Arc::new(event);
        for handler in handlers {
            self.in_flight.count.fetch_add(1, Ordering::AcqRel);
            let guard = InFlightGuard(self.in_flight.clone());
            let event = event.clone();
            let span = tracing::info_span!(
                "event_handler",
                event_type = event_type.as_str(),
                handler = handler.name()
            );

            runtime.spawn(
                async move {
                    let _guard = guard;
                    if let Err(e) = handler.handle(&event).await {
                        error!(error = %e, "Event handler failed");
                    }
                }
                .instrument(span),
            );
        }

        Ok(())
    }

    /// Wait until every spawned handler task has finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.in_flight.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}
