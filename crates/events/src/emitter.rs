//! Listener registry keyed by event name.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::handler::Handler;
use crate::listener::{Invocation, Listener, ListenerId, ListenerKind};

type Registry<T> = HashMap<String, Vec<Listener<T>>>;

/// Named-event emitter.
///
/// Clones share one registry. The registry lock is never held while a
/// listener runs, so listeners may subscribe and unsubscribe freely.
pub struct Emitter<T> {
    registry: Arc<RwLock<Registry<T>>>,
}

impl<T> Emitter<T> {
    /// Create an emitter with no listeners
    pub fn new() -> Self {
        Self {
            registry: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a durable listener
    pub fn on(&self, event: impl Into<String>, handler: Handler<T>) -> ListenerId {
        self.add(event.into(), Listener::new(ListenerKind::Durable, handler))
    }

    /// Register a listener that is removed the first time it fires
    pub fn once(&self, event: impl Into<String>, handler: Handler<T>) -> ListenerId {
        self.add(event.into(), Listener::new(ListenerKind::Once, handler))
    }

    fn add(&self, event: String, listener: Listener<T>) -> ListenerId {
        let id = listener.id();
        debug!(event = %event, listener_id = %id, kind = ?listener.kind(), "Listener registered");
        self.registry.write().entry(event).or_default().push(listener);
        id
    }

    /// Remove a listener by event name and ID.
    ///
    /// Returns `false` if it was not registered. Safe to call repeatedly.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut registry = self.registry.write();
        let Some(listeners) = registry.get_mut(event) else {
            return false;
        };

        let before = listeners.len();
        listeners.retain(|listener| listener.id() != id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            registry.remove(event);
        }

        if removed {
            debug!(event = %event, listener_id = %id, "Listener removed");
        }
        removed
    }

    /// Snapshot of the listeners for `event`, in registration order
    pub fn listeners(&self, event: &str) -> Vec<Listener<T>> {
        self.registry
            .read()
            .get(event)
            .map(|listeners| listeners.to_vec())
            .unwrap_or_default()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.registry.read().get(event).map_or(0, Vec::len)
    }

    /// Event names that currently have listeners
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove every listener for `event`, returning how many were removed
    pub fn remove_all_listeners(&self, event: &str) -> usize {
        self.registry.write().remove(event).map_or(0, |removed| removed.len())
    }
}

impl<T: Clone + Send + 'static> Emitter<T> {
    /// Fire every listener for `event` without waiting for results.
    ///
    /// Returning listeners run inline. Completing listeners are spawned on
    /// the current tokio runtime and skipped if there is none. Once
    /// listeners are removed as they fire. Failures are logged, not
    /// returned. Returns the number of listeners fired.
    pub fn emit(&self, event: &str, args: Vec<T>) -> usize {
        let runtime = Handle::try_current().ok();
        let mut fired = 0;

        for listener in self.listeners(event) {
            if listener.handler().expects_completion() && runtime.is_none() {
                warn!(event = %event, listener_id = %listener.id(), "No async runtime, skipping completing listener");
                continue;
            }
            if listener.is_once() {
                if !listener.claim_once() {
                    continue;
                }
                self.off(event, listener.id());
            }

            let invocation = Invocation::new(self.clone(), event, args.clone());
            match (listener.handler(), runtime.as_ref()) {
                (Handler::Returning(f), _) => {
                    if let Err(e) = f(invocation) {
                        warn!(event = %event, listener_id = %listener.id(), error = %e, "Listener failed");
                    }
                }
                (Handler::Completing(f), Some(runtime)) => {
                    let future = f(invocation);
                    let event = event.to_string();
                    let id = listener.id();
                    runtime.spawn(async move {
                        if let Err(e) = future.await {
                            warn!(event = %event, listener_id = %id, error = %e, "Listener failed");
                        }
                    });
                }
                (Handler::Completing(_), None) => continue,
            }
            fired += 1;
        }

        fired
    }
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("events", &self.event_names())
            .finish()
    }
}
