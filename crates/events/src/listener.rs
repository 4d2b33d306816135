//! Registered listeners and the invocation they receive.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::emitter::Emitter;
use crate::handler::{Convention, Handler};

/// Unique ID of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// How long a listener stays registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerKind {
    /// Stays registered until removed with `off`.
    Durable,
    /// Removed the first time it fires.
    Once,
}

/// A listener registered against an event name.
///
/// Clones share the same fire-once state, so a snapshot taken by one
/// caller observes a claim made through any other snapshot.
pub struct Listener<T> {
    id: ListenerId,
    kind: ListenerKind,
    handler: Handler<T>,
    fired: Arc<AtomicBool>,
}

impl<T> Listener<T> {
    pub fn new(kind: ListenerKind, handler: Handler<T>) -> Self {
        Self {
            id: ListenerId::new(),
            kind,
            handler,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn kind(&self) -> ListenerKind {
        self.kind
    }

    pub fn is_once(&self) -> bool {
        self.kind == ListenerKind::Once
    }

    pub fn handler(&self) -> &Handler<T> {
        &self.handler
    }

    pub fn convention(&self) -> Convention {
        self.handler.convention()
    }

    /// Move a once listener from registered to fired.
    ///
    /// Returns `true` for exactly one caller over the lifetime of the
    /// registration. Durable listeners are never claimed.
    pub fn claim_once(&self) -> bool {
        self.is_once()
            && self
                .fired
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    /// Whether a once listener has already fired.
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            kind: self.kind,
            handler: self.handler.clone(),
            fired: Arc::clone(&self.fired),
        }
    }
}

impl<T> fmt::Debug for Listener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("convention", &self.convention())
            .field("fired", &self.has_fired())
            .finish()
    }
}

/// Everything a listener receives when it is invoked.
pub struct Invocation<T> {
    /// The emitter the listener is registered on
    pub emitter: Emitter<T>,
    /// Event name the listener was invoked for
    pub event: Arc<str>,
    /// Positional arguments
    pub args: Vec<T>,
}

impl<T> Invocation<T> {
    pub fn new(emitter: Emitter<T>, event: impl Into<Arc<str>>, args: Vec<T>) -> Self {
        Self {
            emitter,
            event: event.into(),
            args,
        }
    }

    /// Positional argument, if supplied.
    pub fn arg(&self, index: usize) -> Option<&T> {
        self.args.get(index)
    }

    pub fn into_args(self) -> Vec<T> {
        self.args
    }
}

impl<T: fmt::Debug> fmt::Debug for Invocation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("event", &self.event)
            .field("args", &self.args)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn noop(kind: ListenerKind) -> Listener<Value> {
        Listener::new(kind, Handler::returning(|_| Ok(Value::Null)))
    }

    #[test]
    fn test_once_claimed_exactly_once() {
        let listener = noop(ListenerKind::Once);
        let snapshot = listener.clone();

        assert!(!listener.has_fired());
        assert!(snapshot.claim_once());
        assert!(!listener.claim_once());
        assert!(listener.has_fired());
    }

    #[test]
    fn test_durable_never_claimed() {
        let listener = noop(ListenerKind::Durable);

        assert!(!listener.claim_once());
        assert!(!listener.has_fired());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = noop(ListenerKind::Durable);
        let b = noop(ListenerKind::Durable);

        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn test_invocation_args() {
        let call = Invocation::new(Emitter::new(), "add", vec![Value::from(1), Value::from(2)]);

        assert_eq!(&*call.event, "add");
        assert_eq!(call.arg(1), Some(&Value::from(2)));
        assert_eq!(call.arg(2), None);
        assert_eq!(call.into_args().len(), 2);
    }
}
