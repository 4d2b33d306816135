//! Fire-once listener adaptation.
//!
//! The flow operators call a listener's handler directly rather than going
//! through the emitter's own dispatch, so a once listener would never be
//! removed on its own. Adapting it attaches a removal that runs right
//! before the handler is invoked.

use std::sync::Arc;

use events::{Emitter, Handler, Listener, ListenerId};
use tracing::debug;

/// A listener ready for invocation.
pub struct Adapted<T> {
    handler: Handler<T>,
    removal: Option<OnceRemoval<T>>,
}

impl<T> Adapted<T> {
    pub fn handler(&self) -> &Handler<T> {
        &self.handler
    }

    pub fn is_once(&self) -> bool {
        self.removal.is_some()
    }

    /// Split into the handler and the pending once removal.
    pub fn into_parts(self) -> (Handler<T>, Option<OnceRemoval<T>>) {
        (self.handler, self.removal)
    }
}

/// Deregistration owed by a once listener.
pub struct OnceRemoval<T> {
    emitter: Emitter<T>,
    event: Arc<str>,
    listener: Listener<T>,
}

impl<T> OnceRemoval<T> {
    pub fn listener_id(&self) -> ListenerId {
        self.listener.id()
    }

    /// Claim the listener and remove it from the emitter.
    ///
    /// Only the first claim of a registration removes it. Returns whether
    /// this call did.
    pub fn run(self) -> bool {
        if !self.listener.claim_once() {
            debug!(event = %self.event, listener_id = %self.listener.id(), "Once listener already claimed");
            return false;
        }
        self.emitter.off(&self.event, self.listener.id());
        debug!(event = %self.event, listener_id = %self.listener.id(), "Once listener removed");
        true
    }
}

/// Resolve `listener` to the handler to invoke, attaching a removal when
/// it is a once listener.
pub fn adapt<T>(emitter: &Emitter<T>, event: &Arc<str>, listener: Listener<T>) -> Adapted<T> {
    let handler = listener.handler().clone();
    let removal = listener.is_once().then(|| OnceRemoval {
        emitter: emitter.clone(),
        event: Arc::clone(event),
        listener,
    });
    Adapted { handler, removal }
}
