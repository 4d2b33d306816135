//! Per-call tasks built from an event's listener snapshot.

use std::sync::Arc;

use events::{Emitter, Listener, Payload};

use crate::invoker::{self, Outcome};
use crate::once::{self, Adapted};

/// One listener's unit of work for one orchestration call.
pub struct Task<T> {
    emitter: Emitter<T>,
    event: Arc<str>,
    position: usize,
    listener: Adapted<T>,
}

impl<T: Payload> Task<T> {
    /// Adapt `listener` for invocation at `position` of the snapshot.
    pub fn new(emitter: &Emitter<T>, event: &str, position: usize, listener: Listener<T>) -> Self {
        let event: Arc<str> = Arc::from(event);
        let listener = once::adapt(emitter, &event, listener);
        Self {
            emitter: emitter.clone(),
            event,
            position,
            listener,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn expects_completion(&self) -> bool {
        self.listener.handler().expects_completion()
    }

    /// Invoke the listener with `args`.
    ///
    /// `None` means the task was skipped: its once listener already fired
    /// through another dispatch.
    pub fn start(self, args: Vec<T>) -> Option<Outcome<T>> {
        invoker::invoke(&self.emitter, &self.event, self.position, self.listener, args)
    }
}

/// Snapshot the listeners for `event` and adapt each into a task.
pub fn build<T: Payload>(emitter: &Emitter<T>, event: &str) -> Vec<Task<T>> {
    emitter
        .listeners(event)
        .into_iter()
        .enumerate()
        .map(|(position, listener)| Task::new(emitter, event, position, listener))
        .collect()
}
