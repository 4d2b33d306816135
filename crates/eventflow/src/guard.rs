//! Single-listener invocation.
//!
//! `invoke` treats an event like a function call: it only runs when
//! exactly one listener is registered.

use events::{Emitter, Listener, Payload};
use tracing::debug;

use crate::error::{FlowError, Result};
use crate::task::Task;

/// The only listener registered for `event`.
fn sole_listener<T>(emitter: &Emitter<T>, event: &str) -> Result<Listener<T>> {
    let mut listeners = emitter.listeners(event);
    match listeners.len() {
        0 => Err(FlowError::NoListeners(event.to_string())),
        1 => Ok(listeners.remove(0)),
        count => Err(FlowError::AmbiguousListeners {
            event: event.to_string(),
            count,
        }),
    }
}

/// A sole once listener claimed by another dispatch between the snapshot
/// and the call leaves nothing to invoke.
fn already_fired(event: &str) -> FlowError {
    debug!(event = %event, "Sole listener fired elsewhere");
    FlowError::NoListeners(event.to_string())
}

/// Invoke the only listener for `event` and wait for its result.
pub async fn invoke<T: Payload>(emitter: &Emitter<T>, event: &str, args: Vec<T>) -> Result<T> {
    let listener = sole_listener(emitter, event)?;
    debug!(event = %event, convention = ?listener.convention(), "Invoking sole listener");
    match Task::new(emitter, event, 0, listener).start(args) {
        Some(outcome) => outcome.resolve().await,
        None => Err(already_fired(event)),
    }
}

/// Invoke the only listener for `event` and return its result directly.
///
/// Fails with [`FlowError::AsyncListener`] when the listener completes
/// asynchronously; a once listener is left registered in that case.
pub fn invoke_sync<T: Payload>(emitter: &Emitter<T>, event: &str, args: Vec<T>) -> Result<T> {
    let listener = sole_listener(emitter, event)?;
    if listener.handler().expects_completion() {
        return Err(FlowError::AsyncListener(event.to_string()));
    }

    debug!(event = %event, "Invoking sole listener synchronously");
    Task::new(emitter, event, 0, listener)
        .start(args)
        .ok_or_else(|| already_fired(event))?
        .into_ready()
        .unwrap_or_else(|| Err(FlowError::AsyncListener(event.to_string())))
}
