//! Named-event listener registry
//!
//! This crate provides the emitter, listener and calling-convention types
//! that the `eventflow` operators run on top of.

mod emitter;
mod handler;
mod listener;

pub use emitter::Emitter;
pub use handler::{
    BoxError, Completion, CompletionDropped, CompletingFn, Convention, Handler, ListenerResult,
    ReturningFn,
};
pub use listener::{Invocation, Listener, ListenerId, ListenerKind};

/// Values that can flow through listeners.
pub trait Payload: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Payload for T {}
