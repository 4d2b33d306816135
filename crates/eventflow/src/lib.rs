//! Series, parallel and waterfall control flow over event listeners
//!
//! The operations work on any [`Emitter`] and on any type that exposes one
//! through [`Emits`]. Bring [`FlowExt`] into scope to call them as methods.

pub mod error;
pub mod ext;
pub mod guard;
pub mod host;
pub mod invoker;
pub mod once;
pub mod orchestrator;
pub mod task;

pub use error::{FlowError, Result};
pub use events::{
    BoxError, Completion, CompletionDropped, Convention, Emitter, Handler, Invocation, Listener,
    ListenerId, ListenerKind, Payload,
};
pub use ext::{Emits, FlowExt};
pub use guard::{invoke, invoke_sync};
pub use host::{Augmented, Surface, FLOW_SURFACE};
pub use orchestrator::{parallel, series, waterfall, Policy};
