//! Listener calling conventions.
//!
//! A listener declares at registration time whether it returns its result
//! directly or completes later. The flow operators dispatch on that tag
//! instead of guessing from the listener's shape.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::listener::Invocation;

/// Error type carried by listener failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Outcome of a single listener invocation.
pub type ListenerResult<T> = Result<T, BoxError>;

/// Synchronous listener body.
pub type ReturningFn<T> = dyn Fn(Invocation<T>) -> ListenerResult<T> + Send + Sync;

/// Asynchronous listener body.
pub type CompletingFn<T> =
    dyn Fn(Invocation<T>) -> BoxFuture<'static, ListenerResult<T>> + Send + Sync;

/// Calling convention declared by a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Convention {
    /// Returns its value (or error) before the call returns.
    Returning,
    /// Signals its value (or error) later through a completion.
    Completing,
}

/// A listener body tagged with its calling convention.
pub enum Handler<T> {
    Returning(Arc<ReturningFn<T>>),
    Completing(Arc<CompletingFn<T>>),
}

impl<T: Send + 'static> Handler<T> {
    /// Wrap a synchronous listener.
    pub fn returning<F>(f: F) -> Self
    where
        F: Fn(Invocation<T>) -> ListenerResult<T> + Send + Sync + 'static,
    {
        Handler::Returning(Arc::new(f))
    }

    /// Wrap a listener that produces a future.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(Invocation<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ListenerResult<T>> + Send + 'static,
    {
        Handler::Completing(Arc::new(
            move |invocation| -> BoxFuture<'static, ListenerResult<T>> {
                Box::pin(f(invocation))
            },
        ))
    }

    /// Wrap a listener that takes a trailing completion handle.
    ///
    /// The listener body runs as soon as it is invoked and decides when to
    /// signal the handle. Dropping the handle without signalling fails the
    /// invocation with [`CompletionDropped`].
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Invocation<T>, Completion<T>) + Send + Sync + 'static,
    {
        Handler::Completing(Arc::new(
            move |invocation| -> BoxFuture<'static, ListenerResult<T>> {
                let (tx, rx) = oneshot::channel();
                f(invocation, Completion { tx });
                Box::pin(async move {
                    rx.await
                        .unwrap_or_else(|_| Err(Box::new(CompletionDropped) as BoxError))
                })
            },
        ))
    }
}

impl<T> Handler<T> {
    pub fn convention(&self) -> Convention {
        match self {
            Handler::Returning(_) => Convention::Returning,
            Handler::Completing(_) => Convention::Completing,
        }
    }

    /// Whether the listener must be driven to completion asynchronously.
    pub fn expects_completion(&self) -> bool {
        self.convention() == Convention::Completing
    }
}

impl<T> Clone for Handler<T> {
    fn clone(&self) -> Self {
        match self {
            Handler::Returning(f) => Handler::Returning(Arc::clone(f)),
            Handler::Completing(f) => Handler::Completing(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.convention()).finish()
    }
}

/// One-shot completion handle given to callback-style listeners.
///
/// Signalling consumes the handle, so a listener can complete at most once.
pub struct Completion<T> {
    tx: oneshot::Sender<ListenerResult<T>>,
}

impl<T> Completion<T> {
    pub fn done(self, result: ListenerResult<T>) {
        // The receiver is gone only if the orchestration was dropped.
        let _ = self.tx.send(result);
    }

    pub fn ok(self, value: T) {
        self.done(Ok(value));
    }

    pub fn err(self, error: impl Into<BoxError>) {
        self.done(Err(error.into()));
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// A completion handle was dropped before it was signalled.
#[derive(Debug, Clone, Copy, Error)]
#[error("listener dropped its completion handle without signalling")]
pub struct CompletionDropped;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Emitter;
    use serde_json::{json, Value};

    fn invocation(args: Vec<Value>) -> Invocation<Value> {
        Invocation::new(Emitter::new(), "test", args)
    }

    #[test]
    fn test_convention_tags() {
        let sync: Handler<Value> = Handler::returning(|_| Ok(Value::Null));
        let fut: Handler<Value> = Handler::future(|_| async { Ok(Value::Null) });
        let cb: Handler<Value> = Handler::callback(|_, done| done.ok(Value::Null));

        assert_eq!(sync.convention(), Convention::Returning);
        assert!(!sync.expects_completion());
        assert_eq!(fut.convention(), Convention::Completing);
        assert!(cb.expects_completion());
    }

    #[tokio::test]
    async fn test_callback_completes_with_value() {
        let handler: Handler<Value> = Handler::callback(|call, done| {
            let a = call.arg(0).and_then(Value::as_i64).unwrap_or(0);
            let b = call.arg(1).and_then(Value::as_i64).unwrap_or(0);
            done.ok(json!(a - b));
        });

        let Handler::Completing(f) = handler else {
            panic!("expected completing handler");
        };
        let value = f(invocation(vec![json!(3), json!(2)])).await.unwrap();
        assert_eq!(value, json!(1));
    }

    #[tokio::test]
    async fn test_dropped_completion_is_an_error() {
        let handler: Handler<Value> = Handler::callback(|_, done| drop(done));

        let Handler::Completing(f) = handler else {
            panic!("expected completing handler");
        };
        let err = f(invocation(vec![])).await.unwrap_err();
        assert!(err.is::<CompletionDropped>());
    }

    #[test]
    fn test_convention_serialization() {
        let json = serde_json::to_string(&Convention::Completing).unwrap();
        assert_eq!(json, "\"completing\"");
    }
}
