//! Uniform listener invocation.

use std::sync::Arc;

use events::{Emitter, Handler, Invocation, Payload};
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, warn};

use crate::error::{FlowError, Result};
use crate::once::Adapted;

/// Result of starting a listener.
///
/// Returning listeners finish before `invoke` returns; completing
/// listeners hand back a future that resolves when they signal.
pub enum Outcome<T> {
    Ready(Result<T>),
    Pending(BoxFuture<'static, Result<T>>),
}

impl<T> Outcome<T> {
    /// Wait for the listener to finish.
    pub async fn resolve(self) -> Result<T> {
        match self {
            Outcome::Ready(result) => result,
            Outcome::Pending(future) => future.await,
        }
    }

    /// The result, if the listener has already finished.
    pub fn into_ready(self) -> Option<Result<T>> {
        match self {
            Outcome::Ready(result) => Some(result),
            Outcome::Pending(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Outcome::Ready(_))
    }
}

/// Invoke an adapted listener with `args`.
///
/// A pending once removal runs before the handler is called, so the
/// listener is deregistered however long it takes to complete. Returns
/// `None` without calling the handler when another dispatch already
/// claimed the once listener.
pub fn invoke<T: Payload>(
    emitter: &Emitter<T>,
    event: &Arc<str>,
    position: usize,
    listener: Adapted<T>,
    args: Vec<T>,
) -> Option<Outcome<T>> {
    let (handler, removal) = listener.into_parts();
    if let Some(removal) = removal {
        if !removal.run() {
            debug!(event = %event, position, "Skipping once listener fired elsewhere");
            return None;
        }
    }

    let invocation = Invocation::new(emitter.clone(), Arc::clone(event), args);
    let outcome = match handler {
        Handler::Returning(f) => {
            Outcome::Ready(f(invocation).map_err(|source| failed(event, position, source)))
        }
        Handler::Completing(f) => {
            let event = Arc::clone(event);
            Outcome::Pending(
                f(invocation)
                    .map(move |result| result.map_err(|source| failed(&event, position, source)))
                    .boxed(),
            )
        }
    };
    Some(outcome)
}

fn failed(event: &str, position: usize, source: events::BoxError) -> FlowError {
    warn!(event = %event, position, error = %source, "Listener failed");
    FlowError::listener(event, position, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::once::adapt;
    use serde_json::{json, Value};

    fn first(emitter: &Emitter<Value>, event: &Arc<str>) -> Adapted<Value> {
        let listener = emitter.listeners(event).remove(0);
        adapt(emitter, event, listener)
    }

    #[tokio::test]
    async fn test_returning_listener_is_ready() {
        let emitter: Emitter<Value> = Emitter::new();
        let event: Arc<str> = Arc::from("add");
        emitter.on(
            "add",
            Handler::returning(|call| {
                let sum: i64 = call.args.iter().filter_map(Value::as_i64).sum();
                Ok(json!(sum))
            }),
        );

        let outcome = invoke(&emitter, &event, 0, first(&emitter, &event), vec![json!(1), json!(2)])
            .unwrap();
        assert!(outcome.is_ready());
        assert_eq!(outcome.into_ready().unwrap().unwrap(), json!(3));
    }

    #[tokio::test]
    async fn test_returned_error_is_failure() {
        let emitter: Emitter<Value> = Emitter::new();
        let event: Arc<str> = Arc::from("eat");
        emitter.on("eat", Handler::returning(|_| Err("I am full".into())));

        let err = invoke(&emitter, &event, 3, first(&emitter, &event), vec![])
            .unwrap()
            .resolve()
            .await
            .unwrap_err();
        match err {
            FlowError::Listener { event, position, source } => {
                assert_eq!(event, "eat");
                assert_eq!(position, 3);
                assert_eq!(source.to_string(), "I am full");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_completing_listener_is_pending() {
        let emitter: Emitter<Value> = Emitter::new();
        let event: Arc<str> = Arc::from("subtract");
        emitter.on(
            "subtract",
            Handler::callback(|call, done| {
                let a = call.arg(0).and_then(Value::as_i64).unwrap_or(0);
                let b = call.arg(1).and_then(Value::as_i64).unwrap_or(0);
                done.ok(json!(a - b));
            }),
        );

        let outcome = invoke(&emitter, &event, 0, first(&emitter, &event), vec![json!(3), json!(2)])
            .unwrap();
        assert!(!outcome.is_ready());
        assert_eq!(outcome.resolve().await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn test_once_removed_before_completion() {
        let emitter: Emitter<Value> = Emitter::new();
        let event: Arc<str> = Arc::from("slow");
        emitter.once(
            "slow",
            Handler::future(|_| async {
                tokio::task::yield_now().await;
                Ok(json!("done"))
            }),
        );

        let outcome = invoke(&emitter, &event, 0, first(&emitter, &event), vec![]).unwrap();
        assert_eq!(emitter.listener_count("slow"), 0);
        assert_eq!(outcome.resolve().await.unwrap(), json!("done"));
    }

    #[tokio::test]
    async fn test_listener_receives_emitter() {
        let emitter: Emitter<Value> = Emitter::new();
        let event: Arc<str> = Arc::from("count");
        emitter.on(
            "count",
            Handler::returning(|call| Ok(json!(call.emitter.listener_count(&call.event)))),
        );

        let value = invoke(&emitter, &event, 0, first(&emitter, &event), vec![])
            .unwrap()
            .resolve()
            .await
            .unwrap();
        assert_eq!(value, json!(1));
    }

    #[test]
    fn test_claimed_once_listener_is_skipped() {
        let emitter: Emitter<Value> = Emitter::new();
        let event: Arc<str> = Arc::from("ping");
        let calls = Arc::new(std::sync::Mutex::new(0));
        let counter = Arc::clone(&calls);
        emitter.once(
            "ping",
            Handler::returning(move |_| {
                *counter.lock().unwrap() += 1;
                Ok(json!("pong"))
            }),
        );

        let stale = first(&emitter, &event);
        assert_eq!(emitter.emit("ping", vec![]), 1);

        assert!(invoke(&emitter, &event, 0, stale, vec![]).is_none());
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
