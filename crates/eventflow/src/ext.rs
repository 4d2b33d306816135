//! Flow operations attached to anything that owns an emitter.

use async_trait::async_trait;
use events::{Emitter, Payload};

use crate::error::Result;
use crate::{guard, orchestrator};

/// Types that expose an event emitter.
///
/// Implement this for your own type to get the [`FlowExt`] operations on it.
pub trait Emits<T>: Send + Sync {
    fn emitter(&self) -> &Emitter<T>;
}

impl<T> Emits<T> for Emitter<T> {
    fn emitter(&self) -> &Emitter<T> {
        self
    }
}

/// Control-flow operations over an event's listeners.
#[async_trait]
pub trait FlowExt<T: Payload>: Emits<T> {
    /// Run listeners one at a time in registration order.
    async fn series(&self, event: &str, args: Vec<T>) -> Result<Vec<T>> {
        orchestrator::series(self.emitter(), event, args).await
    }

    /// Launch all listeners and gather their results in registration order.
    async fn parallel(&self, event: &str, args: Vec<T>) -> Result<Vec<T>> {
        orchestrator::parallel(self.emitter(), event, args).await
    }

    /// Pipe each listener's result into the next.
    async fn waterfall(&self, event: &str, args: Vec<T>) -> Result<Option<T>> {
        orchestrator::waterfall(self.emitter(), event, args).await
    }

    /// Call the only listener for `event`.
    async fn invoke(&self, event: &str, args: Vec<T>) -> Result<T> {
        guard::invoke(self.emitter(), event, args).await
    }

    /// Call the only listener for `event` without awaiting.
    fn invoke_sync(&self, event: &str, args: Vec<T>) -> Result<T> {
        guard::invoke_sync(self.emitter(), event, args)
    }
}

impl<T: Payload, E: Emits<T> + ?Sized> FlowExt<T> for E {}

#[cfg(test)]
mod tests {
    use super::*;
    use events::{Handler, Invocation};
    use serde_json::{json, Value};

    /// A type that carries its own emitter.
    struct Counter {
        events: Emitter<Value>,
        label: &'static str,
    }

    impl Emits<Value> for Counter {
        fn emitter(&self) -> &Emitter<Value> {
            &self.events
        }
    }

    #[tokio::test]
    async fn test_custom_type_gets_operations() {
        let counter = Counter {
            events: Emitter::new(),
            label: "counter",
        };
        counter
            .emitter()
            .on("tick", Handler::returning(|_| Ok(json!("a"))));
        counter
            .emitter()
            .on("tick", Handler::callback(|_, done| done.ok(json!("b"))));

        assert_eq!(counter.label, "counter");
        assert_eq!(
            counter.series("tick", vec![]).await.unwrap(),
            vec![json!("a"), json!("b")]
        );
    }

    #[tokio::test]
    async fn test_emitter_operations() {
        let emitter: Emitter<Value> = Emitter::new();
        emitter.on("echo", Handler::returning(|call: Invocation<Value>| Ok(call.args[0].clone())));

        assert_eq!(emitter.invoke("echo", vec![json!("hello")]).await.unwrap(), json!("hello"));
        assert_eq!(emitter.invoke_sync("echo", vec![json!("world")]).unwrap(), json!("world"));
        assert_eq!(emitter.parallel("echo", vec![json!(1)]).await.unwrap(), vec![json!(1)]);
        assert_eq!(emitter.waterfall("echo", vec![json!(2)]).await.unwrap(), Some(json!(2)));
    }
}
