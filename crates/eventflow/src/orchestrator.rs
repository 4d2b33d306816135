//! Series, parallel and waterfall execution over an event's listeners.
//!
//! Each operation snapshots the listeners once when it starts. Listeners
//! added or removed while it runs do not change the tasks already built.

use std::fmt;

use events::{Emitter, Payload};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::error::{FlowError, Result};
use crate::invoker::Outcome;
use crate::task::{self, Task};

/// Strategy for sequencing listener invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    Series,
    Parallel,
    Waterfall,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Series => "series",
            Policy::Parallel => "parallel",
            Policy::Waterfall => "waterfall",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn prepare<T: Payload>(emitter: &Emitter<T>, event: &str, policy: Policy) -> Vec<Task<T>> {
    let tasks = task::build(emitter, event);
    debug!(event = %event, policy = %policy, listeners = tasks.len(), "Starting flow");
    tasks
}

/// Run every listener in registration order, one at a time.
///
/// Stops at the first failure; later listeners are not invoked. A once
/// listener that already fired elsewhere is skipped and contributes no
/// result.
pub async fn series<T: Payload>(emitter: &Emitter<T>, event: &str, args: Vec<T>) -> Result<Vec<T>> {
    let tasks = prepare(emitter, event, Policy::Series);
    let mut results = Vec::with_capacity(tasks.len());

    for task in tasks {
        if let Some(outcome) = task.start(args.clone()) {
            results.push(outcome.resolve().await?);
        }
    }

    debug!(event = %event, results = results.len(), "Series flow completed");
    Ok(results)
}

/// Launch every listener, then gather results by listener position.
///
/// Returning listeners run during the launch pass. Completing listeners
/// are spawned and keep running after a sibling fails; the first failure
/// in completion order is reported and the other results are discarded.
///
/// Spawning needs a tokio runtime. Without one, a flow that has
/// completing listeners fails with [`FlowError::NoRuntime`] before any
/// listener runs.
pub async fn parallel<T: Payload>(
    emitter: &Emitter<T>,
    event: &str,
    args: Vec<T>,
) -> Result<Vec<T>> {
    let tasks = prepare(emitter, event, Policy::Parallel);
    let runtime = match Handle::try_current() {
        Ok(runtime) => Some(runtime),
        Err(_) if tasks.iter().any(Task::expects_completion) => {
            warn!(event = %event, "No async runtime for completing listeners");
            return Err(FlowError::NoRuntime(event.to_string()));
        }
        Err(_) => None,
    };

    let mut slots: Vec<Option<T>> = (0..tasks.len()).map(|_| None).collect();
    let mut first_error = None;
    let mut pending = FuturesUnordered::new();

    for task in tasks {
        let position = task.position();
        match task.start(args.clone()) {
            None => {}
            Some(Outcome::Ready(Ok(value))) => slots[position] = Some(value),
            Some(Outcome::Ready(Err(e))) => {
                first_error.get_or_insert(e);
            }
            Some(Outcome::Pending(future)) => match &runtime {
                Some(runtime) => {
                    let handle = runtime.spawn(future);
                    pending.push(async move { (position, handle.await) });
                }
                None => {
                    first_error.get_or_insert(FlowError::NoRuntime(event.to_string()));
                }
            },
        }
    }

    if let Some(e) = first_error {
        if !pending.is_empty() {
            debug!(event = %event, in_flight = pending.len(), "Detaching in-flight listeners after failure");
        }
        return Err(e);
    }

    while let Some((position, joined)) = pending.next().await {
        match joined {
            Ok(Ok(value)) => slots[position] = Some(value),
            Ok(Err(e)) => return Err(e),
            Err(join_error) => {
                warn!(event = %event, position, error = %join_error, "Listener task aborted");
                return Err(FlowError::ListenerPanicked {
                    event: event.to_string(),
                    position,
                });
            }
        }
    }

    let results: Vec<T> = slots.into_iter().flatten().collect();
    debug!(event = %event, results = results.len(), "Parallel flow completed");
    Ok(results)
}

/// Pipe each listener's result into the next one.
///
/// The first listener receives `args`; every later listener receives the
/// previous result as its only argument. A skipped once listener passes
/// its input through untouched. With no listeners invoked the first of
/// `args` is returned unchanged.
pub async fn waterfall<T: Payload>(
    emitter: &Emitter<T>,
    event: &str,
    args: Vec<T>,
) -> Result<Option<T>> {
    let tasks = prepare(emitter, event, Policy::Waterfall);
    let mut input = args;

    for task in tasks {
        if let Some(outcome) = task.start(input.clone()) {
            input = vec![outcome.resolve().await?];
        }
    }

    debug!(event = %event, "Waterfall flow completed");
    Ok(input.into_iter().next())
}
