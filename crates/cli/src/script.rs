//! Flow scripts: listeners to register and steps to run, read from TOML.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use eventflow::{BoxError, Emitter, Handler};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub listeners: Vec<ListenerSpec>,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

/// A listener to register before the steps run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerSpec {
    pub event: String,
    pub op: Op,
    /// Right-hand side for arithmetic, or the value for `constant`
    #[serde(default)]
    pub operand: Value,
    /// Error message for `fail`
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub once: bool,
    /// Completion delay for `callback` and `future` listeners
    #[serde(default)]
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Add,
    Mul,
    Sub,
    Echo,
    Fail,
    Constant,
}

/// Calling convention of a scripted listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Sync,
    Callback,
    Future,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSpec {
    pub policy: StepPolicy,
    pub event: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPolicy {
    Series,
    Parallel,
    Waterfall,
    Invoke,
}

impl Script {
    /// Read and parse a script file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        let script = Self::parse(&content)
            .with_context(|| format!("Failed to parse script {}", path.display()))?;
        debug!(
            path = %path.display(),
            listeners = script.listeners.len(),
            steps = script.steps.len(),
            "Script loaded"
        );
        Ok(script)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Number of listeners declared per event.
    pub fn listener_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for spec in &self.listeners {
            *counts.entry(spec.event.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Register every declared listener on `emitter`.
    pub fn register(&self, emitter: &Emitter<Value>) {
        for spec in &self.listeners {
            let handler = spec.handler();
            if spec.once {
                emitter.once(spec.event.as_str(), handler);
            } else {
                emitter.on(spec.event.as_str(), handler);
            }
        }
    }
}

impl ListenerSpec {
    fn handler(&self) -> Handler<Value> {
        let action = Action {
            op: self.op,
            operand: self.operand.clone(),
            message: self.message.clone(),
        };
        let delay = Duration::from_millis(self.delay_ms);

        match self.mode {
            Mode::Sync => Handler::returning(move |call| action.apply(&call.args)),
            Mode::Callback => Handler::callback(move |call, done| {
                let result = action.apply(&call.args);
                if delay.is_zero() {
                    done.done(result);
                } else {
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        done.done(result);
                    });
                }
            }),
            Mode::Future => Handler::future(move |call| {
                let result = action.apply(&call.args);
                async move {
                    tokio::time::sleep(delay).await;
                    result
                }
            }),
        }
    }
}

/// What a scripted listener computes from its arguments.
#[derive(Debug, Clone)]
struct Action {
    op: Op,
    operand: Value,
    message: Option<String>,
}

impl Action {
    fn apply(&self, args: &[Value]) -> Result<Value, BoxError> {
        let first = args.first().cloned().unwrap_or(Value::Null);
        match self.op {
            Op::Echo => Ok(first),
            Op::Constant => Ok(self.operand.clone()),
            Op::Fail => Err(self
                .message
                .clone()
                .unwrap_or_else(|| "listener failed".to_string())
                .into()),
            Op::Add => arithmetic(&first, &self.operand, i64::checked_add, |a, b| a + b),
            Op::Sub => arithmetic(&first, &self.operand, i64::checked_sub, |a, b| a - b),
            Op::Mul => arithmetic(&first, &self.operand, i64::checked_mul, |a, b| a * b),
        }
    }
}

fn arithmetic(
    lhs: &Value,
    rhs: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, BoxError> {
    if let (Some(a), Some(b)) = (lhs.as_i64(), rhs.as_i64()) {
        if let Some(n) = int_op(a, b) {
            return Ok(Value::from(n));
        }
    }
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => Ok(Value::from(float_op(a, b))),
        _ => Err(format!("expected numbers, got {lhs} and {rhs}").into()),
    }
}
