//! Executes script steps against an emitter.

use anyhow::{bail, Result};
use eventflow::{Emitter, FlowExt};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::script::{StepPolicy, StepSpec};

/// Outcome of one step, printed as a JSON line.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub policy: StepPolicy,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub async fn run_step(emitter: &Emitter<Value>, index: usize, step: &StepSpec) -> StepReport {
    let args = step.args.clone();
    let event = step.event.as_str();
    let result = match step.policy {
        StepPolicy::Series => emitter.series(event, args).await.map(Value::Array),
        StepPolicy::Parallel => emitter.parallel(event, args).await.map(Value::Array),
        StepPolicy::Waterfall => emitter
            .waterfall(event, args)
            .await
            .map(|value| value.unwrap_or(Value::Null)),
        StepPolicy::Invoke => emitter.invoke(event, args).await,
    };

    let (value, error) = match result {
        Ok(value) => {
            info!(step = index, event = %event, policy = ?step.policy, "Step completed");
            (Some(value), None)
        }
        Err(e) => {
            warn!(step = index, event = %event, policy = ?step.policy, error = %e, "Step failed");
            (None, Some(e.to_string()))
        }
    };

    StepReport {
        step: index,
        policy: step.policy,
        event: step.event.clone(),
        value,
        error,
    }
}

/// Run `steps` in order, stopping after the first failure when `fail_fast`.
pub async fn run_steps(
    emitter: &Emitter<Value>,
    steps: &[StepSpec],
    fail_fast: bool,
) -> Vec<StepReport> {
    let mut reports = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        let report = run_step(emitter, index, step).await;
        let failed = !report.is_ok();
        reports.push(report);
        if failed && fail_fast {
            break;
        }
    }
    reports
}

/// Fail when any reported step failed, so the process exits non-zero.
pub fn ensure_succeeded(reports: &[StepReport], total: usize) -> Result<()> {
    let failed = reports.iter().filter(|report| !report.is_ok()).count();
    if failed > 0 {
        bail!("{} of {} steps failed", failed, total);
    }
    Ok(())
}
