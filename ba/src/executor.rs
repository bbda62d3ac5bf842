//! Tool executor seam
//!
//! The turn handler never touches the backlog itself. It hands an
//! [`ActionPayload`] to an injected [`ToolExecutor`] and expects back
//! `{"steps": [...]}` where each step is a mapping shaped like [`ToolStep`].

use std::time::Instant;

use eyre::Result;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::confirmation::ActionPayload;

/// Executes backlog actions on behalf of the turn handler
///
/// Implementations may block and may fail. Failures and malformed results are
/// turned into a fixed reply by the handler.
pub trait ToolExecutor: Send + Sync {
    fn execute(&self, payload: &ActionPayload) -> Result<Value>;
}

impl<F> ToolExecutor for F
where
    F: Fn(&ActionPayload) -> Result<Value> + Send + Sync,
{
    fn execute(&self, payload: &ActionPayload) -> Result<Value> {
        self(payload)
    }
}

/// Created/updated/deleted counters reported by a tool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepResult {
    pub created: u64,
    pub updated: u64,
    pub deleted: u64,
}

/// One executed tool step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolStep {
    pub tool: String,
    pub result: StepResult,
    pub meta: Map<String, Value>,
    /// Milliseconds
    pub duration: f64,
}

impl ToolStep {
    pub fn new(tool: impl Into<String>, result: StepResult) -> Self {
        Self {
            tool: tool.into(),
            result,
            meta: Map::new(),
            duration: 0.0,
        }
    }

    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration = duration_ms;
        self
    }

    /// JSON record as stored in the run context
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Validated executor output
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub steps: Vec<Value>,
}

impl ExecutionOutcome {
    /// Validate a raw executor result
    ///
    /// The value must be an object holding a `steps` array whose elements are
    /// all objects. Nothing partial is accepted.
    pub fn from_value(value: Value) -> Result<Self> {
        debug!("ExecutionOutcome::from_value: called");
        let Value::Object(mut obj) = value else {
            return Err(eyre::eyre!("Executor result is not a mapping"));
        };
        let Some(Value::Array(steps)) = obj.remove("steps") else {
            return Err(eyre::eyre!("Executor result has no steps list"));
        };
        if let Some(index) = steps.iter().position(|s| !s.is_object()) {
            return Err(eyre::eyre!("Executor step {} is not a mapping", index));
        }
        Ok(Self { steps })
    }
}

/// Executor that simulates backlog changes without storing anything
///
/// Used by the interactive CLI. Each action yields one step whose counters
/// follow the action kind, scaled by `params.count` when present.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

impl ToolExecutor for DryRunExecutor {
    fn execute(&self, payload: &ActionPayload) -> Result<Value> {
        debug!(action = %payload.action, "DryRunExecutor::execute: called");
        let started = Instant::now();

        let count = payload
            .params
            .get("count")
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
            .unwrap_or(1);

        let result = match payload.action.as_str() {
            "generate_stories" => StepResult {
                created: count,
                ..Default::default()
            },
            "update_item" | "prioritize" => StepResult {
                updated: count,
                ..Default::default()
            },
            "delete_item" => StepResult {
                deleted: count,
                ..Default::default()
            },
            _ => StepResult::default(),
        };

        let step = ToolStep::new(payload.action.clone(), result)
            .with_meta(payload.params.clone())
            .with_duration(started.elapsed().as_millis() as f64);

        Ok(json!({ "steps": [step.to_value()?] }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accepts_well_formed_result() {
        let step = ToolStep::new("create_stories", StepResult { created: 3, ..Default::default() });
        let outcome = ExecutionOutcome::from_value(json!({"steps": [step.to_value().unwrap()]})).unwrap();

        assert_eq!(outcome.steps.len(), 1);
        assert_eq!(outcome.steps[0]["result"]["created"], 3);
    }

    #[test]
    fn test_outcome_rejects_malformed_results() {
        let cases = [
            json!(null),
            json!([]),
            json!({}),
            json!({"steps": "nope"}),
            json!({"steps": [{"tool": "a"}, 42]}),
        ];
        for case in cases {
            assert!(ExecutionOutcome::from_value(case).is_err());
        }
    }

    #[test]
    fn test_closure_is_an_executor() {
        let executor = |payload: &ActionPayload| -> Result<Value> { Ok(json!({"steps": [], "echo": payload.action})) };
        let value = executor.execute(&ActionPayload::new("list_items")).unwrap();
        assert_eq!(value["echo"], "list_items");
    }

    #[test]
    fn test_dry_run_scales_with_count() {
        let params = json!({"count": 5, "feature": "Paiement"});
        let payload = ActionPayload::new("generate_stories").with_params(params.as_object().cloned().unwrap());

        let outcome = ExecutionOutcome::from_value(DryRunExecutor.execute(&payload).unwrap()).unwrap();
        let step = &outcome.steps[0];

        assert_eq!(step["tool"], "generate_stories");
        assert_eq!(step["result"]["created"], 5);
        assert_eq!(step["meta"]["feature"], "Paiement");
    }

    #[test]
    fn test_dry_run_reports_whole_milliseconds() {
        let value = DryRunExecutor.execute(&ActionPayload::new("update_item")).unwrap();
        let duration = value["steps"][0]["duration"].as_f64().unwrap();

        assert_eq!(duration.fract(), 0.0);
        assert_eq!(value["steps"][0]["result"]["updated"], 1);
    }

    #[test]
    fn test_step_record_shape() {
        let step = ToolStep::new("delete_item", StepResult { deleted: 2, ..Default::default() }).with_duration(40.0);
        let value = step.to_value().unwrap();

        assert_eq!(
            value,
            json!({
                "tool": "delete_item",
                "result": {"created": 0, "updated": 0, "deleted": 2},
                "meta": {},
                "duration": 40.0,
            })
        );
    }

    #[test]
    fn test_dry_run_delete_defaults_to_one() {
        let outcome = ExecutionOutcome::from_value(DryRunExecutor.execute(&ActionPayload::new("delete_item")).unwrap())
            .unwrap();
        assert_eq!(outcome.steps[0]["result"]["deleted"], 1);
        assert_eq!(outcome.steps[0]["result"]["created"], 0);
    }
}
