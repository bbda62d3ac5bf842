//! RunContext - caller-owned conversation state

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::executor::ToolExecutor;

/// Mutable state spanning one conversation
///
/// Owned by the caller. The turn handler reads every field but only writes
/// `steps` (append only), `last_intent` and `pending_token`.
#[derive(Clone, Default)]
pub struct RunContext {
    /// Executed tool-step records, oldest first
    pub steps: Vec<Value>,

    /// Intent classified on the latest turn
    pub last_intent: Option<String>,

    /// Last action known to the caller, used when no intent is recorded
    pub last_action: Option<String>,

    /// Parameters for the next action
    pub last_params: Map<String, Value>,

    /// Preview shown when asking for confirmation
    pub last_preview: Option<Vec<Value>>,

    /// Token of the risky action awaiting a yes/no
    pub pending_token: Option<String>,

    /// Overrides the default clarification question
    pub clarification_question: Option<String>,

    /// Overrides the default clarification options
    pub clarification_options: Option<Vec<String>>,

    /// Executor used when none is passed to the handler
    pub execute_tools: Option<Arc<dyn ToolExecutor>>,
}

impl RunContext {
    pub fn new() -> Self {
        debug!("RunContext::new: called");
        Self::default()
    }

    /// Create a context carrying its own executor
    pub fn with_executor(executor: Arc<dyn ToolExecutor>) -> Self {
        debug!("RunContext::with_executor: called");
        Self {
            execute_tools: Some(executor),
            ..Self::default()
        }
    }

    /// True when a risky action awaits an answer
    pub fn has_pending(&self) -> bool {
        self.pending_token.is_some()
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("steps", &self.steps.len())
            .field("last_intent", &self.last_intent)
            .field("last_action", &self.last_action)
            .field("last_params", &self.last_params)
            .field("last_preview", &self.last_preview)
            .field("pending_token", &self.pending_token)
            .field("clarification_question", &self.clarification_question)
            .field("clarification_options", &self.clarification_options)
            .field("execute_tools", &self.execute_tools.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::DryRunExecutor;

    #[test]
    fn test_new_context_is_empty() {
        let ctx = RunContext::new();
        assert!(ctx.steps.is_empty());
        assert!(!ctx.has_pending());
        assert!(ctx.execute_tools.is_none());
    }

    #[test]
    fn test_with_executor() {
        let ctx = RunContext::with_executor(Arc::new(DryRunExecutor));
        assert!(ctx.execute_tools.is_some());
        assert!(format!("{:?}", ctx).contains("execute_tools: true"));
    }
}
