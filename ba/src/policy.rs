//! Policy engine - picks the next conversational move
//!
//! Rules form a strict priority chain. The first matching rule wins and every
//! later rule is masked:
//!
//! 1. confidence below threshold -> ask for clarification
//! 2. risky action pending or confirmation keyword -> ask for confirmation
//! 3. long run or recap keyword -> summarize
//! 4. ambiguity keyword -> ask for clarification
//! 5. smalltalk intent -> reformulate
//! 6. otherwise execute the intent

use serde::Serialize;
use tracing::{debug, info};

use crate::classifier::Intent;
use crate::error::{TurnError, TurnResult};
use crate::lexicon::{self, AMBIGUITY_CUES, CONFIRMATION_KEYWORDS, RECAP_KEYWORDS};

/// Default confidence under which the engine asks for clarification
pub const DEFAULT_CLARIFY_BELOW: f64 = 0.5;

/// Default step count above which the engine summarizes
pub const DEFAULT_LONG_RUN_AFTER: usize = 6;

/// The closed set of conversational moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Reformulate,
    AskClarification,
    AskConfirmation,
    ExecuteIntent,
    Summarize,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reformulate => write!(f, "REFORMULATE"),
            Self::AskClarification => write!(f, "ASK_CLARIFICATION"),
            Self::AskConfirmation => write!(f, "ASK_CONFIRMATION"),
            Self::ExecuteIntent => write!(f, "EXECUTE_INTENT"),
            Self::Summarize => write!(f, "SUMMARIZE"),
        }
    }
}

/// A decision together with the rule that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDecision {
    pub decision: Decision,
    pub reason: String,
}

impl PolicyDecision {
    fn new(decision: Decision, reason: &str) -> Self {
        Self {
            decision,
            reason: reason.to_string(),
        }
    }
}

/// Decision thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyEngine {
    /// Confidence strictly below this asks for clarification
    pub clarify_below: f64,
    /// Step counts strictly above this trigger a summary
    pub long_run_after: usize,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self {
            clarify_below: DEFAULT_CLARIFY_BELOW,
            long_run_after: DEFAULT_LONG_RUN_AFTER,
        }
    }
}

impl PolicyEngine {
    /// Create an engine with explicit thresholds
    pub fn new(clarify_below: f64, long_run_after: usize) -> Self {
        Self {
            clarify_below,
            long_run_after,
        }
    }

    /// Evaluate the priority chain
    ///
    /// The boolean and the step count are type-checked by the signature; the
    /// strings must be non-blank and the confidence must lie in [0, 1].
    pub fn decide(
        &self,
        message: &str,
        intent: &str,
        confidence: f64,
        has_pending_risky_action: bool,
        long_run_steps: usize,
    ) -> TurnResult<PolicyDecision> {
        debug!(
            %intent,
            confidence,
            has_pending_risky_action,
            long_run_steps,
            "PolicyEngine::decide: called"
        );
        if message.trim().is_empty() {
            return Err(TurnError::InvalidArgument("message must be a non-blank string".to_string()));
        }
        if intent.trim().is_empty() {
            return Err(TurnError::InvalidArgument("intent must be a non-blank string".to_string()));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(TurnError::InvalidArgument(format!(
                "confidence must be within [0, 1], got {}",
                confidence
            )));
        }

        let decision = if confidence < self.clarify_below {
            PolicyDecision::new(Decision::AskClarification, "low confidence")
        } else if has_pending_risky_action {
            PolicyDecision::new(Decision::AskConfirmation, "risky action pending")
        } else if lexicon::contains_any(message, CONFIRMATION_KEYWORDS) {
            PolicyDecision::new(Decision::AskConfirmation, "confirmation keyword")
        } else if long_run_steps > self.long_run_after {
            PolicyDecision::new(Decision::Summarize, "long run")
        } else if lexicon::contains_any(message, RECAP_KEYWORDS) {
            PolicyDecision::new(Decision::Summarize, "recap requested")
        } else if lexicon::contains_any(message, AMBIGUITY_CUES) {
            PolicyDecision::new(Decision::AskClarification, "ambiguity")
        } else if intent.trim().eq_ignore_ascii_case(Intent::Smalltalk.as_str()) {
            PolicyDecision::new(Decision::Reformulate, "smalltalk")
        } else {
            PolicyDecision::new(Decision::ExecuteIntent, "actionable intent")
        };

        info!(decision = %decision.decision, reason = %decision.reason, "policy decision");
        Ok(decision)
    }
}

/// Evaluate the priority chain with default thresholds
pub fn decide(
    message: &str,
    intent: &str,
    confidence: f64,
    has_pending_risky_action: bool,
    long_run_steps: usize,
) -> TurnResult<PolicyDecision> {
    PolicyEngine::default().decide(message, intent, confidence, has_pending_risky_action, long_run_steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_low_confidence_masks_ambiguity() {
        let result = decide("je ne sais pas, peut-être", "generate_stories", 0.3, false, 0).unwrap();
        assert_eq!(result.decision, Decision::AskClarification);
        assert_eq!(result.reason, "low confidence");
    }

    #[test]
    fn test_low_confidence_masks_pending_action() {
        let result = decide("oui", "smalltalk", 0.0, true, 10).unwrap();
        assert_eq!(result.decision, Decision::AskClarification);
    }

    #[test]
    fn test_pending_action_asks_confirmation() {
        let result = decide("génère des stories", "generate_stories", 1.0, true, 0).unwrap();
        assert_eq!(result.decision, Decision::AskConfirmation);
    }

    #[test]
    fn test_confirmation_keyword_asks_confirmation() {
        let result = decide("Supprime la feature Paiement", "delete_item", 1.0, false, 0).unwrap();
        assert_eq!(result.decision, Decision::AskConfirmation);
        assert_eq!(result.reason, "confirmation keyword");
    }

    #[test]
    fn test_confirmation_masks_long_run() {
        let result = decide("efface tout", "delete_item", 0.9, false, 50).unwrap();
        assert_eq!(result.decision, Decision::AskConfirmation);
    }

    #[test]
    fn test_long_run_summarizes() {
        let result = decide("génère des stories", "generate_stories", 1.0, false, 7).unwrap();
        assert_eq!(result.decision, Decision::Summarize);

        let result = decide("génère des stories", "generate_stories", 1.0, false, 6).unwrap();
        assert_eq!(result.decision, Decision::ExecuteIntent);
    }

    #[test]
    fn test_recap_keyword_summarizes() {
        let result = decide("Fais-moi un récap", "list_items", 0.5, false, 0).unwrap();
        assert_eq!(result.decision, Decision::Summarize);
    }

    #[test]
    fn test_ambiguity_asks_clarification() {
        let result = decide("liste peut-être les features", "list_items", 1.0, false, 0).unwrap();
        assert_eq!(result.decision, Decision::AskClarification);
        assert_eq!(result.reason, "ambiguity");
    }

    #[test]
    fn test_smalltalk_reformulates_case_insensitively() {
        let result = decide("bonjour", "SmallTalk", 1.0, false, 0).unwrap();
        assert_eq!(result.decision, Decision::Reformulate);
    }

    #[test]
    fn test_default_executes() {
        let result = decide("liste les features", "list_items", 1.0, false, 2).unwrap();
        assert_eq!(result.decision, Decision::ExecuteIntent);
    }

    #[test]
    fn test_invalid_arguments_rejected() {
        assert!(matches!(decide(" ", "list_items", 1.0, false, 0), Err(TurnError::InvalidArgument(_))));
        assert!(matches!(decide("liste", "", 1.0, false, 0), Err(TurnError::InvalidArgument(_))));
        assert!(matches!(decide("liste", "list_items", 1.5, false, 0), Err(TurnError::InvalidArgument(_))));
        assert!(matches!(decide("liste", "list_items", -0.1, false, 0), Err(TurnError::InvalidArgument(_))));
        assert!(matches!(decide("liste", "list_items", f64::NAN, false, 0), Err(TurnError::InvalidArgument(_))));
    }

    #[test]
    fn test_custom_thresholds() {
        let engine = PolicyEngine::new(0.8, 2);
        let result = engine.decide("liste", "list_items", 0.7, false, 0).unwrap();
        assert_eq!(result.decision, Decision::AskClarification);

        let result = engine.decide("liste", "list_items", 0.9, false, 3).unwrap();
        assert_eq!(result.decision, Decision::Summarize);
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(Decision::AskConfirmation.to_string(), "ASK_CONFIRMATION");
        assert_eq!(Decision::ExecuteIntent.to_string(), "EXECUTE_INTENT");
    }

    proptest! {
        #[test]
        fn prop_low_confidence_always_clarifies(
            confidence in 0.0f64..0.5,
            pending in any::<bool>(),
            steps in 0usize..100,
        ) {
            let result = decide("supprime peut-être un récap", "delete_item", confidence, pending, steps).unwrap();
            prop_assert_eq!(result.decision, Decision::AskClarification);
            prop_assert_eq!(result.reason, "low confidence");
        }
    }
}
