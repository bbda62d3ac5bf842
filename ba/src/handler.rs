//! TurnHandler - one user message in, one text reply out
//!
//! Composes classifier, policy engine, confirmation gate, utterance builder
//! and narrator. All conversation state lives in the caller's [`RunContext`];
//! the only state the handler owns is its confirmation store.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::classifier::classify;
use crate::config::Config;
use crate::confirmation::{ActionPayload, ConfirmationStore, InMemoryConfirmationStore, Resolution};
use crate::context::RunContext;
use crate::error::{TurnError, TurnResult};
use crate::executor::{ExecutionOutcome, ToolExecutor};
use crate::lexicon;
use crate::narrator::Narrator;
use crate::policy::{Decision, PolicyDecision, PolicyEngine};
use crate::utterance::UtteranceBuilder;

pub const CANCELLED_TEXT: &str = "C'est annulé, aucune modification n'a été faite.";
pub const NOT_FOUND_TEXT: &str =
    "Je ne retrouve pas l'action à confirmer. Pouvez-vous reformuler votre demande ?";
pub const AWAITING_TEXT: &str = "Merci de répondre par « oui » pour confirmer ou « non » pour annuler.";
pub const EXECUTION_ERROR_TEXT: &str =
    "Désolé, l'action n'a pas pu aboutir. Rien n'a été modifié, vous pouvez réessayer.";
pub const DEFAULT_CLARIFICATION_QUESTION: &str = "Pouvez-vous préciser ce que vous souhaitez faire";
pub const DEFAULT_CLARIFICATION_OPTIONS: &[&str] =
    &["Générer des user stories", "Lister le backlog", "Faire un récapitulatif"];

/// Action staged when neither an intent nor an action is known
pub const FALLBACK_ACTION: &str = "EXECUTE";

/// Reply produced for one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TurnResponse {
    Text { text: String },
}

impl TurnResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// The reply text
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text { text } => text,
        }
    }
}

/// Per-turn orchestrator
pub struct TurnHandler {
    store: Arc<dyn ConfirmationStore>,
    policy: PolicyEngine,
    builder: UtteranceBuilder,
    narrator: Narrator,
}

impl Default for TurnHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnHandler {
    /// Handler with default thresholds and its own confirmation store
    pub fn new() -> Self {
        debug!("TurnHandler::new: called");
        Self {
            store: Arc::new(InMemoryConfirmationStore::new()),
            policy: PolicyEngine::default(),
            builder: UtteranceBuilder::default(),
            narrator: Narrator::default(),
        }
    }

    /// Handler with thresholds taken from configuration
    pub fn from_config(config: &Config) -> Self {
        debug!("TurnHandler::from_config: called");
        Self {
            store: Arc::new(InMemoryConfirmationStore::new()),
            policy: config.policy.engine(),
            builder: config.utterance.builder(),
            narrator: config.narrator.narrator(),
        }
    }

    /// Replace the confirmation store, e.g. to share one between handlers
    pub fn with_store(mut self, store: Arc<dyn ConfirmationStore>) -> Self {
        self.store = store;
        self
    }

    /// Process one user message
    ///
    /// `executor` takes precedence over `ctx.execute_tools`. Only validation
    /// failures are returned as errors; executor failures become a reply.
    pub fn handle(
        &self,
        message: &str,
        ctx: &mut RunContext,
        executor: Option<&dyn ToolExecutor>,
    ) -> TurnResult<TurnResponse> {
        debug!("TurnHandler::handle: called");
        if message.trim().is_empty() {
            return Err(TurnError::InvalidInput("message must be a non-blank string".to_string()));
        }

        let ctx_executor = ctx.execute_tools.clone();
        let executor = match executor {
            Some(executor) => executor,
            None => ctx_executor.as_deref().ok_or(TurnError::MissingExecutor)?,
        };

        let classification = classify(message)?;
        let intent = classification.intent.as_str();
        ctx.last_intent = Some(intent.to_string());

        let has_pending = ctx.pending_token.is_some();
        let mut decision = self
            .policy
            .decide(message, intent, classification.confidence, has_pending, ctx.steps.len())?;

        // A pending token gets first refusal on any yes/no reply
        if has_pending
            && decision.decision != Decision::AskConfirmation
            && (lexicon::is_affirmative(message) || lexicon::is_negative(message))
        {
            debug!(overridden = %decision.decision, "TurnHandler::handle: yes/no reply with pending token");
            decision = PolicyDecision {
                decision: Decision::AskConfirmation,
                reason: "pending confirmation reply".to_string(),
            };
        }

        info!(
            %intent,
            confidence = classification.confidence,
            decision = %decision.decision,
            reason = %decision.reason,
            "turn dispatch"
        );

        let text = match decision.decision {
            Decision::Reformulate => self.builder.acknowledge_and_reformulate(message)?,
            Decision::AskClarification => self.clarify(ctx)?,
            Decision::AskConfirmation => match ctx.pending_token.clone() {
                None => self.stage(ctx)?,
                Some(token) => self.resolve(&token, message, ctx, executor)?,
            },
            Decision::Summarize => self.narrator.narrate(&ctx.steps)?,
            Decision::ExecuteIntent => {
                let payload = ActionPayload {
                    action: intent.to_string(),
                    params: ctx.last_params.clone(),
                    preview: ctx.last_preview.clone(),
                };
                match self.execute(executor, &payload, ctx) {
                    Some(narration) => {
                        let ack = self.builder.acknowledge_and_reformulate(message)?;
                        format!("{}\n\n{}", ack, narration)
                    }
                    None => EXECUTION_ERROR_TEXT.to_string(),
                }
            }
        };

        Ok(TurnResponse::text(text))
    }

    /// Default options only accompany the default question
    fn clarify(&self, ctx: &RunContext) -> TurnResult<String> {
        debug!("TurnHandler::clarify: called");
        let custom = ctx.clarification_question.as_deref().filter(|q| !q.trim().is_empty());
        let default_options: Vec<String> = DEFAULT_CLARIFICATION_OPTIONS.iter().map(|s| s.to_string()).collect();

        let (question, options) = match (custom, ctx.clarification_options.as_deref()) {
            (Some(question), options) => (question, options),
            (None, Some(options)) => (DEFAULT_CLARIFICATION_QUESTION, Some(options)),
            (None, None) => (DEFAULT_CLARIFICATION_QUESTION, Some(default_options.as_slice())),
        };

        self.builder.ask_clarification(question, options)
    }

    fn stage(&self, ctx: &mut RunContext) -> TurnResult<String> {
        let action = [ctx.last_intent.as_deref(), ctx.last_action.as_deref()]
            .into_iter()
            .flatten()
            .find(|a| !a.trim().is_empty())
            .unwrap_or(FALLBACK_ACTION);
        debug!(%action, "TurnHandler::stage: called");

        let payload = ActionPayload {
            action: action.to_string(),
            params: ctx.last_params.clone(),
            preview: ctx.last_preview.clone(),
        };
        let token = self.store.stage(&payload)?;
        ctx.pending_token = Some(token.clone());

        Ok(confirmation_prompt(&payload, &token))
    }

    fn resolve(
        &self,
        token: &str,
        message: &str,
        ctx: &mut RunContext,
        executor: &dyn ToolExecutor,
    ) -> TurnResult<String> {
        debug!("TurnHandler::resolve: called");
        let resolution = self.store.resolve(token, message)?;

        let text = match resolution {
            Resolution::Confirmed(payload) => {
                ctx.pending_token = None;
                self.execute(executor, &payload, ctx)
                    .unwrap_or_else(|| EXECUTION_ERROR_TEXT.to_string())
            }
            Resolution::Cancelled => {
                ctx.pending_token = None;
                CANCELLED_TEXT.to_string()
            }
            Resolution::InvalidToken => {
                ctx.pending_token = None;
                NOT_FOUND_TEXT.to_string()
            }
            Resolution::Awaiting => AWAITING_TEXT.to_string(),
        };
        Ok(text)
    }

    /// Run the executor and record its steps
    ///
    /// Returns the narration of the new steps, or `None` when the executor
    /// failed or returned malformed data. Nothing is recorded on failure.
    fn execute(&self, executor: &dyn ToolExecutor, payload: &ActionPayload, ctx: &mut RunContext) -> Option<String> {
        debug!(action = %payload.action, "TurnHandler::execute: called");
        let outcome = match executor.execute(payload).and_then(ExecutionOutcome::from_value) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(action = %payload.action, error = %e, "executor failed");
                return None;
            }
        };

        let narration = match self.narrator.narrate(&outcome.steps) {
            Ok(narration) => narration,
            Err(e) => {
                warn!(action = %payload.action, error = %e, "executor steps could not be narrated");
                return None;
            }
        };

        info!(action = %payload.action, steps = outcome.steps.len(), "recorded executor steps");
        ctx.steps.extend(outcome.steps);
        Some(narration)
    }
}

fn confirmation_prompt(payload: &ActionPayload, token: &str) -> String {
    let mut lines = vec![format!("Cette action demande votre confirmation : {}.", payload.action)];
    match payload.preview.as_deref() {
        Some(items) if !items.is_empty() => {
            lines.push("Aperçu :".to_string());
            lines.extend(items.iter().map(|item| format!("- {}", render_preview_item(item))));
        }
        _ => lines.push("Aperçu : aucun élément à afficher.".to_string()),
    }
    lines.push(format!("{} (jeton : {})", AWAITING_TEXT, token));
    lines.join("\n")
}

fn render_preview_item(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
