//! BacklogAssist - turn-processing core for a backlog planning assistant
//!
//! Each user message goes through a fixed pipeline: keyword classification,
//! a policy decision, then one of five reply strategies. Risky actions are
//! held behind a one-shot confirmation token until the user answers yes or no.
//!
//! # Modules
//!
//! - [`classifier`] - Keyword intent classification with confidence
//! - [`policy`] - Ordered rule chain choosing the reply strategy
//! - [`confirmation`] - Token store gating risky actions
//! - [`utterance`] - Acknowledgements and clarification questions
//! - [`narrator`] - Recaps of executed tool steps
//! - [`executor`] - Tool executor seam and a dry-run implementation
//! - [`handler`] - Per-turn orchestration
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod classifier;
pub mod cli;
pub mod config;
pub mod confirmation;
pub mod context;
pub mod error;
pub mod executor;
pub mod handler;
pub mod lexicon;
pub mod narrator;
pub mod policy;
pub mod repl;
pub mod utterance;

// Re-export commonly used types
pub use classifier::{Classification, Intent, classify};
pub use config::Config;
pub use confirmation::{ActionPayload, ConfirmationStore, InMemoryConfirmationStore, Resolution};
pub use context::RunContext;
pub use error::{TurnError, TurnResult};
pub use executor::{DryRunExecutor, ExecutionOutcome, StepResult, ToolExecutor, ToolStep};
pub use handler::{TurnHandler, TurnResponse};
pub use narrator::{Narrator, narrate};
pub use policy::{Decision, PolicyDecision, PolicyEngine, decide};
pub use repl::ChatSession;
pub use utterance::{UtteranceBuilder, acknowledge_and_reformulate, ask_clarification};
