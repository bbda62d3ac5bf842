//! Confirmation gate for risky actions
//!
//! A risky action is staged under an opaque token and only released when the
//! user answers yes. Staging stores an owned snapshot of the payload, so later
//! changes to the caller's copy cannot alter what gets executed.
//!
//! Callers holding loosely typed JSON stage through
//! [`ConfirmationStore::stage_value`], which checks the payload shape with
//! [`ActionPayload::from_value`] first.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{TurnError, TurnResult};
use crate::lexicon;

/// Number of random bytes in a confirmation token
const TOKEN_BYTES: usize = 16;

/// Action handed to the tool executor, possibly after confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPayload {
    pub action: String,

    #[serde(default)]
    pub params: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<Vec<Value>>,
}

impl ActionPayload {
    /// Create a payload with no params and no preview
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: Map::new(),
            preview: None,
        }
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_preview(mut self, preview: Vec<Value>) -> Self {
        self.preview = Some(preview);
        self
    }

    /// Check the payload invariants
    pub fn validate(&self) -> TurnResult<()> {
        if self.action.trim().is_empty() {
            return Err(TurnError::InvalidPayload("action must be a non-blank string".to_string()));
        }
        Ok(())
    }

    /// Build a payload from loosely typed JSON
    ///
    /// The value must be an object with a non-blank string `action`. When
    /// present, `params` must be an object and `preview` must be an array.
    pub fn from_value(value: &Value) -> TurnResult<Self> {
        debug!("ActionPayload::from_value: called");
        let obj = value
            .as_object()
            .ok_or_else(|| TurnError::InvalidPayload("payload must be a mapping".to_string()))?;

        let action = match obj.get("action") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            _ => return Err(TurnError::InvalidPayload("action must be a non-blank string".to_string())),
        };

        let params = match obj.get("params") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(TurnError::InvalidPayload("params must be a mapping".to_string())),
        };

        let preview = match obj.get("preview") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(items.clone()),
            Some(_) => return Err(TurnError::InvalidPayload("preview must be an ordered list".to_string())),
        };

        Ok(Self {
            action,
            params,
            preview,
        })
    }
}

/// Result of resolving a token against a user reply
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Affirmative reply; the token is consumed and the payload released
    Confirmed(ActionPayload),
    /// Negative reply; the token is consumed
    Cancelled,
    /// Unknown or already consumed token
    InvalidToken,
    /// Neither yes nor no; the token stays pending
    Awaiting,
}

impl Resolution {
    /// Status label of the outcome
    pub fn status(&self) -> &'static str {
        match self {
            Self::Confirmed(_) => "confirmed",
            Self::Cancelled => "cancelled",
            Self::InvalidToken => "invalid_token",
            Self::Awaiting => "awaiting",
        }
    }
}

/// Storage for staged actions
///
/// Implementations must run every lookup-then-mutate sequence atomically so
/// that concurrent resolutions of one token yield at most one confirmation.
pub trait ConfirmationStore: Send + Sync {
    /// Store a snapshot of `payload` under a fresh token
    fn stage(&self, payload: &ActionPayload) -> TurnResult<String>;

    /// Validate a JSON payload and stage it
    fn stage_value(&self, value: &Value) -> TurnResult<String> {
        let payload = ActionPayload::from_value(value)?;
        self.stage(&payload)
    }

    /// Resolve `token` with the user's `reply`
    fn resolve(&self, token: &str, reply: &str) -> TurnResult<Resolution>;
}

/// Process-local confirmation store guarded by a single mutex
///
/// Tokens never expire; an unresolved token lives as long as the store.
#[derive(Debug, Default)]
pub struct InMemoryConfirmationStore {
    pending: Mutex<HashMap<String, ActionPayload>>,
}

impl InMemoryConfirmationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of staged actions awaiting an answer
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// True when `token` is still staged
    pub fn contains(&self, token: &str) -> bool {
        self.lock().contains_key(token)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ActionPayload>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConfirmationStore for InMemoryConfirmationStore {
    fn stage(&self, payload: &ActionPayload) -> TurnResult<String> {
        debug!(action = %payload.action, "InMemoryConfirmationStore::stage: called");
        payload.validate()?;

        let snapshot = payload.clone();
        let mut pending = self.lock();
        let token = loop {
            let candidate = generate_token();
            if !pending.contains_key(&candidate) {
                break candidate;
            }
            debug!("InMemoryConfirmationStore::stage: token collision, regenerating");
        };
        pending.insert(token.clone(), snapshot);

        info!(action = %payload.action, pending = pending.len(), "staged risky action");
        Ok(token)
    }

    fn resolve(&self, token: &str, reply: &str) -> TurnResult<Resolution> {
        debug!("InMemoryConfirmationStore::resolve: called");
        if token.trim().is_empty() {
            return Err(TurnError::InvalidInput("token must be a non-blank string".to_string()));
        }
        if reply.trim().is_empty() {
            return Err(TurnError::InvalidInput("reply must be a non-blank string".to_string()));
        }

        let reply = lexicon::normalize(reply);
        let mut pending = self.lock();

        if !pending.contains_key(token) {
            debug!("InMemoryConfirmationStore::resolve: unknown token");
            return Ok(Resolution::InvalidToken);
        }

        let resolution = if lexicon::is_affirmative(&reply) {
            match pending.remove(token) {
                Some(payload) => Resolution::Confirmed(payload),
                None => Resolution::InvalidToken,
            }
        } else if lexicon::is_negative(&reply) {
            pending.remove(token);
            Resolution::Cancelled
        } else {
            Resolution::Awaiting
        };

        info!(status = resolution.status(), "resolved confirmation");
        Ok(resolution)
    }
}

/// Hex token from the thread-local CSPRNG
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
