//! Utterance builder - acknowledgements and clarification prompts
//!
//! The acknowledgement extracts a "focus" from the user's message with an
//! ordered pipeline of rules, first match wins:
//!
//! 1. from the first command verb to the end of the message
//! 2. the first quoted span (straight, curly or guillemet quotes)
//! 3. the message with greeting, politeness prefixes and a leading pronoun
//!    stripped, repeated until nothing more comes off

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{TurnError, TurnResult};

pub const ACK_PREFIX: &str = "Bien reçu !";
pub const ACK_LEAD_IN: &str = " Si je comprends bien : ";
pub const ACK_SUFFIX: &str = ". C'est noté.";
pub const ELLIPSIS: &str = "…";

/// Default maximum focus length, in characters
pub const DEFAULT_MAX_FOCUS_CHARS: usize = 120;

/// Truncation never cuts inside this many leading characters
pub const DEFAULT_MIN_FOCUS_CHARS: usize = 40;

/// Default cap on clarification options
pub const DEFAULT_MAX_OPTIONS: usize = 5;

/// How a focus rule turns a regex match into the focus text
#[derive(Debug, Clone, Copy)]
enum FocusRule {
    /// Everything from the match start to the end of the message
    ToEnd,
    /// The first capture group that participated in the match
    Captured,
}

static FOCUS_RULES: LazyLock<Vec<(Regex, FocusRule)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(
                r"(?i)\b(?:génère|générer|générez|crée|créer|créez|ajoute|ajouter|ajoutez|liste|lister|listez|affiche|afficher|supprime|supprimer|modifie|modifier|mets à jour|mettre à jour|renomme|renommer|priorise|prioriser|planifie|planifier|découpe|découper|rédige|rédiger)\b",
            )
            .expect("command verb pattern"),
            FocusRule::ToEnd,
        ),
        (
            Regex::new(r#""([^"]+)"|«([^»]+)»|“([^”]+)”|‘([^’]+)’|(?:^|\s)'([^']+)'(?:$|[\s.,;:!?])"#)
                .expect("quote pattern"),
            FocusRule::Captured,
        ),
    ]
});

static GREETING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:bonjour|bonsoir|salut|hello|coucou|hey|hi)\b[\s,;:!.]*").expect("greeting pattern")
});

static POLITENESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:s'il te plaît|s'il vous plaît|stp|svp|merci de|peux-tu|peux tu|pourrais-tu|pourrais tu|pouvez-vous|pourriez-vous|est-ce que tu peux|est-ce que vous pouvez|j'aimerais|je voudrais|je veux|aide-moi à|aidez-moi à)(?:\b|\s|$)[\s,;:!.]*",
    )
    .expect("politeness pattern")
});

static PRONOUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:tu|vous|je|on|nous|il|elle)\s+").expect("pronoun pattern"));

/// Text generator for acknowledgements and clarification prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtteranceBuilder {
    pub max_focus_chars: usize,
    pub min_focus_chars: usize,
    pub max_options: usize,
}

impl Default for UtteranceBuilder {
    fn default() -> Self {
        Self {
            max_focus_chars: DEFAULT_MAX_FOCUS_CHARS,
            min_focus_chars: DEFAULT_MIN_FOCUS_CHARS,
            max_options: DEFAULT_MAX_OPTIONS,
        }
    }
}

impl UtteranceBuilder {
    /// Acknowledge the message and restate its focus
    pub fn acknowledge_and_reformulate(&self, message: &str) -> TurnResult<String> {
        debug!("UtteranceBuilder::acknowledge_and_reformulate: called");
        if message.trim().is_empty() {
            return Err(TurnError::InvalidInput("message must be a non-blank string".to_string()));
        }

        let mut focus = clean_text(&extract_focus(message));
        if focus.is_empty() {
            debug!("UtteranceBuilder::acknowledge_and_reformulate: empty focus, using whole message");
            focus = clean_text(message);
        }
        if focus.is_empty() {
            focus = normalize_whitespace(message);
        }

        let focus = self.truncate(&focus);
        Ok(format!("{}{}{}{}", ACK_PREFIX, ACK_LEAD_IN, wrap_guillemets(&focus), ACK_SUFFIX))
    }

    /// Ask a clarification question, optionally listing choices
    pub fn ask_clarification(&self, question: &str, options: Option<&[String]>) -> TurnResult<String> {
        debug!("UtteranceBuilder::ask_clarification: called");
        let question = clean_text(question);
        if question.is_empty() {
            return Err(TurnError::InvalidInput("question must be a non-blank string".to_string()));
        }

        let choices: Vec<String> = options
            .unwrap_or_default()
            .iter()
            .map(|o| normalize_whitespace(o))
            .filter(|o| !o.is_empty())
            .take(self.max_options)
            .collect();

        if choices.is_empty() {
            debug!("UtteranceBuilder::ask_clarification: no usable options");
            return Ok(format!("{} ?", question));
        }
        Ok(format!("{} ? Options : {}.", question, choices.join(" | ")))
    }

    /// Cut at a word boundary past the protected prefix and mark the cut
    fn truncate(&self, focus: &str) -> String {
        let char_count = focus.chars().count();
        if char_count <= self.max_focus_chars {
            return focus.to_string();
        }

        let head: Vec<char> = focus.chars().take(self.max_focus_chars).collect();
        let cut = head
            .iter()
            .rposition(|c| c.is_whitespace())
            .filter(|pos| *pos >= self.min_focus_chars)
            .unwrap_or(head.len());

        let mut truncated: String = head[..cut].iter().collect();
        truncated.truncate(truncated.trim_end().len());
        truncated.push_str(ELLIPSIS);
        debug!(from = char_count, "UtteranceBuilder::truncate: truncated focus");
        truncated
    }
}

/// Acknowledge with default limits
pub fn acknowledge_and_reformulate(message: &str) -> TurnResult<String> {
    UtteranceBuilder::default().acknowledge_and_reformulate(message)
}

/// Clarification prompt with default limits
pub fn ask_clarification(question: &str, options: Option<&[String]>) -> TurnResult<String> {
    UtteranceBuilder::default().ask_clarification(question, options)
}

fn extract_focus(message: &str) -> String {
    for (pattern, rule) in FOCUS_RULES.iter() {
        match rule {
            FocusRule::ToEnd => {
                if let Some(m) = pattern.find(message) {
                    debug!("extract_focus: command verb rule matched");
                    return message[m.start()..].to_string();
                }
            }
            FocusRule::Captured => {
                let captured = pattern
                    .captures(message)
                    .and_then(|caps| caps.iter().skip(1).flatten().next().map(|m| m.as_str().to_string()));
                if let Some(text) = captured.filter(|t| !t.trim().is_empty()) {
                    debug!("extract_focus: quote rule matched");
                    return text;
                }
            }
        }
    }
    strip_preamble(message)
}

/// Strip greeting, then politeness prefixes, then a pronoun, until stable
fn strip_preamble(message: &str) -> String {
    let mut text = message.trim().to_string();
    loop {
        let before = text.clone();

        text = GREETING.replace(&text, "").trim_start().to_string();
        while POLITENESS.is_match(&text) {
            let stripped = POLITENESS.replace(&text, "").trim_start().to_string();
            if stripped == text {
                break;
            }
            text = stripped;
        }
        text = PRONOUN.replace(&text, "").trim_start().to_string();

        if text == before {
            return text;
        }
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-normalize and drop trailing punctuation
fn clean_text(text: &str) -> String {
    normalize_whitespace(text)
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '.' | '!' | '?' | ',' | ';' | ':' | '…'))
        .to_string()
}

fn wrap_guillemets(focus: &str) -> String {
    if focus.starts_with('«') && focus.ends_with('»') {
        focus.to_string()
    } else {
        format!("«{}»", focus)
    }
}
