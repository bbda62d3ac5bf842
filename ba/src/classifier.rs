//! Keyword-count intent classifier
//!
//! Deterministic heuristic: every intent owns a fixed keyword list, the score
//! of an intent is the number of its keywords contained in the utterance, and
//! confidence is the winning score over the hits of all intents combined.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{TurnError, TurnResult};
use crate::lexicon::{self, AMBIGUITY_CUES};

/// Intent categories, in tie-break order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    GenerateStories,
    ListItems,
    UpdateItem,
    DeleteItem,
    Prioritize,
    Smalltalk,
}

impl Intent {
    /// All intents in declaration order
    pub const ALL: [Intent; 6] = [
        Intent::GenerateStories,
        Intent::ListItems,
        Intent::UpdateItem,
        Intent::DeleteItem,
        Intent::Prioritize,
        Intent::Smalltalk,
    ];

    /// Intent used when no keyword matches at all
    pub const FALLBACK: Intent = Intent::Smalltalk;

    /// Wire name of the intent, also used as the executor action
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GenerateStories => "generate_stories",
            Self::ListItems => "list_items",
            Self::UpdateItem => "update_item",
            Self::DeleteItem => "delete_item",
            Self::Prioritize => "prioritize",
            Self::Smalltalk => "smalltalk",
        }
    }

    /// Lowercase keywords whose containment counts toward this intent
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::GenerateStories => &["génère", "génér", "crée", "ajoute", "user stor", "rédige"],
            Self::ListItems => &["list", "affiche", "montre", "quelles sont", "voir le backlog"],
            Self::UpdateItem => &["modifi", "à jour", "renomme", "change", "déplace", "édite"],
            Self::DeleteItem => &["supprim", "efface", "retire", "enlève", "archive"],
            Self::Prioritize => &["priorit", "ordonne", "classe", "urgent", "important"],
            Self::Smalltalk => &["bonjour", "salut", "merci", "ça va", "hello", "coucou", "bonsoir", "au revoir"],
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of classifying one utterance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub intent: Intent,
    /// Winning score over total hits, in [0, 1]
    pub confidence: f64,
    /// True when the utterance carries an ambiguity cue
    pub ambiguity: bool,
    /// Raw keyword hits per intent
    pub scores: BTreeMap<Intent, u32>,
}

/// Classify an utterance into an intent with a confidence score
pub fn classify(utterance: &str) -> TurnResult<Classification> {
    debug!(len = utterance.len(), "classify: called");
    if utterance.trim().is_empty() {
        return Err(TurnError::InvalidInput("utterance must be a non-blank string".to_string()));
    }

    let text = lexicon::normalize(utterance);
    let mut scores = BTreeMap::new();
    let mut best: Option<(Intent, u32)> = None;
    let mut total_hits = 0u32;

    for intent in Intent::ALL {
        let hits = lexicon::count_hits(&text, intent.keywords());
        scores.insert(intent, hits);
        total_hits += hits;
        // Strictly greater keeps the earlier intent on ties
        if hits > 0 && best.is_none_or(|(_, score)| hits > score) {
            best = Some((intent, hits));
        }
    }

    let (intent, confidence) = match best {
        Some((intent, score)) if total_hits > 0 => {
            debug!(%intent, score, total_hits, "classify: keyword match");
            (intent, f64::from(score) / f64::from(total_hits))
        }
        _ => {
            debug!("classify: no keyword hits, using fallback");
            (Intent::FALLBACK, 0.0)
        }
    };

    let ambiguity = AMBIGUITY_CUES.iter().any(|cue| text.contains(cue));

    Ok(Classification {
        intent,
        confidence,
        ambiguity,
        scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_blank_utterance_rejected() {
        assert!(matches!(classify("   "), Err(TurnError::InvalidInput(_))));
        assert!(matches!(classify(""), Err(TurnError::InvalidInput(_))));
    }

    #[test]
    fn test_zero_hits_falls_back_with_zero_confidence() {
        let result = classify("xyz 123").unwrap();
        assert_eq!(result.intent, Intent::FALLBACK);
        assert_eq!(result.confidence, 0.0);
        assert!(result.scores.values().all(|s| *s == 0));
    }

    #[test]
    fn test_single_intent_full_confidence() {
        let result = classify("Génère 5 user stories pour la feature Paiement").unwrap();
        assert_eq!(result.intent, Intent::GenerateStories);
        assert_eq!(result.scores[&Intent::GenerateStories], 2);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_confidence_uses_shared_denominator() {
        // generate: "génère" + "user stor" = 2, list: "affiche" = 1
        let result = classify("Génère des user stories et affiche-les").unwrap();
        assert_eq!(result.intent, Intent::GenerateStories);
        assert!((result.confidence - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_tie_goes_to_earlier_intent() {
        // one hit for list_items, one for delete_item
        let result = classify("affiche puis retire").unwrap();
        assert_eq!(result.intent, Intent::ListItems);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn test_case_insensitive_matching() {
        let result = classify("SUPPRIME la story 42").unwrap();
        assert_eq!(result.intent, Intent::DeleteItem);
    }

    #[test]
    fn test_ambiguity_independent_of_scoring() {
        let result = classify("peut-être quelque chose").unwrap();
        assert!(result.ambiguity);
        assert_eq!(result.confidence, 0.0);

        let result = classify("Génère peut-être des stories").unwrap();
        assert!(result.ambiguity);
        assert_eq!(result.intent, Intent::GenerateStories);
    }

    #[test]
    fn test_intent_wire_names() {
        assert_eq!(Intent::GenerateStories.to_string(), "generate_stories");
        assert_eq!(Intent::Smalltalk.as_str(), "smalltalk");
    }

    proptest! {
        #[test]
        fn prop_classify_is_pure(text in "\\PC{1,60}") {
            prop_assume!(!text.trim().is_empty());
            let first = classify(&text).unwrap();
            let second = classify(&text).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_confidence_bounded_and_consistent(text in "[a-zéèà ]{1,80}") {
            prop_assume!(!text.trim().is_empty());
            let result = classify(&text).unwrap();
            prop_assert!((0.0..=1.0).contains(&result.confidence));
            let total: u32 = result.scores.values().sum();
            if total == 0 {
                prop_assert_eq!(result.confidence, 0.0);
                prop_assert_eq!(result.intent, Intent::FALLBACK);
            } else {
                let best = result.scores[&result.intent];
                prop_assert!((result.confidence - f64::from(best) / f64::from(total)).abs() < 1e-12);
            }
        }
    }
}
