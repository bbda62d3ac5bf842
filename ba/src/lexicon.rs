//! Fixed keyword tables and matchers
//!
//! All tables are lowercase. Intent and policy checks use plain substring
//! containment; yes/no reply checks use whole-word matching so that short
//! words like "non" or "ok" do not fire inside longer words.

use tracing::debug;

/// Cues that make a request ambiguous regardless of its intent score
pub const AMBIGUITY_CUES: &[&str] = &[
    "peut-être",
    "peut etre",
    "je ne sais pas",
    "je sais pas",
    "pas sûr",
    "pas sur",
    "quelque chose",
    "un truc",
    "n'importe",
    "ou bien",
    "éventuellement",
];

/// Words announcing a destructive or risky action
pub const CONFIRMATION_KEYWORDS: &[&str] = &[
    "supprime",
    "supprimer",
    "suppression",
    "efface",
    "effacer",
    "écrase",
    "écraser",
    "réinitialise",
    "purge",
    "vide le backlog",
    "définitivement",
];

/// Words asking for a progress recap
pub const RECAP_KEYWORDS: &[&str] = &[
    "récap",
    "recap",
    "résumé",
    "bilan",
    "où en est",
    "où en sommes",
    "qu'as-tu fait",
    "avancement",
];

/// Replies accepting a staged action
pub const AFFIRMATIVE_KEYWORDS: &[&str] = &[
    "oui",
    "ouais",
    "ok",
    "okay",
    "d'accord",
    "vas-y",
    "confirme",
    "je confirme",
    "valide",
    "go",
    "yes",
];

/// Replies rejecting a staged action
pub const NEGATIVE_KEYWORDS: &[&str] = &[
    "non",
    "nan",
    "annule",
    "annuler",
    "stop",
    "abandonne",
    "laisse tomber",
    "pas maintenant",
    "no",
];

/// Lowercase and trim text for keyword comparisons
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Count how many keywords of `keywords` occur in already-lowercased `text`
pub fn count_hits(text: &str, keywords: &[&str]) -> u32 {
    keywords.iter().filter(|kw| text.contains(*kw)).count() as u32
}

/// Case-insensitive substring containment of any keyword
pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    keywords.iter().any(|kw| lowered.contains(kw))
}

/// Case-insensitive whole-word containment of any keyword
///
/// A keyword matches when it is bounded on both sides by the start/end of
/// the text or by a character that is neither alphanumeric nor an apostrophe.
pub fn contains_word(text: &str, keywords: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    let found = keywords.iter().any(|kw| has_bounded_match(&lowered, kw));
    debug!(found, "contains_word: checked");
    found
}

fn has_bounded_match(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, matched)| {
        let end = start + matched.len();
        let before_ok = haystack[..start].chars().next_back().is_none_or(is_word_boundary);
        let after_ok = haystack[end..].chars().next().is_none_or(is_word_boundary);
        before_ok && after_ok
    })
}

fn is_word_boundary(c: char) -> bool {
    !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}')
}

/// True when the reply reads as a yes
pub fn is_affirmative(reply: &str) -> bool {
    contains_word(reply, AFFIRMATIVE_KEYWORDS)
}

/// True when the reply reads as a no
pub fn is_negative(reply: &str) -> bool {
    contains_word(reply, NEGATIVE_KEYWORDS)
}
