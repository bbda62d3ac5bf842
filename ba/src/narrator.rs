//! Narrator - recap of executed tool steps
//!
//! Steps arrive as loosely typed JSON records (`tool`, `result`, `meta`,
//! `duration`). Counts and durations are coerced from any numeric-like value;
//! anything unparseable is treated as absent.

use serde_json::Value;
use tracing::debug;

use crate::error::{TurnError, TurnResult};

pub const NOTHING_DONE: &str = "Aucune action n'a encore été effectuée.";
pub const SUGGESTION: &str = "Souhaitez-vous un détail ou une autre action ?";

/// Default number of per-step highlight lines
pub const DEFAULT_MAX_HIGHLIGHTS: usize = 5;

/// Durations at or above this many milliseconds render as seconds
const SECONDS_THRESHOLD_MS: f64 = 1000.0;

/// Created/updated/deleted counters of one or more steps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub created: i64,
    pub updated: i64,
    pub deleted: i64,
}

impl ChangeCounts {
    fn from_result(result: Option<&Value>) -> Self {
        let field = |name: &str| result.and_then(|r| r.get(name)).map(coerce_count).unwrap_or(0);
        Self {
            created: field("created"),
            updated: field("updated"),
            deleted: field("deleted"),
        }
    }

    fn add(&mut self, other: ChangeCounts) {
        self.created = self.created.saturating_add(other.created);
        self.updated = self.updated.saturating_add(other.updated);
        self.deleted = self.deleted.saturating_add(other.deleted);
    }

    /// Summary of the non-zero counters
    fn describe(&self) -> String {
        let parts: Vec<String> = [
            (self.created, "créé(s)"),
            (self.updated, "mis à jour"),
            (self.deleted, "supprimé(s)"),
        ]
        .iter()
        .filter(|(count, _)| *count != 0)
        .map(|(count, label)| format!("{} {}", count, label))
        .collect();

        if parts.is_empty() {
            "aucun changement".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Builds recap text from step records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Narrator {
    pub max_highlights: usize,
}

impl Default for Narrator {
    fn default() -> Self {
        Self {
            max_highlights: DEFAULT_MAX_HIGHLIGHTS,
        }
    }
}

impl Narrator {
    pub fn new(max_highlights: usize) -> Self {
        Self { max_highlights }
    }

    /// Narrate the given steps
    ///
    /// Fails with the position of the first element that is not a mapping.
    /// Totals cover every step, including those beyond the highlight cap.
    pub fn narrate(&self, steps: &[Value]) -> TurnResult<String> {
        debug!(count = steps.len(), "Narrator::narrate: called");
        if let Some(index) = steps.iter().position(|s| !s.is_object()) {
            return Err(TurnError::InvalidStep { index });
        }
        if steps.is_empty() {
            return Ok(NOTHING_DONE.to_string());
        }

        let mut lines = Vec::with_capacity(steps.len().min(self.max_highlights) + 3);
        lines.push(format!(
            "Récapitulatif ({} étape{}) :",
            steps.len(),
            if steps.len() > 1 { "s" } else { "" }
        ));

        let mut totals = ChangeCounts::default();
        for (index, step) in steps.iter().enumerate() {
            let counts = ChangeCounts::from_result(step.get("result"));
            totals.add(counts);
            if index < self.max_highlights {
                lines.push(highlight(step, counts));
            }
        }

        lines.push(format!(
            "Total : {} créé(s), {} mis à jour, {} supprimé(s).",
            totals.created, totals.updated, totals.deleted
        ));
        lines.push(SUGGESTION.to_string());
        Ok(lines.join("\n"))
    }
}

/// Narrate with the default highlight cap
pub fn narrate(steps: &[Value]) -> TurnResult<String> {
    Narrator::default().narrate(steps)
}

fn highlight(step: &Value, counts: ChangeCounts) -> String {
    let tool = step
        .get("tool")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("outil inconnu");

    let mut line = format!("- {}", tool);
    if let Some(scope) = scope(step.get("meta")) {
        line.push_str(&format!(" [{}]", scope));
    }
    line.push_str(&format!(" : {}", counts.describe()));
    if let Some(duration) = step.get("duration").and_then(format_duration) {
        line.push_str(&format!(" ({})", duration));
    }
    line
}

/// `key:value` pairs of the non-null meta entries
fn scope(meta: Option<&Value>) -> Option<String> {
    let pairs: Vec<String> = meta?
        .as_object()?
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| match v {
            Value::String(s) => format!("{}:{}", k, s),
            other => format!("{}:{}", k, other),
        })
        .collect();
    (!pairs.is_empty()).then(|| pairs.join(", "))
}

fn format_duration(value: &Value) -> Option<String> {
    let ms = numeric(value).filter(|d| *d > 0.0)?;
    if ms >= SECONDS_THRESHOLD_MS {
        Some(format!("{:.1} s", ms / 1000.0))
    } else if ms.fract() == 0.0 {
        Some(format!("{} ms", ms as i64))
    } else {
        Some(format!("{} ms", ms))
    }
}

fn numeric(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn coerce_count(value: &Value) -> i64 {
    numeric(value).map(|n| n.trunc() as i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(tool: &str, created: i64, updated: i64, deleted: i64) -> Value {
        json!({
            "tool": tool,
            "result": {"created": created, "updated": updated, "deleted": deleted},
            "meta": {},
            "duration": 120,
        })
    }

    #[test]
    fn test_empty_steps() {
        assert_eq!(narrate(&[]).unwrap(), NOTHING_DONE);
    }

    #[test]
    fn test_non_mapping_step_reports_position() {
        let steps = vec![step("a", 1, 0, 0), json!("oops"), json!(3)];
        match narrate(&steps) {
            Err(TurnError::InvalidStep { index }) => assert_eq!(index, 1),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_totals_cover_steps_beyond_cap() {
        let steps: Vec<Value> = (0..8).map(|i| step(&format!("tool{}", i), 1, 2, 0)).collect();
        let text = narrate(&steps).unwrap();

        let highlights = text.lines().filter(|l| l.starts_with("- ")).count();
        assert_eq!(highlights, DEFAULT_MAX_HIGHLIGHTS);
        assert!(text.starts_with("Récapitulatif (8 étapes) :"));
        assert!(text.contains("Total : 8 créé(s), 16 mis à jour, 0 supprimé(s)."));
        assert!(!text.contains("tool7"));
        assert!(text.ends_with(SUGGESTION));
    }

    #[test]
    fn test_highlight_line_layout() {
        let steps = vec![json!({
            "tool": "create_stories",
            "result": {"created": "5", "updated": 0, "deleted": null},
            "meta": {"feature": "Paiement", "sprint": 3, "owner": null},
            "duration": 2345,
        })];
        let text = narrate(&steps).unwrap();

        assert!(
            text.contains("- create_stories [feature:Paiement, sprint:3] : 5 créé(s) (2.3 s)"),
            "got: {}",
            text
        );
        assert!(text.starts_with("Récapitulatif (1 étape) :"));
    }

    #[test]
    fn test_duration_rendering() {
        assert_eq!(format_duration(&json!(999)), Some("999 ms".to_string()));
        assert_eq!(format_duration(&json!(12.5)), Some("12.5 ms".to_string()));
        assert_eq!(format_duration(&json!(1000)), Some("1.0 s".to_string()));
        assert_eq!(format_duration(&json!("1500")), Some("1.5 s".to_string()));
        assert_eq!(format_duration(&json!(0)), None);
        assert_eq!(format_duration(&json!(-4)), None);
        assert_eq!(format_duration(&json!("rapide")), None);
    }

    #[test]
    fn test_counts_coerced_from_numeric_like_values() {
        let counts = ChangeCounts::from_result(Some(&json!({"created": 2.9, "updated": " 3 ", "deleted": true})));
        assert_eq!(
            counts,
            ChangeCounts {
                created: 2,
                updated: 3,
                deleted: 0
            }
        );
    }

    #[test]
    fn test_totals_saturate_on_huge_counts() {
        let steps = vec![
            json!({"tool": "a", "result": {"created": 1e19}}),
            json!({"tool": "b", "result": {"created": "1e300", "deleted": -1e19}}),
            json!({"tool": "c", "result": {"deleted": -1e19}}),
        ];
        let text = narrate(&steps).unwrap();

        assert!(text.contains(&format!("Total : {} créé(s), 0 mis à jour, {} supprimé(s).", i64::MAX, i64::MIN)));
    }

    #[test]
    fn test_missing_fields_render_defaults() {
        let text = narrate(&[json!({})]).unwrap();
        assert!(text.contains("- outil inconnu : aucun changement"));
        assert!(text.contains("Total : 0 créé(s), 0 mis à jour, 0 supprimé(s)."));
    }
}
