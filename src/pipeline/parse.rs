//! Response parsing: recover a JSON array of questions from raw model text.
//!
//! Vision models are told to answer with a bare JSON array, but replies come
//! back fenced in ```` ```json ```` blocks, prefixed with prose ("Here are the
//! questions:"), or trailed by commentary. The recovery chain runs from
//! strictest to loosest and the first strategy that decodes wins:
//!
//! 1. strip code-fence delimiters, trim, decode the whole text
//! 2. decode the greedy `[ … ]` span (first `[` to last `]`)
//! 3. decode the first non-greedy `[{ … }]` array-of-objects span
//!
//! The order matters: a looser strategy tried first would accept spans the
//! stricter one rejects and change which malformed inputs recover.

use crate::question::Question;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Maximum characters of unparsed model output kept for diagnostics.
pub const EXCERPT_LEN: usize = 500;

static RE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json|JSON)?[ \t]*\r?\n?").unwrap());

static RE_GREEDY_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[\s\S]*\]").unwrap());

static RE_OBJECT_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\s*\{[\s\S]*?\}\s*\]").unwrap());

/// Parse raw model output into questions. Never fails; returns an empty
/// list when nothing could be recovered.
pub fn parse_questions(raw: &str) -> Vec<Question> {
    try_parse_questions(raw).unwrap_or_default()
}

/// Like [`parse_questions`] but distinguishes "decoded, possibly empty"
/// (`Some`) from "no strategy could decode the text" (`None`).
pub fn try_parse_questions(raw: &str) -> Option<Vec<Question>> {
    decode_with_fallbacks(raw).map(|value| coerce_questions(&value))
}

/// Turn a decoded JSON value into questions.
///
/// Non-array values yield an empty list; array elements that are not
/// question-shaped are skipped.
pub fn coerce_questions(value: &Value) -> Vec<Question> {
    let Some(items) = value.as_array() else {
        debug!("Decoded model output is not an array; treating as no questions");
        return Vec::new();
    };
    let questions: Vec<Question> = items.iter().filter_map(Question::from_value).collect();
    if questions.len() < items.len() {
        debug!(
            "Dropped {} malformed question entries",
            items.len() - questions.len()
        );
    }
    questions
}

/// First `max_chars` characters of `raw`, on a char boundary.
pub fn excerpt(raw: &str, max_chars: usize) -> String {
    raw.chars().take(max_chars).collect()
}

fn decode_with_fallbacks(raw: &str) -> Option<Value> {
    // Strategy 1: fenced or bare JSON.
    let cleaned = strip_fences(raw);
    if let Ok(v) = serde_json::from_str::<Value>(cleaned.trim()) {
        return Some(v);
    }

    // Strategy 2: greedy bracketed span.
    if let Some(m) = RE_GREEDY_ARRAY.find(raw) {
        match serde_json::from_str::<Value>(m.as_str()) {
            Ok(v) => return Some(v),
            Err(e) => debug!("Greedy array span did not decode: {}", e),
        }
    }

    // Strategy 3: first array-of-objects span.
    if let Some(m) = RE_OBJECT_ARRAY.find(raw) {
        match serde_json::from_str::<Value>(m.as_str()) {
            Ok(v) => return Some(v),
            Err(e) => debug!("Array-of-objects span did not decode: {}", e),
        }
    }

    None
}

fn strip_fences(raw: &str) -> String {
    RE_FENCE.replace_all(raw, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{McqQuestion, OpenQuestion};

    fn sample() -> Vec<Question> {
        vec![
            Question::Mcq(McqQuestion {
                question: "Which gas do plants absorb?".into(),
                choices: vec!["A) Oxygen".into(), "B) Carbon dioxide".into()],
                correct_answer: Some("B".into()),
                explanation: Some("Photosynthesis consumes CO2.".into()),
            }),
            Question::Other(OpenQuestion {
                question: "Describe the Calvin cycle.".into(),
                explanation: None,
            }),
        ]
    }

    #[test]
    fn fenced_mcq_scenario() {
        let raw = "```json\n[{\"type\":\"mcq\",\"question\":\"2+2=?\",\"choices\":[\"A) 3\",\"B) 4\"],\"correctAnswer\":\"B\",\"explanation\":null}]\n```";
        let qs = parse_questions(raw);
        assert_eq!(qs.len(), 1);
        match &qs[0] {
            Question::Mcq(m) => {
                assert_eq!(m.correct_answer.as_deref(), Some("B"));
                assert_eq!(m.choices.len(), 2);
            }
            other => panic!("expected MCQ, got {other:?}"),
        }
    }

    #[test]
    fn fenced_array_round_trips() {
        let original = sample();
        let body = serde_json::to_string_pretty(&original).unwrap();
        for raw in [
            format!("```json\n{body}\n```"),
            format!("```\n{body}\n```"),
            body.clone(),
        ] {
            assert_eq!(parse_questions(&raw), original, "input: {raw}");
        }
    }

    #[test]
    fn fenced_array_keeps_untrimmed_and_empty_strings() {
        let body = r#"[{"type":"other","question":"  What is   x? ","explanation":""},{"type":"mcq","question":"Pick","choices":[" A) 1","B) 2 "],"correctAnswer":" B ","explanation":"  "}]"#;
        let expected = vec![
            Question::Other(OpenQuestion {
                question: "  What is   x? ".into(),
                explanation: Some(String::new()),
            }),
            Question::Mcq(McqQuestion {
                question: "Pick".into(),
                choices: vec![" A) 1".into(), "B) 2 ".into()],
                correct_answer: Some(" B ".into()),
                explanation: Some("  ".into()),
            }),
        ];
        let parsed = parse_questions(&format!("```json\n{body}\n```"));
        assert_eq!(parsed, expected);
        assert_eq!(
            serde_json::to_value(&parsed).unwrap(),
            serde_json::from_str::<Value>(body).unwrap()
        );
    }

    #[test]
    fn garbage_yields_empty() {
        for raw in ["", "I could not find any questions.", "[[[", "{]", "```json\n```"] {
            assert!(parse_questions(raw).is_empty(), "input: {raw:?}");
        }
        assert!(try_parse_questions("no json here").is_none());
    }

    #[test]
    fn recovers_array_embedded_in_prose() {
        let original = sample();
        let raw = format!(
            "Sure! Here are the questions I found on the page:\n{}\nLet me know if you need more.",
            serde_json::to_string(&original).unwrap()
        );
        assert_eq!(parse_questions(&raw), original);
    }

    #[test]
    fn object_array_fallback_when_greedy_span_is_invalid() {
        // The greedy span runs to the last `]` of "[sic]" and fails to decode.
        let raw = r#"Result: [{"type":"other","question":"Define pH.","explanation":null}] (see page [sic])"#;
        let qs = parse_questions(raw);
        assert_eq!(qs.len(), 1);
        assert_eq!(qs[0].text(), "Define pH.");
    }

    #[test]
    fn non_array_json_is_treated_as_empty() {
        let raw = r#"{"questions": [{"type":"other","question":"Q"}]}"#;
        assert_eq!(try_parse_questions(raw), Some(Vec::new()));
    }

    #[test]
    fn empty_array_is_a_successful_decode() {
        assert_eq!(try_parse_questions("[]"), Some(Vec::new()));
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let raw = r#"[{"type":"other","question":"Kept"}, {"type":"mcq"}, 3]"#;
        let qs = parse_questions(raw);
        assert_eq!(qs.len(), 1);
        assert_eq!(qs[0].text(), "Kept");
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("héllo wörld", 4), "héll");
        assert_eq!(excerpt("ab", 10), "ab");
    }
}
