//! Question records extracted from a page.
//!
//! The wire shape is the one the model is prompted to produce and the one the
//! extraction endpoint returns:
//!
//! ```json
//! {"type":"mcq","question":"2+2=?","choices":["A) 3","B) 4"],"correctAnswer":"B","explanation":null}
//! {"type":"other","question":"Define entropy.","explanation":null}
//! ```
//!
//! Model output is loose, so [`Question::from_value`] coerces arbitrary JSON
//! into a question instead of deserialising strictly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single extracted question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Question {
    /// Multiple choice with labelled options.
    Mcq(McqQuestion),
    /// Anything else: open-ended, short answer, essay.
    Other(OpenQuestion),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McqQuestion {
    pub question: String,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenQuestion {
    pub question: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl Question {
    /// Question text.
    pub fn text(&self) -> &str {
        match self {
            Question::Mcq(q) => &q.question,
            Question::Other(q) => &q.question,
        }
    }

    pub fn explanation(&self) -> Option<&str> {
        match self {
            Question::Mcq(q) => q.explanation.as_deref(),
            Question::Other(q) => q.explanation.as_deref(),
        }
    }

    pub fn is_mcq(&self) -> bool {
        matches!(self, Question::Mcq(_))
    }

    /// Coerce one element of a decoded model reply into a question.
    ///
    /// Returns `None` when the element has no string `question` field.
    /// `"type": "mcq"` (any case) or a missing type with a non-empty
    /// `choices` array becomes an MCQ; every other shape becomes
    /// [`Question::Other`]. Non-string choices are dropped and non-string
    /// `correctAnswer`/`explanation` values become `None`. Strings are kept
    /// verbatim, whitespace and empty values included.
    pub fn from_value(value: &Value) -> Option<Question> {
        let obj = value.as_object()?;
        let question = obj.get("question")?.as_str()?.to_string();
        let explanation = string_field(obj.get("explanation"));

        let choices: Vec<String> = obj
            .get("choices")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let is_mcq = match obj.get("type").and_then(Value::as_str) {
            Some(t) => t.eq_ignore_ascii_case("mcq"),
            None => !choices.is_empty(),
        };

        if is_mcq {
            Some(Question::Mcq(McqQuestion {
                question,
                choices,
                correct_answer: string_field(obj.get("correctAnswer")),
                explanation,
            }))
        } else {
            Some(Question::Other(OpenQuestion {
                question,
                explanation,
            }))
        }
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

impl McqQuestion {
    /// Index of the first choice carrying the `correctAnswer` label.
    pub fn correct_choice_index(&self) -> Option<usize> {
        let label = self.correct_answer.as_deref()?;
        self.choices
            .iter()
            .position(|c| choice_matches_label(c, label))
    }

    /// `true` when `correctAnswer` is set and matches exactly one choice.
    pub fn has_consistent_answer(&self) -> bool {
        match self.correct_answer.as_deref() {
            Some(label) => {
                self.choices
                    .iter()
                    .filter(|c| choice_matches_label(c, label))
                    .count()
                    == 1
            }
            None => false,
        }
    }
}

/// Does `choice` (e.g. `"B) 4"`) carry the answer `label` (e.g. `"B"`)?
///
/// Accepted forms: `B)`, `B.`, a leading `B`, or the trimmed choice starting
/// with the trimmed label (models sometimes answer with the full option).
pub fn choice_matches_label(choice: &str, label: &str) -> bool {
    let label = label.trim();
    if label.is_empty() {
        return false;
    }
    let choice = choice.trim_start();
    choice.starts_with(&format!("{label})"))
        || choice.starts_with(&format!("{label}."))
        || (label.chars().count() == 1 && choice.chars().next() == label.chars().next())
        || choice.trim().starts_with(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialises_mcq_with_type_tag_and_nulls() {
        let q = Question::Mcq(McqQuestion {
            question: "2+2=?".into(),
            choices: vec!["A) 3".into(), "B) 4".into()],
            correct_answer: Some("B".into()),
            explanation: None,
        });
        let v = serde_json::to_value(&q).unwrap();
        assert_eq!(
            v,
            json!({"type":"mcq","question":"2+2=?","choices":["A) 3","B) 4"],"correctAnswer":"B","explanation":null})
        );
    }

    #[test]
    fn from_value_defaults_to_other() {
        let q = Question::from_value(&json!({"question": "Explain osmosis."})).unwrap();
        assert_eq!(
            q,
            Question::Other(OpenQuestion {
                question: "Explain osmosis.".into(),
                explanation: None
            })
        );
    }

    #[test]
    fn from_value_infers_mcq_from_choices() {
        let q = Question::from_value(&json!({
            "question": "Pick one",
            "choices": ["A) x", 7, "B) y"],
            "correctAnswer": 2
        }))
        .unwrap();
        match q {
            Question::Mcq(m) => {
                assert_eq!(m.choices, vec!["A) x", "B) y"]);
                assert_eq!(m.correct_answer, None);
            }
            other => panic!("expected MCQ, got {other:?}"),
        }
    }

    #[test]
    fn from_value_keeps_strings_verbatim() {
        let q = Question::from_value(&json!({
            "type": "mcq",
            "question": "  What is   x? ",
            "choices": ["A) 1", "B) 2"],
            "correctAnswer": " B ",
            "explanation": ""
        }))
        .unwrap();
        assert_eq!(
            q,
            Question::Mcq(McqQuestion {
                question: "  What is   x? ".into(),
                choices: vec!["A) 1".into(), "B) 2".into()],
                correct_answer: Some(" B ".into()),
                explanation: Some(String::new()),
            })
        );
    }

    #[test]
    fn from_value_rejects_entries_without_question() {
        assert!(Question::from_value(&json!({"type": "mcq"})).is_none());
        assert!(Question::from_value(&json!("just a string")).is_none());
        assert!(Question::from_value(&json!({"question": 42})).is_none());
    }

    #[test]
    fn unknown_type_becomes_other() {
        let q = Question::from_value(&json!({"type": "short_answer", "question": "Why?"})).unwrap();
        assert!(!q.is_mcq());
    }

    #[test]
    fn label_matching_forms() {
        assert!(choice_matches_label("B) 4", "B"));
        assert!(choice_matches_label("B. 4", "B"));
        assert!(choice_matches_label("  B 4", "B"));
        assert!(choice_matches_label("B) 4", "B) 4"));
        assert!(!choice_matches_label("A) 3", "B"));
        assert!(!choice_matches_label("A) 3", ""));
    }

    #[test]
    fn consistent_answer_requires_exactly_one_match() {
        let mut m = McqQuestion {
            question: "q".into(),
            choices: vec!["A) 3".into(), "B) 4".into()],
            correct_answer: Some("B".into()),
            explanation: None,
        };
        assert!(m.has_consistent_answer());
        assert_eq!(m.correct_choice_index(), Some(1));

        m.correct_answer = Some("E".into());
        assert!(!m.has_consistent_answer());
        assert_eq!(m.correct_choice_index(), None);
    }
}
