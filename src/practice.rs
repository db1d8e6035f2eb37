//! Practice mode: grade picked choices against MCQ answer labels.

use crate::question::{choice_matches_label, McqQuestion, Question};
use serde::Serialize;

/// Outcome of answering one MCQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Correct,
    Incorrect,
    /// The question carries no usable answer key.
    Ungraded,
}

/// Grade picking `choice_index` of `question`.
pub fn grade(question: &McqQuestion, choice_index: usize) -> Grade {
    let (Some(label), Some(choice)) = (
        question.correct_answer.as_deref().filter(|l| !l.trim().is_empty()),
        question.choices.get(choice_index),
    ) else {
        return Grade::Ungraded;
    };
    if choice_matches_label(choice, label) {
        Grade::Correct
    } else {
        Grade::Incorrect
    }
}

/// Running score of a practice session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PracticeTally {
    pub correct: usize,
    pub incorrect: usize,
    pub ungraded: usize,
}

impl PracticeTally {
    pub fn record(&mut self, grade: Grade) {
        match grade {
            Grade::Correct => self.correct += 1,
            Grade::Incorrect => self.incorrect += 1,
            Grade::Ungraded => self.ungraded += 1,
        }
    }

    pub fn answered(&self) -> usize {
        self.correct + self.incorrect
    }

    /// Percentage of graded answers that were correct; 0 before any.
    pub fn score_pct(&self) -> f64 {
        match self.answered() {
            0 => 0.0,
            n => self.correct as f64 / n as f64 * 100.0,
        }
    }
}

/// MCQs only, in order; open questions cannot be practised by picking.
pub fn mcqs<'a>(questions: impl IntoIterator<Item = &'a Question>) -> Vec<&'a McqQuestion> {
    questions
        .into_iter()
        .filter_map(|q| match q {
            Question::Mcq(m) => Some(m),
            Question::Other(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::OpenQuestion;

    fn mcq(answer: Option<&str>) -> McqQuestion {
        McqQuestion {
            question: "Capital of France?".into(),
            choices: vec!["A) Berlin".into(), "B. Paris".into(), "C) Rome".into()],
            correct_answer: answer.map(str::to_string),
            explanation: None,
        }
    }

    #[test]
    fn grades_by_label() {
        let q = mcq(Some("B"));
        assert_eq!(grade(&q, 1), Grade::Correct);
        assert_eq!(grade(&q, 0), Grade::Incorrect);
        assert_eq!(grade(&q, 9), Grade::Ungraded);
        assert_eq!(grade(&mcq(None), 1), Grade::Ungraded);
        assert_eq!(grade(&mcq(Some("  ")), 1), Grade::Ungraded);
        assert_eq!(grade(&mcq(Some(" B ")), 1), Grade::Correct);
    }

    #[test]
    fn tally_scores_graded_answers_only() {
        let mut t = PracticeTally::default();
        assert_eq!(t.score_pct(), 0.0);
        for g in [Grade::Correct, Grade::Incorrect, Grade::Correct, Grade::Ungraded, Grade::Correct] {
            t.record(g);
        }
        assert_eq!(t.answered(), 4);
        assert_eq!(t.score_pct(), 75.0);
    }

    #[test]
    fn mcqs_skips_open_questions() {
        let qs = vec![
            Question::Other(OpenQuestion {
                question: "Why?".into(),
                explanation: None,
            }),
            Question::Mcq(mcq(Some("A"))),
        ];
        assert_eq!(mcqs(&qs).len(), 1);
    }
}
