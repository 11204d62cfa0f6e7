use thiserror::Error;

use crate::model::ids::TopicId;
use crate::model::progress::QuizScore;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("a question needs at least two options, got {found}")]
    TooFewOptions { found: usize },

    #[error("option {index} is empty")]
    EmptyOption { index: usize },

    #[error("answer index {index} is out of range for {options} options")]
    AnswerOutOfRange { index: usize, options: usize },

    #[error("a quiz needs at least one question")]
    NoQuestions,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    prompt: String,
    options: Vec<String>,
    answer_index: usize,
}

impl QuizQuestion {
    /// Creates a question, checking the prompt, options, and answer index.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` when the prompt is blank, fewer than two options
    /// are given, any option is blank, or the answer index does not point at
    /// an option.
    pub fn new(
        prompt: impl Into<String>,
        options: Vec<String>,
        answer_index: usize,
    ) -> Result<Self, QuizError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuizError::EmptyPrompt);
        }
        if options.len() < 2 {
            return Err(QuizError::TooFewOptions {
                found: options.len(),
            });
        }
        if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuizError::EmptyOption { index });
        }
        if answer_index >= options.len() {
            return Err(QuizError::AnswerOutOfRange {
                index: answer_index,
                options: options.len(),
            });
        }
        Ok(Self {
            prompt: prompt.trim().to_owned(),
            options,
            answer_index,
        })
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn answer_index(&self) -> usize {
        self.answer_index
    }

    /// Whether the given option index answers this question correctly.
    #[must_use]
    pub fn is_correct(&self, chosen: usize) -> bool {
        chosen == self.answer_index
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// A gradable set of questions attached to one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    topic: TopicId,
    questions: Vec<QuizQuestion>,
}

impl Quiz {
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` when the question list is empty.
    pub fn new(topic: TopicId, questions: Vec<QuizQuestion>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        Ok(Self { topic, questions })
    }

    #[must_use]
    pub fn topic(&self) -> &TopicId {
        &self.topic
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Grades a set of answers given as option indices, one per question.
    ///
    /// A missing answer counts as wrong, as does an index that points past
    /// the question's options. The score is the unrounded percentage of
    /// correct answers.
    #[must_use]
    pub fn grade(&self, answers: &[usize]) -> QuizScore {
        let correct = self
            .questions
            .iter()
            .enumerate()
            .filter(|(i, question)| {
                answers
                    .get(*i)
                    .is_some_and(|&chosen| question.is_correct(chosen))
            })
            .count();
        QuizScore::clamped(correct as f64 / self.questions.len() as f64 * 100.0)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn question(answer_index: usize) -> QuizQuestion {
        QuizQuestion::new(
            "Which option is right?",
            vec!["a".into(), "b".into(), "c".into()],
            answer_index,
        )
        .unwrap()
    }

    fn three_question_quiz() -> Quiz {
        Quiz::new(
            TopicId::new("forces-and-motion"),
            vec![question(0), question(1), question(2)],
        )
        .unwrap()
    }

    #[test]
    fn all_correct_answers_score_perfect() {
        let quiz = three_question_quiz();
        let score = quiz.grade(&[0, 1, 2]);
        assert!(score.is_perfect());
    }

    #[test]
    fn partial_answers_score_a_fraction() {
        let quiz = three_question_quiz();
        let score = quiz.grade(&[0, 1, 0]);
        assert!((score.value() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn missing_answers_count_as_wrong() {
        let quiz = three_question_quiz();
        let score = quiz.grade(&[0]);
        assert!((score.value() - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(quiz.grade(&[]).value(), 0.0);
    }

    #[test]
    fn out_of_range_answers_count_as_wrong() {
        let quiz = three_question_quiz();
        let score = quiz.grade(&[9, 9, 9]);
        assert_eq!(score.value(), 0.0);
    }

    #[test]
    fn extra_answers_are_ignored() {
        let quiz = three_question_quiz();
        let score = quiz.grade(&[0, 1, 2, 0, 0]);
        assert!(score.is_perfect());
    }

    #[test]
    fn question_rejects_blank_prompt() {
        let err = QuizQuestion::new("  ", vec!["a".into(), "b".into()], 0).unwrap_err();
        assert_eq!(err, QuizError::EmptyPrompt);
    }

    #[test]
    fn question_rejects_too_few_options() {
        let err = QuizQuestion::new("Q?", vec!["a".into()], 0).unwrap_err();
        assert_eq!(err, QuizError::TooFewOptions { found: 1 });
    }

    #[test]
    fn question_rejects_blank_option() {
        let err = QuizQuestion::new("Q?", vec!["a".into(), " ".into()], 0).unwrap_err();
        assert_eq!(err, QuizError::EmptyOption { index: 1 });
    }

    #[test]
    fn question_rejects_answer_out_of_range() {
        let err = QuizQuestion::new("Q?", vec!["a".into(), "b".into()], 2).unwrap_err();
        assert_eq!(
            err,
            QuizError::AnswerOutOfRange {
                index: 2,
                options: 2
            }
        );
    }

    #[test]
    fn quiz_needs_at_least_one_question() {
        let err = Quiz::new(TopicId::new("t"), Vec::new()).unwrap_err();
        assert_eq!(err, QuizError::NoQuestions);
    }
}
