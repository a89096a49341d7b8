//! # Question Engine
//!
//! Resolves question ids against the catalog and owns the live attempt
//! counter for the question in play. The Progress Store reads attempts
//! through this engine rather than keeping a second copy.

use crate::{config, ContentCatalog, Question};
use std::sync::Arc;

/// Remaining attempts for the active question, bounded by a maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptCounter {
    remaining: u32,
    max: u32,
}

impl Default for AttemptCounter {
    fn default() -> Self {
        Self::new(config::DEFAULT_MAX_ATTEMPTS)
    }
}

impl AttemptCounter {
    /// Creates a full counter.
    ///
    /// # Examples
    ///
    /// ```
    /// use treasure_quest::AttemptCounter;
    ///
    /// let mut attempts = AttemptCounter::new(1);
    /// assert_eq!(attempts.decrement(), 0);
    /// assert_eq!(attempts.decrement(), 0);
    /// assert!(attempts.is_exhausted());
    /// ```
    pub fn new(max: u32) -> Self {
        Self {
            remaining: max,
            max,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Whether no attempt has been spent since the last reset.
    pub fn is_full(&self) -> bool {
        self.remaining == self.max
    }

    /// Refills to the maximum.
    pub fn reset(&mut self) {
        self.remaining = self.max;
    }

    /// Changes the maximum and refills.
    pub fn set_max(&mut self, max: u32) {
        self.max = max;
        self.remaining = max;
    }

    /// Spends one attempt, never going below zero. Returns what is left.
    pub fn decrement(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }
}

/// Result of submitting an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    /// Attempts left after this submission
    pub attempts: u32,
    /// True only on the wrong answer that exhausts the attempts
    pub should_show_solution: bool,
    /// Present exactly when `should_show_solution` is true
    pub solution: Option<String>,
    /// Correct without any earlier miss on this question
    pub first_try: bool,
}

/// Tracks the active question and its attempts.
#[derive(Debug, Clone)]
pub struct QuestionEngine {
    catalog: Arc<ContentCatalog>,
    current: Option<String>,
    attempts: AttemptCounter,
}

impl QuestionEngine {
    /// Creates an engine with the default attempt allowance.
    pub fn new(catalog: Arc<ContentCatalog>) -> Self {
        Self {
            catalog,
            current: None,
            attempts: AttemptCounter::default(),
        }
    }

    /// The catalog questions are resolved against.
    pub fn catalog(&self) -> &Arc<ContentCatalog> {
        &self.catalog
    }

    /// Makes `question_id` the active question and refills attempts.
    ///
    /// Returns `None` for an unknown id, leaving the engine untouched.
    pub fn set_current_question(&mut self, question_id: &str) -> Option<&Question> {
        if self.catalog.question(question_id).is_none() {
            log::warn!("Question '{}' not found in catalog", question_id);
            return None;
        }

        self.current = Some(question_id.to_string());
        self.attempts.reset();
        log::debug!(
            "Active question set to '{}' with {} attempts",
            question_id,
            self.attempts.remaining()
        );
        self.catalog.question(question_id)
    }

    /// The active question, if any.
    pub fn current_question(&self) -> Option<&Question> {
        self.current
            .as_deref()
            .and_then(|id| self.catalog.question(id))
    }

    /// Id of the active question, if any.
    pub fn current_question_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Checks an answer against the active question.
    ///
    /// Without an active question the answer is reported incorrect and no
    /// counter changes.
    pub fn submit_answer(&mut self, selected_index: usize) -> AnswerOutcome {
        let Some(question) = self
            .current
            .as_deref()
            .and_then(|id| self.catalog.question(id))
        else {
            return AnswerOutcome {
                correct: false,
                attempts: self.attempts.remaining(),
                should_show_solution: false,
                solution: None,
                first_try: false,
            };
        };

        if question.is_correct(selected_index) {
            return AnswerOutcome {
                correct: true,
                attempts: self.attempts.remaining(),
                should_show_solution: false,
                solution: None,
                first_try: self.attempts.is_full(),
            };
        }

        let was_exhausted = self.attempts.is_exhausted();
        let remaining = self.attempts.decrement();
        let should_show_solution = !was_exhausted && remaining == 0;

        AnswerOutcome {
            correct: false,
            attempts: remaining,
            should_show_solution,
            solution: should_show_solution.then(|| question.solution.clone()),
            first_try: false,
        }
    }

    /// Attempts left on the active question.
    pub fn remaining_attempts(&self) -> u32 {
        self.attempts.remaining()
    }

    /// Attempt allowance per question.
    pub fn max_attempts(&self) -> u32 {
        self.attempts.max()
    }

    /// Refills attempts.
    pub fn reset_attempts(&mut self) {
        self.attempts.reset();
    }

    /// Changes the allowance and refills.
    pub fn set_max_attempts(&mut self, max: u32) {
        self.attempts.set_max(max);
    }

    /// Spends one attempt outside of answer checking.
    pub fn decrement_attempts(&mut self) -> u32 {
        self.attempts.decrement()
    }

    /// Drops the active question and refills attempts.
    pub fn clear_current_question(&mut self) {
        self.current = None;
        self.attempts.reset();
    }

    /// Drops the active question without touching attempts.
    pub(crate) fn release_current_question(&mut self) {
        self.current = None;
    }

    /// Clue text for the active question.
    pub fn hint_for_current_question(&self) -> Option<&str> {
        self.current_question()?.next_clue.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> QuestionEngine {
        let catalog = ContentCatalog::builtin().expect("built-in content should be valid");
        QuestionEngine::new(Arc::new(catalog))
    }

    #[test]
    fn test_unknown_question_is_not_found() {
        let mut engine = engine();
        assert!(engine.set_current_question("does_not_exist").is_none());
        assert!(engine.current_question().is_none());
    }

    #[test]
    fn test_unknown_question_keeps_previous() {
        let mut engine = engine();
        engine.set_current_question("math_addition_1").unwrap();
        assert!(engine.set_current_question("does_not_exist").is_none());
        assert_eq!(engine.current_question_id(), Some("math_addition_1"));
    }

    #[test]
    fn test_submit_without_question() {
        let mut engine = engine();
        let outcome = engine.submit_answer(0);
        assert!(!outcome.correct);
        assert!(!outcome.should_show_solution);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(engine.remaining_attempts(), 3);
    }

    #[test]
    fn test_correct_answer_keeps_attempts() {
        let mut engine = engine();
        engine.set_current_question("math_addition_1").unwrap();

        let outcome = engine.submit_answer(1);
        assert!(outcome.correct);
        assert!(outcome.first_try);
        assert!(!outcome.should_show_solution);
        assert_eq!(outcome.attempts, 3);
    }

    #[test]
    fn test_solution_revealed_exactly_on_exhaustion() {
        let mut engine = engine();
        engine.set_current_question("math_addition_1").unwrap();

        let first = engine.submit_answer(0);
        assert_eq!(first.attempts, 2);
        assert!(!first.should_show_solution);

        let second = engine.submit_answer(0);
        assert_eq!(second.attempts, 1);
        assert!(second.solution.is_none());

        let third = engine.submit_answer(0);
        assert_eq!(third.attempts, 0);
        assert!(third.should_show_solution);
        assert!(third.solution.unwrap().contains("23"));

        let fourth = engine.submit_answer(0);
        assert_eq!(fourth.attempts, 0);
        assert!(!fourth.should_show_solution);
    }

    #[test]
    fn test_late_correct_answer_is_not_first_try() {
        let mut engine = engine();
        engine.set_current_question("math_addition_1").unwrap();
        engine.submit_answer(3);
        let outcome = engine.submit_answer(1);
        assert!(outcome.correct);
        assert!(!outcome.first_try);
        assert_eq!(outcome.attempts, 2);
    }

    #[test]
    fn test_set_max_attempts_changes_allowance() {
        let mut engine = engine();
        engine.set_max_attempts(1);
        engine.set_current_question("math_addition_1").unwrap();
        assert_eq!(engine.remaining_attempts(), 1);

        let outcome = engine.submit_answer(0);
        assert!(outcome.should_show_solution);
    }

    #[test]
    fn test_clear_and_hint() {
        let mut engine = engine();
        engine.set_current_question("math_division_1").unwrap();
        assert_eq!(
            engine.hint_for_current_question(),
            Some("Where three paths meet, treasures you shall greet!")
        );

        engine.submit_answer(0);
        engine.clear_current_question();
        assert!(engine.hint_for_current_question().is_none());
        assert_eq!(engine.remaining_attempts(), 3);
    }
}
