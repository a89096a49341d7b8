//! # Game Session
//!
//! Presentation-facing control flow over one [`ProgressStore`] and one
//! [`HintEngine`]. A front end opens a treasure, submits answers, asks for
//! hints and advances levels; the session turns each of those into store
//! mutations and hint dispatches.

use crate::{
    config, AnswerOutcome, HintEngine, HintHandle, Level, ProgressStore, QuestError, QuestResult,
    Question, SessionStatus, TreasureLocation,
};
use std::collections::HashSet;

/// What an answer submission did.
#[derive(Debug, Clone)]
pub struct AnswerReport {
    pub outcome: AnswerOutcome,
    /// Score actually added after the difficulty multiplier
    pub points_awarded: u64,
    /// Achievements unlocked by this answer
    pub unlocked: Vec<String>,
    /// Hint dispatched after a wrong answer
    pub hint: Option<HintHandle>,
    /// Every treasure in the level has been collected
    pub level_cleared: bool,
}

/// Result of trying to leave the current level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelAdvance {
    Advanced { level_index: usize, perfect: bool },
    /// The next level's unlock requirements are not met yet
    Locked { level_id: String },
    /// There was no next level; the game is now completed
    GameCompleted { perfect: bool },
}

/// One play session.
#[derive(Debug)]
pub struct GameSession {
    store: ProgressStore,
    hints: HintEngine,
    collected: HashSet<String>,
    active_treasure: Option<String>,
    rewarded_levels: HashSet<String>,
}

impl GameSession {
    /// Wraps a store and applies its saved difficulty to the session limits.
    ///
    /// Needs a tokio runtime for hint expiry.
    pub fn new(mut store: ProgressStore) -> QuestResult<Self> {
        let hints = HintEngine::new()?;
        let difficulty = store.state().settings.difficulty;
        store.set_difficulty(difficulty);

        Ok(Self {
            store,
            hints,
            collected: HashSet::new(),
            active_treasure: None,
            rewarded_levels: HashSet::new(),
        })
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ProgressStore {
        &mut self.store
    }

    pub fn hints(&self) -> &HintEngine {
        &self.hints
    }

    /// Mutable access for registering hint listeners.
    pub fn hints_mut(&mut self) -> &mut HintEngine {
        &mut self.hints
    }

    /// The level being played.
    pub fn current_level(&self) -> Option<&Level> {
        self.store.catalog().level(self.store.state().level_index)
    }

    /// Id of the treasure whose question is open.
    pub fn active_treasure(&self) -> Option<&str> {
        self.active_treasure.as_deref()
    }

    pub fn is_collected(&self, treasure_id: &str) -> bool {
        self.collected.contains(treasure_id)
    }

    /// Treasures in the current level not yet collected.
    pub fn remaining_treasures(&self) -> Vec<&TreasureLocation> {
        self.current_level()
            .map(|level| {
                level
                    .treasures
                    .iter()
                    .filter(|t| !self.collected.contains(&t.id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether every treasure in the current level is collected.
    pub fn is_level_cleared(&self) -> bool {
        self.current_level()
            .is_some_and(|level| level.treasures.iter().all(|t| self.collected.contains(&t.id)))
    }

    pub fn start(&mut self) {
        self.store.start_game();
    }

    /// Opens a treasure in the current level and makes its question active.
    pub fn open_treasure(&mut self, treasure_id: &str) -> QuestResult<&Question> {
        if self.store.status() != SessionStatus::Running {
            return Err(QuestError::InvalidState(format!(
                "cannot open treasures while {:?}",
                self.store.status()
            )));
        }
        if self.collected.contains(treasure_id) {
            return Err(QuestError::InvalidState(format!(
                "treasure '{}' already collected",
                treasure_id
            )));
        }

        let level_index = self.store.state().level_index;
        let question_id = self
            .store
            .catalog()
            .treasure(level_index, treasure_id)
            .map(|t| t.question_id.clone())
            .ok_or_else(|| QuestError::UnknownTreasure(treasure_id.to_string()))?;

        log::debug!("Opening treasure '{}'", treasure_id);
        self.active_treasure = Some(treasure_id.to_string());
        self.store
            .set_current_question(Some(&question_id))
            .ok_or_else(|| QuestError::InvalidState(format!("question '{}' vanished", question_id)))
    }

    /// Submits an answer to the open treasure's question.
    pub fn answer(&mut self, selected_index: usize) -> QuestResult<AnswerReport> {
        let question = self
            .store
            .current_question()
            .cloned()
            .ok_or_else(|| QuestError::InvalidState("no question is open".to_string()))?;
        let treasure = self.active_treasure_location()?;

        let outcome = self.store.submit_answer(selected_index);
        let mut report = AnswerReport {
            outcome,
            points_awarded: 0,
            unlocked: Vec::new(),
            hint: None,
            level_cleared: false,
        };

        if report.outcome.correct {
            let mut points = question.points as u64;
            if report.outcome.first_try {
                points += question.bonus_points as u64;
            }
            report.points_awarded = self.store.add_score(points);
            self.store.add_coins(config::COINS_PER_TREASURE);
            self.store.add_experience(question.points as u64);
            self.store.record_treasure_found();

            self.collected.insert(treasure.id.clone());
            self.close_treasure();
            self.hints.clear_all_hints();
            report.unlocked = self.store.evaluate_achievements();
            report.level_cleared = self.is_level_cleared();
            log::info!(
                "Collected '{}' for {} points",
                treasure.id,
                report.points_awarded
            );
        } else {
            if self.store.state().settings.show_hints {
                report.hint = self.hints.process_hint_from_question(
                    question.hint_type,
                    Some(treasure.position),
                    question.next_clue.as_deref(),
                );
                if report.hint.is_some() {
                    self.store.increment_hints();
                }
            }
            if report.outcome.should_show_solution {
                log::debug!("Out of attempts on '{}'", question.id);
                self.close_treasure();
            }
        }

        Ok(report)
    }

    /// Dispatches the open question's hint on request.
    ///
    /// Returns `None` when hints are switched off or the question has none.
    pub fn request_hint(&mut self) -> QuestResult<Option<HintHandle>> {
        let question = self
            .store
            .current_question()
            .cloned()
            .ok_or_else(|| QuestError::InvalidState("no question is open".to_string()))?;
        if !self.store.state().settings.show_hints {
            return Ok(None);
        }
        let treasure = self.active_treasure_location()?;

        let handle = self.hints.process_hint_from_question(
            question.hint_type,
            Some(treasure.position),
            question.next_clue.as_deref(),
        );
        if handle.is_some() {
            self.store.increment_hints();
        }
        Ok(handle)
    }

    /// Advances the clock while running. Returns the seconds left.
    pub fn tick(&mut self, seconds: u32) -> u32 {
        if self.store.status() == SessionStatus::Running {
            self.store.increment_play_time(seconds as u64);
            let left = self.store.state().time_remaining.saturating_sub(seconds);
            self.store.set_time_remaining(left);
        }
        self.store.state().time_remaining
    }

    /// Leaves a cleared level, granting its rewards once.
    ///
    /// Moves to the next level when it exists and is unlocked, and completes
    /// the game when there is none.
    pub fn advance_level(&mut self) -> QuestResult<LevelAdvance> {
        let level_index = self.store.state().level_index;
        let catalog = self.store.catalog().clone();
        let level = catalog
            .level(level_index)
            .ok_or(QuestError::UnknownLevel(level_index))?;
        if !self.is_level_cleared() {
            return Err(QuestError::InvalidState(format!(
                "level '{}' still has treasures to collect",
                level.id
            )));
        }

        let mut perfect = false;
        if self.rewarded_levels.insert(level.id.clone()) {
            perfect = self
                .store
                .record_level_completion(level.questions.len() as u32);
            if let Some(rewards) = &level.rewards {
                self.store.add_coins(rewards.coins);
                self.store.add_gems(rewards.gems);
                self.store.add_experience(rewards.experience);
                for item in &rewards.items {
                    self.store.add_to_inventory(item.clone());
                }
            }
            self.store.evaluate_achievements();
        }

        let Some(next) = catalog.next_level(level_index) else {
            self.store.complete_game();
            self.hints.clear_all_hints();
            return Ok(LevelAdvance::GameCompleted { perfect });
        };
        if !next.is_unlocked_for(self.store.state()) {
            log::info!("Level '{}' is still locked", next.id);
            return Ok(LevelAdvance::Locked {
                level_id: next.id.clone(),
            });
        }

        if let Some(area) = &next.area {
            self.store.unlock_area(area.clone());
        }
        self.store.next_level();
        self.collected.clear();
        self.close_treasure();
        self.hints.clear_all_hints();

        Ok(LevelAdvance::Advanced {
            level_index: self.store.state().level_index,
            perfect,
        })
    }

    /// Restarts the current level with nothing collected.
    pub fn retry_level(&mut self) {
        self.store.reset_level();
        self.collected.clear();
        self.active_treasure = None;
        self.hints.clear_all_hints();
    }

    /// Writes progress now.
    pub fn flush(&mut self) -> QuestResult<()> {
        self.store.flush()
    }

    fn active_treasure_location(&self) -> QuestResult<TreasureLocation> {
        let treasure_id = self
            .active_treasure
            .as_deref()
            .ok_or_else(|| QuestError::InvalidState("no treasure is open".to_string()))?;
        self.store
            .catalog()
            .treasure(self.store.state().level_index, treasure_id)
            .cloned()
            .ok_or_else(|| QuestError::UnknownTreasure(treasure_id.to_string()))
    }

    fn close_treasure(&mut self) {
        self.active_treasure = None;
        self.store.set_current_question(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{achievements, ContentCatalog, Difficulty, HintType};
    use std::sync::Arc;
    use std::time::Duration;

    fn session() -> GameSession {
        let catalog = Arc::new(ContentCatalog::builtin().expect("built-in content should be valid"));
        let mut session = GameSession::new(ProgressStore::new(catalog)).unwrap();
        session.start();
        session
    }

    fn correct_index(session: &GameSession) -> usize {
        session.store().current_question().unwrap().answer_index
    }

    fn clear_level(session: &mut GameSession) {
        let ids: Vec<String> = session
            .remaining_treasures()
            .iter()
            .map(|t| t.id.clone())
            .collect();
        for id in ids {
            session.open_treasure(&id).unwrap();
            let index = correct_index(session);
            session.answer(index).unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_saved_difficulty_applied_on_start() {
        let session = session();
        assert_eq!(session.store().state().difficulty, Difficulty::Medium);
        assert_eq!(session.store().max_attempts(), 2);
        assert_eq!(session.store().state().time_remaining, 45);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_treasure_requires_running_game() {
        let catalog = Arc::new(ContentCatalog::builtin().unwrap());
        let mut session = GameSession::new(ProgressStore::new(catalog)).unwrap();
        assert!(matches!(
            session.open_treasure("golden_acorn"),
            Err(QuestError::InvalidState(_))
        ));

        session.start();
        assert!(matches!(
            session.open_treasure("fire_crystal"),
            Err(QuestError::UnknownTreasure(_))
        ));
        let question = session.open_treasure("golden_acorn").unwrap();
        assert_eq!(question.id, "math_addition_1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_correct_first_try_awards_bonus() {
        let mut session = session();
        let question = session.open_treasure("golden_acorn").unwrap().clone();
        let report = session.answer(question.answer_index).unwrap();

        let expected = ((question.points + question.bonus_points) as f64 * 1.5).floor() as u64;
        assert!(report.outcome.correct);
        assert_eq!(report.points_awarded, expected);
        assert_eq!(report.unlocked, vec![achievements::FIRST_TREASURE.to_string()]);
        assert!(session.is_collected("golden_acorn"));
        assert!(session.active_treasure().is_none());
        assert!(session.store().current_question_id().is_none());
        assert_eq!(session.store().state().total_coins, config::COINS_PER_TREASURE);
        assert_eq!(session.store().state().stats.treasures_found, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_answer_dispatches_question_hint() {
        let mut session = session();
        let question = session.open_treasure("golden_acorn").unwrap().clone();
        let wrong = (question.answer_index + 1) % question.options.len();

        let report = session.answer(wrong).unwrap();
        assert!(!report.outcome.correct);
        assert!(report.hint.is_some());

        let active = session.hints().get_active_hints();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].hint_type, HintType::Map);
        assert_eq!(active[0].target_position, crate::Position::new(300, 650));
        assert_eq!(session.store().state().hints_used, 1);

        tokio::time::sleep(Duration::from_millis(3001)).await;
        assert!(session.hints().get_active_hints().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_close_treasure() {
        let mut session = session();
        let question = session.open_treasure("golden_acorn").unwrap().clone();
        let wrong = (question.answer_index + 1) % question.options.len();

        session.answer(wrong).unwrap();
        let last = session.answer(wrong).unwrap();
        assert!(last.outcome.should_show_solution);
        assert!(last.outcome.solution.is_some());
        assert!(session.active_treasure().is_none());
        assert!(!session.is_collected("golden_acorn"));
        assert!(matches!(session.answer(0), Err(QuestError::InvalidState(_))));

        // The treasure can be tried again with fresh attempts.
        session.open_treasure("golden_acorn").unwrap();
        assert_eq!(session.store().attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hints_respect_setting() {
        let mut session = session();
        session.store_mut().update_settings(&crate::SettingsUpdate {
            show_hints: Some(false),
            ..Default::default()
        });
        session.open_treasure("magic_stone").unwrap();
        assert!(session.request_hint().unwrap().is_none());
        assert_eq!(session.store().state().hints_used, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_riddle_hint_uses_clue() {
        let mut session = session();
        session.open_treasure("magic_stone").unwrap();
        let handle = session.request_hint().unwrap();
        assert!(handle.is_some());

        let active = session.hints().get_active_hints();
        assert_eq!(
            active[0].message.as_deref(),
            Some("Where three paths meet, treasures you shall greet!")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_only_while_running() {
        let mut session = session();
        assert_eq!(session.tick(5), 40);
        assert_eq!(session.store().state().stats.total_play_time, 5);

        session.store_mut().pause_game();
        assert_eq!(session.tick(5), 40);
        assert_eq!(session.tick(100), 40);

        session.store_mut().resume_game();
        assert_eq!(session.tick(100), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_advance_requires_cleared_level() {
        let mut session = session();
        assert!(matches!(
            session.advance_level(),
            Err(QuestError::InvalidState(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_playthrough_completes_game() {
        let mut session = session();

        clear_level(&mut session);
        let advance = session.advance_level().unwrap();
        assert_eq!(
            advance,
            LevelAdvance::Advanced {
                level_index: 1,
                perfect: true
            }
        );
        let state = session.store().state();
        assert!(state.unlocked_areas.contains("caverns"));
        assert!(state.inventory.contains(&"forest_map".to_string()));
        assert_eq!(state.stats.perfect_levels, 1);
        assert!(state.achievement(achievements::PERFECT_LEVEL).unwrap().unlocked);

        clear_level(&mut session);
        let advance = session.advance_level().unwrap();
        assert_eq!(advance, LevelAdvance::GameCompleted { perfect: true });
        assert_eq!(session.store().status(), SessionStatus::Completed);
        assert_eq!(session.store().state().stats.levels_completed, 2);
        assert!(session
            .store()
            .state()
            .achievement(achievements::EXPLORER)
            .unwrap()
            .unlocked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_locked_next_level_keeps_player() {
        let catalog = Arc::new(ContentCatalog::builtin().unwrap());
        let mut levels = catalog.levels().to_vec();
        if let Some(requirements) = levels[1].unlock_requirements.as_mut() {
            requirements.score = Some(u64::MAX);
        }
        let catalog = Arc::new(ContentCatalog::from_levels(levels).unwrap());
        let mut session = GameSession::new(ProgressStore::new(catalog)).unwrap();
        session.start();

        clear_level(&mut session);
        let advance = session.advance_level().unwrap();
        assert!(matches!(advance, LevelAdvance::Locked { .. }));
        assert_eq!(session.store().state().level_index, 0);

        // Rewards are granted once even if advancing is retried.
        let coins = session.store().state().total_coins;
        session.advance_level().unwrap();
        assert_eq!(session.store().state().total_coins, coins);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_level_resets_collection() {
        let mut session = session();
        session.open_treasure("golden_acorn").unwrap();
        let index = correct_index(&session);
        session.answer(index).unwrap();

        session.retry_level();
        assert!(!session.is_collected("golden_acorn"));
        assert_eq!(session.remaining_treasures().len(), 5);
        assert_eq!(session.store().state().correct_this_level, 0);
    }
}
