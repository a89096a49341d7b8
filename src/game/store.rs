//! # Progress Store
//!
//! The single owner of player progress. Every operation is one synchronous
//! transition from a consistent [`ProgressState`] to the next; callers hold
//! the store by `&mut` so no update is ever observed half-applied.
//!
//! The store owns the [`QuestionEngine`], which in turn owns the only
//! attempt counter. Attempts and the active question id are read through
//! the store rather than duplicated in the state.
//!
//! With `auto_save` enabled every mutation that changes the persisted
//! subset is written through the [`SnapshotStore`]. Otherwise writes happen
//! on [`ProgressStore::flush`] and when the store is dropped.

use crate::{
    achievements, config, experience_level_for, world_level_for, AnswerOutcome, ContentCatalog,
    Difficulty, MemoryStore, Mode, PersistedSnapshot, ProgressState, Question, QuestionEngine,
    QuestResult, Scene, SessionStatus, SettingsUpdate, SnapshotStore, StatsUpdate, Subject,
};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Result of trying to spend a power-up charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUpUse {
    /// One charge spent
    Used { remaining: u32 },
    /// Nothing spent; the count was already zero or never granted
    NoCharges,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Authoritative holder of session and persistent player state.
pub struct ProgressStore {
    state: ProgressState,
    engine: QuestionEngine,
    persistence: Box<dyn SnapshotStore>,
    last_saved: Option<PersistedSnapshot>,
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStore")
            .field("state", &self.state)
            .field("engine", &self.engine)
            .finish()
    }
}

impl ProgressStore {
    /// Creates a store with default state backed by memory only.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use treasure_quest::{ContentCatalog, ProgressStore};
    ///
    /// let catalog = Arc::new(ContentCatalog::builtin().unwrap());
    /// let store = ProgressStore::new(catalog);
    /// assert_eq!(store.attempts(), 3);
    /// assert!(store.current_question_id().is_none());
    /// ```
    pub fn new(catalog: Arc<ContentCatalog>) -> Self {
        Self::open(catalog, MemoryStore::new())
    }

    /// Creates a store and restores the persisted subset from `persistence`.
    ///
    /// A missing record yields defaults. An unreadable or mismatched record
    /// is logged and also yields defaults. A restored record brings back its
    /// difficulty together with the attempts, hints and timer it implies.
    pub fn open(catalog: Arc<ContentCatalog>, persistence: impl SnapshotStore + 'static) -> Self {
        let mut state = ProgressState::new();

        let last_saved = match persistence.load() {
            Ok(Some(snapshot)) => {
                if !snapshot.is_consistent() {
                    log::warn!(
                        "Saved level {} does not match {} experience",
                        snapshot.experience_level,
                        snapshot.experience
                    );
                }
                log::info!("Restored saved progress");
                snapshot.clone().apply_to(&mut state);
                Some(snapshot)
            }
            Ok(None) => {
                log::info!("No saved progress found, starting fresh");
                None
            }
            Err(e) => {
                log::warn!("Failed to load saved progress, using defaults: {}", e);
                None
            }
        };

        let restored = last_saved.is_some();
        let mut store = Self {
            state,
            engine: QuestionEngine::new(catalog),
            persistence: Box::new(persistence),
            last_saved,
        };
        if restored {
            let difficulty = store.state.settings.difficulty;
            store.apply_difficulty(difficulty);
        }
        store
    }

    /// The live state.
    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// The question engine holding the active question.
    pub fn engine(&self) -> &QuestionEngine {
        &self.engine
    }

    pub fn catalog(&self) -> &Arc<ContentCatalog> {
        self.engine.catalog()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    /// Attempts left on the active question.
    pub fn attempts(&self) -> u32 {
        self.engine.remaining_attempts()
    }

    pub fn max_attempts(&self) -> u32 {
        self.engine.max_attempts()
    }

    pub fn current_question_id(&self) -> Option<&str> {
        self.engine.current_question_id()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.engine.current_question()
    }

    /// Charges left for a power-up.
    pub fn power_up_count(&self, id: &str) -> u32 {
        self.state.power_ups.get(id).copied().unwrap_or(0)
    }

    // Session status

    /// Starts (or re-enters) play in the world scene.
    pub fn start_game(&mut self) {
        self.state.game_started = true;
        self.state.game_paused = false;
        self.state.scene = Scene::World;
        log::info!("Game started");
        self.commit();
    }

    pub fn pause_game(&mut self) {
        if !self.state.game_paused {
            self.state.game_paused = true;
            log::debug!("Game paused");
            self.commit();
        }
    }

    pub fn resume_game(&mut self) {
        if self.state.game_paused {
            self.state.game_paused = false;
            log::debug!("Game resumed");
            self.commit();
        }
    }

    /// Marks a running or paused game as completed.
    ///
    /// Returns false when the game was not started or is already completed.
    pub fn complete_game(&mut self) -> bool {
        match self.state.status() {
            SessionStatus::Running | SessionStatus::Paused => {
                self.state.game_completed = true;
                self.state.game_paused = false;
                log::info!("Game completed with score {}", self.state.score);
                self.commit();
                true
            }
            SessionStatus::NotStarted | SessionStatus::Completed => false,
        }
    }

    /// Clears session fields, keeping economy, achievements, stats and settings.
    pub fn reset_game(&mut self) {
        let state = &mut self.state;
        state.game_started = false;
        state.game_paused = false;
        state.game_completed = false;
        state.scene = Scene::Menu;
        state.score = 0;
        state.level_index = 0;
        state.world_level = 1;
        state.correct_this_level = 0;
        state.mistakes_this_level = 0;
        state.time_spent_this_level = 0;
        state.hints_used = 0;
        state.hints_available = config::DEFAULT_HINTS_AVAILABLE;
        state.time_remaining = config::DEFAULT_TIME_REMAINING;

        self.engine.set_max_attempts(config::DEFAULT_MAX_ATTEMPTS);
        self.engine.clear_current_question();

        log::info!("Game reset");
        self.commit();
    }

    // World progression

    /// Moves to the next level index. Does not check the catalog.
    pub fn next_level(&mut self) {
        self.state.level_index += 1;
        self.state.world_level = world_level_for(self.state.level_index);
        self.clear_level_counters();
        log::info!("Advanced to level index {}", self.state.level_index);
        self.commit();
    }

    /// Restarts the current level.
    pub fn reset_level(&mut self) {
        self.clear_level_counters();
        log::debug!("Level {} reset", self.state.level_index);
        self.commit();
    }

    fn clear_level_counters(&mut self) {
        self.state.correct_this_level = 0;
        self.state.mistakes_this_level = 0;
        self.state.time_spent_this_level = 0;
        self.state.hints_used = 0;
        self.engine.release_current_question();
        self.engine.reset_attempts();
    }

    /// Records that the current level was finished.
    ///
    /// Counts a perfect level when every one of `question_total` questions
    /// was answered without a mistake. Returns whether it was perfect.
    pub fn record_level_completion(&mut self, question_total: u32) -> bool {
        let perfect =
            self.state.mistakes_this_level == 0 && self.state.correct_this_level >= question_total;

        self.state.stats.levels_completed += 1;
        if perfect {
            self.state.stats.perfect_levels += 1;
        }
        log::info!(
            "Level {} completed ({})",
            self.state.level_index,
            if perfect { "perfect" } else { "with mistakes" }
        );
        self.commit();
        perfect
    }

    // Economy

    /// Adds points scaled by the difficulty multiplier. Returns the points awarded.
    pub fn add_score(&mut self, points: u64) -> u64 {
        let awarded = (points as f64 * self.state.difficulty.score_multiplier()).floor() as u64;
        self.state.score = self.state.score.saturating_add(awarded);
        self.commit();
        awarded
    }

    pub fn add_coins(&mut self, coins: u64) {
        self.state.total_coins = self.state.total_coins.saturating_add(coins);
        self.commit();
    }

    pub fn add_gems(&mut self, gems: u64) {
        self.state.gems = self.state.gems.saturating_add(gems);
        self.commit();
    }

    /// Adds experience and re-derives the experience level.
    ///
    /// Returns true when the level went up.
    pub fn add_experience(&mut self, experience: u64) -> bool {
        let before = self.state.experience_level;
        self.state.experience = self.state.experience.saturating_add(experience);
        self.state.experience_level = experience_level_for(self.state.experience);
        let levelled_up = self.state.experience_level > before;
        if levelled_up {
            log::info!("Reached experience level {}", self.state.experience_level);
        }
        self.commit();
        levelled_up
    }

    // Session settings

    pub fn set_subject(&mut self, subject: Subject) {
        self.state.subject = subject;
        self.commit();
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.state.mode = mode;
        self.commit();
    }

    /// Switches difficulty and re-derives attempts, hints and the timer.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.apply_difficulty(difficulty);
        self.commit();
    }

    fn apply_difficulty(&mut self, difficulty: Difficulty) {
        self.state.difficulty = difficulty;
        self.state.settings.difficulty = difficulty;
        self.state.hints_available = difficulty.hints_available();
        self.state.time_remaining = difficulty.time_budget();
        self.engine.set_max_attempts(difficulty.max_attempts());
        log::debug!("Difficulty set to {}", difficulty);
    }

    pub fn set_time_remaining(&mut self, seconds: u32) {
        self.state.time_remaining = seconds;
        self.commit();
    }

    // Questions and attempts

    /// Sets or clears the active question.
    ///
    /// A known id refills attempts; `None` clears the question and leaves
    /// attempts alone. An unknown id returns `None` and changes nothing.
    pub fn set_current_question(&mut self, question_id: Option<&str>) -> Option<&Question> {
        match question_id {
            Some(id) => {
                self.engine.set_current_question(id)?;
                self.commit();
                self.engine.current_question()
            }
            None => {
                self.engine.release_current_question();
                self.commit();
                None
            }
        }
    }

    /// Checks an answer and applies its effect on counters and statistics.
    pub fn submit_answer(&mut self, selected_index: usize) -> AnswerOutcome {
        if self.engine.current_question().is_none() {
            return self.engine.submit_answer(selected_index);
        }

        let outcome = self.engine.submit_answer(selected_index);
        if outcome.correct {
            self.state.correct_this_level += 1;
            self.state.stats.correct_answers += 1;
        } else {
            self.state.mistakes_this_level += 1;
        }
        self.state.stats.questions_answered += 1;
        self.state.stats.recompute_average();
        self.commit();
        outcome
    }

    /// Counts a correct answer.
    pub fn increment_correct(&mut self) {
        self.state.correct_this_level += 1;
        self.state.stats.correct_answers += 1;
        self.state.stats.questions_answered += 1;
        self.state.stats.recompute_average();
        self.commit();
    }

    /// Spends one attempt and counts the answered question. Never below zero.
    pub fn decrement_attempts(&mut self) -> u32 {
        let remaining = self.engine.decrement_attempts();
        self.state.stats.questions_answered += 1;
        self.state.stats.recompute_average();
        self.commit();
        remaining
    }

    pub fn reset_attempts(&mut self) {
        self.engine.reset_attempts();
        self.commit();
    }

    /// Counts a hint. Going past the allowance is permitted.
    pub fn increment_hints(&mut self) {
        self.state.hints_used += 1;
        self.state.stats.hints_used += 1;
        if self.state.hints_used > self.state.hints_available {
            log::debug!(
                "Hints used ({}) exceed allowance ({})",
                self.state.hints_used,
                self.state.hints_available
            );
        }
        self.commit();
    }

    /// Counts a treasure opened.
    pub fn record_treasure_found(&mut self) {
        self.state.stats.treasures_found += 1;
        self.commit();
    }

    // Achievements

    /// Unlocks an achievement once.
    ///
    /// Unknown or already unlocked ids are ignored. Returns true only for a
    /// fresh unlock, which also grants the achievement's points as experience.
    pub fn unlock_achievement(&mut self, id: &str) -> bool {
        let Some(achievement) = self
            .state
            .achievements
            .iter_mut()
            .find(|a| a.id == id && !a.unlocked)
        else {
            return false;
        };

        achievement.unlocked = true;
        achievement.unlocked_at = Some(now_millis());
        let points = achievement.points as u64;
        log::info!("Achievement unlocked: {}", achievement.name);

        self.state.experience = self.state.experience.saturating_add(points);
        self.state.experience_level = experience_level_for(self.state.experience);
        self.commit();
        true
    }

    /// Unlocks every achievement whose rule now holds. Returns their ids.
    pub fn evaluate_achievements(&mut self) -> Vec<String> {
        let mut unlocked = Vec::new();
        // Unlocking grants experience, which can satisfy further rules.
        loop {
            let ready: Vec<String> = self
                .state
                .achievements
                .iter()
                .filter(|a| !a.unlocked && achievements::rule_satisfied(&a.id, &self.state))
                .map(|a| a.id.clone())
                .collect();
            if ready.is_empty() {
                break;
            }
            for id in ready {
                if self.unlock_achievement(&id) {
                    unlocked.push(id);
                }
            }
        }
        unlocked
    }

    // Statistics and settings

    pub fn update_stats(&mut self, update: &StatsUpdate) {
        self.state.stats.merge(update);
        self.commit();
    }

    /// Merges settings. A new difficulty also re-derives the session limits.
    pub fn update_settings(&mut self, update: &SettingsUpdate) {
        self.state.settings.merge(update);
        if let Some(difficulty) = update.difficulty {
            self.apply_difficulty(difficulty);
        }
        self.commit();
    }

    /// Adds seconds of play to the lifetime and per-level totals.
    pub fn increment_play_time(&mut self, seconds: u64) {
        self.state.stats.total_play_time += seconds;
        self.state.time_spent_this_level += seconds;
        self.state.stats.recompute_average();
        self.commit();
    }

    // Inventory

    /// Appends an item; duplicates are kept.
    pub fn add_to_inventory(&mut self, item: impl Into<String>) {
        self.state.inventory.push(item.into());
        self.commit();
    }

    pub fn grant_power_up(&mut self, id: impl Into<String>, charges: u32) {
        let count = self.state.power_ups.entry(id.into()).or_insert(0);
        *count = count.saturating_add(charges);
        self.commit();
    }

    /// Spends one charge of a power-up, refusing when none are left.
    pub fn use_power_up(&mut self, id: &str) -> PowerUpUse {
        match self.state.power_ups.get_mut(id) {
            Some(count) if *count > 0 => {
                *count -= 1;
                let remaining = *count;
                self.commit();
                PowerUpUse::Used { remaining }
            }
            _ => {
                log::debug!("Power-up '{}' has no charges remaining", id);
                PowerUpUse::NoCharges
            }
        }
    }

    /// Unlocks an area. Returns false if it was already unlocked.
    pub fn unlock_area(&mut self, area: impl Into<String>) -> bool {
        let inserted = self.state.unlocked_areas.insert(area.into());
        if inserted {
            self.commit();
        }
        inserted
    }

    // Persistence

    /// Writes the persisted subset now if it changed since the last write.
    pub fn flush(&mut self) -> QuestResult<()> {
        let snapshot = PersistedSnapshot::from_state(&self.state);
        if self.last_saved.as_ref() == Some(&snapshot) {
            return Ok(());
        }
        self.persistence.save(&snapshot)?;
        self.last_saved = Some(snapshot);
        Ok(())
    }

    /// Whether the persisted subset has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.last_saved.as_ref() != Some(&PersistedSnapshot::from_state(&self.state))
    }

    fn commit(&mut self) {
        if !self.state.settings.auto_save {
            return;
        }
        if let Err(e) = self.flush() {
            log::warn!("Autosave failed: {}", e);
        }
    }
}

impl Drop for ProgressStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::warn!("Failed to save progress on shutdown: {}", e);
        }
    }
}
