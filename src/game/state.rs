//! # Progress State Module
//!
//! The data the Progress Store owns: session flags, the player economy,
//! per-level counters, inventory, achievements, lifetime statistics and
//! user settings.
//!
//! The live attempt counter and the active question id are owned by the
//! [`QuestionEngine`](crate::QuestionEngine) and read through the store.

use crate::{config, default_achievements, Difficulty, Mode, Scene, Subject};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Session status derived from the started/paused/completed flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    Running,
    Paused,
    Completed,
}

/// An achievement and its unlock state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub points: u32,
    #[serde(default)]
    pub unlocked: bool,
    /// Milliseconds since the Unix epoch; set once on unlock
    #[serde(default)]
    pub unlocked_at: Option<u64>,
}

impl Achievement {
    /// Creates a locked achievement.
    pub fn new(id: &str, name: &str, description: &str, points: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            points,
            unlocked: false,
            unlocked_at: None,
        }
    }
}

/// Lifetime statistics. Counters only grow until a full reset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerStats {
    /// Total play time in seconds
    pub total_play_time: u64,
    pub questions_answered: u64,
    pub correct_answers: u64,
    pub treasures_found: u64,
    pub levels_completed: u64,
    pub perfect_levels: u64,
    pub hints_used: u64,
    /// Average seconds of play per answered question
    pub average_time: f64,
}

impl PlayerStats {
    /// Creates zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow-merges the given fields. Counters never move backwards.
    pub fn merge(&mut self, update: &StatsUpdate) {
        fn raise(field: &mut u64, value: Option<u64>) {
            if let Some(value) = value {
                if value < *field {
                    log::warn!("Ignoring stats update that would lower a counter ({} -> {})", field, value);
                } else {
                    *field = value;
                }
            }
        }

        raise(&mut self.total_play_time, update.total_play_time);
        raise(&mut self.questions_answered, update.questions_answered);
        raise(&mut self.correct_answers, update.correct_answers);
        raise(&mut self.treasures_found, update.treasures_found);
        raise(&mut self.levels_completed, update.levels_completed);
        raise(&mut self.perfect_levels, update.perfect_levels);
        raise(&mut self.hints_used, update.hints_used);
        self.recompute_average();
    }

    /// Recomputes the derived average time.
    pub fn recompute_average(&mut self) {
        self.average_time = if self.questions_answered == 0 {
            0.0
        } else {
            self.total_play_time as f64 / self.questions_answered as f64
        };
    }

    /// Fraction of answered questions that were correct.
    pub fn accuracy(&self) -> f64 {
        if self.questions_answered == 0 {
            0.0
        } else {
            self.correct_answers as f64 / self.questions_answered as f64
        }
    }
}

/// Partial update for [`PlayerStats`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsUpdate {
    pub total_play_time: Option<u64>,
    pub questions_answered: Option<u64>,
    pub correct_answers: Option<u64>,
    pub treasures_found: Option<u64>,
    pub levels_completed: Option<u64>,
    pub perfect_levels: Option<u64>,
    pub hints_used: Option<u64>,
}

/// User-facing settings. Survive `reset_game`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSettings {
    pub music_volume: f32,
    pub sfx_volume: f32,
    pub difficulty: Difficulty,
    pub show_hints: bool,
    pub auto_save: bool,
    pub particle_effects: bool,
    pub screen_shake: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            music_volume: 0.7,
            sfx_volume: 0.8,
            difficulty: Difficulty::Medium,
            show_hints: true,
            auto_save: true,
            particle_effects: true,
            screen_shake: true,
        }
    }
}

impl GameSettings {
    /// Shallow-merges the given fields, clamping volumes to 0.0..=1.0.
    pub fn merge(&mut self, update: &SettingsUpdate) {
        if let Some(volume) = update.music_volume {
            self.music_volume = volume.clamp(0.0, 1.0);
        }
        if let Some(volume) = update.sfx_volume {
            self.sfx_volume = volume.clamp(0.0, 1.0);
        }
        if let Some(difficulty) = update.difficulty {
            self.difficulty = difficulty;
        }
        if let Some(show_hints) = update.show_hints {
            self.show_hints = show_hints;
        }
        if let Some(auto_save) = update.auto_save {
            self.auto_save = auto_save;
        }
        if let Some(particle_effects) = update.particle_effects {
            self.particle_effects = particle_effects;
        }
        if let Some(screen_shake) = update.screen_shake {
            self.screen_shake = screen_shake;
        }
    }
}

/// Partial update for [`GameSettings`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub music_volume: Option<f32>,
    pub sfx_volume: Option<f32>,
    pub difficulty: Option<Difficulty>,
    pub show_hints: Option<bool>,
    pub auto_save: Option<bool>,
    pub particle_effects: Option<bool>,
    pub screen_shake: Option<bool>,
}

/// The Progress Store's live snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressState {
    // Status flags
    pub game_started: bool,
    pub game_paused: bool,
    pub game_completed: bool,
    pub scene: Scene,

    // Economy
    pub score: u64,
    pub total_coins: u64,
    pub gems: u64,
    pub experience: u64,
    /// Derived from experience
    pub experience_level: u32,

    // Session
    pub subject: Subject,
    pub mode: Mode,
    pub difficulty: Difficulty,
    pub hints_used: u32,
    pub hints_available: u32,
    pub time_remaining: u32,

    // World progression
    pub level_index: usize,
    /// Derived from level_index
    pub world_level: u32,
    pub correct_this_level: u32,
    pub mistakes_this_level: u32,
    pub time_spent_this_level: u64,

    // Collections
    pub inventory: Vec<String>,
    pub power_ups: BTreeMap<String, u32>,
    pub unlocked_areas: BTreeSet<String>,
    pub achievements: Vec<Achievement>,

    pub stats: PlayerStats,
    pub settings: GameSettings,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressState {
    /// Creates the start-of-process state with documented defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use treasure_quest::ProgressState;
    ///
    /// let state = ProgressState::new();
    /// assert_eq!(state.score, 0);
    /// assert_eq!(state.experience_level, 1);
    /// assert!(state.unlocked_areas.contains("forest"));
    /// ```
    pub fn new() -> Self {
        let settings = GameSettings::default();
        Self {
            game_started: false,
            game_paused: false,
            game_completed: false,
            scene: Scene::Menu,
            score: 0,
            total_coins: 0,
            gems: 0,
            experience: 0,
            experience_level: 1,
            subject: Subject::Math,
            mode: Mode::Knowledge,
            difficulty: settings.difficulty,
            hints_used: 0,
            hints_available: config::DEFAULT_HINTS_AVAILABLE,
            time_remaining: config::DEFAULT_TIME_REMAINING,
            level_index: 0,
            world_level: 1,
            correct_this_level: 0,
            mistakes_this_level: 0,
            time_spent_this_level: 0,
            inventory: Vec::new(),
            power_ups: BTreeMap::new(),
            unlocked_areas: BTreeSet::from([config::DEFAULT_AREA.to_string()]),
            achievements: default_achievements(),
            stats: PlayerStats::new(),
            settings,
        }
    }

    /// Derives the session status from the flags.
    pub fn status(&self) -> SessionStatus {
        if self.game_completed {
            SessionStatus::Completed
        } else if !self.game_started {
            SessionStatus::NotStarted
        } else if self.game_paused {
            SessionStatus::Paused
        } else {
            SessionStatus::Running
        }
    }

    /// Hints left before exceeding this difficulty's allowance.
    pub fn hints_remaining(&self) -> u32 {
        self.hints_available.saturating_sub(self.hints_used)
    }

    /// Progress through the current level as a fraction of the HUD target.
    pub fn level_progress(&self) -> f64 {
        let target = config::QUESTIONS_PER_LEVEL_TARGET as f64;
        (self.correct_this_level as f64 / target).min(1.0)
    }

    /// Looks up an achievement by id.
    pub fn achievement(&self, id: &str) -> Option<&Achievement> {
        self.achievements.iter().find(|a| a.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = ProgressState::new();
        assert_eq!(state.status(), SessionStatus::NotStarted);
        assert_eq!(state.time_remaining, 45);
        assert_eq!(state.hints_remaining(), 3);
        assert!(state.power_ups.is_empty());
        assert!(!state.achievements.is_empty());
        assert!(state.achievements.iter().all(|a| !a.unlocked));
    }

    #[test]
    fn test_status_derivation() {
        let mut state = ProgressState::new();
        state.game_started = true;
        assert_eq!(state.status(), SessionStatus::Running);
        state.game_paused = true;
        assert_eq!(state.status(), SessionStatus::Paused);
        state.game_completed = true;
        assert_eq!(state.status(), SessionStatus::Completed);
    }

    #[test]
    fn test_stats_merge_never_lowers_counters() {
        let mut stats = PlayerStats::new();
        stats.merge(&StatsUpdate {
            total_play_time: Some(120),
            questions_answered: Some(4),
            ..Default::default()
        });
        assert_eq!(stats.total_play_time, 120);
        assert_eq!(stats.average_time, 30.0);

        stats.merge(&StatsUpdate {
            questions_answered: Some(2),
            treasures_found: Some(1),
            ..Default::default()
        });
        assert_eq!(stats.questions_answered, 4);
        assert_eq!(stats.treasures_found, 1);
    }

    #[test]
    fn test_settings_merge_clamps_volume() {
        let mut settings = GameSettings::default();
        settings.merge(&SettingsUpdate {
            music_volume: Some(1.5),
            sfx_volume: Some(-0.2),
            screen_shake: Some(false),
            ..Default::default()
        });
        assert_eq!(settings.music_volume, 1.0);
        assert_eq!(settings.sfx_volume, 0.0);
        assert!(!settings.screen_shake);
        assert!(settings.show_hints);
    }

    #[test]
    fn test_level_progress_caps_at_one() {
        let mut state = ProgressState::new();
        state.correct_this_level = 7;
        assert_eq!(state.level_progress(), 1.0);
    }

    #[test]
    fn test_accuracy() {
        let stats = PlayerStats {
            questions_answered: 4,
            correct_answers: 3,
            ..Default::default()
        };
        assert_eq!(stats.accuracy(), 0.75);
    }
}
