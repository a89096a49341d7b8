//! # Content Types
//!
//! Questions, treasure markers and levels as loaded from content files.
//! All of these are immutable once the catalog is built.

use crate::{Difficulty, HintType, Position, ProgressState, Subject};
use serde::{Deserialize, Serialize};

/// Optional media attached to a question.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Multimedia {
    pub image: Option<String>,
    pub audio: Option<String>,
    pub video: Option<String>,
}

/// A single knowledge-check item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub subject: Subject,
    pub difficulty: Difficulty,
    pub category: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub answer_index: usize,
    pub solution: String,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub hint_type: Option<HintType>,
    /// Clue text shown as the hint for this question
    #[serde(default)]
    pub next_clue: Option<String>,
    /// Seconds allowed to answer
    pub time_limit: u32,
    pub points: u32,
    pub bonus_points: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub multimedia: Option<Multimedia>,
}

impl Question {
    /// Whether `selected` is the correct option index.
    pub fn is_correct(&self, selected: usize) -> bool {
        selected == self.answer_index
    }

    /// Text of the correct option.
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.answer_index).map(String::as_str)
    }
}

/// Visual rarity of a treasure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreasureKind {
    Bronze,
    Silver,
    Golden,
    Crystal,
    Magic,
    Legendary,
    Elemental,
}

/// A world object gating exactly one question.
///
/// Whether it has been collected is tracked by the session, not the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreasureLocation {
    pub id: String,
    #[serde(flatten)]
    pub position: Position,
    pub question_id: String,
    #[serde(rename = "type")]
    pub kind: TreasureKind,
    #[serde(default)]
    pub rarity: Option<u32>,
}

/// Ambient presentation metadata for a level.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Environment {
    pub weather: String,
    pub time_of_day: String,
    pub ambient_sounds: Vec<String>,
    pub background_music: String,
}

/// Conditions that must hold before a level can be entered.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnlockRequirements {
    /// Minimum experience level
    pub level: Option<u32>,
    pub score: Option<u64>,
    pub achievements: Vec<String>,
}

impl UnlockRequirements {
    /// Checks the requirements against the player's progress.
    pub fn is_met(&self, state: &ProgressState) -> bool {
        if self.level.is_some_and(|level| state.experience_level < level) {
            return false;
        }
        if self.score.is_some_and(|score| state.score < score) {
            return false;
        }
        self.achievements.iter().all(|id| {
            state
                .achievement(id)
                .map(|achievement| achievement.unlocked)
                .unwrap_or(false)
        })
    }
}

/// Rewards granted when a level is finished.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelRewards {
    pub coins: u64,
    pub gems: u64,
    pub experience: u64,
    pub items: Vec<String>,
}

/// An ordered unit of content bundling questions and treasure markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub environment: Environment,
    pub treasures: Vec<TreasureLocation>,
    pub questions: Vec<Question>,
    /// Area id unlocked for the player on finishing this level
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub unlock_requirements: Option<UnlockRequirements>,
    #[serde(default)]
    pub rewards: Option<LevelRewards>,
}

impl Level {
    /// Finds a treasure marker by id.
    pub fn treasure(&self, treasure_id: &str) -> Option<&TreasureLocation> {
        self.treasures.iter().find(|t| t.id == treasure_id)
    }

    /// Finds the treasure marker gating a question.
    pub fn treasure_for_question(&self, question_id: &str) -> Option<&TreasureLocation> {
        self.treasures.iter().find(|t| t.question_id == question_id)
    }

    /// Whether any question in this level belongs to `subject`.
    pub fn covers_subject(&self, subject: Subject) -> bool {
        self.questions.iter().any(|q| q.subject == subject)
    }

    /// Whether the player may enter this level.
    pub fn is_unlocked_for(&self, state: &ProgressState) -> bool {
        self.unlock_requirements
            .as_ref()
            .map(|requirements| requirements.is_met(state))
            .unwrap_or(true)
    }
}
