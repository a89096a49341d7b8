//! # Game Module
//!
//! Player progress state and the store that owns it.
//!
//! This module contains the shared value types used across the crate:
//! - World positions used as hint targets and treasure markers
//! - Difficulty tiers and the limits derived from them
//! - Subjects, play modes and scene markers
//! - Progress state, achievements and the Progress Store

pub mod achievements;
pub mod state;
pub mod store;

pub use achievements::*;
pub use state::*;
pub use store::*;

use crate::config;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a 2D coordinate in the game world.
///
/// # Examples
///
/// ```
/// use treasure_quest::Position;
///
/// let pos = Position::new(10, 20);
/// assert_eq!(pos.x, 10);
/// assert_eq!(pos.y, 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Creates a new position with the given coordinates.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Calculates the Euclidean distance to another position.
    ///
    /// # Examples
    ///
    /// ```
    /// use treasure_quest::Position;
    ///
    /// let pos1 = Position::new(0, 0);
    /// let pos2 = Position::new(3, 4);
    /// assert_eq!(pos1.euclidean_distance(pos2), 5.0);
    /// ```
    pub fn euclidean_distance(self, other: Position) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Difficulty tiers and the per-question limits derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Multiplier applied to every score award.
    ///
    /// # Examples
    ///
    /// ```
    /// use treasure_quest::Difficulty;
    ///
    /// assert_eq!(Difficulty::Medium.score_multiplier(), 1.5);
    /// ```
    pub fn score_multiplier(self) -> f64 {
        match self {
            Difficulty::Easy => 1.0,
            Difficulty::Medium => 1.5,
            Difficulty::Hard => 2.0,
        }
    }

    /// Attempts granted per question.
    pub fn max_attempts(self) -> u32 {
        match self {
            Difficulty::Easy => 3,
            Difficulty::Medium => 2,
            Difficulty::Hard => 1,
        }
    }

    /// Hints the player is expected to use per level.
    pub fn hints_available(self) -> u32 {
        match self {
            Difficulty::Easy => 3,
            Difficulty::Medium => 2,
            Difficulty::Hard => 1,
        }
    }

    /// Question timer budget in seconds.
    pub fn time_budget(self) -> u32 {
        match self {
            Difficulty::Easy => 60,
            Difficulty::Medium => 45,
            Difficulty::Hard => 30,
        }
    }

    /// Returns all tiers from easiest to hardest.
    pub fn all() -> [Difficulty; 3] {
        [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// Knowledge areas questions are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Subject {
    #[default]
    Math,
    Science,
    English,
    History,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::str::FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "math" => Ok(Subject::Math),
            "science" => Ok(Subject::Science),
            "english" => Ok(Subject::English),
            "history" => Ok(Subject::History),
            other => Err(format!("unknown subject '{}'", other)),
        }
    }
}

/// How rewards are framed for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Knowledge,
    Reward,
    Challenge,
}

/// Scene marker the presentation layer uses to pick what to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scene {
    #[default]
    Menu,
    World,
}

/// Experience level for a given amount of experience.
///
/// # Examples
///
/// ```
/// use treasure_quest::experience_level_for;
///
/// assert_eq!(experience_level_for(0), 1);
/// assert_eq!(experience_level_for(999), 1);
/// assert_eq!(experience_level_for(2500), 3);
/// ```
pub fn experience_level_for(experience: u64) -> u32 {
    u32::try_from(experience / config::EXPERIENCE_PER_LEVEL)
        .unwrap_or(u32::MAX)
        .saturating_add(1)
}

/// World tier for a level index (five levels per tier).
///
/// # Examples
///
/// ```
/// use treasure_quest::world_level_for;
///
/// assert_eq!(world_level_for(0), 1);
/// assert_eq!(world_level_for(4), 1);
/// assert_eq!(world_level_for(5), 2);
/// ```
pub fn world_level_for(level_index: usize) -> u32 {
    (level_index / config::LEVELS_PER_WORLD_TIER) as u32 + 1
}
