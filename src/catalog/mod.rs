//! # Content Catalog
//!
//! The immutable collection of levels the question flow draws from.
//!
//! The catalog is loaded once, validated, and indexed by question id so
//! that lookups never scan every level. Nothing mutates it afterwards;
//! share it behind an `Arc`.

pub mod content;

pub use content::*;

use crate::{Difficulty, QuestError, QuestResult, Subject};
use std::collections::HashMap;
use std::path::Path;

const BUILTIN_LEVELS: &str = include_str!("../../assets/levels.json");

/// Validated, indexed game content.
#[derive(Debug, Clone)]
pub struct ContentCatalog {
    levels: Vec<Level>,
    /// Question id -> (level index, question index)
    index: HashMap<String, (usize, usize)>,
}

impl ContentCatalog {
    /// Builds a catalog from levels, validating references and indexing questions.
    ///
    /// # Examples
    ///
    /// ```
    /// use treasure_quest::ContentCatalog;
    ///
    /// let catalog = ContentCatalog::from_levels(Vec::new()).unwrap();
    /// assert!(catalog.is_empty());
    /// ```
    pub fn from_levels(levels: Vec<Level>) -> QuestResult<Self> {
        let mut index = HashMap::new();

        for (level_index, level) in levels.iter().enumerate() {
            for (question_index, question) in level.questions.iter().enumerate() {
                if question.options.is_empty() {
                    return Err(QuestError::InvalidCatalog(format!(
                        "question '{}' has no options",
                        question.id
                    )));
                }
                if question.answer_index >= question.options.len() {
                    return Err(QuestError::InvalidCatalog(format!(
                        "question '{}' answer index {} is out of range",
                        question.id, question.answer_index
                    )));
                }
                if index
                    .insert(question.id.clone(), (level_index, question_index))
                    .is_some()
                {
                    return Err(QuestError::InvalidCatalog(format!(
                        "duplicate question id '{}'",
                        question.id
                    )));
                }
            }
        }

        for level in &levels {
            for treasure in &level.treasures {
                if !index.contains_key(&treasure.question_id) {
                    return Err(QuestError::InvalidCatalog(format!(
                        "treasure '{}' in level '{}' references unknown question '{}'",
                        treasure.id, level.id, treasure.question_id
                    )));
                }
            }
        }

        log::debug!(
            "Indexed {} questions across {} levels",
            index.len(),
            levels.len()
        );

        Ok(Self { levels, index })
    }

    /// Parses and validates a JSON array of levels.
    pub fn from_json_str(json: &str) -> QuestResult<Self> {
        let levels: Vec<Level> = serde_json::from_str(json)?;
        Self::from_levels(levels)
    }

    /// Loads a JSON content file.
    pub fn from_path(path: impl AsRef<Path>) -> QuestResult<Self> {
        let path = path.as_ref();
        log::info!("Loading content catalog from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// The content shipped with the game.
    pub fn builtin() -> QuestResult<Self> {
        Self::from_json_str(BUILTIN_LEVELS)
    }

    /// All levels in play order.
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the catalog has no levels.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Total number of questions across all levels.
    pub fn question_count(&self) -> usize {
        self.index.len()
    }

    /// Level at `level_index`.
    pub fn level(&self, level_index: usize) -> Option<&Level> {
        self.levels.get(level_index)
    }

    /// Level following `level_index`, if any.
    pub fn next_level(&self, level_index: usize) -> Option<&Level> {
        self.levels.get(level_index + 1)
    }

    /// Resolves a question id.
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.index
            .get(question_id)
            .map(|&(level, question)| &self.levels[level].questions[question])
    }

    /// Index of the level containing a question.
    pub fn level_index_of(&self, question_id: &str) -> Option<usize> {
        self.index.get(question_id).map(|&(level, _)| level)
    }

    /// Finds a treasure marker in a given level.
    pub fn treasure(&self, level_index: usize, treasure_id: &str) -> Option<&TreasureLocation> {
        self.level(level_index)?.treasure(treasure_id)
    }

    /// Levels containing at least one question for `subject`.
    pub fn levels_by_subject(&self, subject: Subject) -> Vec<&Level> {
        self.levels
            .iter()
            .filter(|level| level.covers_subject(subject))
            .collect()
    }

    /// Levels tagged with `difficulty`.
    pub fn levels_by_difficulty(&self, difficulty: Difficulty) -> Vec<&Level> {
        self.levels
            .iter()
            .filter(|level| level.difficulty == difficulty)
            .collect()
    }
}
