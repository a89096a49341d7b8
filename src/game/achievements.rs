//! # Achievements
//!
//! The default achievement table and the rules that unlock each entry.

use crate::{Achievement, ProgressState};

/// Answer the first question correctly.
pub const FIRST_TREASURE: &str = "first_treasure";
/// Open ten treasures.
pub const TREASURE_HUNTER: &str = "treasure_hunter";
/// Answer twenty-five questions correctly.
pub const SCHOLAR: &str = "scholar";
/// Finish a level without a wrong answer.
pub const PERFECT_LEVEL: &str = "perfect_level";
/// Finish two levels.
pub const EXPLORER: &str = "explorer";
/// Reach experience level two.
pub const LEVEL_UP: &str = "level_up";

const TABLE: [(&str, &str, &str, u32); 6] = [
    (FIRST_TREASURE, "First Discovery", "Answer your first question correctly", 50),
    (TREASURE_HUNTER, "Treasure Hunter", "Open 10 treasures", 100),
    (SCHOLAR, "Scholar", "Answer 25 questions correctly", 200),
    (PERFECT_LEVEL, "Flawless", "Complete a level without a wrong answer", 250),
    (EXPLORER, "Explorer", "Complete 2 levels", 150),
    (LEVEL_UP, "Growing Wiser", "Reach experience level 2", 100),
];

/// Builds the locked achievement list a new player starts with.
pub fn default_achievements() -> Vec<Achievement> {
    TABLE
        .iter()
        .map(|(id, name, description, points)| Achievement::new(id, name, description, *points))
        .collect()
}

/// Whether the unlock rule for `id` holds. Unknown ids have no rule.
pub fn rule_satisfied(id: &str, state: &ProgressState) -> bool {
    let stats = &state.stats;
    match id {
        FIRST_TREASURE => stats.correct_answers >= 1,
        TREASURE_HUNTER => stats.treasures_found >= 10,
        SCHOLAR => stats.correct_answers >= 25,
        PERFECT_LEVEL => stats.perfect_levels >= 1,
        EXPLORER => stats.levels_completed >= 2,
        LEVEL_UP => state.experience_level >= 2,
        _ => false,
    }
}
