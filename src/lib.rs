//! # Treasure Quest
//!
//! Progress tracking core for an exploration game where every treasure is
//! guarded by a knowledge question.
//!
//! ## Architecture Overview
//!
//! The crate is organised around a small number of cooperating pieces:
//!
//! - **Content Catalog**: immutable levels, questions and treasure markers,
//!   indexed by question id at load time
//! - **Question Engine**: resolves the active question and owns the live
//!   attempt counter
//! - **Hint Dispatch Engine**: typed publish/subscribe for time-limited hints
//! - **Progress Store**: the single owner of session and persistent player state
//! - **Persistence Adapter**: loads and saves the persisted subset of progress
//!
//! [`GameSession`] wires these together for a presentation layer. Rendering,
//! input and audio live outside this crate and only call into it.

pub mod catalog;
pub mod engine;
pub mod game;
pub mod persistence;
pub mod session;

// Core module re-exports
pub use catalog::*;
pub use engine::*;
pub use game::*;
pub use persistence::*;
pub use session::*;

/// Core error type for the Treasure Quest engine.
#[derive(thiserror::Error, Debug)]
pub enum QuestError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Content catalog failed validation
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// Level index outside the catalog
    #[error("Unknown level index: {0}")]
    UnknownLevel(usize),

    /// Treasure id not present in the current level
    #[error("Unknown treasure: {0}")]
    UnknownTreasure(String),

    /// No async runtime available for hint timers
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Operation not valid in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type used throughout the Treasure Quest codebase.
pub type QuestResult<T> = Result<T, QuestError>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Game configuration constants.
pub mod config {
    /// Attempts granted per question before a difficulty is chosen
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Hints allowed per level before a difficulty is chosen
    pub const DEFAULT_HINTS_AVAILABLE: u32 = 3;

    /// Seconds on the question timer before a difficulty is chosen
    pub const DEFAULT_TIME_REMAINING: u32 = 45;

    /// Experience needed per experience level
    pub const EXPERIENCE_PER_LEVEL: u64 = 1000;

    /// World levels per world tier
    pub const LEVELS_PER_WORLD_TIER: usize = 5;

    /// Default lifetime of a hint in milliseconds
    pub const DEFAULT_HINT_DURATION_MS: u64 = 3000;

    /// Name of the persisted progress record
    pub const SNAPSHOT_NAME: &str = "treasure-quest-progress";

    /// Coins awarded for each treasure opened with a correct answer
    pub const COINS_PER_TREASURE: u64 = 10;

    /// Area every new player starts with
    pub const DEFAULT_AREA: &str = "forest";

    /// Correct answers the HUD treats as a full level
    pub const QUESTIONS_PER_LEVEL_TARGET: u32 = 5;
}
