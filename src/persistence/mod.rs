//! # Persistence Module
//!
//! Durable storage for the persisted subset of player progress.
//!
//! Only economy, achievements, statistics, settings, inventory, power-ups
//! and unlocked areas survive a restart. Session fields are never written.

use crate::{
    config, default_achievements, experience_level_for, Achievement, GameSettings, PlayerStats,
    ProgressState, QuestResult,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// The persisted progress record.
///
/// Missing fields deserialize to their documented defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedSnapshot {
    pub total_coins: u64,
    pub gems: u64,
    pub experience: u64,
    #[serde(rename = "level")]
    pub experience_level: u32,
    pub achievements: Vec<Achievement>,
    pub stats: PlayerStats,
    pub settings: GameSettings,
    pub inventory: Vec<String>,
    pub power_ups: BTreeMap<String, u32>,
    pub unlocked_areas: BTreeSet<String>,
}

impl Default for PersistedSnapshot {
    fn default() -> Self {
        Self {
            total_coins: 0,
            gems: 0,
            experience: 0,
            experience_level: 1,
            achievements: Vec::new(),
            stats: PlayerStats::new(),
            settings: GameSettings::default(),
            inventory: Vec::new(),
            power_ups: BTreeMap::new(),
            unlocked_areas: BTreeSet::from([config::DEFAULT_AREA.to_string()]),
        }
    }
}

impl PersistedSnapshot {
    /// Captures the persisted subset of a state.
    pub fn from_state(state: &ProgressState) -> Self {
        Self {
            total_coins: state.total_coins,
            gems: state.gems,
            experience: state.experience,
            experience_level: state.experience_level,
            achievements: state.achievements.clone(),
            stats: state.stats.clone(),
            settings: state.settings.clone(),
            inventory: state.inventory.clone(),
            power_ups: state.power_ups.clone(),
            unlocked_areas: state.unlocked_areas.clone(),
        }
    }

    /// Restores the persisted subset into a state, leaving session fields alone.
    ///
    /// Achievements from the default table missing in the record are added
    /// locked, so new entries appear for existing players.
    pub fn apply_to(self, state: &mut ProgressState) {
        state.total_coins = self.total_coins;
        state.gems = self.gems;
        state.experience = self.experience;
        state.experience_level = self.experience_level.max(1);
        state.stats = self.stats;
        state.settings = self.settings;
        state.inventory = self.inventory;
        state.power_ups = self.power_ups;
        state.unlocked_areas = self.unlocked_areas;

        let mut achievements = self.achievements;
        for achievement in default_achievements() {
            if !achievements.iter().any(|a| a.id == achievement.id) {
                achievements.push(achievement);
            }
        }
        state.achievements = achievements;
    }

    /// Parses a record.
    pub fn from_json(json: &str) -> QuestResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes a record.
    pub fn to_json(&self) -> QuestResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether the experience level stored matches the experience.
    pub fn is_consistent(&self) -> bool {
        self.experience_level == experience_level_for(self.experience)
    }
}

/// Backend that holds the single named progress record.
pub trait SnapshotStore: Send {
    /// Reads the record, `None` when nothing has been saved yet.
    fn load(&self) -> QuestResult<Option<PersistedSnapshot>>;

    /// Replaces the record.
    fn save(&mut self, snapshot: &PersistedSnapshot) -> QuestResult<()>;
}

/// Stores the record as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Record `name` inside `dir`.
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", name)),
        }
    }

    /// Default record name inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir, config::SNAPSHOT_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> QuestResult<Option<PersistedSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&self.path)?;
        PersistedSnapshot::from_json(&json).map(Some)
    }

    fn save(&mut self, snapshot: &PersistedSnapshot) -> QuestResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write then rename so a crash never leaves a truncated record.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, snapshot.to_json()?)?;
        std::fs::rename(&tmp, &self.path)?;
        log::debug!("Saved progress to {}", self.path.display());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryRecord {
    snapshot: Option<PersistedSnapshot>,
    saves: usize,
}

/// Keeps the record in memory. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    record: Arc<Mutex<MemoryRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with an existing record.
    pub fn with_snapshot(snapshot: PersistedSnapshot) -> Self {
        let store = Self::new();
        store.lock().snapshot = Some(snapshot);
        store
    }

    /// The last saved record.
    pub fn snapshot(&self) -> Option<PersistedSnapshot> {
        self.lock().snapshot.clone()
    }

    /// Number of saves performed.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> QuestResult<Option<PersistedSnapshot>> {
        Ok(self.snapshot())
    }

    fn save(&mut self, snapshot: &PersistedSnapshot) -> QuestResult<()> {
        let mut record = self.lock();
        record.snapshot = Some(snapshot.clone());
        record.saves += 1;
        Ok(())
    }
}
