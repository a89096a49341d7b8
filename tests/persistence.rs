//! Progress survives a restart through the JSON file store.

use std::sync::Arc;
use tempfile::TempDir;
use treasure_quest::{
    achievements, ContentCatalog, Difficulty, JsonFileStore, PersistedSnapshot, ProgressStore,
    QuestResult, SessionStatus, SettingsUpdate, SnapshotStore,
};

fn catalog() -> QuestResult<Arc<ContentCatalog>> {
    Ok(Arc::new(ContentCatalog::builtin()?))
}

#[test]
fn test_progress_round_trip() -> QuestResult<()> {
    let temp_dir = TempDir::new()?;

    let before = {
        let mut store = ProgressStore::open(catalog()?, JsonFileStore::in_dir(temp_dir.path()));
        store.start_game();
        store.add_score(100);
        store.add_coins(30);
        store.add_gems(2);
        store.add_experience(1200);
        store.add_to_inventory("forest_map");
        store.grant_power_up("time_boost", 2);
        store.unlock_area("caverns");
        store.set_current_question(Some("math_addition_1"));
        store.submit_answer(0);
        store.increment_correct();
        store.increment_hints();
        store.increment_play_time(37);
        store.record_treasure_found();
        store.unlock_achievement(achievements::FIRST_TREASURE);
        store.update_settings(&SettingsUpdate {
            music_volume: Some(0.25),
            difficulty: Some(Difficulty::Hard),
            ..Default::default()
        });
        let snapshot = PersistedSnapshot::from_state(store.state());
        snapshot
    };
    assert!(before.stats.average_time > 0.0);

    let store = ProgressStore::open(catalog()?, JsonFileStore::in_dir(temp_dir.path()));
    let state = store.state();

    // Every persisted field comes back unchanged
    assert_eq!(PersistedSnapshot::from_state(state), before);
    assert_eq!(state.experience_level, 2);
    assert_eq!(state.difficulty, Difficulty::Hard);
    assert_eq!(store.max_attempts(), 1);

    // Session fields do not
    assert_eq!(state.score, 0);
    assert_eq!(state.level_index, 0);
    assert_eq!(store.status(), SessionStatus::NotStarted);
    assert!(store.current_question_id().is_none());

    Ok(())
}

#[test]
fn test_corrupt_record_falls_back_to_defaults() -> QuestResult<()> {
    let temp_dir = TempDir::new()?;
    let persistence = JsonFileStore::in_dir(temp_dir.path());
    std::fs::write(persistence.path(), "{ this is not json")?;

    let store = ProgressStore::open(catalog()?, persistence);
    assert_eq!(store.state().total_coins, 0);
    assert_eq!(store.state().experience_level, 1);

    Ok(())
}

#[test]
fn test_disabled_autosave_still_saves_on_drop() -> QuestResult<()> {
    let temp_dir = TempDir::new()?;

    {
        let mut store = ProgressStore::open(catalog()?, JsonFileStore::in_dir(temp_dir.path()));
        store.update_settings(&SettingsUpdate {
            auto_save: Some(false),
            ..Default::default()
        });
        store.add_coins(5);
    }

    let saved = JsonFileStore::in_dir(temp_dir.path())
        .load()?
        .expect("progress should be saved on drop");
    assert_eq!(saved.total_coins, 5);
    assert!(!saved.settings.auto_save);

    Ok(())
}

#[test]
fn test_record_from_older_version_loads() -> QuestResult<()> {
    let temp_dir = TempDir::new()?;
    let persistence = JsonFileStore::in_dir(temp_dir.path());
    std::fs::write(
        persistence.path(),
        r#"{ "totalCoins": 12, "level": 1, "settings": { "musicVolume": 0.1 } }"#,
    )?;

    let store = ProgressStore::open(catalog()?, persistence);
    let state = store.state();
    assert_eq!(state.total_coins, 12);
    assert_eq!(state.settings.music_volume, 0.1);
    assert_eq!(state.settings.sfx_volume, 0.8);
    assert_eq!(
        state.achievements.len(),
        achievements::default_achievements().len()
    );

    let snapshot = PersistedSnapshot::from_state(state);
    assert!(snapshot.is_consistent());

    Ok(())
}
