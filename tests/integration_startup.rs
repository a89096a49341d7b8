//! Integration test to ensure a session can start up without errors.

use std::sync::Arc;
use treasure_quest::{
    ContentCatalog, GameSession, ProgressStore, QuestResult, Scene, SessionStatus,
};

#[tokio::test]
async fn test_basic_startup() -> QuestResult<()> {
    let catalog = Arc::new(ContentCatalog::builtin()?);
    let store = ProgressStore::new(catalog);
    assert_eq!(store.status(), SessionStatus::NotStarted);

    let mut session = GameSession::new(store)?;
    session.start();

    // Verify the session is properly initialized
    let state = session.store().state();
    assert_eq!(state.status(), SessionStatus::Running);
    assert_eq!(state.scene, Scene::World);
    assert_eq!(state.level_index, 0);
    assert_eq!(state.world_level, 1);
    assert!(session.store().current_question_id().is_none());

    // Verify the first level is playable
    let level = session.current_level().expect("first level should exist");
    assert_eq!(level.name, "Whispering Woods");
    assert_eq!(session.remaining_treasures().len(), level.treasures.len());

    Ok(())
}

#[tokio::test]
async fn test_custom_catalog_from_file() -> QuestResult<()> {
    let builtin = ContentCatalog::builtin()?;
    let levels = builtin.levels()[..1].to_vec();

    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("levels.json");
    std::fs::write(&path, serde_json::to_string(&levels)?)?;

    let catalog = ContentCatalog::from_path(&path)?;
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.question_count(), 5);

    let mut session = GameSession::new(ProgressStore::new(Arc::new(catalog)))?;
    session.start();
    assert!(session.open_treasure("golden_acorn").is_ok());

    Ok(())
}

#[test]
fn test_session_needs_runtime() {
    let catalog = Arc::new(ContentCatalog::builtin().unwrap());
    assert!(GameSession::new(ProgressStore::new(catalog)).is_err());
}
