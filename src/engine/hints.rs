//! # Hint Dispatch Engine
//!
//! Typed publish/subscribe for time-limited assistance cues.
//!
//! Each emitted hint is recorded as active, handed synchronously to the
//! listener registered for its type, and removed again by an expiry task
//! scheduled on the tokio runtime. Expiry tasks are aborted when hints are
//! cleared or the engine is dropped, so no timer outlives the engine.

use crate::{config, Position, QuestError, QuestResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use uuid::Uuid;

/// Hint categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HintType {
    Map,
    Riddle,
    Compass,
    Glow,
    Sound,
    Visual,
}

impl HintType {
    /// Message used by the convenience emitters.
    pub fn default_message(self) -> Option<&'static str> {
        match self {
            HintType::Map => Some("Check your map for the treasure location!"),
            HintType::Riddle => Some("Solve the riddle to find your treasure!"),
            HintType::Compass => Some("Follow the compass to find your treasure!"),
            HintType::Glow => Some("Follow the glowing path!"),
            HintType::Sound | HintType::Visual => None,
        }
    }

    /// How long a hint of this type stays active.
    pub fn default_duration(self) -> Duration {
        let millis = match self {
            HintType::Map => 3000,
            HintType::Riddle => 5000,
            HintType::Compass => 8000,
            HintType::Glow => 4000,
            HintType::Sound | HintType::Visual => config::DEFAULT_HINT_DURATION_MS,
        };
        Duration::from_millis(millis)
    }
}

/// A dispatched hint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub hint_type: HintType,
    pub target_position: Position,
    pub message: Option<String>,
    pub duration: Duration,
}

/// Handle to a scheduled hint expiry.
#[derive(Debug, Clone)]
pub struct HintHandle {
    id: Uuid,
    expiry: AbortHandle,
}

impl HintHandle {
    /// Id of the hint this handle belongs to.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the expiry task has run or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.expiry.is_finished()
    }
}

/// Listener invoked synchronously when a hint of its type is emitted.
pub type HintCallback = Box<dyn Fn(&Hint) + Send + Sync>;

type ActiveHints = Arc<Mutex<Vec<Hint>>>;
type PendingExpiries = Arc<Mutex<HashMap<Uuid, AbortHandle>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes a hint by id. Safe to call for hints already gone.
fn remove_hint(active: &Mutex<Vec<Hint>>, id: Uuid) -> bool {
    let mut hints = lock(active);
    let before = hints.len();
    hints.retain(|hint| hint.id != id);
    hints.len() != before
}

/// Publish/subscribe hub for hints, one listener per type.
pub struct HintEngine {
    runtime: Handle,
    callbacks: HashMap<HintType, HintCallback>,
    active: ActiveHints,
    expiries: PendingExpiries,
}

impl std::fmt::Debug for HintEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HintEngine")
            .field("callbacks", &self.callbacks.keys().collect::<Vec<_>>())
            .field("active", &lock(&self.active).len())
            .finish()
    }
}

impl HintEngine {
    /// Creates an engine bound to the current tokio runtime.
    pub fn new() -> QuestResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| QuestError::Runtime(format!("hint timers need a tokio runtime: {}", e)))?;
        Ok(Self::with_runtime(runtime))
    }

    /// Creates an engine that schedules expiries on `runtime`.
    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            runtime,
            callbacks: HashMap::new(),
            active: Arc::new(Mutex::new(Vec::new())),
            expiries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers the listener for `hint_type`, replacing any previous one.
    pub fn register_hint_callback<F>(&mut self, hint_type: HintType, callback: F)
    where
        F: Fn(&Hint) + Send + Sync + 'static,
    {
        if self.callbacks.insert(hint_type, Box::new(callback)).is_some() {
            log::debug!("Replaced hint listener for {:?}", hint_type);
        }
    }

    /// Records a hint, notifies its listener and schedules its expiry.
    pub fn emit_hint(
        &self,
        hint_type: HintType,
        target_position: Position,
        message: Option<String>,
        duration: Duration,
    ) -> HintHandle {
        let hint = Hint {
            id: Uuid::new_v4(),
            hint_type,
            target_position,
            message,
            duration,
        };
        let id = hint.id;

        lock(&self.active).push(hint.clone());

        match self.callbacks.get(&hint_type) {
            Some(callback) => callback(&hint),
            None => log::debug!("No listener for {:?} hint; recording only", hint_type),
        }

        // Holding the expiry map while spawning keeps the task from
        // unregistering itself before it is registered.
        let mut expiries = lock(&self.expiries);
        let active = Arc::clone(&self.active);
        let pending = Arc::clone(&self.expiries);
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            if remove_hint(&active, id) {
                log::debug!("Hint {} expired", id);
            }
            lock(&pending).remove(&id);
        });
        let expiry = task.abort_handle();
        expiries.insert(id, expiry.clone());

        HintHandle { id, expiry }
    }

    /// Points at the treasure on the map.
    pub fn show_map_hint(&self, target_position: Position) -> HintHandle {
        self.emit_default(HintType::Map, target_position, None)
    }

    /// Shows a riddle, or a generic riddle prompt when none is given.
    pub fn show_riddle_hint(&self, target_position: Position, riddle: Option<&str>) -> HintHandle {
        self.emit_default(HintType::Riddle, target_position, riddle)
    }

    /// Turns on the compass towards the treasure.
    pub fn show_compass_hint(&self, target_position: Position) -> HintHandle {
        self.emit_default(HintType::Compass, target_position, None)
    }

    /// Lights a glowing path to the treasure.
    pub fn show_glow_hint(&self, target_position: Position) -> HintHandle {
        self.emit_default(HintType::Glow, target_position, None)
    }

    fn emit_default(
        &self,
        hint_type: HintType,
        target_position: Position,
        message: Option<&str>,
    ) -> HintHandle {
        let message = message
            .or(hint_type.default_message())
            .map(str::to_string);
        self.emit_hint(hint_type, target_position, message, hint_type.default_duration())
    }

    /// Dispatches the hint attached to a question.
    ///
    /// Does nothing unless both a type and a target are given. Only types
    /// with a convenience emitter are dispatched; the custom message is used
    /// for riddles alone. Emit other types through [`HintEngine::emit_hint`].
    pub fn process_hint_from_question(
        &self,
        hint_type: Option<HintType>,
        target_position: Option<Position>,
        custom_message: Option<&str>,
    ) -> Option<HintHandle> {
        let (hint_type, target) = (hint_type?, target_position?);

        let handle = match hint_type {
            HintType::Map => self.show_map_hint(target),
            HintType::Riddle => self.show_riddle_hint(target, custom_message),
            HintType::Compass => self.show_compass_hint(target),
            HintType::Glow => self.show_glow_hint(target),
            HintType::Sound | HintType::Visual => {
                log::debug!("No question dispatch for {:?} hints", hint_type);
                return None;
            }
        };
        Some(handle)
    }

    /// Snapshot of hints that have not yet expired.
    pub fn get_active_hints(&self) -> Vec<Hint> {
        lock(&self.active).clone()
    }

    /// Removes one hint now and cancels its expiry.
    pub fn cancel_hint(&self, id: Uuid) -> bool {
        if let Some(expiry) = lock(&self.expiries).remove(&id) {
            expiry.abort();
        }
        remove_hint(&self.active, id)
    }

    /// Empties the active list and cancels every pending expiry.
    pub fn clear_all_hints(&self) {
        self.abort_expiries();
        lock(&self.active).clear();
    }

    fn abort_expiries(&self) {
        for (_, expiry) in lock(&self.expiries).drain() {
            expiry.abort();
        }
    }
}

impl Drop for HintEngine {
    fn drop(&mut self) {
        self.abort_expiries();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_map_hint_expires_after_default_duration() {
        let engine = HintEngine::new().unwrap();
        engine.emit_hint(
            HintType::Map,
            Position::new(10, 20),
            None,
            HintType::Map.default_duration(),
        );

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert_eq!(engine.get_active_hints().len(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(engine.get_active_hints().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_receives_hint_synchronously() {
        let mut engine = HintEngine::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        engine.register_hint_callback(HintType::Compass, move |hint| {
            lock(&sink).push(hint.clone());
        });

        engine.show_compass_hint(Position::new(1, 2));

        let seen = lock(&seen);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].target_position, Position::new(1, 2));
        assert_eq!(seen[0].duration, Duration::from_millis(8000));
        assert_eq!(
            seen[0].message.as_deref(),
            Some("Follow the compass to find your treasure!")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_replaces_previous_listener() {
        let mut engine = HintEngine::new().unwrap();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first);
        engine.register_hint_callback(HintType::Glow, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&second);
        engine.register_hint_callback(HintType::Glow, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        engine.show_glow_hint(Position::new(0, 0));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlistened_hint_still_recorded_and_expires() {
        let engine = HintEngine::new().unwrap();
        engine.show_riddle_hint(Position::new(5, 5), None);

        let active = engine.get_active_hints();
        assert_eq!(active.len(), 1);
        assert_eq!(
            active[0].message.as_deref(),
            Some("Solve the riddle to find your treasure!")
        );

        tokio::time::sleep(Duration::from_millis(5001)).await;
        assert!(engine.get_active_hints().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_hint_from_question() {
        let engine = HintEngine::new().unwrap();

        assert!(engine
            .process_hint_from_question(None, Some(Position::new(1, 1)), None)
            .is_none());
        assert!(engine
            .process_hint_from_question(Some(HintType::Map), None, None)
            .is_none());
        assert!(engine.get_active_hints().is_empty());

        engine.process_hint_from_question(
            Some(HintType::Riddle),
            Some(Position::new(1, 1)),
            Some("Where three paths meet"),
        );
        engine.process_hint_from_question(
            Some(HintType::Map),
            Some(Position::new(2, 2)),
            Some("ignored for maps"),
        );

        let active = engine.get_active_hints();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].message.as_deref(), Some("Where three paths meet"));
        assert_eq!(active[0].duration, Duration::from_millis(5000));
        assert_eq!(
            active[1].message.as_deref(),
            Some("Check your map for the treasure location!")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_question_sound_and_visual_hints_are_not_dispatched() {
        let mut engine = HintEngine::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        engine.register_hint_callback(HintType::Sound, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        for hint_type in [HintType::Sound, HintType::Visual] {
            assert!(engine
                .process_hint_from_question(Some(hint_type), Some(Position::new(1, 1)), Some("listen"))
                .is_none());
        }
        assert!(engine.get_active_hints().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // Direct emission still reaches the listener.
        engine.emit_hint(
            HintType::Sound,
            Position::new(1, 1),
            None,
            HintType::Sound.default_duration(),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_all_hints_cancels_expiries() {
        let engine = HintEngine::new().unwrap();
        let handle = engine.show_map_hint(Position::new(3, 3));
        engine.show_glow_hint(Position::new(4, 4));

        engine.clear_all_hints();
        assert!(engine.get_active_hints().is_empty());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(handle.is_finished());

        // A hint emitted after clearing keeps its own timer.
        engine.show_map_hint(Position::new(5, 5));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.get_active_hints().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_single_hint() {
        let engine = HintEngine::new().unwrap();
        let keep = engine.show_compass_hint(Position::new(1, 1));
        let drop_me = engine.show_map_hint(Position::new(2, 2));

        assert!(engine.cancel_hint(drop_me.id()));
        assert!(!engine.cancel_hint(drop_me.id()));

        let active = engine.get_active_hints();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, keep.id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_pending_expiries() {
        let engine = HintEngine::new().unwrap();
        let handle = engine.show_compass_hint(Position::new(1, 1));
        drop(engine);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(handle.is_finished());
    }

    #[test]
    fn test_new_without_runtime_fails() {
        assert!(matches!(HintEngine::new(), Err(QuestError::Runtime(_))));
    }
}
