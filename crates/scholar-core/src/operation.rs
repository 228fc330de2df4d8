//! Per-entity operation state.
//!
//! [`OperationTracker`] is a keyed map of idle/in-flight/failed states. It is the
//! only synchronization used by the client: it prevents duplicate triggering of
//! the same operation on the same entity (two deletes of one post, two downloads
//! of one attachment) while letting operations on different keys run
//! concurrently. It does not provide transactional isolation.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationState {
    Idle,
    InFlight,
    /// Last attempt failed; the message is shown until dismissed or retried
    Failed(String),
}

#[derive(Debug)]
pub struct OperationTracker<K> {
    states: Arc<Mutex<HashMap<K, OperationState>>>,
}

impl<K> Clone for OperationTracker<K> {
    fn clone(&self) -> Self {
        Self {
            states: Arc::clone(&self.states),
        }
    }
}

impl<K> Default for OperationTracker<K> {
    fn default() -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

fn lock<K>(states: &Mutex<HashMap<K, OperationState>>) -> MutexGuard<'_, HashMap<K, OperationState>> {
    // A panic while holding the lock cannot leave the map half-updated.
    states.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<K: Eq + Hash + Clone> OperationTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` in flight. Returns `None` if an operation on `key` is already running.
    pub fn try_begin(&self, key: K) -> Option<OperationGuard<K>> {
        let mut states = lock(&self.states);
        if matches!(states.get(&key), Some(OperationState::InFlight)) {
            return None;
        }
        states.insert(key.clone(), OperationState::InFlight);
        Some(OperationGuard {
            states: Arc::clone(&self.states),
            key: Some(key),
        })
    }

    pub fn state(&self, key: &K) -> OperationState {
        lock(&self.states)
            .get(key)
            .cloned()
            .unwrap_or(OperationState::Idle)
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.state(key) == OperationState::InFlight
    }

    pub fn in_flight_count(&self) -> usize {
        lock(&self.states)
            .values()
            .filter(|s| **s == OperationState::InFlight)
            .count()
    }

    /// Dismiss a failure for `key`. In-flight operations are left untouched.
    pub fn clear_failure(&self, key: &K) {
        let mut states = lock(&self.states);
        if matches!(states.get(key), Some(OperationState::Failed(_))) {
            states.remove(key);
        }
    }

    /// Dismiss every recorded failure.
    pub fn clear_failures(&self) {
        lock(&self.states).retain(|_, state| !matches!(state, OperationState::Failed(_)));
    }
}

/// Marks one operation as in flight until finished, failed, or dropped.
///
/// Dropping the guard without calling [`finish`](Self::finish) or
/// [`fail`](Self::fail) returns the key to idle, so an abandoned future never
/// leaves an entity stuck in flight.
#[derive(Debug)]
pub struct OperationGuard<K: Eq + Hash> {
    states: Arc<Mutex<HashMap<K, OperationState>>>,
    key: Option<K>,
}

impl<K: Eq + Hash> OperationGuard<K> {
    pub fn finish(mut self) {
        if let Some(key) = self.key.take() {
            lock(&self.states).remove(&key);
        }
    }

    pub fn fail(mut self, message: impl Into<String>) {
        if let Some(key) = self.key.take() {
            lock(&self.states).insert(key, OperationState::Failed(message.into()));
        }
    }
}

impl<K: Eq + Hash> Drop for OperationGuard<K> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            lock(&self.states).remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_cannot_begin_twice() {
        let tracker = OperationTracker::new();
        let guard = tracker.try_begin("post-1".to_string()).unwrap();
        assert!(tracker.try_begin("post-1".to_string()).is_none());
        assert!(tracker.is_in_flight(&"post-1".to_string()));

        guard.finish();
        assert_eq!(tracker.state(&"post-1".to_string()), OperationState::Idle);
        assert!(tracker.try_begin("post-1".to_string()).is_some());
    }

    #[test]
    fn test_different_keys_run_concurrently() {
        let tracker = OperationTracker::new();
        let a = tracker.try_begin(("p1", "a.pdf")).unwrap();
        let b = tracker.try_begin(("p1", "b.pdf")).unwrap();
        assert_eq!(tracker.in_flight_count(), 2);

        a.finish();
        assert!(!tracker.is_in_flight(&("p1", "a.pdf")));
        assert!(tracker.is_in_flight(&("p1", "b.pdf")));
        drop(b);
        assert_eq!(tracker.in_flight_count(), 0);
    }

    #[test]
    fn test_failure_is_recorded_and_retriable() {
        let tracker = OperationTracker::new();
        tracker.try_begin(7u32).unwrap().fail("Download link not available");
        assert_eq!(
            tracker.state(&7),
            OperationState::Failed("Download link not available".to_string())
        );

        // A failed operation can be triggered again.
        let retry = tracker.try_begin(7).unwrap();
        assert!(tracker.is_in_flight(&7));
        retry.fail("still broken");
        tracker.clear_failure(&7);
        assert_eq!(tracker.state(&7), OperationState::Idle);
    }

    #[test]
    fn test_dropped_guard_releases_key() {
        let tracker = OperationTracker::new();
        {
            let _guard = tracker.try_begin("abandoned").unwrap();
            assert!(tracker.is_in_flight(&"abandoned"));
        }
        assert_eq!(tracker.state(&"abandoned"), OperationState::Idle);
    }

    #[test]
    fn test_clones_share_state() {
        let tracker = OperationTracker::new();
        let other = tracker.clone();
        let _guard = tracker.try_begin(1u8).unwrap();
        assert!(other.try_begin(1u8).is_none());
    }

    #[test]
    fn test_clear_failures_keeps_in_flight() {
        let tracker = OperationTracker::new();
        tracker.try_begin("a").unwrap().fail("boom");
        tracker.try_begin("b").unwrap().fail("boom");
        let running = tracker.try_begin("c").unwrap();

        tracker.clear_failures();
        assert_eq!(tracker.state(&"a"), OperationState::Idle);
        assert_eq!(tracker.state(&"b"), OperationState::Idle);
        assert!(tracker.is_in_flight(&"c"));
        drop(running);
    }
}
