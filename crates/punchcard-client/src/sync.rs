//! The balance engine: one authoritative in-process balance, fed by the
//! profile fetch, realtime pushes, and confirmed local commands.
//!
//! All balance mutations flow through this type. The dispatcher and the
//! channel never write shared state directly; they call the update entry
//! points here, and every applied update notifies all current observers
//! synchronously with the new state. Subscribing replays the latest known
//! value immediately, so a late subscriber never waits for the next update.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use punchcard_core::{BalanceSource, BalanceState};

/// Where the engine is in its fetch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No fetch attempted yet; the value is the cached seed.
    Uninitialized,
    /// Profile fetch in flight.
    Fetching,
    /// At least one authoritative update has been applied.
    Synced,
    /// The fetch failed; serving the last known value until something
    /// fresher arrives.
    Degraded,
}

/// Handle identifying one registered balance observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

type Observer = Arc<dyn Fn(BalanceState) + Send + Sync>;

/// The authoritative balance state machine.
///
/// Never torn down while the process lives; [`reset`](Self::reset) returns
/// it to its initial state on logout.
pub struct BalanceEngine {
    inner: Mutex<EngineInner>,
}

struct EngineInner {
    phase: SyncPhase,
    state: BalanceState,
    next_observer_id: u64,
    observers: HashMap<u64, Observer>,
}

impl BalanceEngine {
    /// Create an engine seeded with a cached balance, zero if none is known.
    pub fn new(cached: Option<i64>) -> Self {
        Self {
            inner: Mutex::new(EngineInner {
                phase: SyncPhase::Uninitialized,
                state: BalanceState::seeded(cached.unwrap_or(0)),
                next_observer_id: 0,
                observers: HashMap::new(),
            }),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SyncPhase {
        self.inner.lock().phase
    }

    /// Snapshot of the current balance state.
    pub fn state(&self) -> BalanceState {
        self.inner.lock().state
    }

    /// Register an observer.
    ///
    /// The observer is invoked immediately with the retained state, then on
    /// every subsequent applied update.
    pub fn subscribe(&self, observer: impl Fn(BalanceState) + Send + Sync + 'static) -> ObserverId {
        let observer: Observer = Arc::new(observer);
        let (id, state) = {
            let mut inner = self.inner.lock();
            let id = inner.next_observer_id;
            inner.next_observer_id += 1;
            inner.observers.insert(id, observer.clone());
            (id, inner.state)
        };
        observer(state);
        ObserverId(id)
    }

    /// Remove an observer. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: ObserverId) {
        self.inner.lock().observers.remove(&id.0);
    }

    /// Seed the retained value from session storage, before any fetch.
    ///
    /// Only effective while uninitialized; once anything fresher has been
    /// applied the cached value is stale by definition.
    pub fn seed(&self, value: i64) {
        let mut inner = self.inner.lock();
        if inner.phase != SyncPhase::Uninitialized {
            return;
        }
        inner.state.value = value;
        inner.state.revision += 1;
        let (state, observers) = inner.snapshot();
        drop(inner);
        broadcast(state, &observers);
    }

    /// Mark the profile fetch as started and capture the revision the
    /// result must be ordered against.
    pub fn begin_fetch(&self) -> u64 {
        let mut inner = self.inner.lock();
        inner.phase = SyncPhase::Fetching;
        inner.state.revision
    }

    /// Apply a completed profile fetch.
    ///
    /// The fetched value only lands if nothing else was applied since
    /// [`begin_fetch`](Self::begin_fetch); a push arriving mid-flight is
    /// more recent than the fetch by definition and wins. Returns whether
    /// the value was applied.
    pub fn complete_fetch(&self, snapshot: u64, value: i64) -> bool {
        let notify = {
            let mut inner = self.inner.lock();
            // Anything applied since the snapshot is newer than the fetch;
            // the phase was already advanced by whatever superseded it.
            if inner.state.revision != snapshot {
                tracing::info!(
                    value,
                    "discarding fetch result superseded by a newer update"
                );
                return false;
            }
            inner.apply(value, BalanceSource::Fetched);
            inner.snapshot()
        };
        let (state, observers) = notify;
        broadcast(state, &observers);
        true
    }

    /// Record a failed profile fetch.
    ///
    /// Keeps the last known value and the session; a transient fetch
    /// failure must never eject an otherwise-valid session.
    pub fn fail_fetch(&self) {
        let mut inner = self.inner.lock();
        if inner.phase == SyncPhase::Fetching {
            inner.phase = SyncPhase::Degraded;
        }
        tracing::warn!(
            value = inner.state.value,
            "profile fetch failed; keeping last known balance"
        );
    }

    /// Apply a pushed balance. Pushes unconditionally overwrite the current
    /// value, whatever its source.
    pub fn apply_push(&self, value: i64) {
        let (state, observers) = {
            let mut inner = self.inner.lock();
            inner.apply(value, BalanceSource::Pushed);
            inner.snapshot()
        };
        broadcast(state, &observers);
    }

    /// Apply a confirmed local command's balance.
    pub fn apply_optimistic(&self, value: i64) {
        let (state, observers) = {
            let mut inner = self.inner.lock();
            inner.apply(value, BalanceSource::Optimistic);
            inner.snapshot()
        };
        broadcast(state, &observers);
    }

    /// Return to the initial state and drop every observer.
    ///
    /// Called exactly once per session end; part of the single teardown
    /// signal alongside the channel disconnect.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.phase = SyncPhase::Uninitialized;
        // The revision keeps climbing across sessions so a fetch still in
        // flight at logout can never land on the fresh state.
        inner.state = BalanceState {
            value: 0,
            source: BalanceSource::Fetched,
            revision: inner.state.revision + 1,
        };
        inner.observers.clear();
        tracing::debug!("balance engine reset");
    }
}

impl EngineInner {
    fn apply(&mut self, value: i64, source: BalanceSource) {
        self.state = BalanceState {
            value,
            source,
            revision: self.state.revision + 1,
        };
        self.phase = SyncPhase::Synced;
        tracing::debug!(value, ?source, "balance updated");
    }

    fn snapshot(&self) -> (BalanceState, Vec<Observer>) {
        (self.state, self.observers.values().cloned().collect())
    }
}

// Observers run outside the lock so they may re-enter the engine.
fn broadcast(state: BalanceState, observers: &[Observer]) {
    for observer in observers {
        observer(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(engine: &BalanceEngine) -> (ObserverId, Arc<Mutex<Vec<BalanceState>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = engine.subscribe(move |state| sink.lock().push(state));
        (id, seen)
    }

    #[test]
    fn subscribe_replays_latest_value() {
        let engine = BalanceEngine::new(Some(40));
        let (_, seen) = recording(&engine);
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(seen.lock()[0].value, 40);

        engine.apply_push(75);
        let (_, late) = recording(&engine);
        assert_eq!(late.lock()[0].value, 75);
        assert_eq!(late.lock()[0].source, BalanceSource::Pushed);
    }

    #[test]
    fn last_push_wins_over_any_sequence() {
        let engine = BalanceEngine::new(None);
        let (_, seen) = recording(&engine);
        for value in [10, 200, 30, 55] {
            engine.apply_push(value);
        }
        let last = *seen.lock().last().unwrap();
        assert_eq!(last.value, 55);
        assert_eq!(last.source, BalanceSource::Pushed);
        assert_eq!(engine.state().value, 55);
    }

    #[test]
    fn failed_fetch_keeps_cached_value() {
        let engine = BalanceEngine::new(Some(40));
        engine.begin_fetch();
        engine.fail_fetch();
        assert_eq!(engine.phase(), SyncPhase::Degraded);
        assert_eq!(engine.state().value, 40);
    }

    #[test]
    fn successful_fetch_lands_when_nothing_newer_arrived() {
        let engine = BalanceEngine::new(None);
        let snapshot = engine.begin_fetch();
        assert_eq!(engine.phase(), SyncPhase::Fetching);
        assert!(engine.complete_fetch(snapshot, 120));
        assert_eq!(engine.phase(), SyncPhase::Synced);
        assert_eq!(engine.state().source, BalanceSource::Fetched);
        assert_eq!(engine.state().value, 120);
    }

    #[test]
    fn push_during_fetch_beats_the_fetch_result() {
        let engine = BalanceEngine::new(None);
        let snapshot = engine.begin_fetch();
        engine.apply_push(80);
        assert!(!engine.complete_fetch(snapshot, 120));
        assert_eq!(engine.state().value, 80);
        assert_eq!(engine.state().source, BalanceSource::Pushed);
        assert_eq!(engine.phase(), SyncPhase::Synced);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let engine = BalanceEngine::new(None);
        let (id, seen) = recording(&engine);
        engine.unsubscribe(id);
        engine.apply_push(9);
        assert_eq!(seen.lock().len(), 1); // only the replay
    }

    #[test]
    fn reset_drops_observers_and_state() {
        let engine = BalanceEngine::new(Some(40));
        let (_, seen) = recording(&engine);
        engine.apply_push(75);
        engine.reset();
        engine.apply_push(99);
        assert_eq!(seen.lock().len(), 2); // replay + first push only
        assert_eq!(engine.phase(), SyncPhase::Synced);
        assert_eq!(engine.state().value, 99);
    }

    #[test]
    fn fetch_completing_after_reset_is_discarded() {
        let engine = BalanceEngine::new(Some(40));
        let snapshot = engine.begin_fetch();
        engine.reset();
        assert!(!engine.complete_fetch(snapshot, 120));
        assert_eq!(engine.state().value, 0);
    }

    #[test]
    fn seed_is_ignored_once_initialized() {
        let engine = BalanceEngine::new(None);
        engine.seed(40);
        assert_eq!(engine.state().value, 40);
        engine.apply_push(80);
        engine.seed(40);
        assert_eq!(engine.state().value, 80);
    }
}
