//! Subscriber registry for engine state changes.

use super::engine::EngineState;

/// Receives every published [`EngineState`].
pub trait StateObserver: Send {
    fn on_state(&mut self, state: &EngineState);
}

impl<F> StateObserver for F
where
    F: FnMut(&EngineState) + Send,
{
    fn on_state(&mut self, state: &EngineState) {
        self(state)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(crate) u64);

/// Observers in subscription order.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next_id: u64,
    entries: Vec<(ObserverId, Box<dyn StateObserver>)>,
}

impl ObserverRegistry {
    pub(crate) fn add(&mut self, observer: Box<dyn StateObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.insert(id, observer);
        id
    }

    /// Register under an id allocated elsewhere (the async driver hands ids
    /// out before the command reaches the engine).
    pub(crate) fn insert(&mut self, id: ObserverId, observer: Box<dyn StateObserver>) {
        self.next_id = self.next_id.max(id.0 + 1);
        self.entries.push((id, observer));
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    pub(crate) fn notify(&mut self, state: &EngineState) {
        for (_, observer) in self.entries.iter_mut() {
            observer.on_state(state);
        }
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.entries.len())
            .finish()
    }
}
