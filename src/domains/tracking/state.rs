use super::ports::EntityId;
use super::route::Route;
use super::smoothing::SmoothingWindow;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::time::Instant;

/// Per-entity simulation state. Only the tick handler mutates it.
#[derive(Debug, Clone, Default)]
pub struct EntityKinematicState {
    pub route: Option<Arc<Route>>,
    /// Fractional index into `route`, in `[0, route.len())`.
    pub progress: f64,
    pub last_update: Option<Instant>,
    pub window: SmoothingWindow,
}

/// Owned map of kinematic state, keyed by entity id.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    states: BTreeMap<EntityId, EntityKinematicState>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure(&mut self, id: EntityId) -> &mut EntityKinematicState {
        self.states.entry(id).or_default()
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityKinematicState> {
        self.states.get(&id)
    }

    /// Drops state for every entity not in `active`; returns how many were removed.
    pub fn retain_active(&mut self, active: &HashSet<EntityId>) -> usize {
        let before = self.states.len();
        self.states.retain(|id, _| active.contains(id));
        before - self.states.len()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&EntityId, &mut EntityKinematicState)> {
        self.states.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
