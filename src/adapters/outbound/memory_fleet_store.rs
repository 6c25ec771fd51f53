use crate::common::{DomainError, DomainResult, GeoPoint};
use crate::config::SeedVehicle;
use crate::domains::tracking::{ActiveEntity, EntityId, FleetStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Process-local fleet table for demos and tests.
#[derive(Default)]
pub struct InMemoryFleetStore {
    vehicles: RwLock<BTreeMap<EntityId, ActiveEntity>>,
}

impl InMemoryFleetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vehicles(vehicles: impl IntoIterator<Item = ActiveEntity>) -> Self {
        let store = Self::new();
        for vehicle in vehicles {
            store.upsert(vehicle);
        }
        store
    }

    pub fn from_seed(seed: &[SeedVehicle]) -> Self {
        Self::with_vehicles(seed.iter().map(|v| ActiveEntity::new(v.id, v.label.clone())))
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<EntityId, ActiveEntity>> {
        self.vehicles.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<EntityId, ActiveEntity>> {
        self.vehicles.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn upsert(&self, vehicle: ActiveEntity) {
        self.write().insert(vehicle.id, vehicle);
    }

    /// Returns false for an unknown id.
    pub fn set_status(&self, id: EntityId, status: &str) -> bool {
        match self.write().get_mut(&id) {
            Some(vehicle) => {
                vehicle.status = status.to_string();
                true
            }
            None => false,
        }
    }

    pub fn position(&self, id: EntityId) -> Option<GeoPoint> {
        self.read().get(&id).and_then(|v| v.last_position)
    }
}

#[async_trait]
impl FleetStore for InMemoryFleetStore {
    async fn list_active(&self) -> DomainResult<Vec<ActiveEntity>> {
        Ok(self
            .read()
            .values()
            .filter(|v| v.status == "active")
            .cloned()
            .collect())
    }

    async fn update_position(&self, id: EntityId, position: GeoPoint) -> DomainResult<()> {
        match self.write().get_mut(&id) {
            Some(vehicle) => {
                vehicle.last_position = Some(position);
                Ok(())
            }
            None => Err(DomainError::PersistenceWriteFailed {
                id,
                reason: "no such vehicle".to_string(),
            }),
        }
    }
}
