use crate::common::{DomainResult, GeoPoint};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub type EntityId = i64;

/// A tracked vehicle as the persistence side knows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEntity {
    pub id: EntityId,
    pub label: String,
    pub status: String,
    /// Last position written back by the tick loop, if any.
    pub last_position: Option<GeoPoint>,
}

impl ActiveEntity {
    pub fn new(id: EntityId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            status: "active".to_string(),
            last_position: None,
        }
    }
}

/// Port to the external directions service. Implementations may fail or return
/// nothing at any time; the route cache retries on later ticks.
#[async_trait]
pub trait RouteGeometryProvider: Send + Sync {
    async fn fetch_route(&self, start: GeoPoint, end: GeoPoint) -> DomainResult<Vec<GeoPoint>>;
}

/// Port to the store holding vehicles and their last known positions.
#[async_trait]
pub trait FleetStore: Send + Sync {
    /// Entities with status `active`, read once per tick.
    async fn list_active(&self) -> DomainResult<Vec<ActiveEntity>>;

    async fn update_position(&self, id: EntityId, position: GeoPoint) -> DomainResult<()>;
}
