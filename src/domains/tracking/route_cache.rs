use super::ports::{EntityId, RouteGeometryProvider};
use super::route::Route;
use crate::common::{DomainError, DomainResult};
use crate::config::RouteDefinition;
use crate::domains::logger::DynLogger;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Outcome of a cache lookup. Only `Ready` lets the caller move the entity this tick.
#[derive(Debug, Clone)]
pub enum RouteLookup {
    Ready(Arc<Route>),
    Pending,
    Failed(DomainError),
}

impl RouteLookup {
    pub fn into_result(self, key: &str) -> DomainResult<Arc<Route>> {
        match self {
            RouteLookup::Ready(route) => Ok(route),
            RouteLookup::Pending => Err(DomainError::RouteUnresolved { key: key.to_string() }),
            RouteLookup::Failed(err) => Err(err),
        }
    }
}

#[derive(Debug)]
enum Slot {
    Ready(Arc<Route>),
    Pending,
    Failed { error: DomainError, retry_at: Instant },
}

/// Route geometry per direction key. A miss starts one background fetch; callers never wait.
pub struct RouteCache {
    provider: Arc<dyn RouteGeometryProvider>,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    retry_backoff: Duration,
    logger: DynLogger,
}

impl RouteCache {
    pub fn new(provider: Arc<dyn RouteGeometryProvider>, retry_backoff: Duration, logger: DynLogger) -> Self {
        Self {
            provider,
            slots: Arc::new(Mutex::new(HashMap::new())),
            retry_backoff,
            logger,
        }
    }

    pub async fn resolve(&self, entity_id: EntityId, direction: &RouteDefinition) -> RouteLookup {
        let mut slots = self.slots.lock().await;
        match slots.get(&direction.key) {
            Some(Slot::Ready(route)) => return RouteLookup::Ready(Arc::clone(route)),
            Some(Slot::Pending) => return RouteLookup::Pending,
            Some(Slot::Failed { error, retry_at }) if Instant::now() < *retry_at => {
                return RouteLookup::Failed(error.clone());
            }
            _ => {}
        }
        slots.insert(direction.key.clone(), Slot::Pending);
        drop(slots);

        tracing::debug!(entity_id, key = %direction.key, "requesting route geometry");
        self.spawn_fetch(direction.clone());
        RouteLookup::Pending
    }

    pub async fn cached(&self, key: &str) -> Option<Arc<Route>> {
        match self.slots.lock().await.get(key) {
            Some(Slot::Ready(route)) => Some(Arc::clone(route)),
            _ => None,
        }
    }

    /// Forgets a resolved route so the next lookup fetches it again. In-flight fetches are kept.
    pub async fn invalidate(&self, key: &str) -> bool {
        let mut slots = self.slots.lock().await;
        if matches!(slots.get(key), Some(Slot::Pending)) {
            return false;
        }
        slots.remove(key).is_some()
    }

    fn spawn_fetch(&self, direction: RouteDefinition) {
        let provider = Arc::clone(&self.provider);
        let slots = Arc::clone(&self.slots);
        let logger = Arc::clone(&self.logger);
        let backoff = self.retry_backoff;

        tokio::spawn(async move {
            let (start, end) = (direction.origin.point(), direction.destination.point());
            // Runs apart so a panicking provider still settles the slot.
            let fetched = match tokio::spawn(async move { provider.fetch_route(start, end).await }).await {
                Ok(fetched) => fetched,
                Err(e) => Err(DomainError::InfrastructureError(format!("route fetch task failed: {}", e))),
            };
            let outcome = fetched.and_then(|points| {
                Route::new(
                    direction.key.clone(),
                    direction.origin.name.clone(),
                    direction.destination.name.clone(),
                    points,
                )
            });

            let slot = match outcome {
                Ok(route) => {
                    logger.info(&format!(
                        "Fetched route {} from {} to {} ({} points)",
                        route.key(),
                        route.origin(),
                        route.destination(),
                        route.len()
                    ));
                    Slot::Ready(Arc::new(route))
                }
                Err(e) => {
                    let error = DomainError::RouteFetchFailed {
                        key: direction.key.clone(),
                        reason: e.to_string(),
                    };
                    logger.warn(&error.to_string());
                    Slot::Failed {
                        error,
                        retry_at: Instant::now() + backoff,
                    }
                }
            };
            slots.lock().await.insert(direction.key, slot);
        });
    }
}
