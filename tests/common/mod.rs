#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

use transit_tracker::config::{RouteDefinition, RoutesConfig, SimulationConfig};
use transit_tracker::domains::logger::DomainLogger;
use transit_tracker::domains::tracking::{ActiveEntity, EntityId, FleetStore, RouteGeometryProvider};
use transit_tracker::{DomainError, DomainResult, GeoPoint, NamedPoint};

pub const ROUTE_KEY: &str = "A-B";

/// Two-point route A(0,0) -> B(0,10) used by every entity.
pub fn routes() -> RoutesConfig {
    RoutesConfig {
        default_route: ROUTE_KEY.to_string(),
        definitions: vec![RouteDefinition {
            key: ROUTE_KEY.to_string(),
            label_contains: String::new(),
            origin: NamedPoint { name: "A".to_string(), lat: 0.0, lng: 0.0 },
            destination: NamedPoint { name: "B".to_string(), lat: 0.0, lng: 10.0 },
        }],
    }
}

pub fn two_points() -> Vec<GeoPoint> {
    vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 10.0)]
}

/// Half a segment per 100 ms tick, no smoothing lag, retry failed routes every tick.
pub fn settings() -> SimulationConfig {
    SimulationConfig {
        tick_interval_ms: 100,
        speed_factor: 0.005,
        smoothing_window: 1,
        smoothing_horizon_ms: 1000,
        resnapshot_interval_ms: 5000,
        subscriber_queue_capacity: 8,
        max_lagged_batches: 50,
        route_retry_backoff_ms: 0,
        position_write_queue: 64,
    }
}

pub struct StubProvider {
    response: Mutex<DomainResult<Vec<GeoPoint>>>,
    calls: AtomicUsize,
    gate: Semaphore,
}

impl StubProvider {
    pub fn new(points: Vec<GeoPoint>) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(points)),
            calls: AtomicUsize::new(0),
            gate: Semaphore::new(Semaphore::MAX_PERMITS),
        })
    }

    /// Holds every fetch until [`StubProvider::release`] is called.
    pub fn gated(points: Vec<GeoPoint>) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(points)),
            calls: AtomicUsize::new(0),
            gate: Semaphore::new(0),
        })
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        let provider = Self::new(Vec::new());
        provider.set_response(Err(DomainError::InfrastructureError(reason.to_string())));
        provider
    }

    pub fn release(&self) {
        self.gate.add_permits(1_000);
    }

    pub fn set_response(&self, response: DomainResult<Vec<GeoPoint>>) {
        *self.response.lock().unwrap() = response;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RouteGeometryProvider for StubProvider {
    async fn fetch_route(&self, _start: GeoPoint, _end: GeoPoint) -> DomainResult<Vec<GeoPoint>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| DomainError::InfrastructureError(e.to_string()))?;
        self.response.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct RecordingStore {
    pub entities: Mutex<Vec<ActiveEntity>>,
    pub writes: Mutex<Vec<(EntityId, GeoPoint)>>,
    pub events: Mutex<Vec<&'static str>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub list_delay: Mutex<Duration>,
    pub list_calls: AtomicUsize,
}

impl RecordingStore {
    pub fn with(entities: Vec<ActiveEntity>) -> Arc<Self> {
        let store = Self::default();
        *store.entities.lock().unwrap() = entities;
        Arc::new(store)
    }

    pub fn deactivate(&self, id: EntityId) {
        self.entities.lock().unwrap().retain(|e| e.id != id);
    }

    pub fn writes(&self) -> Vec<(EntityId, GeoPoint)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FleetStore for RecordingStore {
    async fn list_active(&self) -> DomainResult<Vec<ActiveEntity>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push("enter");
        let delay = *self.list_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.events.lock().unwrap().push("exit");

        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DomainError::PersistenceReadFailed("database unavailable".to_string()));
        }
        Ok(self.entities.lock().unwrap().clone())
    }

    async fn update_position(&self, id: EntityId, position: GeoPoint) -> DomainResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::PersistenceWriteFailed {
                id,
                reason: "disk full".to_string(),
            });
        }
        self.writes.lock().unwrap().push((id, position));
        Ok(())
    }
}

pub struct CaptureLogger {
    pub messages: Arc<Mutex<Vec<String>>>,
}

impl CaptureLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { messages: Arc::new(Mutex::new(Vec::new())) })
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages.lock().unwrap().iter().any(|m| m.contains(needle))
    }
}

impl DomainLogger for CaptureLogger {
    fn info(&self, msg: &str) { self.messages.lock().unwrap().push(format!("INFO:{}", msg)); }
    fn warn(&self, msg: &str) { self.messages.lock().unwrap().push(format!("WARN:{}", msg)); }
    fn error(&self, msg: &str) { self.messages.lock().unwrap().push(format!("ERR:{}", msg)); }
}

/// Lets spawned fetch tasks run without moving a paused clock.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}
