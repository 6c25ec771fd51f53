use super::snapshot::{PositionEntry, SnapshotMessage};
use super::subscription::{SubscriberSet, Subscription};
use super::writer::PositionWriter;
use crate::config::SimulationConfig;
use crate::domains::logger::DynLogger;
use crate::domains::tracking::{
    ActiveEntity, DirectionTable, EntityId, EntityKinematicState, EntityRegistry, FleetStore,
    PositionSimulator, RouteCache, RouteGeometryProvider, RouteLookup, SmoothingFilter,
};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

/// What one tick did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub active: usize,
    pub published: usize,
    pub skipped_pending: usize,
    pub skipped_failed: usize,
    pub unsmoothed: usize,
    pub delivered: usize,
    pub dropped: usize,
    pub disconnected: usize,
}

enum EntityOutcome {
    Smoothed(PositionEntry),
    Pending,
    Failed,
    Unsmoothed,
}

struct HubShared {
    settings: SimulationConfig,
    store: Arc<dyn FleetStore>,
    routes: RouteCache,
    directions: DirectionTable,
    simulator: PositionSimulator,
    filter: SmoothingFilter,
    /// Held for a whole tick; this is what keeps ticks from overlapping.
    registry: Mutex<EntityRegistry>,
    latest: RwLock<HashMap<EntityId, PositionEntry>>,
    subscribers: Arc<SubscriberSet>,
    writer: PositionWriter,
    logger: DynLogger,
}

/// Drives the simulation tick and fans smoothed positions out to subscribers.
#[derive(Clone)]
pub struct BroadcastHub {
    shared: Arc<HubShared>,
}

impl BroadcastHub {
    /// Must be called from within a tokio runtime (spawns the position writer).
    pub fn new(
        settings: SimulationConfig,
        store: Arc<dyn FleetStore>,
        provider: Arc<dyn RouteGeometryProvider>,
        directions: DirectionTable,
        logger: DynLogger,
    ) -> Self {
        let shared = HubShared {
            routes: RouteCache::new(provider, settings.route_retry_backoff(), Arc::clone(&logger)),
            simulator: PositionSimulator::new(settings.speed_factor),
            filter: SmoothingFilter::new(settings.smoothing_window, settings.smoothing_horizon()),
            registry: Mutex::new(EntityRegistry::new()),
            latest: RwLock::new(HashMap::new()),
            subscribers: Arc::new(SubscriberSet::new(settings.max_lagged_batches, Arc::clone(&logger))),
            writer: PositionWriter::spawn(Arc::clone(&store), settings.position_write_queue, Arc::clone(&logger)),
            store,
            directions,
            settings,
            logger,
        };
        Self { shared: Arc::new(shared) }
    }

    pub fn route_cache(&self) -> &RouteCache {
        &self.shared.routes
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }

    pub async fn tracked_entities(&self) -> usize {
        self.shared.registry.lock().await.len()
    }

    /// Progress of one entity, for inspection.
    pub async fn progress_of(&self, id: EntityId) -> Option<f64> {
        self.shared.registry.lock().await.get(id).map(|state| state.progress)
    }

    /// Ticks every `tick_interval` until `shutdown` resolves. A tick that overruns makes the
    /// loop skip the missed slots instead of running ticks back to back.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let period = self.shared.settings.tick_interval().max(Duration::from_millis(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        self.shared
            .logger
            .info(&format!("Tick loop started ({} ms interval)", period.as_millis()));
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    let report = self.tick().await;
                    tracing::trace!(?report, "tick finished");
                }
            }
        }
        self.shared.logger.info("Tick loop stopped");
    }

    /// One recompute-and-broadcast cycle. Concurrent calls run one after another.
    pub async fn tick(&self) -> TickReport {
        let shared = &self.shared;
        let mut registry = shared.registry.lock().await;
        let now = Instant::now();
        let mut report = TickReport::default();

        let active = match shared.store.list_active().await {
            Ok(active) => active,
            Err(e) => {
                shared.logger.error(&format!("Skipping tick: {}", e));
                return report;
            }
        };
        report.active = active.len();

        let by_id: HashMap<EntityId, &ActiveEntity> = active.iter().map(|e| (e.id, e)).collect();
        let ids: HashSet<EntityId> = by_id.keys().copied().collect();
        let pruned = registry.retain_active(&ids);
        if pruned > 0 {
            tracing::debug!(pruned, "dropped state of inactive entities");
            shared
                .latest
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .retain(|id, _| ids.contains(id));
        }
        for id in &ids {
            registry.ensure(*id);
        }

        let work = registry
            .iter_mut()
            .filter_map(|(id, state)| by_id.get(id).map(|entity| shared.process_entity(entity, state, now)));
        let outcomes = join_all(work).await;

        let mut batch = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                EntityOutcome::Smoothed(entry) => batch.push(entry),
                EntityOutcome::Pending => report.skipped_pending += 1,
                EntityOutcome::Failed => report.skipped_failed += 1,
                EntityOutcome::Unsmoothed => report.unsmoothed += 1,
            }
        }

        if !batch.is_empty() {
            {
                let mut latest = shared.latest.write().unwrap_or_else(|poisoned| poisoned.into_inner());
                for entry in &batch {
                    shared.writer.enqueue(entry.id, entry.position());
                    latest.insert(entry.id, entry.clone());
                }
            }
            report.published = batch.len();
            let stats = shared.subscribers.publish(&SnapshotMessage::delta(batch));
            report.delivered = stats.delivered;
            report.dropped = stats.dropped;
            report.disconnected = stats.disconnected;
        }

        drop(registry);
        report
    }

    /// Attaches a subscriber: it gets a full snapshot right away and another one every
    /// `resnapshot_interval` until it is dropped.
    pub async fn subscribe(&self) -> Subscription {
        let shared = &self.shared;
        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(shared.settings.subscriber_queue_capacity.max(1));

        let _ = sender.try_send(shared.full_snapshot().await);
        shared.subscribers.insert(id, sender);

        let task_shared = Arc::clone(shared);
        let period = shared.settings.resnapshot_interval().max(Duration::from_millis(1));
        let resnapshot = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let snapshot = task_shared.full_snapshot().await;
                if !task_shared.subscribers.send_to(id, snapshot) {
                    break;
                }
            }
        });

        shared.logger.info(&format!("Subscriber {} attached", id));
        Subscription::new(id, receiver, resnapshot, Arc::clone(&shared.subscribers))
    }

    pub async fn full_snapshot(&self) -> SnapshotMessage {
        self.shared.full_snapshot().await
    }
}

impl HubShared {
    async fn process_entity(
        &self,
        entity: &ActiveEntity,
        state: &mut EntityKinematicState,
        now: Instant,
    ) -> EntityOutcome {
        let direction = self.directions.direction_for(&entity.label);
        let route = match self.routes.resolve(entity.id, direction).await {
            RouteLookup::Ready(route) => route,
            RouteLookup::Pending => return EntityOutcome::Pending,
            RouteLookup::Failed(e) => {
                tracing::debug!(entity = entity.id, error = %e, "route unavailable");
                return EntityOutcome::Failed;
            }
        };

        self.simulator.attach_route(state, &route);
        let point = self.simulator.advance(state, &route, now);
        match self.filter.push(&mut state.window, point, now) {
            Some(smoothed) => EntityOutcome::Smoothed(PositionEntry {
                id: entity.id,
                label: entity.label.clone(),
                lat: smoothed.lat,
                lng: smoothed.lng,
                status: entity.status.clone(),
            }),
            None => EntityOutcome::Unsmoothed,
        }
    }

    /// Active entities with their freshest known position: the last smoothed one if this
    /// process has produced one, else what the store holds.
    async fn full_snapshot(&self) -> SnapshotMessage {
        let latest = self
            .latest
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        let entries = match self.store.list_active().await {
            Ok(active) => active
                .into_iter()
                .filter_map(|entity| {
                    let position = latest
                        .get(&entity.id)
                        .map(PositionEntry::position)
                        .or(entity.last_position)?;
                    Some(PositionEntry {
                        id: entity.id,
                        label: entity.label,
                        lat: position.lat,
                        lng: position.lng,
                        status: entity.status,
                    })
                })
                .collect(),
            Err(e) => {
                self.logger
                    .warn(&format!("Full snapshot served from memory only: {}", e));
                let mut entries: Vec<PositionEntry> = latest.into_values().collect();
                entries.sort_by_key(|entry| entry.id);
                entries
            }
        };
        SnapshotMessage::full(entries)
    }
}
