use crate::adapters::inbound::WebSocketGateway;
use crate::adapters::outbound::{InMemoryFleetStore, OpenRouteServiceProvider, PostgresFleetStore};
use crate::common::ApplicationResult;
use crate::config::Config;
use crate::domains::broadcast::BroadcastHub;
use crate::domains::logger::DynLogger;
use crate::domains::tracking::{DirectionTable, FleetStore, RouteGeometryProvider};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Wires the store, the geometry provider, the hub and the subscriber endpoint together.
pub struct TrackingService {
    config: Config,
    hub: BroadcastHub,
    logger: DynLogger,
}

impl TrackingService {
    /// Builds the adapters named by `config`: Postgres when configured, otherwise an
    /// in-memory fleet seeded from `seed_vehicles`.
    pub async fn bootstrap(config: Config, logger: DynLogger) -> ApplicationResult<Self> {
        let store: Arc<dyn FleetStore> = match &config.postgres {
            Some(pg) => {
                logger.info(&format!("Using PostgreSQL fleet store at {}:{}", pg.host, pg.port));
                Arc::new(PostgresFleetStore::new(pg.clone()).await?)
            }
            None => {
                logger.info(&format!(
                    "Using in-memory fleet store with {} seeded vehicles",
                    config.seed_vehicles.len()
                ));
                Arc::new(InMemoryFleetStore::from_seed(&config.seed_vehicles))
            }
        };
        if config.geometry.api_key.is_empty() {
            logger.warn("No directions API key configured; route requests will likely be rejected");
        }
        let provider: Arc<dyn RouteGeometryProvider> = Arc::new(OpenRouteServiceProvider::new(&config.geometry)?);

        Self::with_components(config, store, provider, logger)
    }

    pub fn with_components(
        config: Config,
        store: Arc<dyn FleetStore>,
        provider: Arc<dyn RouteGeometryProvider>,
        logger: DynLogger,
    ) -> ApplicationResult<Self> {
        let directions = DirectionTable::new(&config.routes)?;
        for direction in directions.definitions() {
            logger.info(&format!(
                "Direction {}: {} -> {} (labels containing \"{}\")",
                direction.key, direction.origin.name, direction.destination.name, direction.label_contains
            ));
        }
        let hub = BroadcastHub::new(config.simulation.clone(), store, provider, directions, logger.clone());
        Ok(Self { config, hub, logger })
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Serves subscribers on `server.bind_addr` and ticks until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> ApplicationResult<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(&self.config.server.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> ApplicationResult<()>
    where
        F: Future<Output = ()>,
    {
        let gateway = WebSocketGateway::new(self.hub.clone(), self.logger.clone());
        tokio::select! {
            _ = self.hub.run(std::future::pending::<()>()) => {}
            _ = gateway.serve(listener) => {}
            _ = shutdown => self.logger.info("Shutdown requested"),
        }
        Ok(())
    }
}
