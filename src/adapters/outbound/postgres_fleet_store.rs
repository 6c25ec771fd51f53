use crate::common::{DomainError, DomainResult, GeoPoint};
use crate::config::PostgresConfig;
use crate::domains::tracking::{ActiveEntity, EntityId, FleetStore};
use async_trait::async_trait;
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime};
use tokio_postgres::NoTls;

/// Fleet table in PostgreSQL.
pub struct PostgresFleetStore {
    pool: Pool,
}

fn infra(context: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::InfrastructureError(format!("{}: {}", context, e))
}

impl PostgresFleetStore {
    pub async fn new(config: PostgresConfig) -> DomainResult<Self> {
        let mut pg_config = Config::new();
        pg_config.host = Some(config.host);
        pg_config.port = Some(config.port);
        pg_config.dbname = Some(config.database);
        pg_config.user = Some(config.username);
        pg_config.password = Some(config.password);
        pg_config.pool = Some(PoolConfig::new(config.max_connections.max(1) as usize));

        let pool = pg_config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| infra("Failed to create PostgreSQL pool", e))?;

        let store = Self::from_pool(pool);
        store.initialize_schema().await?;
        Ok(store)
    }

    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn initialize_schema(&self) -> DomainResult<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| infra("Failed to get database connection", e))?;

        let schema = r#"
            CREATE TABLE IF NOT EXISTS vehicles (
                id BIGINT PRIMARY KEY,
                label VARCHAR(100) NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'active',
                current_lat DOUBLE PRECISION,
                current_lng DOUBLE PRECISION,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );

            CREATE INDEX IF NOT EXISTS idx_vehicles_status
            ON vehicles(status);
        "#;

        client
            .batch_execute(schema)
            .await
            .map_err(|e| infra("Failed to initialize database schema", e))
    }

    /// Inserts or replaces a vehicle row. Used for seeding and tests.
    pub async fn upsert(&self, entity: &ActiveEntity) -> DomainResult<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| infra("Failed to get database connection", e))?;

        client
            .execute(
                "INSERT INTO vehicles (id, label, status, current_lat, current_lng)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (id) DO UPDATE SET
                 label = EXCLUDED.label,
                 status = EXCLUDED.status,
                 current_lat = EXCLUDED.current_lat,
                 current_lng = EXCLUDED.current_lng,
                 updated_at = NOW()",
                &[
                    &entity.id,
                    &entity.label,
                    &entity.status,
                    &entity.last_position.map(|p| p.lat),
                    &entity.last_position.map(|p| p.lng),
                ],
            )
            .await
            .map_err(|e| infra("Failed to upsert vehicle", e))?;
        Ok(())
    }
}

#[async_trait]
impl FleetStore for PostgresFleetStore {
    async fn list_active(&self) -> DomainResult<Vec<ActiveEntity>> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| DomainError::PersistenceReadFailed(e.to_string()))?;

        let rows = client
            .query(
                "SELECT id, label, status, current_lat, current_lng
                 FROM vehicles
                 WHERE status = 'active'
                 ORDER BY id",
                &[],
            )
            .await
            .map_err(|e| DomainError::PersistenceReadFailed(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let lat: Option<f64> = row.get(3);
                let lng: Option<f64> = row.get(4);
                ActiveEntity {
                    id: row.get(0),
                    label: row.get(1),
                    status: row.get(2),
                    last_position: lat.zip(lng).map(|(lat, lng)| GeoPoint::new(lat, lng)),
                }
            })
            .collect())
    }

    async fn update_position(&self, id: EntityId, position: GeoPoint) -> DomainResult<()> {
        let write_failed = |reason: String| DomainError::PersistenceWriteFailed { id, reason };

        let client = self.pool.get().await.map_err(|e| write_failed(e.to_string()))?;
        let updated = client
            .execute(
                "UPDATE vehicles SET current_lat = $1, current_lng = $2, updated_at = NOW() WHERE id = $3",
                &[&position.lat, &position.lng, &id],
            )
            .await
            .map_err(|e| write_failed(e.to_string()))?;

        if updated == 0 {
            return Err(write_failed("no such vehicle".to_string()));
        }
        Ok(())
    }
}
