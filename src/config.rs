use crate::common::NamedPoint;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub geometry: GeometryProviderConfig,
    pub postgres: Option<PostgresConfig>,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub routes: RoutesConfig,
    /// Vehicles loaded into the in-memory store when no Postgres section is configured.
    pub seed_vehicles: Vec<SeedVehicle>,
}

/// Tuning constants for the tick loop, the smoothing window and subscriber delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub tick_interval_ms: u64,
    /// Route points advanced per elapsed millisecond.
    pub speed_factor: f64,
    pub smoothing_window: usize,
    pub smoothing_horizon_ms: u64,
    pub resnapshot_interval_ms: u64,
    pub subscriber_queue_capacity: usize,
    /// Consecutive dropped batches after which a subscriber is disconnected.
    pub max_lagged_batches: u32,
    /// 0 retries a failed route fetch on the very next tick.
    pub route_retry_backoff_ms: u64,
    pub position_write_queue: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryProviderConfig {
    pub base_url: String,
    pub profile: String,
    pub api_key: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// When set, domain log lines are also written to this file.
    pub file: Option<String>,
    pub buffer_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesConfig {
    pub default_route: String,
    pub definitions: Vec<RouteDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDefinition {
    pub key: String,
    /// Entities whose label contains this substring run this route.
    pub label_contains: String,
    pub origin: NamedPoint,
    pub destination: NamedPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedVehicle {
    pub id: i64,
    pub label: String,
}

impl SimulationConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn smoothing_horizon(&self) -> Duration {
        Duration::from_millis(self.smoothing_horizon_ms)
    }

    pub fn resnapshot_interval(&self) -> Duration {
        Duration::from_millis(self.resnapshot_interval_ms)
    }

    pub fn route_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.route_retry_backoff_ms)
    }
}

impl Config {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, overlaid by an optional TOML file, overlaid by `TRANSIT__SECTION__KEY`
    /// environment variables. An empty geometry API key falls back to `ORS_API_KEY`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Config::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("TRANSIT")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Config = builder.build()?.try_deserialize()?;
        if config.geometry.api_key.is_empty() {
            if let Ok(key) = std::env::var("ORS_API_KEY") {
                config.geometry.api_key = key;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings under which the tick could never publish anything.
    pub fn validate(&self) -> Result<()> {
        if self.simulation.smoothing_window == 0 {
            anyhow::bail!("simulation.smoothing_window must be at least 1");
        }
        if self.simulation.smoothing_horizon_ms == 0 {
            anyhow::bail!("simulation.smoothing_horizon_ms must be at least 1");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            geometry: GeometryProviderConfig::default(),
            postgres: None,
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            routes: RoutesConfig::default(),
            seed_vehicles: vec![
                SeedVehicle { id: 1, label: "KBX 101 Juja".to_string() },
                SeedVehicle { id: 2, label: "KCA 202 Nairobi".to_string() },
            ],
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            speed_factor: 0.00002,
            smoothing_window: 5,
            smoothing_horizon_ms: 1000,
            resnapshot_interval_ms: 5000,
            subscriber_queue_capacity: 32,
            max_lagged_batches: 50,
            route_retry_backoff_ms: 1000,
            position_write_queue: 1024,
        }
    }
}

impl Default for GeometryProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openrouteservice.org".to_string(),
            profile: "driving-car".to_string(),
            api_key: String::new(),
            timeout_ms: 10_000,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:5000".to_string() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { file: None, buffer_capacity: 256 }
    }
}

impl Default for RoutesConfig {
    fn default() -> Self {
        let juja = NamedPoint { name: "Juja".to_string(), lat: -1.1016, lng: 37.0144 };
        let nairobi = NamedPoint { name: "Nairobi".to_string(), lat: -1.286389, lng: 36.817223 };
        Self {
            default_route: "Nairobi-Juja".to_string(),
            definitions: vec![
                RouteDefinition {
                    key: "Juja-Nairobi".to_string(),
                    label_contains: "Juja".to_string(),
                    origin: juja.clone(),
                    destination: nairobi.clone(),
                },
                RouteDefinition {
                    key: "Nairobi-Juja".to_string(),
                    label_contains: "Nairobi".to_string(),
                    origin: nairobi,
                    destination: juja,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_tuning() {
        let config = Config::default();
        assert_eq!(config.simulation.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.simulation.smoothing_window, 5);
        assert_eq!(config.simulation.smoothing_horizon(), Duration::from_secs(1));
        assert_eq!(config.simulation.resnapshot_interval(), Duration::from_secs(5));
        assert_eq!(config.routes.definitions.len(), 2);
        assert!(config.postgres.is_none());
    }

    #[tokio::test]
    async fn partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transit.toml");
        tokio::fs::write(
            &path,
            r#"
[simulation]
tick_interval_ms = 250
speed_factor = 0.005

[server]
bind_addr = "127.0.0.1:9000"
"#,
        )
        .await
        .unwrap();

        let config = Config::from_file(&path).await.unwrap();
        assert_eq!(config.simulation.tick_interval_ms, 250);
        assert_eq!(config.simulation.speed_factor, 0.005);
        assert_eq!(config.simulation.smoothing_window, 5);
        assert_eq!(config.server.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.routes.default_route, "Nairobi-Juja");
    }

    #[test]
    fn layered_load_reads_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transit.toml");
        std::fs::write(&path, "[simulation]\nsmoothing_window = 8\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.simulation.smoothing_window, 8);
        assert_eq!(config.simulation.tick_interval_ms, 100);
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transit.toml");
        std::fs::write(&path, "[geometry]\nprofile = \"driving-hgv\"\n").unwrap();

        std::env::set_var("TRANSIT__GEOMETRY__PROFILE", "cycling-regular");
        std::env::set_var("TRANSIT__SERVER__BIND_ADDR", "127.0.0.1:7000");
        let loaded = Config::load(Some(&path));
        std::env::remove_var("TRANSIT__GEOMETRY__PROFILE");
        std::env::remove_var("TRANSIT__SERVER__BIND_ADDR");

        let config = loaded.unwrap();
        assert_eq!(config.geometry.profile, "cycling-regular");
        assert_eq!(config.server.bind_addr, "127.0.0.1:7000");
        assert_eq!(config.geometry.base_url, "https://api.openrouteservice.org");
    }

    #[test]
    fn zero_smoothing_window_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transit.toml");
        std::fs::write(&path, "[simulation]\nsmoothing_window = 0\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("smoothing_window"));
    }
}
