use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Route unresolved for direction {key}")]
    RouteUnresolved { key: String },

    #[error("Route fetch failed for direction {key}: {reason}")]
    RouteFetchFailed { key: String, reason: String },

    #[error("Route geometry must contain at least one point")]
    EmptyRoute,

    #[error("Failed to read active entities: {0}")]
    PersistenceReadFailed(String),

    #[error("Failed to persist position of entity {id}: {reason}")]
    PersistenceWriteFailed { id: i64, reason: String },

    #[error("Delivery to subscriber {subscriber} failed: {reason}")]
    SubscriberDeliveryFailed { subscriber: String, reason: String },

    #[error("Invalid route table: {0}")]
    InvalidRouteTable(String),

    #[error("Infrastructure error: {0}")]
    InfrastructureError(String),
}

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
pub type ApplicationResult<T> = Result<T, ApplicationError>;
