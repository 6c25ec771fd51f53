use crate::common::{DomainError, DomainResult};
use crate::config::{RouteDefinition, RoutesConfig};

/// Assigns each entity a direction from its label.
#[derive(Debug, Clone)]
pub struct DirectionTable {
    definitions: Vec<RouteDefinition>,
    default_index: usize,
}

impl DirectionTable {
    pub fn new(config: &RoutesConfig) -> DomainResult<Self> {
        let default_index = config
            .definitions
            .iter()
            .position(|d| d.key == config.default_route)
            .ok_or_else(|| {
                DomainError::InvalidRouteTable(format!(
                    "default route {} has no definition",
                    config.default_route
                ))
            })?;
        Ok(Self {
            definitions: config.definitions.clone(),
            default_index,
        })
    }

    /// First definition whose `label_contains` occurs in `label`, else the default route.
    /// An empty `label_contains` never matches.
    pub fn direction_for(&self, label: &str) -> &RouteDefinition {
        self.definitions
            .iter()
            .find(|d| !d.label_contains.is_empty() && label.contains(&d.label_contains))
            .unwrap_or(&self.definitions[self.default_index])
    }

    pub fn definitions(&self) -> &[RouteDefinition] {
        &self.definitions
    }
}
