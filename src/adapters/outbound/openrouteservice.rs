use crate::common::{DomainError, DomainResult, GeoPoint};
use crate::config::GeometryProviderConfig;
use crate::domains::tracking::RouteGeometryProvider;
use async_trait::async_trait;
use geojson::{GeoJson, Value};
use reqwest::header::AUTHORIZATION;
use serde_json::json;
use std::time::Duration;

/// Directions from the OpenRouteService GeoJSON endpoint.
pub struct OpenRouteServiceProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OpenRouteServiceProvider {
    pub fn new(config: &GeometryProviderConfig) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| DomainError::InfrastructureError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/v2/directions/{}/geojson",
                config.base_url.trim_end_matches('/'),
                config.profile
            ),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RouteGeometryProvider for OpenRouteServiceProvider {
    async fn fetch_route(&self, start: GeoPoint, end: GeoPoint) -> DomainResult<Vec<GeoPoint>> {
        // The service takes [lng, lat] pairs.
        let body = json!({ "coordinates": [[start.lng, start.lat], [end.lng, end.lat]] });

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::InfrastructureError(format!("Directions request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DomainError::InfrastructureError(format!("Directions body unreadable: {}", e)))?;
        if !status.is_success() {
            return Err(DomainError::InfrastructureError(format!(
                "Directions service returned {}: {}",
                status, text
            )));
        }
        parse_route_geojson(&text)
    }
}

/// Points of the first feature's LineString in a GeoJSON FeatureCollection.
pub fn parse_route_geojson(body: &str) -> DomainResult<Vec<GeoPoint>> {
    let malformed = |reason: String| DomainError::InfrastructureError(format!("Malformed directions response: {}", reason));

    let collection = match body.parse::<GeoJson>().map_err(|e| malformed(e.to_string()))? {
        GeoJson::FeatureCollection(collection) => collection,
        _ => return Err(malformed("expected a FeatureCollection".to_string())),
    };
    let geometry = collection
        .features
        .into_iter()
        .next()
        .and_then(|feature| feature.geometry)
        .ok_or_else(|| malformed("no route feature".to_string()))?;

    let Value::LineString(positions) = geometry.value else {
        return Err(malformed("route geometry is not a LineString".to_string()));
    };
    if positions.is_empty() {
        return Err(DomainError::EmptyRoute);
    }
    positions
        .into_iter()
        .map(|position| match position.as_slice() {
            [lng, lat, ..] => Ok(GeoPoint::new(*lat, *lng)),
            _ => Err(malformed("coordinate with fewer than two values".to_string())),
        })
        .collect()
}
