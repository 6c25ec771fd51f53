use crate::common::{DomainError, DomainResult, GeoPoint};

/// A resolved, immutable polyline from a named origin to a named destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    key: String,
    origin: String,
    destination: String,
    points: Vec<GeoPoint>,
}

impl Route {
    pub fn new(
        key: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
        points: Vec<GeoPoint>,
    ) -> DomainResult<Self> {
        if points.is_empty() {
            return Err(DomainError::EmptyRoute);
        }
        Ok(Self {
            key: key.into(),
            origin: origin.into(),
            destination: destination.into(),
            points,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Number of points; never zero.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, index: usize) -> GeoPoint {
        self.points[index % self.points.len()]
    }
}
