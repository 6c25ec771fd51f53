use crate::common::GeoPoint;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Recent interpolated samples of one entity, oldest first.
#[derive(Debug, Clone, Default)]
pub struct SmoothingWindow {
    samples: VecDeque<(GeoPoint, Instant)>,
}

impl SmoothingWindow {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Unweighted moving average over a window bounded both by age and by sample count.
#[derive(Debug, Clone, Copy)]
pub struct SmoothingFilter {
    max_samples: usize,
    horizon: Duration,
}

impl SmoothingFilter {
    pub fn new(max_samples: usize, horizon: Duration) -> Self {
        Self { max_samples, horizon }
    }

    /// Records `point` at `now` and returns the mean of the surviving samples.
    /// Samples aged `horizon` or more are evicted first, then the window is cut to the
    /// newest `max_samples`.
    pub fn push(&self, window: &mut SmoothingWindow, point: GeoPoint, now: Instant) -> Option<GeoPoint> {
        window.samples.push_back((point, now));
        window
            .samples
            .retain(|(_, at)| now.saturating_duration_since(*at) < self.horizon);
        while window.samples.len() > self.max_samples {
            window.samples.pop_front();
        }
        average(window.samples.iter().map(|(p, _)| p))
    }
}

/// Arithmetic mean of lat and lng, `None` for no points.
///
/// Accumulates offsets from the first point, so identical inputs average to exactly
/// that point and large absolute coordinates do not eat precision.
pub fn average<'a>(points: impl IntoIterator<Item = &'a GeoPoint>) -> Option<GeoPoint> {
    let mut points = points.into_iter();
    let first = *points.next()?;
    let mut count = 1.0;
    let (mut d_lat, mut d_lng) = (0.0, 0.0);
    for point in points {
        d_lat += point.lat - first.lat;
        d_lng += point.lng - first.lng;
        count += 1.0;
    }
    Some(GeoPoint::new(first.lat + d_lat / count, first.lng + d_lng / count))
}
