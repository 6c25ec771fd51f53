use super::route::Route;
use super::state::EntityKinematicState;
use crate::common::GeoPoint;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Advances entities along their route in proportion to elapsed time.
#[derive(Debug, Clone, Copy)]
pub struct PositionSimulator {
    /// Route points per elapsed millisecond.
    speed_factor: f64,
}

impl PositionSimulator {
    pub fn new(speed_factor: f64) -> Self {
        Self { speed_factor }
    }

    /// Installs `route` on the state. A different route (by identity) restarts the entity
    /// at the first point with a fresh clock and an empty smoothing window.
    /// Returns whether the route changed.
    pub fn attach_route(&self, state: &mut EntityKinematicState, route: &Arc<Route>) -> bool {
        let unchanged = state
            .route
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, route));
        if unchanged {
            return false;
        }
        state.route = Some(Arc::clone(route));
        state.progress = 0.0;
        state.last_update = None;
        state.window.clear();
        true
    }

    /// Moves the entity forward by the time elapsed since its last advance and returns the
    /// interpolated point. The first advance after a route change does not move.
    pub fn advance(&self, state: &mut EntityKinematicState, route: &Route, now: Instant) -> GeoPoint {
        let elapsed = state
            .last_update
            .map(|previous| now.saturating_duration_since(previous))
            .unwrap_or(Duration::ZERO);
        state.last_update = Some(now);

        state.progress = step_progress(state.progress, self.speed_factor * millis(elapsed), route.len());
        point_at(route, state.progress)
    }
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_nanos() as f64 / 1_000_000.0
}

/// `(progress + delta) mod len`, kept inside `[0, len)`. Single-point routes stay at 0.
pub fn step_progress(progress: f64, delta: f64, len: usize) -> f64 {
    if len <= 1 {
        return 0.0;
    }
    let len = len as f64;
    let next = (progress + delta).rem_euclid(len);
    if next.is_finite() && next < len {
        next
    } else {
        0.0
    }
}

/// Linear interpolation between `route[floor(progress)]` and its successor, wrapping at the end.
pub fn point_at(route: &Route, progress: f64) -> GeoPoint {
    let len = route.len();
    if len == 1 {
        return route.point(0);
    }
    let i = (progress.floor() as usize).min(len - 1);
    let j = (i + 1) % len;
    let frac = progress - i as f64;
    route.point(i).lerp(&route.point(j), frac)
}
