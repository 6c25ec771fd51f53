use crate::common::GeoPoint;
use crate::domains::tracking::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SNAPSHOT_EVENT: &str = "vehicleUpdate";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEntry {
    pub id: EntityId,
    pub label: String,
    pub lat: f64,
    pub lng: f64,
    pub status: String,
}

impl PositionEntry {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    /// Entities moved in one tick.
    Delta,
    /// Every active entity with a known position.
    Full,
}

/// One batch handed to subscribers. Entries are shared between all queues.
#[derive(Debug, Clone)]
pub struct SnapshotMessage {
    pub kind: SnapshotKind,
    pub generated_at: DateTime<Utc>,
    pub entries: Arc<[PositionEntry]>,
}

#[derive(Serialize)]
struct WireSnapshot<'a> {
    event: &'static str,
    kind: SnapshotKind,
    generated_at: &'a DateTime<Utc>,
    data: &'a [PositionEntry],
}

impl SnapshotMessage {
    pub fn delta(entries: Vec<PositionEntry>) -> Self {
        Self::new(SnapshotKind::Delta, entries)
    }

    pub fn full(entries: Vec<PositionEntry>) -> Self {
        Self::new(SnapshotKind::Full, entries)
    }

    fn new(kind: SnapshotKind, entries: Vec<PositionEntry>) -> Self {
        Self {
            kind,
            generated_at: Utc::now(),
            entries: entries.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_wire_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&WireSnapshot {
            event: SNAPSHOT_EVENT,
            kind: self.kind,
            generated_at: &self.generated_at,
            data: &self.entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_carries_event_kind_and_entries() {
        let message = SnapshotMessage::delta(vec![PositionEntry {
            id: 7,
            label: "KBX 101 Juja".to_string(),
            lat: -1.2,
            lng: 36.9,
            status: "active".to_string(),
        }]);

        let json: serde_json::Value = serde_json::from_str(&message.to_wire_json().unwrap()).unwrap();
        assert_eq!(json["event"], "vehicleUpdate");
        assert_eq!(json["kind"], "delta");
        assert_eq!(json["data"][0]["id"], 7);
        assert_eq!(json["data"][0]["lng"], 36.9);
        assert!(json["generated_at"].is_string());
    }
}
