//! Wire formats returned by the themeparks.wiki-shaped API
//!
//! Parsing is tolerant: missing fields default, unknown status strings map
//! to `Unknown`, and entries without an id are skipped. A response that is
//! not even the right JSON shape is a `TransportError::Decode` (permanent
//! for the cycle, never retried).

use crate::domain::{AttractionNode, AttractionStatus, EntityId, LiveUpdate};
use crate::io::transport::TransportError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Decode a fetched JSON value into a typed response
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, TransportError> {
    serde_json::from_value(value).map_err(|e| TransportError::Decode(e.to_string()))
}

/// `GET /destinations`
#[derive(Debug, Deserialize)]
pub struct DestinationsResponse {
    #[serde(default)]
    pub destinations: Vec<DestinationDto>,
}

#[derive(Debug, Deserialize)]
pub struct DestinationDto {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parks: Vec<ParkDto>,
}

#[derive(Debug, Deserialize)]
pub struct ParkDto {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// `GET /entity/{id}/children`
#[derive(Debug, Deserialize)]
pub struct ChildrenResponse {
    #[serde(default)]
    pub children: Vec<ChildDto>,
}

#[derive(Debug, Deserialize)]
pub struct ChildDto {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "entityType")]
    pub entity_type: Option<String>,
}

/// `GET /entity/{id}/live`
#[derive(Debug, Deserialize)]
pub struct LiveResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "liveData")]
    pub live_data: Vec<LiveDto>,
}

#[derive(Debug, Deserialize)]
pub struct LiveDto {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "entityType")]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub queue: Option<QueueDto>,
    #[serde(default, rename = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Queue kinds keyed by their API names. Presence of a kind is what the
/// engine cares about; only STANDBY carries a wait time we read.
#[derive(Debug, Deserialize)]
pub struct QueueDto {
    #[serde(default, rename = "STANDBY")]
    pub standby: Option<StandbyDto>,
    #[serde(default, rename = "BOARDING_GROUP")]
    pub boarding_group: Option<Value>,
    #[serde(default, rename = "PAID_RETURN_TIME")]
    pub paid_return_time: Option<Value>,
    #[serde(default, rename = "SINGLE_RIDER")]
    pub single_rider: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct StandbyDto {
    #[serde(default, rename = "waitTime")]
    pub wait_time: Option<i64>,
}

impl ChildrenResponse {
    /// Attraction children only; other entity types (shows, restaurants)
    /// and entries without an id are skipped.
    pub fn attraction_nodes(self) -> Vec<AttractionNode> {
        self.children
            .into_iter()
            .filter(|c| c.entity_type.as_deref() == Some("ATTRACTION"))
            .filter_map(|c| {
                if c.id.is_empty() {
                    debug!(name = %c.name, "wire_child_missing_id");
                    return None;
                }
                Some(AttractionNode { id: EntityId(c.id), name: c.name })
            })
            .collect()
    }
}

impl LiveResponse {
    /// Map live entries into merge updates. `now` stands in for a missing
    /// `lastUpdated` so the staleness clock still starts ticking.
    pub fn live_updates(self, now: DateTime<Utc>) -> Vec<LiveUpdate> {
        self.live_data
            .into_iter()
            .filter(|d| d.entity_type.as_deref() == Some("ATTRACTION"))
            .filter_map(|d| {
                if d.id.is_empty() {
                    debug!(name = %d.name, "wire_live_missing_id");
                    return None;
                }

                let status = d
                    .status
                    .as_deref()
                    .map(AttractionStatus::parse)
                    .unwrap_or(AttractionStatus::Unknown);

                let (wait, virtual_queue, paid_return, single_rider) = match &d.queue {
                    Some(q) => (
                        q.standby.as_ref().and_then(|s| s.wait_time),
                        q.boarding_group.is_some(),
                        q.paid_return_time.is_some(),
                        q.single_rider.is_some(),
                    ),
                    None => (None, false, false, false),
                };

                // Negative waits are API noise; treat as absent
                let wait_minutes = wait.filter(|w| *w >= 0).map(|w| w as u32);

                Some(LiveUpdate {
                    id: EntityId(d.id),
                    status,
                    wait_minutes,
                    last_updated: d.last_updated.unwrap_or(now),
                    virtual_queue,
                    paid_return,
                    single_rider,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_destinations() {
        let value = json!({
            "destinations": [
                {
                    "id": "dest-1",
                    "name": "Walt Disney World Resort",
                    "parks": [
                        {"id": "park-1", "name": "Magic Kingdom", "timezone": "America/New_York"},
                        {"id": "park-2", "name": "EPCOT"}
                    ]
                }
            ]
        });

        let resp: DestinationsResponse = decode(value).unwrap();
        assert_eq!(resp.destinations.len(), 1);
        assert_eq!(resp.destinations[0].parks.len(), 2);
        assert_eq!(resp.destinations[0].parks[0].timezone.as_deref(), Some("America/New_York"));
        assert_eq!(resp.destinations[0].parks[1].timezone, None);
    }

    #[test]
    fn test_decode_wrong_shape_is_decode_error() {
        let err = decode::<DestinationsResponse>(json!({"destinations": "nope"})).unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_children_filters_non_attractions() {
        let value = json!({
            "children": [
                {"id": "a-1", "name": "Space Mountain", "entityType": "ATTRACTION"},
                {"id": "r-1", "name": "Some Restaurant", "entityType": "RESTAURANT"},
                {"id": "", "name": "Ghost", "entityType": "ATTRACTION"},
                {"id": "a-2", "name": "Haunted Mansion", "entityType": "ATTRACTION"}
            ]
        });

        let resp: ChildrenResponse = decode(value).unwrap();
        let nodes = resp.attraction_nodes();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].name, "Space Mountain");
        assert_eq!(nodes[1].name, "Haunted Mansion");
    }

    #[test]
    fn test_live_updates_parsing() {
        let now = Utc::now();
        let value = json!({
            "id": "park-1",
            "name": "Magic Kingdom",
            "liveData": [
                {
                    "id": "a-1",
                    "name": "Space Mountain",
                    "entityType": "ATTRACTION",
                    "status": "OPERATING",
                    "queue": {
                        "STANDBY": {"waitTime": 45},
                        "SINGLE_RIDER": {"waitTime": 20}
                    },
                    "lastUpdated": "2025-06-01T12:00:00Z"
                },
                {
                    "id": "a-2",
                    "name": "Haunted Mansion",
                    "entityType": "ATTRACTION",
                    "status": "CLOSED"
                },
                {
                    "id": "s-1",
                    "name": "Parade",
                    "entityType": "SHOW",
                    "status": "OPERATING"
                }
            ]
        });

        let resp: LiveResponse = decode(value).unwrap();
        let updates = resp.live_updates(now);
        assert_eq!(updates.len(), 2);

        assert_eq!(updates[0].status, AttractionStatus::Operating);
        assert_eq!(updates[0].wait_minutes, Some(45));
        assert!(updates[0].single_rider);
        assert!(!updates[0].virtual_queue);
        assert_eq!(updates[0].last_updated.to_rfc3339(), "2025-06-01T12:00:00+00:00");

        // No lastUpdated on the wire falls back to `now`
        assert_eq!(updates[1].status, AttractionStatus::Closed);
        assert_eq!(updates[1].wait_minutes, None);
        assert_eq!(updates[1].last_updated, now);
    }

    #[test]
    fn test_live_updates_unknown_status_and_negative_wait() {
        let now = Utc::now();
        let value = json!({
            "liveData": [
                {
                    "id": "a-1",
                    "entityType": "ATTRACTION",
                    "status": "WEATHER_DELAY",
                    "queue": {"STANDBY": {"waitTime": -5}}
                }
            ]
        });

        let resp: LiveResponse = decode(value).unwrap();
        let updates = resp.live_updates(now);
        assert_eq!(updates[0].status, AttractionStatus::Unknown);
        assert_eq!(updates[0].wait_minutes, None);
    }

    #[test]
    fn test_virtual_queue_flags() {
        let now = Utc::now();
        let value = json!({
            "liveData": [
                {
                    "id": "a-1",
                    "entityType": "ATTRACTION",
                    "status": "OPERATING",
                    "queue": {
                        "BOARDING_GROUP": {"allocationStatus": "AVAILABLE"},
                        "PAID_RETURN_TIME": {"price": {"amount": 1200}}
                    }
                }
            ]
        });

        let resp: LiveResponse = decode(value).unwrap();
        let updates = resp.live_updates(now);
        assert!(updates[0].virtual_queue);
        assert!(updates[0].paid_return);
        assert!(!updates[0].single_rider);
        assert_eq!(updates[0].wait_minutes, None);
    }
}
