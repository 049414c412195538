//! Core entity model: destinations, parks, attractions, live status

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Newtype wrapper for API entity identifiers to provide type safety.
/// Identifiers are opaque strings (UUIDs in practice) returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId(s.to_string())
    }
}

/// Operating status of an attraction as reported by the live endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttractionStatus {
    Operating,
    Down,
    Closed,
    Refurbishment,
    /// Status string we don't recognize, or no data for this attraction
    Unknown,
}

impl AttractionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AttractionStatus::Operating => "operating",
            AttractionStatus::Down => "down",
            AttractionStatus::Closed => "closed",
            AttractionStatus::Refurbishment => "refurbishment",
            AttractionStatus::Unknown => "unknown",
        }
    }

    /// Parse an API status string. Unrecognized values map to `Unknown`
    /// rather than failing the whole response.
    pub fn parse(s: &str) -> Self {
        match s {
            "OPERATING" => AttractionStatus::Operating,
            "DOWN" => AttractionStatus::Down,
            "CLOSED" => AttractionStatus::Closed,
            "REFURBISHMENT" => AttractionStatus::Refurbishment,
            _ => AttractionStatus::Unknown,
        }
    }
}

/// Latest known live state of one attraction.
///
/// `wait_minutes` is only ever `Some` while the attraction is operating;
/// `new` enforces that so the invariant holds no matter what the API sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStatus {
    pub status: AttractionStatus,
    pub wait_minutes: Option<u32>,
    pub last_updated: DateTime<Utc>,
    /// Attraction runs a boarding-group virtual queue
    #[serde(default)]
    pub virtual_queue: bool,
    /// Paid return-time queue (Lightning Lane style) is offered
    #[serde(default)]
    pub paid_return: bool,
    /// Single-rider line exists
    #[serde(default)]
    pub single_rider: bool,
}

impl LiveStatus {
    pub fn new(
        status: AttractionStatus,
        wait_minutes: Option<u32>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        let wait_minutes = if status == AttractionStatus::Operating {
            wait_minutes
        } else {
            None
        };
        Self {
            status,
            wait_minutes,
            last_updated,
            virtual_queue: false,
            paid_return: false,
            single_rider: false,
        }
    }

    /// No data yet for this attraction
    pub fn unknown(at: DateTime<Utc>) -> Self {
        Self::new(AttractionStatus::Unknown, None, at)
    }

    /// True when the data is older than the configured threshold
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        now - self.last_updated > threshold
    }
}

/// A single attraction. Lives under exactly one park, referenced by id
/// (weak reference - the park is looked up through the snapshot, never
/// held as a pointer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attraction {
    pub id: EntityId,
    pub name: String,
    pub park_id: EntityId,
    pub live: LiveStatus,
    /// False when a hierarchy refresh no longer lists this attraction.
    /// Inactive entities are retained so in-flight reads stay valid.
    pub active: bool,
}

/// A theme park within a destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Park {
    pub id: EntityId,
    pub name: String,
    pub timezone: Option<String>,
    pub destination_id: EntityId,
    /// Ordered as discovered from the hierarchy
    pub attraction_ids: Vec<EntityId>,
    /// Wall-clock time of the last successful live merge for this park
    pub last_synced: Option<DateTime<Utc>>,
    pub active: bool,
}

/// A top-level resort grouping of parks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub id: EntityId,
    pub name: String,
    pub park_ids: Vec<EntityId>,
}

/// Immutable, consistent view of the whole entity tree.
///
/// The store hands out `Arc<Snapshot>` clones; a snapshot is never mutated
/// after publication, so readers need no locking. The same structure is
/// serialized verbatim by the cache layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub destinations: HashMap<EntityId, Destination>,
    pub parks: HashMap<EntityId, Park>,
    pub attractions: HashMap<EntityId, Attraction>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty() && self.parks.is_empty()
    }

    pub fn park(&self, id: &EntityId) -> Option<&Park> {
        self.parks.get(id)
    }

    pub fn attraction(&self, id: &EntityId) -> Option<&Attraction> {
        self.attractions.get(id)
    }

    /// A park's attractions in hierarchy order, skipping ids the
    /// attraction map doesn't know (hierarchy may lag live data)
    pub fn park_attractions<'a>(&'a self, park: &'a Park) -> impl Iterator<Item = &'a Attraction> {
        park.attraction_ids.iter().filter_map(|id| self.attractions.get(id))
    }
}

/// Hierarchy refresh payload: one node per destination with its parks and
/// (for tracked parks) their attractions. Input order is irrelevant - the
/// merge is idempotent and keyed by id.
#[derive(Debug, Clone)]
pub struct DestinationNode {
    pub id: EntityId,
    pub name: String,
    pub parks: Vec<ParkNode>,
}

#[derive(Debug, Clone)]
pub struct ParkNode {
    pub id: EntityId,
    pub name: String,
    pub timezone: Option<String>,
    /// Empty for parks whose children were not fetched this refresh
    pub attractions: Vec<AttractionNode>,
}

#[derive(Debug, Clone)]
pub struct AttractionNode {
    pub id: EntityId,
    pub name: String,
}

/// One attraction's worth of live data, already mapped from the wire
#[derive(Debug, Clone)]
pub struct LiveUpdate {
    pub id: EntityId,
    pub status: AttractionStatus,
    pub wait_minutes: Option<u32>,
    pub last_updated: DateTime<Utc>,
    pub virtual_queue: bool,
    pub paid_return: bool,
    pub single_rider: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_parse() {
        assert_eq!(AttractionStatus::parse("OPERATING"), AttractionStatus::Operating);
        assert_eq!(AttractionStatus::parse("REFURBISHMENT"), AttractionStatus::Refurbishment);
        assert_eq!(AttractionStatus::parse("SOMETHING_NEW"), AttractionStatus::Unknown);
        assert_eq!(AttractionStatus::parse(""), AttractionStatus::Unknown);
    }

    #[test]
    fn test_wait_minutes_cleared_when_not_operating() {
        let now = Utc::now();
        let live = LiveStatus::new(AttractionStatus::Closed, Some(45), now);
        assert_eq!(live.wait_minutes, None);

        let live = LiveStatus::new(AttractionStatus::Operating, Some(45), now);
        assert_eq!(live.wait_minutes, Some(45));
    }

    #[test]
    fn test_staleness() {
        let updated = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let live = LiveStatus::new(AttractionStatus::Operating, Some(10), updated);
        let threshold = Duration::seconds(180);

        let fresh_now = updated + Duration::seconds(60);
        assert!(!live.is_stale(fresh_now, threshold));

        let old_now = updated + Duration::seconds(181);
        assert!(live.is_stale(old_now, threshold));
    }

    #[test]
    fn test_snapshot_lookup() {
        let mut snap = Snapshot::default();
        assert!(snap.is_empty());

        let park_id = EntityId::from("park-1");
        snap.parks.insert(
            park_id.clone(),
            Park {
                id: park_id.clone(),
                name: "Magic Kingdom".to_string(),
                timezone: Some("America/New_York".to_string()),
                destination_id: EntityId::from("dest-1"),
                attraction_ids: vec![EntityId::from("attr-1"), EntityId::from("missing")],
                last_synced: None,
                active: true,
            },
        );
        snap.attractions.insert(
            EntityId::from("attr-1"),
            Attraction {
                id: EntityId::from("attr-1"),
                name: "Space Mountain".to_string(),
                park_id: park_id.clone(),
                live: LiveStatus::unknown(Utc::now()),
                active: true,
            },
        );

        let park = snap.park(&park_id).unwrap();
        // Unknown attraction ids are skipped, not an error
        let attractions: Vec<_> = snap.park_attractions(park).collect();
        assert_eq!(attractions.len(), 1);
        assert_eq!(attractions[0].name, "Space Mountain");
    }
}
