//! Entity store - single source of truth for the discovered hierarchy
//! and live wait-time state
//!
//! Concurrency discipline: the sync scheduler is the only writer. Readers
//! (query facade, cache layer) take an `Arc<Snapshot>` and never block on a
//! merge in progress - every mutation builds the next snapshot aside and
//! publishes it with one pointer swap, so a reader sees either the old or
//! the new state, never a partial merge.

use crate::domain::{
    Attraction, AttractionStatus, Destination, DestinationNode, EntityId, LiveStatus, LiveUpdate,
    Park, Snapshot,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Outcome of merging one park's live updates
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LiveMergeStats {
    pub applied: u64,
    /// Dropped for carrying a timestamp older than the stored one
    pub discarded_stale: u64,
    /// Dropped for an attraction id the hierarchy doesn't know yet
    pub unmatched: u64,
}

pub struct EntityStore {
    current: RwLock<Arc<Snapshot>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self { current: RwLock::new(Arc::new(Snapshot::default())) }
    }

    /// Warm start from a cached snapshot
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self { current: RwLock::new(Arc::new(snapshot)) }
    }

    /// Current immutable view. Cheap (one Arc clone) and never blocked by
    /// a writer building the next snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    /// Build-aside-and-swap. The next snapshot is cloned and rebuilt
    /// entirely outside the lock; the write lock is taken only for the
    /// pointer assignment, so readers are gated on a swap, never on a
    /// merge in progress. Safe because the scheduler is the only writer.
    fn mutate<R>(&self, f: impl FnOnce(&mut Snapshot) -> R) -> R {
        let mut next = (*self.snapshot()).clone();
        let result = f(&mut next);
        *self.current.write() = Arc::new(next);
        result
    }

    /// Merge a full hierarchy refresh. Idempotent and order-independent:
    /// everything is keyed by entity id.
    ///
    /// Parks absent from the refresh are marked inactive, not removed.
    /// Attraction lists are only replaced for parks whose children were
    /// fetched this refresh (non-empty node list); live state of surviving
    /// attractions is preserved.
    pub fn apply_hierarchy(&self, nodes: &[DestinationNode], now: DateTime<Utc>) {
        self.mutate(|snap| {
            let mut listed_parks: Vec<EntityId> = Vec::new();

            for dest in nodes {
                let park_ids: Vec<EntityId> = dest.parks.iter().map(|p| p.id.clone()).collect();
                snap.destinations.insert(
                    dest.id.clone(),
                    Destination {
                        id: dest.id.clone(),
                        name: dest.name.clone(),
                        park_ids,
                    },
                );

                for park_node in &dest.parks {
                    listed_parks.push(park_node.id.clone());

                    let children_fetched = !park_node.attractions.is_empty();
                    let (attraction_ids, last_synced) = match snap.parks.get(&park_node.id) {
                        Some(existing) if !children_fetched => {
                            (existing.attraction_ids.clone(), existing.last_synced)
                        }
                        Some(existing) => (
                            park_node.attractions.iter().map(|a| a.id.clone()).collect(),
                            existing.last_synced,
                        ),
                        None => {
                            (park_node.attractions.iter().map(|a| a.id.clone()).collect(), None)
                        }
                    };

                    if children_fetched {
                        // Deactivate attractions this refresh no longer lists
                        let park_id = park_node.id.clone();
                        for attraction in snap.attractions.values_mut() {
                            if attraction.park_id == park_id
                                && !attraction_ids.contains(&attraction.id)
                            {
                                attraction.active = false;
                            }
                        }

                        for node in &park_node.attractions {
                            match snap.attractions.get_mut(&node.id) {
                                Some(existing) => {
                                    existing.name = node.name.clone();
                                    existing.park_id = park_id.clone();
                                    existing.active = true;
                                }
                                None => {
                                    snap.attractions.insert(
                                        node.id.clone(),
                                        Attraction {
                                            id: node.id.clone(),
                                            name: node.name.clone(),
                                            park_id: park_id.clone(),
                                            live: LiveStatus::unknown(now),
                                            active: true,
                                        },
                                    );
                                }
                            }
                        }
                    }

                    snap.parks.insert(
                        park_node.id.clone(),
                        Park {
                            id: park_node.id.clone(),
                            name: park_node.name.clone(),
                            timezone: park_node.timezone.clone(),
                            destination_id: dest.id.clone(),
                            attraction_ids,
                            last_synced,
                            active: true,
                        },
                    );
                }
            }

            // Soft-delete parks the full refresh no longer lists
            for park in snap.parks.values_mut() {
                if !listed_parks.contains(&park.id) {
                    park.active = false;
                }
            }
        });
    }

    /// Merge one park's live updates as a single atomic mutation.
    ///
    /// Applies the monotonic-timestamp rule: an update older than the
    /// stored `last_updated` is a no-op. Updates for ids the hierarchy
    /// doesn't know yet are dropped (the hierarchy may lag live data by
    /// one refresh cycle).
    pub fn apply_live(
        &self,
        park_id: &EntityId,
        updates: &[LiveUpdate],
        now: DateTime<Utc>,
    ) -> LiveMergeStats {
        self.mutate(|snap| {
            let mut stats = LiveMergeStats::default();

            for update in updates {
                let Some(attraction) = snap.attractions.get_mut(&update.id) else {
                    debug!(id = %update.id, park = %park_id, "live_update_unmatched");
                    stats.unmatched += 1;
                    continue;
                };

                if update.last_updated < attraction.live.last_updated {
                    debug!(
                        id = %update.id,
                        stored = %attraction.live.last_updated,
                        received = %update.last_updated,
                        "live_update_discarded_stale"
                    );
                    stats.discarded_stale += 1;
                    continue;
                }

                let mut live =
                    LiveStatus::new(update.status, update.wait_minutes, update.last_updated);
                live.virtual_queue = update.virtual_queue;
                live.paid_return = update.paid_return;
                live.single_rider = update.single_rider;
                attraction.live = live;
                stats.applied += 1;
            }

            if let Some(park) = snap.parks.get_mut(park_id) {
                park.last_synced = Some(now);
            }

            stats
        })
    }

    /// Degrade one park after a permanent fetch failure: its attractions
    /// read `Unknown` with no wait, keeping their timestamps so staleness
    /// keeps growing. Other parks are untouched.
    pub fn mark_park_unknown(&self, park_id: &EntityId) {
        self.mutate(|snap| {
            for attraction in snap.attractions.values_mut() {
                if &attraction.park_id == park_id {
                    attraction.live.status = AttractionStatus::Unknown;
                    attraction.live.wait_minutes = None;
                }
            }
        });
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}
