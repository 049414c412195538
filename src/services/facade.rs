//! Query facade - synchronous reads over the latest store snapshot
//!
//! Every call grabs the current `Arc<Snapshot>` and answers from it; nothing
//! here waits on the network or on the sync loop. Views carry an `is_stale`
//! flag so callers can distinguish fresh data from cached leftovers.

use crate::domain::{AttractionStatus, EntityId};
use crate::infra::Config;
use crate::services::store::EntityStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("park not found: {0}")]
    ParkNotFound(EntityId),
}

/// One attraction as seen by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttractionView {
    pub id: EntityId,
    pub name: String,
    pub status: AttractionStatus,
    pub wait_minutes: Option<u32>,
    pub last_updated: DateTime<Utc>,
    pub is_stale: bool,
    pub virtual_queue: bool,
    pub paid_return: bool,
    pub single_rider: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkView {
    pub id: EntityId,
    pub name: String,
    pub timezone: Option<String>,
    pub last_synced: Option<DateTime<Utc>>,
    pub is_stale: bool,
    pub attractions: Vec<AttractionView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkSummary {
    pub id: EntityId,
    pub name: String,
    pub attraction_count: usize,
    pub last_synced: Option<DateTime<Utc>>,
    pub is_stale: bool,
}

pub struct QueryFacade {
    store: Arc<EntityStore>,
    featured: Vec<String>,
    show_closed: bool,
    staleness_threshold: chrono::Duration,
}

impl QueryFacade {
    pub fn new(store: Arc<EntityStore>, config: &Config) -> Self {
        Self {
            store,
            featured: config.featured_attractions().to_vec(),
            show_closed: config.show_closed_attractions(),
            staleness_threshold: config.staleness_threshold(),
        }
    }

    /// Full view of one park, attractions in hierarchy order.
    pub fn park(&self, park_id: &EntityId) -> Result<ParkView, QueryError> {
        self.park_at(park_id, Utc::now())
    }

    /// Featured attractions in configured order. Names match
    /// case-insensitively on containment; names matching nothing are
    /// skipped. `Closed` entries drop out when the closed filter is on -
    /// the store itself is untouched.
    pub fn featured(&self) -> Vec<AttractionView> {
        self.featured_at(Utc::now())
    }

    /// Wait time in minutes for an attraction matched by partial name,
    /// anywhere in the tracked hierarchy. `None` unless it is operating
    /// with a posted standby wait.
    pub fn wait_time(&self, park_id: &EntityId, name: &str) -> Option<u32> {
        let snapshot = self.store.snapshot();
        let park = snapshot.park(park_id).filter(|p| p.active)?;
        let attraction = snapshot
            .park_attractions(park)
            .find(|a| a.active && name_matches(&a.name, name))?;
        match attraction.live.status {
            AttractionStatus::Operating => attraction.live.wait_minutes,
            _ => None,
        }
    }

    /// Summaries of every active park, grouped by destination order.
    pub fn parks(&self) -> Vec<ParkSummary> {
        self.parks_at(Utc::now())
    }

    fn park_at(&self, park_id: &EntityId, now: DateTime<Utc>) -> Result<ParkView, QueryError> {
        let snapshot = self.store.snapshot();
        let park = snapshot
            .park(park_id)
            .filter(|p| p.active)
            .ok_or_else(|| QueryError::ParkNotFound(park_id.clone()))?;

        let attractions = snapshot
            .park_attractions(park)
            .filter(|a| a.active)
            .filter(|a| self.show_closed || a.live.status != AttractionStatus::Closed)
            .map(|a| self.attraction_view(a, now))
            .collect();

        Ok(ParkView {
            id: park.id.clone(),
            name: park.name.clone(),
            timezone: park.timezone.clone(),
            last_synced: park.last_synced,
            is_stale: self.park_is_stale(park.last_synced, now),
            attractions,
        })
    }

    fn featured_at(&self, now: DateTime<Utc>) -> Vec<AttractionView> {
        let snapshot = self.store.snapshot();
        let mut views = Vec::with_capacity(self.featured.len());
        for wanted in &self.featured {
            // Lowest entity id wins when several attractions match a name,
            // so repeated queries agree regardless of map iteration order
            let found = snapshot
                .attractions
                .values()
                .filter(|a| a.active && name_matches(&a.name, wanted))
                .min_by(|a, b| a.id.cmp(&b.id));
            let Some(attraction) = found else { continue };
            if !self.show_closed && attraction.live.status == AttractionStatus::Closed {
                continue;
            }
            views.push(self.attraction_view(attraction, now));
        }
        views
    }

    fn parks_at(&self, now: DateTime<Utc>) -> Vec<ParkSummary> {
        let snapshot = self.store.snapshot();
        let mut summaries = Vec::new();
        for dest in snapshot.destinations.values() {
            for park_id in &dest.park_ids {
                let Some(park) = snapshot.park(park_id).filter(|p| p.active) else { continue };
                summaries.push(ParkSummary {
                    id: park.id.clone(),
                    name: park.name.clone(),
                    attraction_count: park.attraction_ids.len(),
                    last_synced: park.last_synced,
                    is_stale: self.park_is_stale(park.last_synced, now),
                });
            }
        }
        summaries
    }

    fn attraction_view(
        &self,
        attraction: &crate::domain::Attraction,
        now: DateTime<Utc>,
    ) -> AttractionView {
        AttractionView {
            id: attraction.id.clone(),
            name: attraction.name.clone(),
            status: attraction.live.status,
            wait_minutes: attraction.live.wait_minutes,
            last_updated: attraction.live.last_updated,
            is_stale: attraction.live.is_stale(now, self.staleness_threshold),
            virtual_queue: attraction.live.virtual_queue,
            paid_return: attraction.live.paid_return,
            single_rider: attraction.live.single_rider,
        }
    }

    /// A park that never synced is stale by definition.
    fn park_is_stale(&self, last_synced: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_synced {
            Some(at) => now.signed_duration_since(at) > self.staleness_threshold,
            None => true,
        }
    }
}

fn name_matches(name: &str, wanted: &str) -> bool {
    name.to_lowercase().contains(&wanted.to_lowercase())
}
