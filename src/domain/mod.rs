//! Domain models - the entity hierarchy and live-status types
//!
//! This module contains the canonical data types used throughout the engine:
//! - `Destination` / `Park` / `Attraction` - the discovered entity tree
//! - `LiveStatus` - per-attraction wait time and operating status
//! - `Snapshot` - immutable view of the whole tree handed to readers
//! - `DestinationNode` / `LiveUpdate` - merge inputs produced by the wire layer

pub mod entity;

pub use entity::{
    Attraction, AttractionNode, AttractionStatus, Destination, DestinationNode, EntityId,
    LiveStatus, LiveUpdate, Park, ParkNode, Snapshot,
};
