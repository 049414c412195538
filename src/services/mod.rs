//! Services - sync engine state and read surface
//!
//! - `store` - In-memory entity hierarchy with snapshot publication
//! - `scheduler` - Periodic sync loop with backoff and cache persistence
//! - `facade` - Synchronous query surface over the latest snapshot

pub mod facade;
pub mod scheduler;
pub mod store;

// Re-export commonly used types
pub use facade::{AttractionView, ParkSummary, ParkView, QueryError, QueryFacade};
pub use scheduler::SyncScheduler;
pub use store::EntityStore;
