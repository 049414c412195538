//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `transport` - HTTP client for the upstream wait-time API
//! - `wire` - JSON wire formats and their mapping into domain updates
//! - `cache` - durable snapshot cache with atomic replace

pub mod cache;
pub mod transport;
pub mod wire;

// Re-export commonly used types
pub use cache::{CacheError, SnapshotCache};
pub use transport::{HttpTransport, Transport, TransportError};
