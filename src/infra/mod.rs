//! Infrastructure - configuration and metrics
//!
//! This module contains infrastructure concerns:
//! - `config` - Engine configuration (TOML loading, defaults, floor enforcement)
//! - `metrics` - Lock-free sync counters with periodic reporting

pub mod config;
pub mod metrics;

// Re-export commonly used types
pub use config::Config;
pub use metrics::Metrics;
