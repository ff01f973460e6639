//! Types library for the market-surveillance pipeline
//!
//! This library provides all core type definitions shared across the
//! surveillance services, ensuring every wire payload and persisted
//! document is an explicit tagged structure rather than loose JSON.
//!
//! # Modules
//! - `event`: market events as published to the event log
//! - `anomaly`: anomaly classification and persisted anomaly records
//! - `stats`: cumulative statistics snapshot
//! - `health`: per-service health status
//! - `errors`: error taxonomy and failure policy

// Public modules
pub mod anomaly;
pub mod errors;
pub mod event;
pub mod health;
pub mod stats;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::anomaly::*;
    pub use crate::errors::*;
    pub use crate::event::*;
    pub use crate::health::*;
    pub use crate::stats::*;
}
