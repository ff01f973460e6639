//! Per-service health status
//!
//! The health snapshot is a flat map of service name to status string,
//! replaced wholesale on every polling cycle. Statuses serialize as bare
//! strings so the persisted document stays readable.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// Last-known status of one dependent service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    /// The service answered 2xx.
    Healthy,
    /// Timeout, connection failure, or non-success status.
    Unavailable,
    /// Healthy, enriched with the service's own reported counters.
    Info(String),
}

impl ServiceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ServiceStatus::Healthy => "Healthy",
            ServiceStatus::Unavailable => "Unavailable",
            ServiceStatus::Info(s) => s,
        }
    }

    /// Whether the service was reachable at the last check.
    pub fn is_reachable(&self) -> bool {
        !matches!(self, ServiceStatus::Unavailable)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ServiceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ServiceStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StatusVisitor;

        impl Visitor<'_> for StatusVisitor {
            type Value = ServiceStatus;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a service status string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ServiceStatus, E> {
                Ok(match v {
                    "Healthy" => ServiceStatus::Healthy,
                    "Unavailable" => ServiceStatus::Unavailable,
                    other => ServiceStatus::Info(other.to_string()),
                })
            }
        }

        deserializer.deserialize_str(StatusVisitor)
    }
}

/// The persisted health document: service name → last-known status.
///
/// BTreeMap keeps the document deterministically ordered across runs.
pub type HealthSnapshot = BTreeMap<String, ServiceStatus>;
