//! Capabilities of managed resources
//!
//! Each resource type implements only the capabilities it supports and
//! holds its server's [`ManagementConnection`](crate::mgmt::ManagementConnection)
//! through an `Arc`. Components of one server share that connection.

pub mod server;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::mgmt::ConfigProperty;

pub use server::ServerComponent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvailabilityType {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Numeric sample
    Measurement,
    /// Descriptive string value
    Trait,
}

/// One metric a caller wants collected
///
/// Names are attribute names, `attribute:sub` for one field of a compound
/// attribute, or `_internal:<stat>` for the probe's own request counters.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRequest {
    pub name: String,
    pub kind: MetricKind,
}

impl MetricRequest {
    pub fn measurement(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: MetricKind::Measurement,
        }
    }

    pub fn trait_value(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: MetricKind::Trait,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Measurement(f64),
    Trait(String),
}

/// Named operation parameters
pub type OperationParams = Map<String, Value>;

/// Simple result text on success, error message on failure
pub type OperationOutcome = std::result::Result<String, String>;

/// Attribute name and the value to write for it
pub type ConfigUpdate = (String, ConfigProperty);

#[async_trait]
pub trait Availability: Send + Sync {
    /// Any failure to reach or read the resource counts as `Down`
    async fn availability(&self) -> AvailabilityType;
}

#[async_trait]
pub trait Measurable: Send + Sync {
    /// Collect the requested metrics
    ///
    /// Metrics that cannot be read are left out of the report.
    async fn metric_values(&self, requests: &[MetricRequest]) -> Vec<(String, MetricValue)>;
}

#[async_trait]
pub trait Operable: Send + Sync {
    /// Invoke `"scope:operation"` with `params`
    async fn invoke_operation(&self, name: &str, params: &OperationParams) -> OperationOutcome;
}

#[async_trait]
pub trait Configurable: Send + Sync {
    /// Current attribute values of the resource, without runtime attributes
    async fn load_configuration(&self) -> std::result::Result<Map<String, Value>, String>;

    /// Write the given attributes in one composite request
    ///
    /// Either every attribute is written or, when one write fails, none is.
    async fn update_configuration(&self, updates: &[ConfigUpdate]) -> OperationOutcome;
}
