//! Traffic data providers.
//!
//! [`FlowProvider`] and [`RoutingProvider`] are the capabilities injected
//! into the estimator. [`TomTomClient`] implements both against the TomTom
//! traffic and routing APIs.

mod tomtom;

pub use tomtom::{DEFAULT_BASE_URL, TomTomClient};

use crate::corridor::Coordinate;
use anyhow::Result;
use async_trait::async_trait;

/// One flow-segment reading at a point. Travel times are in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSegment {
    pub current_travel_time: Option<f64>,
    pub free_flow_travel_time: Option<f64>,
    pub raw: serde_json::Value,
}

impl FlowSegment {
    /// Extra seconds over free flow, clamped at zero. `None` when either
    /// travel time is missing.
    pub fn extra_seconds(&self) -> Option<f64> {
        match (self.current_travel_time, self.free_flow_travel_time) {
            (Some(current), Some(free)) if current >= free => Some(current - free),
            (Some(_), Some(_)) => Some(0.0),
            _ => None,
        }
    }
}

/// Route summary for one origin/destination pair. Times are in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    pub no_traffic_travel_time: f64,
    pub live_traffic_travel_time: f64,
    pub raw: serde_json::Value,
}

impl RouteSummary {
    pub fn delay_seconds(&self) -> f64 {
        (self.live_traffic_travel_time - self.no_traffic_travel_time).max(0.0)
    }
}

#[async_trait]
pub trait FlowProvider: Send + Sync {
    async fn flow_segment(&self, point: Coordinate) -> Result<FlowSegment>;
}

#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn route_summary(&self, origin: Coordinate, destination: Coordinate)
    -> Result<RouteSummary>;
}
