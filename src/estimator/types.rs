//! Data types produced by the signal fetchers and the fusion step.

use crate::corridor::{Direction, Tunnel};
use crate::observations::WaitObservation;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Source tag written on observations logged from a fused estimate.
pub const FUSION_SOURCE: &str = "tomtom:fusion";

/// Source tag written on observations logged from a flow-only estimate.
pub const FLOW_ONLY_SOURCE: &str = "tomtom";

/// Upper bound on the flow-only estimate, in minutes.
pub const FLOW_ONLY_CAP_MINUTES: i64 = 600;

/// Result of sampling a corridor with the flow provider.
#[derive(Debug, Clone, Serialize)]
pub struct FlowChain {
    pub direction: Direction,
    /// Sum of current travel times over the points that answered.
    pub travel_seconds: f64,
    /// Per-point extra seconds over free flow, for points reporting both times.
    pub extras: Vec<f64>,
    /// Trimmed sum of `extras`.
    pub delay_seconds: u64,
    pub raw: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteDelay {
    pub direction: Direction,
    pub delay_seconds: f64,
    pub raw: serde_json::Value,
}

/// Which sources contributed to an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Method {
    #[serde(rename = "routing")]
    Routing,
    #[serde(rename = "flow")]
    Flow,
    #[serde(rename = "max(routeDelta, flowChain)")]
    Fused,
    #[serde(rename = "flow-extras")]
    FlowExtras,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Routing => "routing",
            Method::Flow => "flow",
            Method::Fused => "max(routeDelta, flowChain)",
            Method::FlowExtras => "flow-extras",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Components {
    pub route_delta_sec: Option<f64>,
    pub flow_chain_sec: Option<f64>,
}

/// A wait-time estimate for one tunnel direction.
#[derive(Debug, Clone, Serialize)]
pub struct Estimation {
    pub direction: Direction,
    pub wait_minutes: Option<i64>,
    pub components: Components,
    pub method: Method,
    pub raw: serde_json::Value,
}

impl Estimation {
    /// Converts the estimate into a loggable observation. `None` when there
    /// is no wait figure.
    pub fn to_observation(&self, tunnel: Tunnel, noted_at: DateTime<Utc>) -> Option<WaitObservation> {
        let source = match self.method {
            Method::FlowExtras => FLOW_ONLY_SOURCE,
            _ => FUSION_SOURCE,
        };
        self.wait_minutes.map(|minutes| WaitObservation {
            tunnel,
            direction: self.direction,
            minutes: minutes as f64,
            noted_at,
            source: source.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_serializes_to_tag() {
        assert_eq!(serde_json::to_string(&Method::Fused).unwrap(), "\"max(routeDelta, flowChain)\"");
        assert_eq!(serde_json::to_string(&Method::Routing).unwrap(), "\"routing\"");
        assert_eq!(Method::Flow.to_string(), "flow");
    }

    #[test]
    fn test_to_observation() {
        let estimation = Estimation {
            direction: Direction::E,
            wait_minutes: Some(7),
            components: Components {
                route_delta_sec: Some(420.0),
                flow_chain_sec: None,
            },
            method: Method::Routing,
            raw: serde_json::Value::Null,
        };
        let now = Utc::now();
        let obs = estimation.to_observation(Tunnel::MonteBianco, now).unwrap();

        assert_eq!(obs.tunnel, Tunnel::MonteBianco);
        assert_eq!(obs.direction, Direction::E);
        assert_eq!(obs.minutes, 7.0);
        assert_eq!(obs.noted_at, now);
        assert_eq!(obs.source, FUSION_SOURCE);

        let empty = Estimation {
            wait_minutes: None,
            ..estimation
        };
        assert!(empty.to_observation(Tunnel::MonteBianco, now).is_none());
    }
}
