use crate::corridor::{CorridorTable, Direction, Tunnel};
use crate::estimator::signals::{get_flow_chain, get_route_delay};
use crate::estimator::types::{
    Components, Estimation, FLOW_ONLY_CAP_MINUTES, FlowChain, Method, RouteDelay,
};
use crate::fetch::RetryPolicy;
use crate::providers::{FlowProvider, RoutingProvider};
use serde_json::json;
use std::str::FromStr;
use tracing::{info, warn};

pub const DEFAULT_FLOW_POINTS: usize = 3;
pub const DEFAULT_FLOW_ONLY_POINTS: usize = 8;

/// Which flow quantity enters the fusion max.
///
/// `Travel` is the raw sum of current travel times per point and is the
/// default. `Delay` is the trimmed sum of per-point extra seconds, which is
/// comparable with the routing delay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlowSignal {
    #[default]
    Travel,
    Delay,
}

impl FromStr for FlowSignal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "travel" => Ok(FlowSignal::Travel),
            "delay" => Ok(FlowSignal::Delay),
            other => Err(format!("unknown flow signal: {other}")),
        }
    }
}

impl FlowSignal {
    fn seconds(&self, chain: &FlowChain) -> f64 {
        match self {
            FlowSignal::Travel => chain.travel_seconds,
            FlowSignal::Delay => chain.delay_seconds as f64,
        }
    }
}

/// Fuses routing and flow signals into per-direction wait estimates.
pub struct Estimator<F, R> {
    flow: F,
    routing: R,
    corridors: CorridorTable,
    policy: RetryPolicy,
    flow_points: usize,
    flow_signal: FlowSignal,
}

impl<F, R> Estimator<F, R>
where
    F: FlowProvider,
    R: RoutingProvider,
{
    pub fn new(flow: F, routing: R, corridors: CorridorTable) -> Self {
        Self {
            flow,
            routing,
            corridors,
            policy: RetryPolicy::default(),
            flow_points: DEFAULT_FLOW_POINTS,
            flow_signal: FlowSignal::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_flow_points(mut self, flow_points: usize) -> Self {
        self.flow_points = flow_points.max(1);
        self
    }

    pub fn with_flow_signal(mut self, flow_signal: FlowSignal) -> Self {
        self.flow_signal = flow_signal;
        self
    }

    pub fn corridors(&self) -> &CorridorTable {
        &self.corridors
    }

    /// Estimates the current wait for one tunnel direction.
    ///
    /// Routing and flow are fetched concurrently; either may fail without
    /// affecting the other. Returns `None` when the direction is not on the
    /// tunnel's axis or when both sources failed.
    #[tracing::instrument(skip(self))]
    pub async fn estimate_wait(&self, tunnel: Tunnel, direction: Direction) -> Option<Estimation> {
        let Some(path) = self.corridors.path(tunnel, direction, self.flow_points) else {
            warn!("Direction not on tunnel axis");
            return None;
        };

        let (route, flow) = tokio::join!(
            get_route_delay(&self.routing, path.origin, path.destination, direction, &self.policy),
            get_flow_chain(&self.flow, &path.points, direction, &self.policy),
        );

        let route = route
            .inspect_err(|e| warn!(error = %e, "Routing source unavailable"))
            .ok();
        let flow = flow
            .inspect_err(|e| warn!(error = %e, "Flow source unavailable"))
            .ok();

        let estimation = fuse(direction, route, flow, self.flow_signal);
        match &estimation {
            Some(e) => info!(
                wait_minutes = ?e.wait_minutes,
                method = %e.method,
                "Wait estimated"
            ),
            None => warn!("No source available, skipping estimate"),
        }
        estimation
    }

    /// Flow-only estimate from the trimmed sum of per-point extra seconds,
    /// capped at ten hours. Returns `None` when no point answered.
    #[tracing::instrument(skip(self))]
    pub async fn estimate_flow_only(
        &self,
        tunnel: Tunnel,
        direction: Direction,
        n_points: usize,
    ) -> Option<Estimation> {
        let path = self.corridors.path(tunnel, direction, n_points.max(1))?;
        let chain = get_flow_chain(&self.flow, &path.points, direction, &self.policy)
            .await
            .inspect_err(|e| warn!(error = %e, "Flow source unavailable, skipping estimate"))
            .ok()?;

        let delay = chain.delay_seconds;
        let minutes = ((delay as f64 / 60.0).round() as i64).min(FLOW_ONLY_CAP_MINUTES);
        info!(wait_minutes = minutes, samples = chain.extras.len(), "Flow-only wait estimated");

        Some(Estimation {
            direction,
            wait_minutes: Some(minutes),
            components: Components {
                route_delta_sec: None,
                flow_chain_sec: Some(delay as f64),
            },
            method: Method::FlowExtras,
            raw: json!({ "provider": "tomtom", "points": path.points, "flows": chain.raw }),
        })
    }
}

/// Combines whichever sources are present with a max-of rule. An absent
/// source counts as zero.
pub fn fuse(
    direction: Direction,
    route: Option<RouteDelay>,
    flow: Option<FlowChain>,
    flow_signal: FlowSignal,
) -> Option<Estimation> {
    let method = match (&route, &flow) {
        (None, None) => return None,
        (Some(_), Some(_)) => Method::Fused,
        (Some(_), None) => Method::Routing,
        (None, Some(_)) => Method::Flow,
    };

    let route_delta = route.as_ref().map(|r| r.delay_seconds);
    let flow_chain = flow.as_ref().map(|f| flow_signal.seconds(f));
    let fused = route_delta.unwrap_or(0.0).max(flow_chain.unwrap_or(0.0));

    Some(Estimation {
        direction,
        wait_minutes: Some((fused / 60.0).round() as i64),
        components: Components {
            route_delta_sec: route_delta,
            flow_chain_sec: flow_chain,
        },
        method,
        raw: json!({
            "route": route.map(|r| r.raw),
            "flow": flow.map(|f| f.raw),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::aggregate::summarize;

    fn route(delay: f64) -> RouteDelay {
        RouteDelay {
            direction: Direction::S,
            delay_seconds: delay,
            raw: serde_json::Value::Null,
        }
    }

    fn chain(travel: f64, extras: Vec<f64>) -> FlowChain {
        FlowChain {
            direction: Direction::S,
            travel_seconds: travel,
            delay_seconds: summarize(&extras),
            extras,
            raw: vec![],
        }
    }

    #[test]
    fn test_fuse_none_when_no_source() {
        assert!(fuse(Direction::S, None, None, FlowSignal::Travel).is_none());
    }

    #[test]
    fn test_fuse_takes_max() {
        let e = fuse(Direction::S, Some(route(120.0)), Some(chain(300.0, vec![])), FlowSignal::Travel).unwrap();
        assert_eq!(e.wait_minutes, Some(5));
        assert_eq!(e.method, Method::Fused);
        assert_eq!(e.components.route_delta_sec, Some(120.0));
        assert_eq!(e.components.flow_chain_sec, Some(300.0));
    }

    #[test]
    fn test_fuse_method_tags() {
        let routing = fuse(Direction::N, Some(route(90.0)), None, FlowSignal::Travel).unwrap();
        assert_eq!(routing.method, Method::Routing);
        assert_eq!(routing.wait_minutes, Some(2));
        assert_eq!(routing.components.flow_chain_sec, None);

        let flow = fuse(Direction::N, None, Some(chain(29.0, vec![])), FlowSignal::Travel).unwrap();
        assert_eq!(flow.method, Method::Flow);
        assert_eq!(flow.wait_minutes, Some(0));
        assert_eq!(flow.components.route_delta_sec, None);
    }

    #[test]
    fn test_fuse_delay_signal_uses_trimmed_extras() {
        let flow = chain(900.0, vec![60.0, 120.0]);
        let e = fuse(Direction::S, Some(route(30.0)), Some(flow), FlowSignal::Delay).unwrap();
        assert_eq!(e.components.flow_chain_sec, Some(180.0));
        assert_eq!(e.wait_minutes, Some(3));
    }

    #[test]
    fn test_flow_signal_parse() {
        assert_eq!("Delay".parse::<FlowSignal>(), Ok(FlowSignal::Delay));
        assert_eq!("travel".parse::<FlowSignal>(), Ok(FlowSignal::Travel));
        assert!("mean".parse::<FlowSignal>().is_err());
    }
}
