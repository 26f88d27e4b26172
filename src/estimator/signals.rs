//! Provider fetchers: one corridor flow chain and one route delay.

use crate::corridor::{Coordinate, Direction};
use crate::estimator::aggregate::summarize;
use crate::estimator::types::{FlowChain, RouteDelay};
use crate::fetch::{RetryPolicy, with_retry};
use crate::providers::{FlowProvider, RoutingProvider};
use anyhow::{Result, bail};
use tracing::debug;

/// Samples the flow provider at every point, in order.
///
/// A point that still fails after retries contributes nothing and is left
/// out of `raw`; the remaining points are still sampled. Fails only when no
/// point returned data.
#[tracing::instrument(skip(provider, points, policy), fields(points = points.len()))]
pub async fn get_flow_chain<P: FlowProvider + ?Sized>(
    provider: &P,
    points: &[Coordinate],
    direction: Direction,
    policy: &RetryPolicy,
) -> Result<FlowChain> {
    let mut travel_seconds = 0.0;
    let mut extras = Vec::new();
    let mut raw = Vec::new();

    for point in points {
        match with_retry(policy, || provider.flow_segment(*point)).await {
            Ok(segment) => {
                travel_seconds += segment.current_travel_time.unwrap_or(0.0);
                if let Some(extra) = segment.extra_seconds() {
                    extras.push(extra);
                }
                raw.push(segment.raw);
            }
            Err(e) => {
                debug!(point = %point, error = %e, "Flow point skipped");
            }
        }
    }

    if raw.is_empty() {
        bail!("no flow data for any of {} points", points.len());
    }

    Ok(FlowChain {
        direction,
        travel_seconds,
        delay_seconds: summarize(&extras),
        extras,
        raw,
    })
}

/// Asks the routing provider for the live-traffic delay on one path.
#[tracing::instrument(skip(provider, policy), fields(origin = %origin, destination = %destination))]
pub async fn get_route_delay<P: RoutingProvider + ?Sized>(
    provider: &P,
    origin: Coordinate,
    destination: Coordinate,
    direction: Direction,
    policy: &RetryPolicy,
) -> Result<RouteDelay> {
    let summary = with_retry(policy, || provider.route_summary(origin, destination)).await?;
    Ok(RouteDelay {
        direction,
        delay_seconds: summary.delay_seconds(),
        raw: summary.raw,
    })
}
