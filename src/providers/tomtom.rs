use crate::corridor::Coordinate;
use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, fetch_json};
use crate::providers::{FlowProvider, FlowSegment, RouteSummary, RoutingProvider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.tomtom.com";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowResponse {
    flow_segment_data: Option<FlowSegmentData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowSegmentData {
    current_travel_time: Option<f64>,
    free_flow_travel_time: Option<f64>,
}

#[derive(Deserialize)]
struct RouteResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Deserialize)]
struct Route {
    summary: Option<Summary>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    #[serde(default)]
    no_traffic_travel_time_in_seconds: f64,
    #[serde(default)]
    live_traffic_incidents_travel_time_in_seconds: f64,
}

/// TomTom flow-segment and routing client.
pub struct TomTomClient<C> {
    http: C,
    base_url: String,
}

impl TomTomClient<UrlParam<BasicClient>> {
    pub fn new(api_key: String, base_url: &str) -> Self {
        Self::with_client(UrlParam::new(BasicClient::new(), "key", api_key), base_url)
    }
}

impl<C: HttpClient> TomTomClient<C> {
    pub fn with_client(http: C, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn flow_url(&self, point: Coordinate) -> String {
        format!(
            "{}/traffic/services/4/flowSegmentData/absolute/10/json?point={}",
            self.base_url, point
        )
    }

    fn route_url(&self, origin: Coordinate, destination: Coordinate) -> String {
        format!(
            "{}/routing/1/calculateRoute/{}:{}/json?traffic=true&computeTravelTimeFor=all&routeType=fastest",
            self.base_url, origin, destination
        )
    }
}

fn parse_flow(raw: serde_json::Value) -> Result<FlowSegment> {
    let parsed: FlowResponse =
        serde_json::from_value(raw.clone()).context("malformed flow segment body")?;
    let data = parsed
        .flow_segment_data
        .context("flow response has no flowSegmentData")?;

    Ok(FlowSegment {
        current_travel_time: data.current_travel_time,
        free_flow_travel_time: data.free_flow_travel_time,
        raw,
    })
}

fn parse_route(raw: serde_json::Value) -> Result<RouteSummary> {
    let parsed: RouteResponse =
        serde_json::from_value(raw).context("malformed routing body")?;
    let summary = parsed
        .routes
        .into_iter()
        .next()
        .and_then(|r| r.summary)
        .context("routing response has no route summary")?;

    Ok(RouteSummary {
        no_traffic_travel_time: summary.no_traffic_travel_time_in_seconds,
        live_traffic_travel_time: summary.live_traffic_incidents_travel_time_in_seconds,
        raw: serde_json::json!({
            "summary": {
                "noTrafficTravelTimeInSeconds": summary.no_traffic_travel_time_in_seconds,
                "liveTrafficIncidentsTravelTimeInSeconds": summary.live_traffic_incidents_travel_time_in_seconds,
            }
        }),
    })
}

#[async_trait]
impl<C: HttpClient> FlowProvider for TomTomClient<C> {
    async fn flow_segment(&self, point: Coordinate) -> Result<FlowSegment> {
        let raw = fetch_json(&self.http, &self.flow_url(point)).await?;
        parse_flow(raw)
    }
}

#[async_trait]
impl<C: HttpClient> RoutingProvider for TomTomClient<C> {
    async fn route_summary(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<RouteSummary> {
        let raw = fetch_json(&self.http, &self.route_url(origin, destination)).await?;
        parse_route(raw)
    }
}
