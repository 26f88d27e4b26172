//! Runtime settings read from the environment (and `.env`, loaded by the
//! binary with `dotenvy`).

use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use std::str::FromStr;
use std::time::Duration;

use crate::estimator::FlowSignal;
use crate::estimator::fusion::DEFAULT_FLOW_POINTS;
use crate::fetch::RetryPolicy;
use crate::providers::DEFAULT_BASE_URL;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Zurich;
pub const DEFAULT_OBSERVATIONS_PATH: &str = "observations.csv";

#[derive(Debug, Clone)]
pub struct Settings {
    pub tomtom_api_key: Option<String>,
    pub tomtom_base_url: String,
    /// Local clock used for weekday and bin derivation.
    pub timezone: Tz,
    pub retry: RetryPolicy,
    pub flow_points: usize,
    pub flow_signal: FlowSignal,
    pub observations_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tomtom_api_key: None,
            tomtom_base_url: DEFAULT_BASE_URL.to_string(),
            timezone: DEFAULT_TIMEZONE,
            retry: RetryPolicy::default(),
            flow_points: DEFAULT_FLOW_POINTS,
            flow_signal: FlowSignal::default(),
            observations_path: DEFAULT_OBSERVATIONS_PATH.to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from any variable lookup; unset or empty variables
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut settings = Self::default();

        settings.tomtom_api_key = get("TOMTOM_API_KEY");
        if let Some(url) = get("TOMTOM_BASE_URL") {
            settings.tomtom_base_url = url;
        }
        if let Some(tz) = get("TUNNEL_TIMEZONE") {
            settings.timezone = tz
                .parse::<Tz>()
                .map_err(|e| anyhow!("TUNNEL_TIMEZONE: {e}"))?;
        }
        if let Some(attempts) = get("PROVIDER_ATTEMPTS") {
            settings.retry.attempts = parse_var("PROVIDER_ATTEMPTS", &attempts)?;
        }
        if let Some(ms) = get("PROVIDER_TIMEOUT_MS") {
            settings.retry.timeout = Duration::from_millis(parse_var("PROVIDER_TIMEOUT_MS", &ms)?);
        }
        if let Some(points) = get("FLOW_POINTS") {
            settings.flow_points = parse_var("FLOW_POINTS", &points)?;
        }
        if let Some(signal) = get("FLOW_SIGNAL") {
            settings.flow_signal = signal
                .parse()
                .map_err(|e: String| anyhow!("FLOW_SIGNAL: {e}"))?;
        }
        if let Some(path) = get("OBSERVATIONS_PATH") {
            settings.observations_path = path;
        }

        Ok(settings)
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.tomtom_api_key
            .as_deref()
            .context("TOMTOM_API_KEY must be set for live estimation")
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{name}: invalid value '{value}'"))
}
