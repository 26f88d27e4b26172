//! CLI entry point for the tunnel wait estimator.
//!
//! Provides subcommands for live estimation, periodic polling into the
//! observation log, manual entry, and forecasting from the logged history.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use tunnel_wait::{
    config::Settings,
    corridor::{CorridorTable, Direction, Tunnel},
    estimator::{Estimator, fusion::DEFAULT_FLOW_ONLY_POINTS},
    forecast::{
        bin_label, build_profiles, find_min_in_window, parse_bin_label, predict_wait,
        weekly_heatmap,
    },
    observations::{CsvObservationStore, MANUAL_SOURCE, ObservationStore, WaitObservation},
    output::{format_minutes, print_json},
    providers::TomTomClient,
};

type LiveEstimator = Estimator<
    TomTomClient<tunnel_wait::fetch::auth::UrlParam<tunnel_wait::fetch::BasicClient>>,
    TomTomClient<tunnel_wait::fetch::auth::UrlParam<tunnel_wait::fetch::BasicClient>>,
>;

#[derive(Parser)]
#[command(name = "tunnel_wait")]
#[command(about = "Estimate and forecast queue waits at alpine road tunnels", long_about = None)]
struct Cli {
    /// JSON file overriding the built-in corridor geometry
    #[arg(long, global = true)]
    corridors: Option<String>,

    /// Observation CSV (defaults to OBSERVATIONS_PATH or observations.csv)
    #[arg(long, global = true)]
    observations: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the current wait for one tunnel direction
    Estimate {
        tunnel: Tunnel,
        direction: Direction,

        /// Use only flow extras (trimmed sum) instead of routing+flow fusion
        #[arg(long, default_value_t = false)]
        flow_only: bool,

        /// Append the estimate to the observation log
        #[arg(long, default_value_t = false)]
        log: bool,
    },
    /// Estimate every tunnel direction periodically and log the results
    Poll {
        /// Seconds between rounds
        #[arg(short = 'r', long, default_value_t = 300)]
        sample_rate: u64,

        /// Number of rounds (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 1)]
        num_samples: usize,
    },
    /// Predict the wait at a given time from logged history
    Predict {
        tunnel: Tunnel,
        direction: Direction,

        /// RFC 3339 timestamp or local "YYYY-MM-DDTHH:MM" (defaults to now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Find the arrival time with the lowest predicted wait
    BestWindow {
        tunnel: Tunnel,
        direction: Direction,

        /// Local date, YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,

        /// Window start, HH:MM
        #[arg(long)]
        from: String,

        /// Window end, HH:MM (may be earlier than --from to cross midnight)
        #[arg(long)]
        to: String,
    },
    /// Record a manually observed wait
    Record {
        tunnel: Tunnel,
        direction: Direction,

        /// Observed wait in minutes
        #[arg(allow_negative_numbers = true)]
        minutes: f64,

        /// Source tag stored with the observation
        #[arg(long, default_value = MANUAL_SOURCE)]
        source: String,

        /// RFC 3339 timestamp or local "YYYY-MM-DDTHH:MM" (defaults to now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Weekly mean-wait heatmap (Monday first, by hour)
    Heatmap {
        /// Restrict to one tunnel
        #[arg(long)]
        tunnel: Option<Tunnel>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/tunnel_wait.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("tunnel_wait.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    let corridors = match &cli.corridors {
        Some(path) => CorridorTable::load(path)?,
        None => CorridorTable::builtin(),
    };
    let store = CsvObservationStore::new(
        cli.observations
            .clone()
            .unwrap_or_else(|| settings.observations_path.clone()),
    );

    match cli.command {
        Commands::Estimate {
            tunnel,
            direction,
            flow_only,
            log,
        } => {
            let estimator = live_estimator(&settings, corridors)?;
            let estimation = if flow_only {
                estimator
                    .estimate_flow_only(tunnel, direction, DEFAULT_FLOW_ONLY_POINTS)
                    .await
            } else {
                estimator.estimate_wait(tunnel, direction).await
            };

            let Some(estimation) = estimation else {
                warn!(%tunnel, %direction, "No estimate available");
                return Ok(());
            };
            if let Some(minutes) = estimation.wait_minutes {
                info!(%tunnel, %direction, wait = %format_minutes(minutes as f64), "Current wait");
            }
            if log {
                if let Some(obs) = estimation.to_observation(tunnel, Utc::now()) {
                    store.append(&obs)?;
                }
            }
            print_json(&estimation)?;
        }
        Commands::Poll {
            sample_rate,
            num_samples,
        } => {
            let estimator = Arc::new(live_estimator(&settings, corridors)?);
            poll(estimator, &store, sample_rate, num_samples).await?;
        }
        Commands::Predict {
            tunnel,
            direction,
            at,
        } => {
            let tz = settings.timezone;
            let at = match at {
                Some(s) => parse_local_time(&s, &tz)?,
                None => Utc::now().with_timezone(&tz),
            };

            let observations = store.load(None, None)?;
            let profiles = build_profiles(&observations, &tz);
            match predict_wait(&profiles, tunnel, direction, &at) {
                Some(prediction) => {
                    info!(
                        %tunnel,
                        %direction,
                        bin = %bin_label(prediction.bin_used),
                        wait = %format_minutes(prediction.minutes as f64),
                        "Predicted wait"
                    );
                    print_json(&prediction)?;
                }
                None => warn!(%tunnel, %direction, "No history for prediction"),
            }
        }
        Commands::BestWindow {
            tunnel,
            direction,
            date,
            from,
            to,
        } => {
            let start = parse_bin_label(&from).ok_or_else(|| anyhow!("invalid --from '{from}'"))?;
            let end = parse_bin_label(&to).ok_or_else(|| anyhow!("invalid --to '{to}'"))?;

            let observations = store.load(None, None)?;
            let profiles = build_profiles(&observations, &settings.timezone);
            match find_min_in_window(
                &profiles,
                tunnel,
                direction,
                date,
                start,
                end,
                &settings.timezone,
            ) {
                Some(best) => {
                    info!(
                        %tunnel,
                        %direction,
                        arrive = %bin_label(best.best_bin),
                        wait = %format_minutes(best.result.minutes as f64),
                        "Best arrival time"
                    );
                    print_json(&json!({
                        "bestBin": best.best_bin,
                        "arrive": bin_label(best.best_bin),
                        "result": best.result,
                    }))?;
                }
                None => warn!(%tunnel, %direction, "No history in window"),
            }
        }
        Commands::Record {
            tunnel,
            direction,
            minutes,
            source,
            at,
        } => {
            let noted_at = match at {
                Some(s) => parse_local_time(&s, &settings.timezone)?.with_timezone(&Utc),
                None => Utc::now(),
            };
            let observation = WaitObservation {
                tunnel,
                direction,
                minutes,
                noted_at,
                source,
            };
            store.record(&observation)?;
            info!(%tunnel, %direction, minutes, path = store.path(), "Observation recorded");
            print_json(&observation)?;
        }
        Commands::Heatmap { tunnel } => {
            let observations = store.load(None, None)?;
            print_json(&weekly_heatmap(&observations, tunnel, &settings.timezone))?;
        }
    }

    Ok(())
}

fn live_estimator(settings: &Settings, corridors: CorridorTable) -> Result<LiveEstimator> {
    let key = settings.require_api_key()?.to_string();
    Ok(Estimator::new(
        TomTomClient::new(key.clone(), &settings.tomtom_base_url),
        TomTomClient::new(key, &settings.tomtom_base_url),
        corridors,
    )
    .with_policy(settings.retry)
    .with_flow_points(settings.flow_points)
    .with_flow_signal(settings.flow_signal))
}

/// Accepts RFC 3339 or a naive local `YYYY-MM-DDTHH:MM` read in `tz`.
fn parse_local_time(s: &str, tz: &Tz) -> Result<DateTime<Tz>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(tz));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .with_context(|| format!("invalid time '{s}'"))?;
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| anyhow!("'{s}' does not exist in {tz}"))
}

/// Estimates every corridor direction concurrently each round and appends
/// the results to the observation log.
#[tracing::instrument(skip(estimator, store), fields(sample_rate, num_samples))]
async fn poll(
    estimator: Arc<LiveEstimator>,
    store: &CsvObservationStore,
    sample_rate: u64,
    num_samples: usize,
) -> Result<()> {
    let pairs = estimator.corridors().pairs();
    if num_samples == 0 {
        info!(sample_rate, "Polling indefinitely. Press Ctrl+C to stop.");
    } else {
        info!(num_samples, sample_rate, pairs = pairs.len(), "Starting polling");
    }

    let mut sample_count = 0;
    loop {
        if num_samples > 0 && sample_count >= num_samples {
            break;
        }
        sample_count += 1;
        info!(sample = sample_count, "Starting sample round");

        let mut tasks = vec![];
        for (tunnel, direction) in pairs.iter().copied() {
            let estimator = estimator.clone();
            let span = tracing::info_span!("estimate", %tunnel, %direction);
            tasks.push(tokio::spawn(
                async move {
                    let estimation = estimator.estimate_wait(tunnel, direction).await;
                    (tunnel, estimation)
                }
                .instrument(span),
            ));
        }

        let noted_at = Utc::now();
        let mut logged = 0;
        for task in tasks {
            match task.await {
                Ok((tunnel, Some(estimation))) => {
                    if let Some(obs) = estimation.to_observation(tunnel, noted_at) {
                        if let Err(e) = store.append(&obs) {
                            error!(error = %e, "Failed to log observation");
                        } else {
                            logged += 1;
                        }
                    }
                }
                Ok((_, None)) => {}
                Err(e) => error!(error = %e, "Estimate task failed"),
            }
        }
        info!(logged, path = store.path(), "Sample round complete");

        if num_samples == 0 || sample_count < num_samples {
            tokio::time::sleep(tokio::time::Duration::from_secs(sample_rate)).await;
        }
    }

    Ok(())
}
