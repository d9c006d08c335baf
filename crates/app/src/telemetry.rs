use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{
    BuildError as PrometheusBuildError, Matcher, PrometheusBuilder, PrometheusHandle,
};
use std::{
    fmt as stdfmt,
    sync::{Mutex, OnceLock},
    time::{Duration, Instant},
};
use tracing_subscriber::{
    fmt::{self as tracing_fmt, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use oniontodo_util::{AppConfig, Environment};

const RPC_REQUESTS_TOTAL: &str = "rpc_requests_total";
const RPC_DURATION_SECONDS: &str = "rpc_duration_seconds";
const BUILD_INFO: &str = "app_build_info";
const UPTIME_SECONDS: &str = "app_uptime_seconds";

/// Unary calls are store round trips; buckets stop well above the busy timeout.
const RPC_DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0, 5.0];

// sqlx logs every statement at info.
const DEFAULT_FILTER: &str = "info,sqlx=warn";

#[derive(Debug)]
pub enum TelemetryError {
    Tracing(tracing_subscriber::util::TryInitError),
    Metrics(PrometheusBuildError),
}

impl stdfmt::Display for TelemetryError {
    fn fmt(&self, f: &mut stdfmt::Formatter<'_>) -> stdfmt::Result {
        match self {
            Self::Tracing(err) => write!(f, "failed to initialize tracing: {err}"),
            Self::Metrics(err) => write!(f, "failed to initialize prometheus recorder: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {}

impl From<tracing_subscriber::util::TryInitError> for TelemetryError {
    fn from(value: tracing_subscriber::util::TryInitError) -> Self {
        Self::Tracing(value)
    }
}

impl From<PrometheusBuildError> for TelemetryError {
    fn from(value: PrometheusBuildError) -> Self {
        Self::Metrics(value)
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static METRICS_INSTALL_GUARD: Mutex<()> = Mutex::new(());
static START_TIME: OnceLock<Instant> = OnceLock::new();

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

fn build_git_sha() -> &'static str {
    option_env!("GIT_SHA").unwrap_or("unknown")
}

/// Installs the global subscriber: human readable output while developing,
/// one JSON object per line in production.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let production = config.environment == Environment::Production;

    let pretty = (!production).then(|| {
        tracing_fmt::layer()
            .with_target(false)
            .with_timer(UtcTime::rfc_3339())
            .pretty()
    });
    let json = production.then(|| {
        tracing_fmt::layer()
            .with_target(false)
            .with_timer(UtcTime::rfc_3339())
            .json()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty)
        .with(json)
        .try_init()?;

    tracing::info!(
        stage = "telemetry",
        env = %config.environment.as_str(),
        version = BUILD_VERSION,
        git_sha = build_git_sha(),
        "tracing initialized"
    );
    Ok(())
}

/// Installs the Prometheus recorder once per process and returns its handle.
pub fn init_metrics() -> Result<PrometheusHandle, TelemetryError> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let _guard = METRICS_INSTALL_GUARD
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(RPC_DURATION_SECONDS.to_string()),
            RPC_DURATION_BUCKETS,
        )?
        .install_recorder()?;
    METRICS_HANDLE.set(handle.clone()).ok();

    describe_gauge!(BUILD_INFO, "Build metadata for the running binary");
    describe_gauge!(UPTIME_SECONDS, "Seconds since the process started");
    describe_counter!(
        RPC_REQUESTS_TOTAL,
        "Count of TodoService RPC calls, labelled by procedure and result code"
    );
    describe_histogram!(
        RPC_DURATION_SECONDS,
        "Latency in seconds of TodoService RPC calls, labelled by procedure"
    );

    gauge!(BUILD_INFO, "version" => BUILD_VERSION, "git" => build_git_sha()).set(1.0);
    START_TIME.get_or_init(Instant::now);

    Ok(handle)
}

/// Records the outcome of one TodoService call.
pub fn record_rpc(procedure: &str, code: &'static str, elapsed: Duration) {
    counter!(RPC_REQUESTS_TOTAL, "procedure" => procedure.to_string(), "code" => code)
        .increment(1);
    histogram!(RPC_DURATION_SECONDS, "procedure" => procedure.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn render_metrics(handle: &PrometheusHandle) -> String {
    let uptime = START_TIME
        .get()
        .map(|start| start.elapsed().as_secs_f64())
        .unwrap_or_default();
    gauge!(UPTIME_SECONDS).set(uptime);

    handle.render()
}
