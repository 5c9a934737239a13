mod signal;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use sensim_core::config::{DEFAULT_BROKER_URL, DEFAULT_SUBJECT_PREFIX};
use sensim_core::impls::{InMemoryBroker, InMemoryMetrics, UniformSourceFactory};
use sensim_core::{SimConfig, SimulationBuilder};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

/// Concurrent sensor simulation harness.
#[derive(Debug, Parser)]
#[command(name = "sensim", version, about)]
struct Args {
    /// Number of simulated sensors
    #[arg(long, env = "SENSIM_PRODUCERS", default_value_t = 5000)]
    producers: usize,

    /// Run length in seconds before automatic shutdown
    #[arg(long, env = "SENSIM_DURATION_SECS", default_value_t = 600)]
    duration_secs: u64,

    /// Tick period of each sensor in milliseconds
    #[arg(long, env = "SENSIM_INTERVAL_MS", default_value_t = 100)]
    interval_ms: u64,

    /// Capacity of the shared reading queue
    #[arg(long, env = "SENSIM_QUEUE_CAPACITY", default_value_t = 1000)]
    queue_capacity: usize,

    /// Forward every reading to the broker
    #[arg(long, env = "SENSIM_ENABLE_BROKER_PUBLISH")]
    enable_broker_publish: bool,

    #[arg(long, env = "SENSIM_BROKER_URL", default_value = DEFAULT_BROKER_URL)]
    broker_url: String,

    #[arg(long, env = "SENSIM_SUBJECT_PREFIX", default_value = DEFAULT_SUBJECT_PREFIX)]
    subject_prefix: String,

    #[arg(long, env = "SENSIM_PUBLISH_TIMEOUT_MS", default_value_t = 2000)]
    publish_timeout_ms: u64,

    /// How long the publisher keeps publishing after shutdown starts (0 = drop at once)
    #[arg(long, env = "SENSIM_PUBLISH_DRAIN_TIMEOUT_MS", default_value_t = 5000)]
    publish_drain_timeout_ms: u64,

    /// Cadence of aggregator/publisher summaries in seconds
    #[arg(long, env = "SENSIM_SUMMARY_INTERVAL_SECS", default_value_t = 5)]
    summary_interval_secs: u64,

    #[arg(long, env = "SENSIM_METRICS_ADDR", default_value = "0.0.0.0:2112")]
    metrics_addr: SocketAddr,

    #[arg(long, env = "SENSIM_PROFILING_ADDR", default_value = "127.0.0.1:6060")]
    profiling_addr: SocketAddr,

    /// Seed for reproducible sensor values (entropy when absent)
    #[arg(long, env = "SENSIM_SEED")]
    seed: Option<u64>,

    #[arg(long, env = "SENSIM_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    /// Print the full run report as JSON on stdout when done
    #[arg(long)]
    print_report: bool,
}

impl Args {
    fn to_config(&self) -> SimConfig {
        SimConfig {
            producer_count: self.producers,
            simulation_duration: Duration::from_secs(self.duration_secs),
            producer_interval: Duration::from_millis(self.interval_ms),
            queue_capacity: self.queue_capacity,
            enable_broker_publish: self.enable_broker_publish,
            broker_url: self.broker_url.clone(),
            subject_prefix: self.subject_prefix.clone(),
            publish_timeout: Duration::from_millis(self.publish_timeout_ms),
            publish_drain_timeout: Duration::from_millis(self.publish_drain_timeout_ms),
            summary_interval: Duration::from_secs(self.summary_interval_secs),
            metrics_bind_address: self.metrics_addr.to_string(),
            profiling_bind_address: self.profiling_addr.to_string(),
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_current_span(true)
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = args.to_config();
    let metrics = Arc::new(InMemoryMetrics::new());
    let sources = match args.seed {
        Some(seed) => UniformSourceFactory::seeded(seed),
        None => UniformSourceFactory::from_entropy(),
    };

    let mut builder = SimulationBuilder::new(config.clone())
        .metrics(metrics.clone())
        .sources(Arc::new(sources));
    if config.enable_broker_publish {
        // no wire client in this build: publish into a counting loopback
        warn!(url = %config.broker_url, "using in-process loopback broker");
        builder = builder.broker(Arc::new(InMemoryBroker::loopback()));
    }
    let sim = builder.build().context("invalid simulation setup")?;

    info!(
        metrics_addr = %config.metrics_bind_address,
        profiling_addr = %config.profiling_bind_address,
        "starting simulation"
    );
    let report = sim
        .run(signal::interrupt())
        .await
        .context("simulation failed")?;

    let snapshot = metrics.snapshot();
    info!(
        run_id = %report.run_id,
        sent = report.sent,
        received = report.received,
        restarts = report.restarts,
        lossless = report.is_lossless(),
        publish_dropped = report.dropped,
        publish_success = snapshot.publish_success,
        publish_failures = snapshot.publish_failures,
        queue_high_watermark = report.queue_high_watermark,
        "run summary"
    );

    if args.print_report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
