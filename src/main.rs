mod aws;
mod config;
mod context;
mod model;
mod output;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::aws::client::AwsApi;
use crate::config::Config;
use crate::context::RunContext;
use crate::output::{LineFormat, LineFormatter};
use crate::pipeline::Collector;

const APP_NAME: &str = "cw-graphite";
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_CONFIG_PATH: &str = "./conf.json";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Parser, Debug)]
#[command(
    name = APP_NAME,
    version = VERSION,
    about = "CloudWatch to Graphite bridge",
    long_about = "cw-graphite: discovers ELB, RDS, ElastiCache, ECS and Lambda resources, queries their recent CloudWatch statistics and writes Graphite line protocol to stdout"
)]
struct Args {
    /// Path to the JSON metrics configuration file
    #[arg(
        long,
        env = "CW_GRAPHITE_CONFIG",
        default_value = DEFAULT_CONFIG_PATH,
        help = "Path to the JSON metrics configuration file"
    )]
    config: PathBuf,

    /// AWS region override
    #[arg(
        long,
        env = "AWS_REGION",
        help = "AWS region override (defaults to the SDK provider chain)"
    )]
    region: Option<String>,

    /// Log level
    #[arg(
        long,
        env = "RUST_LOG",
        default_value = DEFAULT_LOG_LEVEL,
        help = "Log level (trace/debug/info/warn/error)"
    )]
    log_level: String,

    /// Force the legacy Graphite naming scheme
    #[arg(
        long,
        help = "Emit the legacy naming scheme regardless of the configuration file"
    )]
    legacy_format: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging; metric lines go to stdout, everything else to stderr
    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        return;
    }

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %args.config.display(), error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    let legacy = args.legacy_format || config.metrics_config.legacy_format;
    let formatter = LineFormatter::new(
        if legacy {
            LineFormat::Legacy
        } else {
            LineFormat::Current
        },
        &config.metrics_config.carbon_namespace_prefix,
    );
    let ctx = RunContext::new(formatter);

    let (window_start, window_end) = ctx.window_rfc3339();
    info!(
        app = APP_NAME,
        version = VERSION,
        config = %args.config.display(),
        window_start = %window_start,
        window_end = %window_end,
        legacy_format = legacy,
        "announcement"
    );

    let api = AwsApi::connect(args.region).await;
    let collector = Collector::new(api, config, ctx, std::io::stdout());
    collector.run().await;
}

/// Initialize the logging system
fn init_logging(log_level: &str) -> Result<()> {
    let env_filter = match log_level {
        "trace" => EnvFilter::new("trace"),
        "debug" => EnvFilter::new("debug"),
        "info" => EnvFilter::new("info"),
        "warn" => EnvFilter::new("warn"),
        "error" => EnvFilter::new("error"),
        _ => EnvFilter::new("info"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();

    Ok(())
}
