use clap::{Parser, Subcommand};
use rpcpool::config::{Config, LoggingConfig};
use rpcpool::loadgen;
use rpcpool::{PoolError, Result, TcpPool};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "rpcpool")]
#[command(about = "Pooled RPC connection driver and echo endpoint", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Generate example configuration file
    #[arg(long, value_name = "FILE")]
    generate_config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides config
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a line echo endpoint to pool connections against
    Serve {
        #[arg(long, default_value = "127.0.0.1:2020")]
        bind: String,
    },
    /// Drive concurrent requests through a connection pool
    Bench {
        /// Endpoint to connect to (overrides config)
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        init_size: Option<usize>,
        #[arg(long)]
        idle_size: Option<usize>,
        #[arg(long)]
        peak_size: Option<usize>,
        /// Number of requests to perform
        #[arg(short = 'n', long)]
        requests: Option<u64>,
        /// Number of requests to run at a time
        #[arg(short = 'c', long)]
        concurrency: Option<usize>,
        /// Log progress every N finished requests
        #[arg(long)]
        tick: Option<u64>,
        /// Per-request timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle config generation
    if let Some(config_path) = args.generate_config {
        println!("Generating example configuration file: {:?}", config_path);
        Config::create_example(&config_path)?;
        println!("Example configuration file created successfully!");
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_logging(&config.logging)?;
    info!("rpcpool v{} starting", env!("CARGO_PKG_VERSION"));

    match args.command {
        Some(Command::Serve { bind }) => {
            let listener = TcpListener::bind(&bind).await?;
            tokio::select! {
                result = loadgen::serve_echo(listener) => {
                    if let Err(e) = result {
                        error!("Echo endpoint error: {}", e);
                        return Err(e.into());
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down");
                }
            }
        }
        Some(Command::Bench {
            server,
            init_size,
            idle_size,
            peak_size,
            requests,
            concurrency,
            tick,
            timeout_ms,
            json,
        }) => {
            // Apply CLI overrides
            if let Some(server) = server {
                config.pool.endpoint = server;
            }
            if let Some(v) = init_size {
                config.pool.init_size = v;
            }
            if let Some(v) = idle_size {
                config.pool.idle_size = v;
            }
            if let Some(v) = peak_size {
                config.pool.peak_size = v;
            }
            if let Some(v) = requests {
                config.bench.requests = v;
            }
            if let Some(v) = concurrency {
                config.bench.concurrency = v;
            }
            if let Some(v) = tick {
                config.bench.tick = v;
            }
            if let Some(v) = timeout_ms {
                config.bench.timeout_ms = v;
            }
            config.validate()?;

            let pool = Arc::new(TcpPool::from_config(config.pool.clone()));
            let report = loadgen::run(Arc::clone(&pool), &config.bench).await;
            pool.close().await;

            if json {
                let out = serde_json::to_string_pretty(&report)
                    .map_err(|e| PoolError::Config(format!("Failed to encode report: {}", e)))?;
                println!("{}", out);
            } else {
                println!(
                    "QPS: {} (Num: {}, Millis: {}, PoolFailed: {}, CallFailed: {})",
                    report.qps,
                    report.finished,
                    report.elapsed_ms,
                    report.pool_failed,
                    report.call_failed
                );
            }
        }
        None => {
            println!("No command given; see --help");
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_new(&logging.level)
        .map_err(|e| PoolError::Config(format!("Invalid log level: {}", e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    Ok(())
}
