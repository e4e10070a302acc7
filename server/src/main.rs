use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use datamock_server::{app, AppState, CliOverrides, ServerConfig};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Mock HTTP server with deterministic synthetic data and fault injection")]
struct Args {
    /// Config file path (TOML, YAML or JSON)
    #[clap(short, long, env = "DATAMOCK_CONFIG")]
    config: Option<String>,

    /// Interface to bind
    #[clap(long, env = "DATAMOCK_HOST")]
    host: Option<String>,

    /// TCP port to listen on
    #[clap(short, long, env = "DATAMOCK_PORT")]
    port: Option<u16>,

    /// Require this key on /api routes
    #[clap(long, env = "DATAMOCK_API_KEY")]
    api_key: Option<String>,

    /// Seed for every dataset
    #[clap(long, env = "DATAMOCK_SEED")]
    seed: Option<u64>,

    /// Record count for every dataset
    #[clap(long, env = "DATAMOCK_TOTAL_RECORDS")]
    total_records: Option<u64>,

    /// JSON schema file for the records dataset
    #[clap(long, env = "DATAMOCK_SCHEMA_FILE")]
    schema_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = ServerConfig::load(args.config.as_deref()).context("loading configuration")?;
    config.apply(CliOverrides {
        host: args.host,
        port: args.port,
        api_key: args.api_key,
        seed: args.seed,
        total_records: args.total_records,
        schema_file: args.schema_file,
    });

    let state = AppState::from_config(&config)
        .context("building datasets")?
        .into_shared();
    for (name, generator) in &state.datasets {
        let metrics = generator.get_metrics();
        tracing::info!(
            dataset = %name,
            total_records = metrics.total_records,
            seed = metrics.seed,
            fields = metrics.field_count,
            "Dataset ready"
        );
    }

    let addr = config.socket_addr().context("parsing listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }
}
