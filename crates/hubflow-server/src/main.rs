use axum::{Json, Router, routing::get};
use clap::Parser;
use hubflow_connect::{ConnectState, create_router};
use serde_json::json;
use std::path::PathBuf;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod state;

#[derive(Parser, Debug)]
#[command(name = "hubflow-server", version, about = "Hubflow Mercado Livre connection service")]
struct Cli {
    /// Path to the TOML config file. Falls back to ./hubflow.toml when present.
    #[arg(long, env = "HUBFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address, e.g. 0.0.0.0:8080. Overrides the config file.
    #[arg(long)]
    bind: Option<String>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut cfg = hubflow_core::load_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        cfg.server.bind = bind;
    }
    cfg.validate()?;

    let state = state::build_state(&cfg).await?;
    let app = app(state);

    tracing::info!("hubflow-server listening on {}", cfg.server.bind);

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn app(state: ConnectState) -> Router {
    create_router(state)
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "service": "hubflow-server" }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutting down");
}
