mod access;
mod analyzer;
mod config;
mod db;
mod errors;
mod matching;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::access::PgAccessPolicy;
use crate::analyzer::HttpJobAnalyzer;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::matching::ledger::PgCreditLedger;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing or malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting talent-match API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    if config.run_migrations {
        run_migrations(&db).await?;
    }

    // Initialize analyzer client
    let analyzer = Arc::new(HttpJobAnalyzer::new(
        config.analyzer_url.clone(),
        config.analyzer_api_key.clone(),
    ));
    info!("Analyzer client initialized ({})", config.analyzer_url);

    info!(
        "Fit band {}+{} (default {}), anonymized labels '{} <{} hex>'",
        config.fit_band.floor,
        config.fit_band.span,
        config.fit_band.default_score,
        config.anonymization.label_prefix,
        config.anonymization.hash_len
    );

    // Build app state
    let state = AppState {
        access: Arc::new(PgAccessPolicy::new(db.clone())),
        ledger: Arc::new(PgCreditLedger),
        analyzer,
        db,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the recruiter dashboard origin

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
