//! Codegate Server - Adaptive admission guard for a verification endpoint
//!
//! Every request to `/check_code` flows through the guard before the code
//! is checked: sliding-window rate tracking, escalating block/blacklist
//! states, an identity-entropy anomaly signal, and randomized service
//! degradation noise.

mod config;
mod guard;
mod routes;
mod verify;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::guard::{AdmissionEngine, ThreadRngNoise};
use crate::verify::StoredCodeVerifier;

/// How often idle client records are swept
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,codegate_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Starting Codegate server on {}:{}", config.host, config.port);
    tracing::info!("Guard profile: {}", config.profile);

    let verifier = match &config.valid_code {
        Some(code) => StoredCodeVerifier::new(code.clone(), config.balance.clone()),
        None => StoredCodeVerifier::generate(config.balance.clone()),
    };
    // Lab semantics: the secret is logged so operators can drive traffic
    // against the guard.
    tracing::info!("Valid code (lab): {}", verifier.code());

    let engine = Arc::new(AdmissionEngine::new(
        config.guard.clone(),
        config.record_retention,
        Arc::new(verifier),
        Box::new(ThreadRngNoise),
    ));

    // Background sweep keeps the record store bounded.
    let sweeper = Arc::clone(&engine);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let evicted = sweeper.evict_idle(Instant::now());
            if evicted > 0 {
                tracing::debug!(evicted, "swept idle client records");
            }
        }
    });

    let state = routes::AppState::new(config.clone(), engine);

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(routes::check::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Health check endpoint
async fn health_check(State(state): State<routes::AppState>) -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "profile": state.config.profile,
        "tracked_clients": state.engine.tracked_clients(),
    }))
}
