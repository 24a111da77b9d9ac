//! Wallet Auth Server
//!
//! HTTP API for Solana wallet sign-in: challenge issuance, signature login,
//! wallet attach/unattach, and JWT refresh.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;

use wallet_auth_server::auth::{
    AuthEngines, MemoryNonceStore, NonceLedger, NonceStore, PgNonceStore, SolanaAuthEngine,
    TokenService,
};
use wallet_auth_server::config::Config;
use wallet_auth_server::db::{self, Database};
use wallet_auth_server::middleware::RateLimiter;
use wallet_auth_server::routes::{build_router, RouterOptions};
use wallet_auth_server::state::AppState;
use wallet_auth_server::users::{MemoryUserStore, PgUserStore, UserStore};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const RATE_LIMIT_IDLE: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        environment = config.environment.as_str(),
        database = %config.database_url_masked(),
        "Starting wallet auth server"
    );

    let (nonce_store, users, database) = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(&config, url).await?;
            db::run_migrations(&pool).await?;

            (
                Arc::new(PgNonceStore::new(pool.clone())) as Arc<dyn NonceStore>,
                Arc::new(PgUserStore::new(pool.clone())) as Arc<dyn UserStore>,
                Some(Database::new(pool)),
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            (
                Arc::new(MemoryNonceStore::new()) as Arc<dyn NonceStore>,
                Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>,
                None,
            )
        }
    };

    let ledger = Arc::new(NonceLedger::new(nonce_store, config.nonce_ttl()));

    let tokens = Arc::new(TokenService::new(
        users.clone(),
        config.jwt_secret.clone(),
        config.jwt_access_token_ttl_seconds,
        config.jwt_refresh_token_ttl_days,
    ));

    let solana = SolanaAuthEngine::new(
        ledger.clone(),
        users.clone(),
        tokens.clone(),
        config.app_name.clone(),
    );
    let engines = AuthEngines::new(Arc::new(solana));

    let app_state = AppState::new(engines, tokens, users, database);

    let rate_limiter = RateLimiter::new(config.rate_limit_rps);

    // Periodic cleanup of expired nonces and idle rate-limit buckets
    let sweep_ledger = ledger.clone();
    let sweep_limiter = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;

            match sweep_ledger.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "Purged expired nonces"),
                Err(e) => tracing::warn!(error = %e, "Nonce purge failed"),
            }

            let dropped = sweep_limiter.cleanup(RATE_LIMIT_IDLE).await;
            if dropped > 0 {
                tracing::debug!(dropped, "Dropped idle rate limit buckets");
            }
        }
    });

    let app = build_router(
        app_state,
        rate_limiter,
        RouterOptions {
            cors_allowed_origins: config.cors_allowed_origins.clone(),
            hsts: config.environment.is_production(),
        },
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
