//! # vigil-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the Vigil API and the background
//! overdue sweep. Binds to a configurable port (default 8080).

use std::sync::Arc;

use vigil_api::state::{AppConfig, AppState};
use vigil_core::SystemClock;
use vigil_crypto::VaultCipher;
use vigil_notify::{HttpEmailNotifier, Notifier, NullNotifier};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Build configuration from environment.
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let jwt_secret = match std::env::var("VIGIL_JWT_SECRET") {
        Ok(secret) => secret,
        Err(_) => {
            tracing::warn!(
                "VIGIL_JWT_SECRET not set — using an ephemeral secret. \
                 Issued tokens will not survive restarts."
            );
            vigil_crypto::generate_token()
        }
    };

    let public_base_url = std::env::var("VIGIL_PUBLIC_BASE_URL")
        .unwrap_or_else(|_| format!("http://localhost:{port}"));

    let sweep_interval_secs = match std::env::var("VIGIL_SWEEP_INTERVAL_SECS") {
        Ok(raw) => {
            let secs: u64 = raw.parse().map_err(|e| {
                tracing::error!("Invalid VIGIL_SWEEP_INTERVAL_SECS {raw:?}: {e}");
                e
            })?;
            if secs == 0 {
                tracing::warn!("VIGIL_SWEEP_INTERVAL_SECS=0 — overdue sweep disabled");
                None
            } else {
                Some(secs)
            }
        }
        Err(_) => Some(3600),
    };

    let config = AppConfig {
        port,
        jwt_secret,
        public_base_url,
        sweep_interval_secs,
    };

    // Master key for the vault cipher. An invalid key is fatal; an absent
    // one gets an ephemeral replacement so development still works.
    let cipher = match std::env::var("VIGIL_MASTER_KEY_HEX") {
        Ok(hex) => Arc::new(VaultCipher::from_hex(&hex).map_err(|e| {
            tracing::error!("Invalid VIGIL_MASTER_KEY_HEX: {e}");
            e
        })?),
        Err(_) => {
            tracing::warn!(
                "VIGIL_MASTER_KEY_HEX not set — using an ephemeral master key. \
                 Vault items will be unreadable after restart."
            );
            Arc::new(VaultCipher::ephemeral())
        }
    };

    // Mail relay. Without one, release and verification sends fail loudly
    // rather than pretending to deliver.
    let notifier: Arc<dyn Notifier> = match std::env::var("VIGIL_MAIL_RELAY_URL") {
        Ok(raw) => {
            let url = url::Url::parse(&raw).map_err(|e| {
                tracing::error!("Invalid VIGIL_MAIL_RELAY_URL {raw:?}: {e}");
                e
            })?;
            let token = std::env::var("VIGIL_MAIL_RELAY_TOKEN").ok();
            tracing::info!(relay = %url, "Mail relay configured");
            Arc::new(HttpEmailNotifier::new(url, token)?)
        }
        Err(_) => {
            tracing::warn!(
                "VIGIL_MAIL_RELAY_URL not set — email delivery disabled. \
                 Releases and verification sends will report the relay as unavailable."
            );
            Arc::new(NullNotifier)
        }
    };

    // Initialize database pool (optional — absent means in-memory only).
    let db_pool = vigil_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let state = AppState::new(config, cipher, notifier, Arc::new(SystemClock), db_pool);

    // Hydrate in-memory stores from database (if connected).
    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    // Background overdue sweep.
    if let Some(secs) = state.config.sweep_interval_secs {
        let sweep_state = state.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(secs));
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                let completed = sweep_state.coordinator.sweep().await;
                if !completed.is_empty() {
                    tracing::info!(count = completed.len(), "overdue sweep triggered releases");
                }
                if let Some(pool) = &sweep_state.db_pool {
                    for record in &completed {
                        if let Err(e) = vigil_api::db::releases::save(pool, record).await {
                            tracing::warn!(error = %e, release = %record.id, "failed to persist release record");
                        }
                    }
                }
            }
        });
        tracing::info!(interval_secs = secs, "overdue sweep scheduled");
    }

    let port = state.config.port;
    let app = vigil_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Vigil API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
