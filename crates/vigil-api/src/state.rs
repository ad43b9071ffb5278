//! # Application State
//!
//! Shared state for the Axum application. The in-memory stores are the
//! runtime source of truth; the optional Postgres pool mirrors them for
//! durability and is replayed into them once at startup.
//!
//! Everything is behind `Arc`, so `AppState` clones are cheap and every
//! handler sees the same stores the release coordinator and the sweep task
//! operate on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use vigil_core::Clock;
use vigil_crypto::VaultCipher;
use vigil_notify::Notifier;
use vigil_release::ReleaseCoordinator;
use vigil_state::{
    ObligationStore, PresenceStore, RelationshipStore, ReleaseLog, TrustedContactStore, UserStore,
    VaultStore,
};

/// Application configuration, read from the environment at startup.
///
/// Custom `Debug` redacts the JWT secret to keep it out of logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// HS256 signing secret for access tokens.
    pub jwt_secret: String,
    /// Base URL used when building trusted-contact verification links.
    pub public_base_url: String,
    /// Seconds between overdue sweeps. `None` disables the sweep task.
    pub sweep_interval_secs: Option<u64>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("jwt_secret", &"[REDACTED]")
            .field("public_base_url", &self.public_base_url)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            jwt_secret: "vigil-dev-secret".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
            sweep_interval_secs: Some(3600),
        }
    }
}

/// Shared application state accessible to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserStore>,
    pub presence: Arc<PresenceStore>,
    pub vault: Arc<VaultStore>,
    pub obligations: Arc<ObligationStore>,
    pub trusted: Arc<TrustedContactStore>,
    pub relationships: Arc<RelationshipStore>,
    pub releases: Arc<ReleaseLog>,
    pub coordinator: Arc<ReleaseCoordinator>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    /// PostgreSQL pool for durable mirroring. `None` means in-memory only.
    pub db_pool: Option<PgPool>,
    pub config: AppConfig,
}

impl AppState {
    /// Wire up the stores and the release coordinator.
    pub fn new(
        config: AppConfig,
        cipher: Arc<VaultCipher>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        db_pool: Option<PgPool>,
    ) -> Self {
        let users = Arc::new(UserStore::new());
        let presence = Arc::new(PresenceStore::new());
        let vault = Arc::new(VaultStore::new(cipher));
        let obligations = Arc::new(ObligationStore::new());
        let releases = Arc::new(ReleaseLog::new());

        let coordinator = Arc::new(ReleaseCoordinator::new(
            Arc::clone(&users),
            Arc::clone(&presence),
            Arc::clone(&vault),
            Arc::clone(&obligations),
            Arc::clone(&releases),
            Arc::clone(&notifier),
            Arc::clone(&clock),
        ));

        Self {
            users,
            presence,
            vault,
            obligations,
            trusted: Arc::new(TrustedContactStore::new()),
            relationships: Arc::new(RelationshipStore::new()),
            releases,
            coordinator,
            notifier,
            clock,
            db_pool,
            config,
        }
    }

    /// The current instant by the application clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Hydrate the in-memory stores from the database.
    ///
    /// Called once on startup when a pool is configured. Reads stay fast
    /// and synchronous afterwards; the pool only sees writes.
    pub async fn hydrate_from_db(&self) -> Result<(), sqlx::Error> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let users = crate::db::users::load_all(pool).await?;
        let user_count = users.len();
        for user in users {
            self.users.insert_record(user);
        }

        let presence = crate::db::presence::load_all(pool).await?;
        let presence_count = presence.len();
        for record in presence {
            self.presence.insert_record(record);
        }

        let recipients = crate::db::vault::load_all_recipients(pool).await?;
        let recipient_count = recipients.len();
        for recipient in recipients {
            self.vault.insert_recipient_record(recipient);
        }

        let items = crate::db::vault::load_all_items(pool).await?;
        let item_count = items.len();
        for item in items {
            self.vault.insert_item_record(item);
        }

        let obligations = crate::db::obligations::load_all(pool).await?;
        let obligation_count = obligations.len();
        for obligation in obligations {
            self.obligations.insert_record(obligation);
        }

        let contacts = crate::db::trusted::load_all(pool).await?;
        let contact_count = contacts.len();
        for contact in contacts {
            self.trusted.insert_record(contact);
        }

        let relationships = crate::db::relationships::load_all(pool).await?;
        let relationship_count = relationships.len();
        for relationship in relationships {
            self.relationships.insert_record(relationship);
        }

        let releases = crate::db::releases::load_all(pool).await?;
        let release_count = releases.len();
        for record in releases {
            self.releases.insert_record(record);
        }

        tracing::info!(
            users = user_count,
            presence = presence_count,
            recipients = recipient_count,
            items = item_count,
            obligations = obligation_count,
            trusted_contacts = contact_count,
            relationships = relationship_count,
            releases = release_count,
            "hydrated in-memory stores from database"
        );
        Ok(())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("users", &self.users.count())
            .field("notifier", &self.notifier.name())
            .field("db", &self.db_pool.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
