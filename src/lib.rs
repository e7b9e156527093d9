//! Nomad - offline-first client core for a nature observation network
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CLI (clap)                              │
//! │  - sync / feed / post / outbox / account / social commands  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Sync coordinator (outbox drain)                          │
//! │  - Feed loader, post composer                               │
//! │  - Account and social operations                            │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                        │
//! ┌──────────────────────────────┐ ┌────────────────────────────┐
//! │          Data Layer          │ │      Backend client        │
//! │  - SQLite (sqlx)             │ │  - reqwest, JSON envelope  │
//! │  - outbox, feed cache,       │ │  - multipart uploads       │
//! │    session                   │ │  - connectivity probe      │
//! └──────────────────────────────┘ └────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: Backend HTTP client and wire types
//! - `service`: Business logic layer
//! - `data`: SQLite store (outbox, feed cache, session)
//! - `connectivity`: Online/offline detection
//! - `config`: Configuration management
//! - `metrics`: Prometheus instruments
//! - `error`: Error types

pub mod api;
pub mod config;
pub mod connectivity;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;

use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::connectivity::Connectivity;
use crate::service::{
    AccountService, FeedLoader, PostComposer, SocialService, SyncCoordinator, SyncReport,
};

/// Application state owned by the process entry point
///
/// Holds the shared handles every service is built from. Cloning is
/// cheap; all clones share the same database pool and HTTP client.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Local store
    pub db: Arc<data::Database>,

    /// Backend client
    pub api: Arc<api::ApiClient>,

    /// Network availability check
    pub connectivity: Arc<dyn Connectivity>,

    /// Absolute outbox directory for offline image copies
    outbox_dir: PathBuf,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Validate configuration
    /// 2. Connect to SQLite database (runs migrations)
    /// 3. Build the backend client
    /// 4. Select the connectivity check
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        config.validate()?;

        // 1. Connect to SQLite database
        let db = data::Database::connect(&config.database.path).await?;

        // 2. Outbox directory
        let outbox_dir = std::path::absolute(&config.outbox.dir)?;
        tokio::fs::create_dir_all(&outbox_dir).await?;

        // 3. Backend client
        let api = api::ApiClient::new(&config.api)?;
        tracing::info!(base_url = %api.base_url(), "Backend client ready");

        // 4. Connectivity
        let connectivity: Arc<dyn Connectivity> =
            Arc::from(connectivity::from_config(&config.connectivity, &config.api)?);
        tracing::debug!(mode = ?config.connectivity.mode, "Connectivity check selected");

        let depth = db.count_pending_uploads().await?;
        metrics::OUTBOX_DEPTH.set(depth);

        tracing::info!(pending_uploads = depth, "Application state initialized");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            api: Arc::new(api),
            connectivity,
            outbox_dir,
        })
    }

    /// Replace the connectivity check
    pub fn with_connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn outbox_dir(&self) -> &std::path::Path {
        &self.outbox_dir
    }

    pub fn sync_coordinator(&self) -> Arc<SyncCoordinator> {
        Arc::new(
            SyncCoordinator::new(
                self.db.clone(),
                self.api.clone(),
                self.connectivity.clone(),
            )
            .with_outbox_dir(self.outbox_dir.clone()),
        )
    }

    pub fn feed_loader(&self) -> FeedLoader {
        FeedLoader::new(
            self.db.clone(),
            self.api.clone(),
            self.connectivity.clone(),
        )
    }

    pub fn post_composer(&self) -> PostComposer {
        PostComposer::new(
            self.db.clone(),
            self.api.clone(),
            self.connectivity.clone(),
            self.outbox_dir.clone(),
        )
    }

    pub fn account_service(&self) -> AccountService {
        AccountService::new(self.db.clone(), self.api.clone())
    }

    pub fn social_service(&self) -> SocialService {
        SocialService::new(self.db.clone(), self.api.clone())
    }

    /// App came to the foreground: drain the outbox in the background
    ///
    /// The returned handle can be awaited for the report or aborted.
    pub fn on_foreground(&self) -> JoinHandle<SyncReport> {
        self.sync_coordinator().spawn()
    }

    /// Close the database pool
    pub async fn shutdown(&self) {
        self.db.close().await;
        tracing::info!("Application state shut down");
    }
}
