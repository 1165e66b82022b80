//! Vuluz Core - wallet client logic
//!
//! This crate implements the client side of the Vuluz wallet following
//! hexagonal architecture:
//!
//! - **domain**: Core entities (Transaction, User, Favorite, filters, money)
//! - **ports**: Trait definitions for external dependencies (WalletApi, SessionStore)
//! - **services**: Auth and wallet state containers, derived views, logging
//! - **adapters**: Concrete implementations (reqwest, DuckDB, in-memory)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::duckdb::DuckDbSessionStore;
use adapters::http::HttpWalletApi;
use adapters::memory::{InMemoryWalletApi, MemorySessionStore, DEMO_EMAIL, DEMO_PASSWORD};
use config::Config;
use ports::{SessionStore, WalletApi};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult, Result};
pub use domain::{
    CashflowPeriod, Credentials, Favorite, FilterPatch, PaymentMethod, Registration, Transaction,
    TransactionFilters, TransactionStatus, TransactionType, User,
};
pub use services::{EntryPoint, LogEvent, LoggingService};

/// Main context for Vuluz operations
///
/// Holds the configuration, the backend and the services wired to it.
/// Built once per process and passed to whatever needs it.
pub struct VuluzContext {
    pub config: Config,
    pub api: Arc<dyn WalletApi>,
    pub auth: AuthService,
    pub wallet: WalletStore,
    pub favorites: FavoritesService,
}

impl VuluzContext {
    /// Create a context from the settings in `vuluz_dir`
    ///
    /// Demo mode uses the in-memory backend and keeps the session in
    /// memory; otherwise the REST backend and `session.duckdb` are used.
    pub fn new(vuluz_dir: &Path) -> anyhow::Result<Self> {
        let config = Config::load(vuluz_dir)?;

        let (api, store): (Arc<dyn WalletApi>, Arc<dyn SessionStore>) = if config.demo_mode {
            (
                Arc::new(InMemoryWalletApi::demo()),
                Arc::new(MemorySessionStore::new()),
            )
        } else {
            (
                Arc::new(HttpWalletApi::new(&config.api_base_url, config.request_timeout)?),
                Arc::new(DuckDbSessionStore::open(&vuluz_dir.join("session.duckdb"))?),
            )
        };

        Ok(Self::with_backend(config, api, store))
    }

    /// Wire services over an explicit backend and session store
    pub fn with_backend(
        config: Config,
        api: Arc<dyn WalletApi>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let auth =
            AuthService::new(Arc::clone(&api), store).with_idle_timeout(config.idle_timeout());
        let wallet = WalletStore::new(Arc::clone(&api))
            .with_limits(config.transfer_limits, config.top_up_limits);
        let favorites = FavoritesService::new(Arc::clone(&api));

        Self {
            config,
            api,
            auth,
            wallet,
            favorites,
        }
    }

    pub fn is_demo(&self) -> bool {
        self.config.demo_mode
    }

    /// Log in and seed the wallet store with the profile
    pub async fn login(&self, credentials: &Credentials) -> Result<User> {
        let user = self.auth.login(credentials).await?;
        self.wallet
            .dispatch(services::WalletAction::ProfileLoaded(user.clone()))?;
        Ok(user)
    }

    /// Session check on start
    ///
    /// In demo mode a missing session logs in with the demo account.
    pub async fn restore(&self) -> Result<Option<User>> {
        let user = match self.auth.restore().await? {
            Some(user) => Some(user),
            None if self.is_demo() => {
                Some(self.auth.login(&Credentials::new(DEMO_EMAIL, DEMO_PASSWORD)).await?)
            }
            None => None,
        };

        if let Some(user) = &user {
            self.wallet
                .dispatch(services::WalletAction::ProfileLoaded(user.clone()))?;
        }
        Ok(user)
    }

    /// Restore the session or fail with [`Error::NotAuthenticated`]
    pub async fn require_user(&self) -> Result<User> {
        self.restore().await?.ok_or(Error::NotAuthenticated)
    }

    /// Clear the session and all wallet state
    pub fn logout(&self) -> Result<()> {
        self.wallet.dispatch(services::WalletAction::Reset)?;
        self.auth.logout()
    }
}
