//! Wallet backend port
//!
//! Every remote operation the client performs goes through this trait.
//! `HttpWalletApi` talks to the real REST backend; `InMemoryWalletApi`
//! is an in-process double for tests and offline demos.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{
    CashflowPeriod, CashflowPoint, Credentials, Favorite, PaymentMethod, Registration,
    Transaction, TransactionFilters, TransactionSummary, User,
};

/// Token returned by a successful login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthToken {
    pub token: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Outgoing transfer command
///
/// The idempotency key travels as a header, never in the body.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub idempotency_key: Uuid,
    pub to_wallet_number: String,
    pub amount: Decimal,
    pub notes: String,
    pub pin: String,
}

/// Top-up command
#[derive(Debug, Clone, PartialEq)]
pub struct TopUpRequest {
    pub idempotency_key: Uuid,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub description: String,
    pub pin: String,
}

/// Backend acknowledgement of a money command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandReceipt {
    pub message: String,
    /// Server-side transaction id, when the backend returns one
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// Wallet backend abstraction
#[async_trait]
pub trait WalletApi: Send + Sync {
    /// Backend name for logs (e.g. "http", "memory")
    fn name(&self) -> &str;

    /// Replace the bearer token used for authenticated calls
    fn set_token(&self, token: Option<String>);

    // === Auth ===

    async fn login(&self, credentials: &Credentials) -> Result<AuthToken>;

    /// Returns the backend's confirmation message
    async fn register(&self, form: &Registration) -> Result<String>;

    async fn profile(&self) -> Result<User>;

    // === Wallet ===

    async fn balance(&self) -> Result<Decimal>;

    /// Transaction history, newest first unless `filters.sort` says otherwise
    async fn history(&self, filters: &TransactionFilters) -> Result<Vec<Transaction>>;

    async fn transfer(&self, request: &TransferRequest) -> Result<CommandReceipt>;

    async fn top_up(&self, request: &TopUpRequest) -> Result<CommandReceipt>;

    // === Dashboard ===

    async fn summary(&self) -> Result<TransactionSummary>;

    async fn cashflow(&self, period: CashflowPeriod) -> Result<Vec<CashflowPoint>>;

    // === Favorites ===

    async fn favorites(&self) -> Result<Vec<Favorite>>;

    async fn add_favorite(&self, wallet_number: &str) -> Result<Favorite>;

    async fn remove_favorite(&self, wallet_number: &str) -> Result<()>;

    /// Full name of the owner of `wallet_number`
    async fn wallet_owner(&self, wallet_number: &str) -> Result<String>;
}
