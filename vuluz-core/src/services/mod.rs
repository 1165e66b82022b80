//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod auth;
mod balance;
pub mod export;
mod favorites;
pub mod logging;
pub mod migration;
mod wallet;

pub use auth::AuthService;
pub use balance::BalanceView;
pub use favorites::{FavoritesService, RecipientCheck};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use wallet::{TopUpCommand, TransferCommand, WalletAction, WalletState, WalletStore};
