//! Core domain entities
//!
//! Pure data structures and the rules that operate on them - no I/O.

mod favorite;
pub mod filter;
pub mod money;
pub mod result;
pub mod summary;
pub mod token;
mod transaction;
mod user;
pub mod validation;

pub use favorite::Favorite;
pub use filter::{FilterPatch, SortDirection, SortKey, SortOrder, TransactionFilters};
pub use summary::{CashflowPeriod, CashflowPoint, TransactionSummary};
pub use transaction::{Transaction, TransactionStatus, TransactionType};
pub use user::{Credentials, Registration, Session, User};
pub use validation::{AmountLimits, PaymentMethod};
