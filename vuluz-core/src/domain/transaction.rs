//! Transaction domain model

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::result::{Error, Result};

/// Kind of wallet movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    TransferIn,
    TransferOut,
    TopUp,
    Payment,
    Refund,
}

impl TransactionType {
    pub const ALL: [TransactionType; 5] = [
        TransactionType::TransferIn,
        TransactionType::TransferOut,
        TransactionType::TopUp,
        TransactionType::Payment,
        TransactionType::Refund,
    ];

    /// Wire name, e.g. `TOP_UP`
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::TransferIn => "TRANSFER_IN",
            TransactionType::TransferOut => "TRANSFER_OUT",
            TransactionType::TopUp => "TOP_UP",
            TransactionType::Payment => "PAYMENT",
            TransactionType::Refund => "REFUND",
        }
    }

    /// Human label, e.g. `Top Up`
    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::TransferIn => "Transfer In",
            TransactionType::TransferOut => "Transfer Out",
            TransactionType::TopUp => "Top Up",
            TransactionType::Payment => "Payment",
            TransactionType::Refund => "Refund",
        }
    }

    /// Money flows into the wallet
    pub fn is_incoming(&self) -> bool {
        matches!(
            self,
            TransactionType::TransferIn | TransactionType::TopUp | TransactionType::Refund
        )
    }

    /// `+` for incoming, `-` for outgoing
    pub fn symbol(&self) -> char {
        if self.is_incoming() {
            '+'
        } else {
            '-'
        }
    }

    /// Signed balance effect of `amount` for this type
    pub fn signed(&self, amount: Decimal) -> Decimal {
        if self.is_incoming() {
            amount
        } else {
            -amount
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    /// Accepts wire names and the backend's human labels ("Transfer In", "Top Up")
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "TRANSFER_IN" => Ok(TransactionType::TransferIn),
            "TRANSFER_OUT" => Ok(TransactionType::TransferOut),
            "TOP_UP" | "TOPUP" => Ok(TransactionType::TopUp),
            "PAYMENT" => Ok(TransactionType::Payment),
            "REFUND" => Ok(TransactionType::Refund),
            _ => Err(Error::validation(format!("unknown transaction type: {}", s))),
        }
    }
}

/// Lifecycle of a transaction as seen by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

/// A single wallet transaction
///
/// Amounts are always positive; the direction comes from the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    /// Local wall-clock time of the transaction
    pub date: NaiveDateTime,
    pub description: String,
    /// Counterparty label (recipient, sender or funding source)
    pub counterparty: String,
    pub status: TransactionStatus,
    /// Key of the command that created this transaction locally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<Uuid>,
}

impl Transaction {
    /// Create a completed transaction with required fields
    pub fn new(
        id: impl Into<String>,
        transaction_type: TransactionType,
        amount: Decimal,
        date: NaiveDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            amount: amount.abs(),
            transaction_type,
            date,
            description: String::new(),
            counterparty: String::new(),
            status: TransactionStatus::Completed,
            idempotency_key: None,
        }
    }

    /// Create a pending transaction for a locally issued command
    ///
    /// The identifier is derived from the idempotency key so the same
    /// command always maps to the same local record.
    pub fn pending(
        key: Uuid,
        transaction_type: TransactionType,
        amount: Decimal,
        description: impl Into<String>,
        counterparty: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("local-{}", key.simple()),
            amount: amount.abs(),
            transaction_type,
            date: Local::now().naive_local(),
            description: description.into(),
            counterparty: counterparty.into(),
            status: TransactionStatus::Pending,
            idempotency_key: Some(key),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_counterparty(mut self, counterparty: impl Into<String>) -> Self {
        self.counterparty = counterparty.into();
        self
    }

    /// Key of the command that produced this entry, when the backend echoes it
    pub fn with_idempotency_key(mut self, key: Option<Uuid>) -> Self {
        self.idempotency_key = key;
        self
    }

    /// Signed balance effect of this transaction
    pub fn signed_amount(&self) -> Decimal {
        self.transaction_type.signed(self.amount)
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    pub fn is_failed(&self) -> bool {
        self.status == TransactionStatus::Failed
    }

    /// Case-insensitive match on description or counterparty
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.description.to_lowercase().contains(&term)
            || self.counterparty.to_lowercase().contains(&term)
    }
}
