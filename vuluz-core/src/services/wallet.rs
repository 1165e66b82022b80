//! Wallet store - single in-memory source of truth for a session
//!
//! Balance, transaction list, filters and summary live in a
//! [`WalletState`] that only changes through [`WalletState::apply`].
//! The state mutex is held for reducer steps only, never across an
//! `await`, so concurrent commands cannot interleave inside a write.
//!
//! Money commands run optimistically: the pending transaction is
//! prepended and the balance moved before the backend answers, then the
//! transaction is confirmed or compensated (delta reversed, marked failed).
//! Compensation only follows an answer from the backend. When the request
//! is lost on the way the transaction stays pending, and resubmitting it
//! with the same idempotency key settles it.
//!
//! A `load` that overlaps any command is stale: the backend may or may not
//! have committed that command when it answered, so it is not applied.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::domain::result::{Error, OperationResult, Result};
use crate::domain::validation::{validate_account_number, validate_pin};
use crate::domain::{
    AmountLimits, CashflowPeriod, CashflowPoint, FilterPatch, PaymentMethod, SortDirection,
    SortKey, SortOrder, Transaction, TransactionFilters, TransactionStatus, TransactionSummary,
    TransactionType, User,
};
use crate::ports::{CommandReceipt, TopUpRequest, TransferRequest, WalletApi};

/// Snapshot of everything the wallet views render from
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletState {
    pub balance: Decimal,
    /// Newest first
    pub transactions: Vec<Transaction>,
    pub filters: TransactionFilters,
    pub summary: Option<TransactionSummary>,
    /// Wallet number of the logged-in user
    pub wallet_number: Option<String>,
    pub loaded: bool,
}

/// Every state transition the wallet store performs
#[derive(Debug, Clone)]
pub enum WalletAction {
    /// Profile fetched at login or restore
    ProfileLoaded(User),
    /// History and summary fetched while no command was in flight
    Loaded {
        transactions: Vec<Transaction>,
        summary: TransactionSummary,
    },
    BalanceRefreshed(Decimal),
    /// Optimistic step: prepend the pending transaction, apply its delta
    Submitted(Transaction),
    /// Backend accepted the command
    Confirmed { key: Uuid },
    /// Backend rejected the command: reverse the delta, mark failed
    Rejected { key: Uuid },
    FiltersChanged(FilterPatch),
    FiltersCleared,
    Reset,
}

impl WalletState {
    /// Reducer: the only place wallet state changes
    pub fn apply(&mut self, action: WalletAction) {
        match action {
            WalletAction::ProfileLoaded(user) => {
                self.balance = user.balance;
                self.wallet_number = user.wallet_number;
            }
            WalletAction::Loaded {
                transactions,
                summary,
            } => {
                // Backend copy wins; unconfirmed local entries are dropped
                self.transactions = transactions;
                self.balance = summary.current_balance;
                self.summary = Some(summary);
                self.loaded = true;
            }
            WalletAction::BalanceRefreshed(balance) => {
                self.set_balance(balance);
            }
            WalletAction::Submitted(tx) => {
                let balance = self.balance + tx.signed_amount();
                self.transactions.insert(0, tx);
                self.set_balance(balance);
            }
            WalletAction::Confirmed { key } => {
                if let Some(tx) = self.find_pending(key) {
                    tx.status = TransactionStatus::Completed;
                }
            }
            WalletAction::Rejected { key } => {
                let reversal = match self.find_pending(key) {
                    Some(tx) => {
                        tx.status = TransactionStatus::Failed;
                        tx.signed_amount()
                    }
                    None => return,
                };
                let balance = self.balance - reversal;
                self.set_balance(balance);
            }
            WalletAction::FiltersChanged(patch) => self.filters.merge(patch),
            WalletAction::FiltersCleared => self.filters = TransactionFilters::default(),
            WalletAction::Reset => *self = Self::default(),
        }
    }

    fn set_balance(&mut self, balance: Decimal) {
        self.balance = balance;
        if let Some(summary) = self.summary.as_mut() {
            summary.current_balance = balance;
        }
    }

    fn find_pending(&mut self, key: Uuid) -> Option<&mut Transaction> {
        self.transactions
            .iter_mut()
            .find(|tx| tx.idempotency_key == Some(key) && tx.is_pending())
    }

    /// Transaction list after the filter pipeline
    pub fn visible(&self) -> Vec<Transaction> {
        self.filters.apply(&self.transactions)
    }
}

/// Transfer to another wallet
#[derive(Debug, Clone)]
pub struct TransferCommand {
    /// Reuse a key to make a resubmission detectable; generated when absent
    pub idempotency_key: Option<Uuid>,
    pub to_wallet_number: String,
    /// Recipient's name, shown as the counterparty of the pending entry
    pub recipient_name: Option<String>,
    pub amount: Decimal,
    pub notes: String,
    pub pin: String,
}

impl TransferCommand {
    pub fn new(to_wallet_number: impl Into<String>, amount: Decimal, pin: impl Into<String>) -> Self {
        Self {
            idempotency_key: None,
            to_wallet_number: to_wallet_number.into(),
            recipient_name: None,
            amount,
            notes: String::new(),
            pin: pin.into(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_recipient_name(mut self, name: impl Into<String>) -> Self {
        self.recipient_name = Some(name.into());
        self
    }

    pub fn with_key(mut self, key: Uuid) -> Self {
        self.idempotency_key = Some(key);
        self
    }
}

/// Top-up from an external funding source
#[derive(Debug, Clone)]
pub struct TopUpCommand {
    pub idempotency_key: Option<Uuid>,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub description: String,
    pub pin: String,
}

impl TopUpCommand {
    pub fn new(amount: Decimal, payment_method: PaymentMethod, pin: impl Into<String>) -> Self {
        Self {
            idempotency_key: None,
            amount,
            payment_method,
            description: String::new(),
            pin: pin.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_key(mut self, key: Uuid) -> Self {
        self.idempotency_key = Some(key);
        self
    }
}

/// Removes its key from the in-flight set when dropped
struct InFlight<'a> {
    keys: &'a Mutex<HashSet<Uuid>>,
    key: Uuid,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut keys) = self.keys.lock() {
            keys.remove(&self.key);
        }
    }
}

/// Failed result for a command the backend never answered
///
/// The transaction is still pending: it may have been applied.
fn unconfirmed(err: &Error, tx: Transaction) -> OperationResult<Transaction> {
    let mut context = HashMap::new();
    context.insert("title".to_string(), json!("Not confirmed"));
    context.insert("authFailure".to_string(), json!(false));
    context.insert("outcomeUnknown".to_string(), json!(true));
    let what = match tx.transaction_type {
        TransactionType::TopUp => "top-up",
        _ => "transfer",
    };
    OperationResult {
        success: false,
        error: Some(format!(
            "{}. The {} may still go through; check your history before trying again.",
            err, what
        )),
        data: Some(tx),
        context: Some(context),
    }
}

/// Failed result carrying the alert title and whether the session is gone
fn failure<T>(err: &Error, data: Option<T>) -> OperationResult<T> {
    let mut context = HashMap::new();
    context.insert("title".to_string(), json!(err.title()));
    context.insert("authFailure".to_string(), json!(err.is_auth_failure()));
    OperationResult {
        success: false,
        data,
        error: Some(err.to_string()),
        context: Some(context),
    }
}

fn success(tx: Transaction, receipt: CommandReceipt) -> OperationResult<Transaction> {
    let mut context = HashMap::new();
    context.insert("message".to_string(), json!(receipt.message));
    if let Some(id) = receipt.transaction_id {
        context.insert("transactionId".to_string(), json!(id));
    }
    OperationResult::ok_with_context(tx, context)
}

/// Wallet/transaction state container
pub struct WalletStore {
    api: Arc<dyn WalletApi>,
    state: Mutex<WalletState>,
    in_flight: Mutex<HashSet<Uuid>>,
    /// Bumped whenever a command starts or settles
    generation: AtomicU64,
    transfer_limits: AmountLimits,
    top_up_limits: AmountLimits,
}

impl WalletStore {
    pub fn new(api: Arc<dyn WalletApi>) -> Self {
        Self {
            api,
            state: Mutex::new(WalletState::default()),
            in_flight: Mutex::new(HashSet::new()),
            generation: AtomicU64::new(0),
            transfer_limits: AmountLimits::transfer(),
            top_up_limits: AmountLimits::top_up(),
        }
    }

    pub fn with_limits(mut self, transfer: AmountLimits, top_up: AmountLimits) -> Self {
        self.transfer_limits = transfer;
        self.top_up_limits = top_up;
        self
    }

    fn state(&self) -> Result<MutexGuard<'_, WalletState>> {
        self.state
            .lock()
            .map_err(|e| Error::Other(format!("Lock poisoned: {}", e)))
    }

    /// Run one reducer step
    pub fn dispatch(&self, action: WalletAction) -> Result<()> {
        self.state()?.apply(action);
        Ok(())
    }

    /// Fetch history and summary concurrently and replace the local view
    ///
    /// If any command overlapped the fetch, the answer is dropped and the
    /// local view returned as is. The next load after it settles applies.
    pub async fn load(&self) -> Result<WalletState> {
        let started = self.generation.load(Ordering::SeqCst);
        let unfiltered = TransactionFilters::default();
        let (history, summary) = tokio::join!(self.api.history(&unfiltered), self.api.summary());
        let (history, summary) = (history?, summary?);

        let mut state = self.state()?;
        if self.generation.load(Ordering::SeqCst) != started || self.busy()? {
            return Ok(state.clone());
        }
        state.apply(WalletAction::Loaded {
            transactions: history,
            summary,
        });
        Ok(state.clone())
    }

    fn busy(&self) -> Result<bool> {
        let keys = self
            .in_flight
            .lock()
            .map_err(|e| Error::Other(format!("Lock poisoned: {}", e)))?;
        Ok(!keys.is_empty())
    }

    /// Re-read the balance from the backend
    pub async fn refresh_balance(&self) -> Result<Decimal> {
        let balance = self.api.balance().await?;
        self.dispatch(WalletAction::BalanceRefreshed(balance))?;
        Ok(balance)
    }

    pub fn snapshot(&self) -> Result<WalletState> {
        Ok(self.state()?.clone())
    }

    pub fn balance(&self) -> Result<Decimal> {
        Ok(self.state()?.balance)
    }

    /// Filtered (and optionally sorted) transaction list
    pub fn visible(&self) -> Result<Vec<Transaction>> {
        Ok(self.state()?.visible())
    }

    pub fn apply_filters(&self, patch: FilterPatch) -> Result<Vec<Transaction>> {
        let mut state = self.state()?;
        state.apply(WalletAction::FiltersChanged(patch));
        Ok(state.visible())
    }

    pub fn clear_filters(&self) -> Result<Vec<Transaction>> {
        let mut state = self.state()?;
        state.apply(WalletAction::FiltersCleared);
        Ok(state.visible())
    }

    pub fn apply_sort(&self, key: SortKey, direction: SortDirection) -> Result<Vec<Transaction>> {
        self.apply_filters(FilterPatch::new().sort(Some(SortOrder::new(key, direction))))
    }

    pub fn get_transaction(&self, id: &str) -> Result<Transaction> {
        self.state()?
            .transactions
            .iter()
            .find(|tx| tx.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("transaction {}", id)))
    }

    pub async fn cashflow(&self, period: CashflowPeriod) -> Result<Vec<CashflowPoint>> {
        self.api.cashflow(period).await
    }

    /// Claim `key` for the duration of one submission
    fn begin(&self, key: Uuid) -> Result<InFlight<'_>> {
        let mut keys = self
            .in_flight
            .lock()
            .map_err(|e| Error::Other(format!("Lock poisoned: {}", e)))?;
        if !keys.insert(key) {
            return Err(Error::DuplicateSubmission(key.to_string()));
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(InFlight {
            keys: &self.in_flight,
            key,
        })
    }

    /// Funds check and optimistic step under one lock
    ///
    /// A key that already settled locally is refused. A key whose entry is
    /// still pending was never answered: it is sent again as is, without a
    /// second optimistic step. The caller holds the key's claim, so that
    /// entry cannot belong to a command still in flight.
    fn submit_locally(&self, tx: Transaction) -> Result<()> {
        let mut state = self.state()?;
        if let Some(key) = tx.idempotency_key {
            if let Some(earlier) = state.transactions.iter().find(|t| t.idempotency_key == Some(key)) {
                let same_command = earlier.transaction_type == tx.transaction_type
                    && earlier.amount == tx.amount;
                if earlier.is_pending() && same_command {
                    return Ok(());
                }
                return Err(Error::DuplicateSubmission(key.to_string()));
            }
        }
        if !tx.transaction_type.is_incoming() && tx.amount > state.balance {
            return Err(Error::InsufficientFunds {
                available: state.balance,
                requested: tx.amount,
            });
        }
        state.apply(WalletAction::Submitted(tx));
        Ok(())
    }

    /// Confirm or compensate once the backend has answered
    ///
    /// A lost request leaves the transaction pending.
    fn settle(
        &self,
        key: Uuid,
        outcome: Result<CommandReceipt>,
    ) -> Result<(Transaction, Result<CommandReceipt>)> {
        let mut state = self.state()?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        match &outcome {
            Ok(_) => state.apply(WalletAction::Confirmed { key }),
            Err(e) if e.is_outcome_unknown() => {}
            Err(_) => state.apply(WalletAction::Rejected { key }),
        }
        let tx = state
            .transactions
            .iter()
            .find(|tx| tx.idempotency_key == Some(key))
            .cloned()
            .ok_or_else(|| Error::not_found(format!("pending transaction {}", key)))?;
        Ok((tx, outcome))
    }

    fn check_transfer(&self, command: &TransferCommand) -> Result<()> {
        validate_account_number(&command.to_wallet_number)?;
        self.transfer_limits.check(command.amount)?;
        validate_pin(&command.pin)?;

        let own = self.state()?.wallet_number.clone();
        if own.as_deref() == Some(command.to_wallet_number.trim()) {
            return Err(Error::validation("You cannot transfer to your own wallet"));
        }
        Ok(())
    }

    /// Transfer money out of the wallet
    ///
    /// Checks run before any state change: account number, amount range,
    /// PIN, not the user's own wallet, available balance.
    pub async fn create_transfer(&self, command: TransferCommand) -> OperationResult<Transaction> {
        if let Err(e) = self.check_transfer(&command) {
            return failure(&e, None);
        }

        let key = command.idempotency_key.unwrap_or_else(Uuid::new_v4);
        let _claim = match self.begin(key) {
            Ok(claim) => claim,
            Err(e) => return failure(&e, None),
        };

        let to = command.to_wallet_number.trim().to_string();
        let counterparty = command.recipient_name.clone().unwrap_or_else(|| to.clone());
        let description = if command.notes.trim().is_empty() {
            format!("Transfer to {}", counterparty)
        } else {
            command.notes.clone()
        };
        let pending = Transaction::pending(
            key,
            TransactionType::TransferOut,
            command.amount,
            description,
            counterparty,
        );
        if let Err(e) = self.submit_locally(pending) {
            return failure(&e, None);
        }

        let request = TransferRequest {
            idempotency_key: key,
            to_wallet_number: to,
            amount: command.amount,
            notes: command.notes,
            pin: command.pin,
        };
        let outcome = self.api.transfer(&request).await;
        self.finish(key, outcome)
    }

    /// Add money to the wallet
    pub async fn create_top_up(&self, command: TopUpCommand) -> OperationResult<Transaction> {
        let checks = self
            .top_up_limits
            .check(command.amount)
            .and_then(|_| validate_pin(&command.pin));
        if let Err(e) = checks {
            return failure(&e, None);
        }

        let key = command.idempotency_key.unwrap_or_else(Uuid::new_v4);
        let _claim = match self.begin(key) {
            Ok(claim) => claim,
            Err(e) => return failure(&e, None),
        };

        let description = if command.description.trim().is_empty() {
            format!("Top up via {}", command.payment_method.label())
        } else {
            command.description.clone()
        };
        let pending = Transaction::pending(
            key,
            TransactionType::TopUp,
            command.amount,
            description.clone(),
            command.payment_method.label(),
        );
        if let Err(e) = self.submit_locally(pending) {
            return failure(&e, None);
        }

        let request = TopUpRequest {
            idempotency_key: key,
            amount: command.amount,
            payment_method: command.payment_method,
            description,
            pin: command.pin,
        };
        let outcome = self.api.top_up(&request).await;
        self.finish(key, outcome)
    }

    fn finish(&self, key: Uuid, outcome: Result<CommandReceipt>) -> OperationResult<Transaction> {
        match self.settle(key, outcome) {
            Ok((tx, Ok(receipt))) => success(tx, receipt),
            Ok((tx, Err(e))) if e.is_outcome_unknown() => unconfirmed(&e, tx),
            Ok((tx, Err(e))) => failure(&e, Some(tx)),
            Err(e) => failure(&e, None),
        }
    }
}
