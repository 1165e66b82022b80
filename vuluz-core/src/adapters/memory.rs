//! In-process wallet backend
//!
//! Implements [`WalletApi`] against local state using the same business
//! rules as the real backend: PIN check, minimum top-up, no self-transfer
//! and a balance check. A replayed idempotency key answers with the first
//! receipt instead of applying the command again. Used by tests and the
//! offline demo; it is never mixed with the HTTP client.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::money::format_idr;
use crate::domain::summary::{cashflow, summarize};
use crate::domain::token::unsigned_token;
use crate::domain::{
    CashflowPeriod, CashflowPoint, Credentials, Favorite, Registration, Session, Transaction,
    TransactionFilters, TransactionSummary, TransactionType, User,
};
use crate::ports::{
    AuthToken, CommandReceipt, SessionStore, TopUpRequest, TransferRequest, WalletApi,
};

/// Smallest top-up the backend accepts by default
const MIN_TOP_UP: i64 = 10_000;

/// Demo login, see [`InMemoryWalletApi::demo`]
pub const DEMO_EMAIL: &str = "demo@vuluz.app";
pub const DEMO_PASSWORD: &str = "demo1234";
pub const DEMO_PIN: &str = "123456";

/// Lifetime of tokens issued by [`InMemoryWalletApi::login`]
const TOKEN_TTL_HOURS: i64 = 24;

struct MemoryState {
    user: User,
    password: String,
    pin: String,
    issued_token: Option<String>,
    presented_token: Option<String>,
    transactions: Vec<Transaction>,
    favorites: Vec<Favorite>,
    next_id: u64,
    owners: HashMap<String, String>,
    /// Receipts of committed commands by idempotency key
    receipts: HashMap<Uuid, CommandReceipt>,
    reject_next: Option<String>,
    drop_next_reply: bool,
    min_top_up: Decimal,
    calls: HashMap<&'static str, usize>,
}

impl MemoryState {
    fn record(&mut self, op: &'static str) {
        *self.calls.entry(op).or_insert(0) += 1;
    }

    fn authorize(&self) -> Result<()> {
        match (&self.presented_token, &self.issued_token) {
            (None, _) => Err(Error::NotAuthenticated),
            (Some(presented), Some(issued)) if presented == issued => Ok(()),
            _ => Err(Error::Unauthorized),
        }
    }

    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("mem-{}", self.next_id)
    }

    fn take_rejection(&mut self) -> Result<()> {
        match self.reject_next.take() {
            Some(message) => Err(Error::api(400, message)),
            None => Ok(()),
        }
    }

    fn replayed(&self, key: Uuid) -> Option<CommandReceipt> {
        self.receipts.get(&key).cloned()
    }

    fn commit(&mut self, key: Uuid, tx: Transaction, message: &str) -> CommandReceipt {
        let receipt = CommandReceipt {
            message: message.to_string(),
            transaction_id: Some(tx.id.clone()),
        };
        self.transactions.insert(0, tx.with_idempotency_key(Some(key)));
        self.receipts.insert(key, receipt.clone());
        receipt
    }
}

/// Scripted in-memory implementation of [`WalletApi`]
pub struct InMemoryWalletApi {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
    reply_delay: Option<Duration>,
}

impl InMemoryWalletApi {
    /// Backend with a single registered user
    pub fn new(user: User, password: impl Into<String>, pin: impl Into<String>) -> Self {
        let mut owners = HashMap::new();
        if let Some(wallet) = &user.wallet_number {
            owners.insert(wallet.clone(), user.full_name.clone());
        }
        Self {
            state: Mutex::new(MemoryState {
                user,
                password: password.into(),
                pin: pin.into(),
                issued_token: None,
                presented_token: None,
                transactions: Vec::new(),
                favorites: Vec::new(),
                next_id: 0,
                owners,
                receipts: HashMap::new(),
                reject_next: None,
                drop_next_reply: false,
                min_top_up: Decimal::new(MIN_TOP_UP, 0),
                calls: HashMap::new(),
            }),
            latency: None,
            reply_delay: None,
        }
    }

    /// Demo backend seeded with a user, a handful of contacts and history
    ///
    /// Login with `demo@vuluz.app` / `demo1234`, PIN `123456`.
    pub fn demo() -> Self {
        let mut user = User::new("1", "John Doe", DEMO_EMAIL);
        user.user_name = Some("johndoe".to_string());
        user.wallet_number = Some("114516277".to_string());
        user.balance = Decimal::new(1_250_000, 0);

        let now = Local::now().naive_local();
        let days = |d: i64| now - chrono::Duration::days(d);
        let seed = vec![
            (TransactionType::TransferIn, 750_000, days(1), "Payment from Sarah", "Sarah Smith"),
            (TransactionType::TransferOut, 125_500, days(3), "Grocery shopping", "Michael Johnson"),
            (TransactionType::TopUp, 1_000_000, days(6), "Monthly salary", "Bank Transfer"),
            (TransactionType::Payment, 49_990, days(9), "Netflix subscription", "Netflix Inc."),
            (TransactionType::TransferOut, 300_000, days(14), "Rent share", "Budi Santoso"),
            (TransactionType::Refund, 25_000, days(20), "Order refund", "Tokopedia"),
            (TransactionType::TopUp, 500_000, days(38), "Bonus payment", "Bank Transfer"),
        ];

        let transactions = seed
            .into_iter()
            .enumerate()
            .map(|(i, (t, amount, date, desc, who))| {
                Transaction::new(format!("tx_{}", 1001 + i), t, Decimal::new(amount, 0), date)
                    .with_description(desc)
                    .with_counterparty(who)
            })
            .collect();

        Self::new(user, DEMO_PASSWORD, DEMO_PIN)
            .with_transactions(transactions)
            .with_owner("223344556", "Budi Santoso")
            .with_owner("334455667", "Siti Rahma")
            .with_owner("445566778", "Michael Johnson")
            .with_favorite(Favorite::new("1", "Budi Santoso", "223344556"))
    }

    /// Seed history (newest first)
    pub fn with_transactions(self, transactions: Vec<Transaction>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.transactions = transactions;
        }
        self
    }

    /// Register a wallet that transfers and favorites can target
    pub fn with_owner(self, wallet_number: impl Into<String>, full_name: impl Into<String>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.owners.insert(wallet_number.into(), full_name.into());
        }
        self
    }

    pub fn with_favorite(self, favorite: Favorite) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.favorites.push(favorite);
        }
        self
    }

    /// Override the smallest accepted top-up
    pub fn with_min_top_up(self, min: Decimal) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.min_top_up = min;
        }
        self
    }

    /// Delay every call, to widen race windows in tests
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Hold money command replies back after the command is committed
    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = Some(delay);
        self
    }

    /// Commit the next money command but lose its reply, as a timeout would
    pub fn drop_next_reply(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.drop_next_reply = true;
        }
    }

    /// Make the next money command fail with `message`
    pub fn reject_next(&self, message: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.reject_next = Some(message.into());
        }
    }

    /// Invalidate the issued token so the next call answers 401
    pub fn expire_session(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.issued_token = None;
        }
    }

    /// Number of times `op` reached the backend (e.g. "transfer")
    pub fn call_count(&self, op: &str) -> usize {
        self.state
            .lock()
            .map(|s| s.calls.get(op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Server-side balance
    pub fn current_balance(&self) -> Decimal {
        self.state
            .lock()
            .map(|s| s.user.balance)
            .unwrap_or_default()
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Deliver a money command reply, applying the reply-side knobs
    async fn reply(&self, outcome: Result<CommandReceipt>) -> Result<CommandReceipt> {
        if let Some(delay) = self.reply_delay {
            tokio::time::sleep(delay).await;
        }
        if outcome.is_ok() && self.with_state(|s| Ok(std::mem::take(&mut s.drop_next_reply)))? {
            return Err(Error::Network("request timed out".to_string()));
        }
        outcome
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> Result<T>) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| Error::Other(format!("Lock poisoned: {}", e)))?;
        f(&mut state)
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[async_trait]
impl WalletApi for InMemoryWalletApi {
    fn name(&self) -> &str {
        "memory"
    }

    fn set_token(&self, token: Option<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.presented_token = token;
        }
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthToken> {
        self.pause().await;
        self.with_state(|s| {
            s.record("login");
            let email_matches = s.user.email.eq_ignore_ascii_case(credentials.email.trim());
            if !email_matches || s.password != credentials.password {
                return Err(Error::api(400, "Invalid email or password"));
            }
            let expires_at = Utc::now() + chrono::Duration::hours(TOKEN_TTL_HOURS);
            let token = unsigned_token(&s.user.id, expires_at);
            s.issued_token = Some(token.clone());
            Ok(AuthToken {
                token,
                message: Some("Login success".to_string()),
            })
        })
    }

    async fn register(&self, form: &Registration) -> Result<String> {
        self.pause().await;
        self.with_state(|s| {
            s.record("register");
            if s.user.email.eq_ignore_ascii_case(form.email.trim()) {
                return Err(Error::api(400, "Email is already registered"));
            }
            Ok("Register success".to_string())
        })
    }

    async fn profile(&self) -> Result<User> {
        self.pause().await;
        self.with_state(|s| {
            s.record("profile");
            s.authorize()?;
            Ok(s.user.clone())
        })
    }

    async fn balance(&self) -> Result<Decimal> {
        self.pause().await;
        self.with_state(|s| {
            s.record("balance");
            s.authorize()?;
            Ok(s.user.balance)
        })
    }

    async fn history(&self, filters: &TransactionFilters) -> Result<Vec<Transaction>> {
        self.pause().await;
        self.with_state(|s| {
            s.record("history");
            s.authorize()?;
            Ok(filters.apply(&s.transactions))
        })
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<CommandReceipt> {
        self.pause().await;
        let outcome = self.with_state(|s| {
            s.record("transfer");
            s.authorize()?;
            if let Some(receipt) = s.replayed(request.idempotency_key) {
                return Ok(receipt);
            }
            s.take_rejection()?;

            let to = request.to_wallet_number.trim();
            if request.pin != s.pin {
                return Err(Error::api(400, "Invalid PIN"));
            }
            if s.user.owns_wallet(to) {
                return Err(Error::api(400, "You cant transfer to yourself"));
            }
            let Some(recipient) = s.owners.get(to).cloned() else {
                return Err(Error::api(400, "Receiver wallet number is not found"));
            };
            if request.amount > s.user.balance {
                return Err(Error::api(400, "Balance is not enough"));
            }

            s.user.balance -= request.amount;
            let id = s.next_id();
            let tx = Transaction::new(id, TransactionType::TransferOut, request.amount, now())
                .with_description(request.notes.clone())
                .with_counterparty(recipient);
            Ok(s.commit(request.idempotency_key, tx, "Transfer success"))
        });
        self.reply(outcome).await
    }

    async fn top_up(&self, request: &TopUpRequest) -> Result<CommandReceipt> {
        self.pause().await;
        let outcome = self.with_state(|s| {
            s.record("top_up");
            s.authorize()?;
            if let Some(receipt) = s.replayed(request.idempotency_key) {
                return Ok(receipt);
            }
            s.take_rejection()?;

            if request.pin != s.pin {
                return Err(Error::api(400, "Invalid PIN"));
            }
            if request.amount < s.min_top_up {
                let min = format_idr(s.min_top_up).replace("Rp ", "Rp.");
                return Err(Error::api(400, format!("Top-up amount must be greater than {}", min)));
            }

            s.user.balance += request.amount;
            let id = s.next_id();
            let tx = Transaction::new(id, TransactionType::TopUp, request.amount, now())
                .with_description(request.description.clone())
                .with_counterparty(request.payment_method.label());
            Ok(s.commit(request.idempotency_key, tx, "Top up success"))
        });
        self.reply(outcome).await
    }

    async fn summary(&self) -> Result<TransactionSummary> {
        self.pause().await;
        self.with_state(|s| {
            s.record("summary");
            s.authorize()?;
            Ok(summarize(&s.transactions, s.user.balance, Local::now().date_naive()))
        })
    }

    async fn cashflow(&self, period: CashflowPeriod) -> Result<Vec<CashflowPoint>> {
        self.pause().await;
        self.with_state(|s| {
            s.record("cashflow");
            s.authorize()?;
            Ok(cashflow(&s.transactions, period, Local::now().date_naive()))
        })
    }

    async fn favorites(&self) -> Result<Vec<Favorite>> {
        self.pause().await;
        self.with_state(|s| {
            s.record("favorites");
            s.authorize()?;
            Ok(s.favorites.clone())
        })
    }

    async fn add_favorite(&self, wallet_number: &str) -> Result<Favorite> {
        self.pause().await;
        self.with_state(|s| {
            s.record("add_favorite");
            s.authorize()?;
            let wallet = wallet_number.trim();
            if s.user.owns_wallet(wallet) {
                return Err(Error::api(400, "Cannot add your own wallet as favorite"));
            }
            if s.favorites.iter().any(|f| f.wallet_number == wallet) {
                return Err(Error::api(400, "Wallet is already in your favorites"));
            }
            let Some(owner) = s.owners.get(wallet).cloned() else {
                return Err(Error::api(400, "Wallet not found"));
            };
            let favorite = Favorite::new(s.next_id(), owner, wallet);
            s.favorites.push(favorite.clone());
            Ok(favorite)
        })
    }

    async fn remove_favorite(&self, wallet_number: &str) -> Result<()> {
        self.pause().await;
        self.with_state(|s| {
            s.record("remove_favorite");
            s.authorize()?;
            let before = s.favorites.len();
            s.favorites.retain(|f| f.wallet_number != wallet_number.trim());
            if s.favorites.len() == before {
                return Err(Error::api(404, "Favorite not found"));
            }
            Ok(())
        })
    }

    async fn wallet_owner(&self, wallet_number: &str) -> Result<String> {
        self.pause().await;
        self.with_state(|s| {
            s.record("wallet_owner");
            s.authorize()?;
            s.owners
                .get(wallet_number.trim())
                .cloned()
                .ok_or_else(|| Error::not_found(format!("wallet {}", wallet_number.trim())))
        })
    }
}

/// Session store that lives only as long as the process
#[derive(Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, Option<Session>>> {
        self.session
            .lock()
            .map_err(|e| Error::Other(format!("Lock poisoned: {}", e)))
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>> {
        Ok(self.guard()?.clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.guard()? = Some(session.clone());
        Ok(())
    }

    fn touch(&self, at: chrono::DateTime<chrono::Utc>) -> Result<()> {
        if let Some(session) = self.guard()?.as_mut() {
            session.last_activity = at;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.guard()? = None;
        Ok(())
    }
}
