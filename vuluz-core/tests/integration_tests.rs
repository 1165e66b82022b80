//! Integration tests for vuluz-core services
//!
//! These tests drive the public API end to end: the in-memory backend
//! stands in for the REST server, while session storage and the event log
//! use real DuckDB files in temporary directories.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tempfile::TempDir;

use vuluz_core::adapters::duckdb::DuckDbSessionStore;
use vuluz_core::adapters::memory::{InMemoryWalletApi, MemorySessionStore};
use vuluz_core::config::Config;
use vuluz_core::domain::summary::cashflow;
use vuluz_core::domain::{AmountLimits, CashflowPeriod, SortDirection, SortKey};
use vuluz_core::ports::{SessionStore, WalletApi};
use vuluz_core::services::export::write_csv;
use vuluz_core::services::{
    BalanceView, EntryPoint, LogEvent, LoggingService, TopUpCommand, TransferCommand,
};
use vuluz_core::{
    Credentials, FilterPatch, PaymentMethod, Transaction, TransactionStatus, TransactionType, User,
    VuluzContext,
};

// ============================================================================
// Test Helpers
// ============================================================================

const EMAIL: &str = "salma@example.com";
const PASSWORD: &str = "secret123";
const PIN: &str = "123456";
const OWN_WALLET: &str = "998877665";
const RECIPIENT: &str = "114516277";

fn dollars(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

/// Backend holding one user with `balance`, plus one known recipient
fn backend(balance: Decimal, history: Vec<Transaction>) -> Arc<InMemoryWalletApi> {
    let mut user = User::new("42", "Salma Mazaya", EMAIL);
    user.wallet_number = Some(OWN_WALLET.to_string());
    user.balance = balance;

    Arc::new(
        InMemoryWalletApi::new(user, PASSWORD, PIN)
            .with_owner(RECIPIENT, "Budi Santoso")
            .with_min_top_up(dollars(1))
            .with_transactions(history),
    )
}

/// Context with limits loose enough for small example amounts
fn context(api: Arc<InMemoryWalletApi>, store: Arc<dyn SessionStore>) -> VuluzContext {
    let mut config = Config::default();
    let loose = AmountLimits::new(dollars(1), Decimal::new(99_999_999, 0));
    config.transfer_limits = loose;
    config.top_up_limits = loose;
    VuluzContext::with_backend(config, api, store)
}

async fn logged_in(api: Arc<InMemoryWalletApi>) -> VuluzContext {
    let ctx = context(api, Arc::new(MemorySessionStore::new()));
    ctx.login(&Credentials::new(EMAIL, PASSWORD)).await.unwrap();
    ctx.wallet.load().await.unwrap();
    ctx
}

fn sample_history() -> Vec<Transaction> {
    vec![
        Transaction::new("t3", TransactionType::TransferIn, dollars(4_000), at("2024-03-11 00:00:01"))
            .with_description("Split bill")
            .with_counterparty("Andi"),
        Transaction::new("t2", TransactionType::Payment, dollars(2_500), at("2024-03-10 23:59:59"))
            .with_description("Coffee beans")
            .with_counterparty("Kopi Kenangan"),
        Transaction::new("t1", TransactionType::TopUp, dollars(10_000), at("2024-03-01 08:00:00"))
            .with_description("Salary")
            .with_counterparty("Bank Transfer"),
    ]
}

// ============================================================================
// Money commands
// ============================================================================

#[tokio::test]
async fn test_top_up_example() {
    let api = backend(dollars(10_000), vec![]);
    let ctx = logged_in(api.clone()).await;
    let before = ctx.wallet.snapshot().unwrap().transactions.len();

    let result = ctx
        .wallet
        .create_top_up(TopUpCommand::new(dollars(5_000), PaymentMethod::BankTransfer, PIN))
        .await;

    assert!(result.success, "{:?}", result.error);
    let state = ctx.wallet.snapshot().unwrap();
    assert_eq!(state.balance, dollars(15_000));
    assert_eq!(state.transactions.len(), before + 1);
    assert_eq!(state.transactions[0].transaction_type, TransactionType::TopUp);
    assert_eq!(state.transactions[0].amount, dollars(5_000));
    assert_eq!(api.current_balance(), dollars(15_000));
}

#[tokio::test]
async fn test_transfer_example() {
    let api = backend(dollars(15_000), vec![]);
    let ctx = logged_in(api.clone()).await;

    let result = ctx
        .wallet
        .create_transfer(TransferCommand::new(RECIPIENT, dollars(3_000), PIN).with_notes("Lunch"))
        .await;

    assert!(result.success, "{:?}", result.error);
    let state = ctx.wallet.snapshot().unwrap();
    assert_eq!(state.balance, dollars(12_000));
    assert_eq!(state.transactions.len(), 1);
    assert_eq!(state.transactions[0].status, TransactionStatus::Completed);
    assert_eq!(state.transactions[0].description, "Lunch");
}

#[tokio::test]
async fn test_transfer_blocked_on_low_balance() {
    let api = backend(dollars(2_000), sample_history());
    let ctx = logged_in(api.clone()).await;
    let before = ctx.wallet.snapshot().unwrap();

    let result = ctx
        .wallet
        .create_transfer(TransferCommand::new(RECIPIENT, dollars(3_000), PIN))
        .await;

    assert!(!result.success);
    let after = ctx.wallet.snapshot().unwrap();
    assert_eq!(after.balance, dollars(2_000));
    assert_eq!(after.transactions, before.transactions);
    assert_eq!(api.call_count("transfer"), 0);
}

#[tokio::test]
async fn test_rejected_transfer_is_compensated() {
    let api = backend(dollars(15_000), vec![]);
    let ctx = logged_in(api.clone()).await;
    api.reject_next("Service temporarily unavailable");

    let result = ctx
        .wallet
        .create_transfer(TransferCommand::new(RECIPIENT, dollars(3_000), PIN))
        .await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Service temporarily unavailable"));
    let state = ctx.wallet.snapshot().unwrap();
    assert_eq!(state.balance, dollars(15_000));
    assert_eq!(state.transactions[0].status, TransactionStatus::Failed);
    assert_eq!(api.current_balance(), dollars(15_000));

    // Summary ignores the failed entry
    let summary = vuluz_core::domain::summary::summarize(
        &state.transactions,
        state.balance,
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
    );
    assert_eq!(summary.total_expense, Decimal::ZERO);
}

#[tokio::test]
async fn test_wrong_pin_rejected_by_backend() {
    let api = backend(dollars(15_000), vec![]);
    let ctx = logged_in(api.clone()).await;

    let result = ctx
        .wallet
        .create_top_up(TopUpCommand::new(dollars(1_000), PaymentMethod::DebitCard, "000000"))
        .await;

    assert_eq!(result.error.as_deref(), Some("Invalid PIN"));
    assert_eq!(ctx.wallet.balance().unwrap(), dollars(15_000));
}

// ============================================================================
// Filters and derived views
// ============================================================================

#[tokio::test]
async fn test_type_filter() {
    let ctx = logged_in(backend(dollars(11_500), sample_history())).await;
    let visible = ctx
        .wallet
        .apply_filters(FilterPatch::new().transaction_type(Some(TransactionType::Payment)))
        .unwrap();
    assert_eq!(visible.len(), 1);
    assert!(visible.iter().all(|t| t.transaction_type == TransactionType::Payment));
}

#[tokio::test]
async fn test_date_range_is_inclusive_to_end_of_day() {
    let ctx = logged_in(backend(dollars(11_500), sample_history())).await;
    let visible = ctx
        .wallet
        .apply_filters(
            FilterPatch::new()
                .date_from(NaiveDate::from_ymd_opt(2024, 3, 1))
                .date_to(NaiveDate::from_ymd_opt(2024, 3, 10)),
        )
        .unwrap();

    let ids: Vec<_> = visible.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["t2", "t1"]);
}

#[tokio::test]
async fn test_clear_filters_restores_source_list() {
    let ctx = logged_in(backend(dollars(11_500), sample_history())).await;
    ctx.wallet
        .apply_filters(FilterPatch::new().search(Some("coffee")))
        .unwrap();
    ctx.wallet.apply_sort(SortKey::Amount, SortDirection::Asc).unwrap();

    let cleared = ctx.wallet.clear_filters().unwrap();
    assert_eq!(cleared, ctx.wallet.snapshot().unwrap().transactions);
    assert_eq!(cleared, sample_history());
}

#[tokio::test]
async fn test_balance_view_and_cashflow() {
    let ctx = logged_in(backend(dollars(11_500), sample_history())).await;
    let state = ctx.wallet.snapshot().unwrap();
    let view = BalanceView::from_state(&state);
    assert_eq!(view.balance, dollars(11_500));

    let points = cashflow(
        &state.transactions,
        CashflowPeriod::Monthly,
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
    );
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].label, "MAR");
    assert_eq!(points[0].income, dollars(14_000));
    assert_eq!(points[0].expense, dollars(2_500));
}

#[tokio::test]
async fn test_csv_export_of_visible_list() {
    let ctx = logged_in(backend(dollars(11_500), sample_history())).await;
    let visible = ctx
        .wallet
        .apply_filters(FilterPatch::new().transaction_type(Some(TransactionType::TopUp)))
        .unwrap();

    let mut out = Vec::new();
    write_csv(&visible, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("t1,2024-03-01 08:00:00,TOP_UP,100.00,Salary,Bank Transfer,completed"));
}

// ============================================================================
// Session persistence
// ============================================================================

#[tokio::test]
async fn test_session_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("session.duckdb");
    let api = backend(dollars(10_000), vec![]);

    {
        let store = Arc::new(DuckDbSessionStore::open(&db_path).unwrap());
        let ctx = context(api.clone(), store);
        ctx.login(&Credentials::new(EMAIL, PASSWORD)).await.unwrap();
    }

    let store = Arc::new(DuckDbSessionStore::open(&db_path).unwrap());
    let ctx = context(api.clone(), store);
    let user = ctx.require_user().await.unwrap();
    assert_eq!(user.email, EMAIL);
    assert_eq!(api.call_count("login"), 1);
    assert_eq!(ctx.wallet.balance().unwrap(), dollars(10_000));
}

#[tokio::test]
async fn test_unauthorized_clears_persisted_session() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("session.duckdb");
    let api = backend(dollars(10_000), vec![]);
    let store = Arc::new(DuckDbSessionStore::open(&db_path).unwrap());

    let ctx = context(api.clone(), store.clone());
    ctx.login(&Credentials::new(EMAIL, PASSWORD)).await.unwrap();
    ctx.wallet.load().await.unwrap();
    api.expire_session();

    let result = ctx
        .wallet
        .create_top_up(TopUpCommand::new(dollars(1_000), PaymentMethod::CreditCard, PIN))
        .await;
    assert!(!result.success);

    let error = vuluz_core::Error::Unauthorized;
    assert!(ctx.auth.handle_failure(&error).unwrap());
    assert!(store.load().unwrap().is_none());
    assert!(matches!(api.profile().await, Err(vuluz_core::Error::NotAuthenticated)));
}

// ============================================================================
// Event log
// ============================================================================

#[tokio::test]
async fn test_failures_are_logged_without_sensitive_values() {
    let temp_dir = TempDir::new().unwrap();
    let logger = LoggingService::new(temp_dir.path(), EntryPoint::Sdk, "0.1.0").unwrap();
    let ctx = logged_in(backend(dollars(10_000), vec![])).await;

    let result = ctx
        .wallet
        .create_transfer(TransferCommand::new("555666777", dollars(3_000), PIN))
        .await;
    assert!(!result.success);

    let message = format!(
        "{} (wallet 555666777, pin {})",
        result.error.clone().unwrap_or_default(),
        PIN
    );
    logger
        .log(
            LogEvent::new("transfer_failed")
                .with_operation("transfer")
                .with_error(message),
        )
        .unwrap();

    let entries = logger.get_errors(10).unwrap();
    assert_eq!(entries.len(), 1);
    let stored = entries[0].error_message.clone().unwrap();
    assert!(stored.starts_with("Receiver wallet number is not found"));
    assert!(!stored.contains("555666777"));
    assert!(!stored.contains(PIN));
}
