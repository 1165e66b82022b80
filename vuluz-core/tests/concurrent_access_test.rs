//! Concurrent submission tests
//!
//! These tests race wallet commands against each other on a multi-threaded
//! runtime. The in-memory backend adds latency so submissions overlap while
//! the first one is still waiting for the backend.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture
//! Run specific test: cargo test --test concurrent_access_test test_name -- --nocapture

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use uuid::Uuid;

use vuluz_core::adapters::memory::{InMemoryWalletApi, DEMO_PIN};
use vuluz_core::ports::WalletApi;
use vuluz_core::services::{TopUpCommand, TransferCommand, WalletAction, WalletStore};
use vuluz_core::{Credentials, PaymentMethod, TransactionStatus};

/// Number of concurrent submissions for stress tests
const TASK_COUNT: usize = 8;

/// Backend latency, long enough for every task to start before any finishes
const LATENCY: Duration = Duration::from_millis(50);

fn rp(amount: i64) -> Decimal {
    Decimal::new(amount, 0)
}

async fn shared_store() -> (Arc<InMemoryWalletApi>, Arc<WalletStore>) {
    store_over(InMemoryWalletApi::demo().with_latency(LATENCY)).await
}

async fn store_over(api: InMemoryWalletApi) -> (Arc<InMemoryWalletApi>, Arc<WalletStore>) {
    let api = Arc::new(api);
    let token = api
        .login(&Credentials::new("demo@vuluz.app", "demo1234"))
        .await
        .unwrap();
    api.set_token(Some(token.token));
    let profile = api.profile().await.unwrap();

    let store = Arc::new(WalletStore::new(api.clone()));
    store.dispatch(WalletAction::ProfileLoaded(profile)).unwrap();
    store.load().await.unwrap();
    (api, store)
}

/// Test: the same idempotency key submitted from many tasks at once.
///
/// Exactly one submission may reach the backend; the rest are rejected
/// client-side while the first is in flight.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_key_reaches_backend_once() {
    let (api, store) = shared_store().await;
    let key = Uuid::new_v4();

    let mut handles = vec![];
    for _ in 0..TASK_COUNT {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .create_transfer(TransferCommand::new("223344556", rp(10_000), DEMO_PIN).with_key(key))
                .await
        }));
    }

    let mut successes = 0;
    let mut duplicates = 0;
    for handle in handles {
        let result = handle.await.unwrap();
        if result.success {
            successes += 1;
        } else {
            println!("Rejected: {:?}", result.error);
            duplicates += 1;
        }
    }

    println!("Results: {} successes, {} duplicates", successes, duplicates);
    assert_eq!(successes, 1);
    assert_eq!(duplicates, TASK_COUNT - 1);
    assert_eq!(api.call_count("transfer"), 1);
    assert_eq!(store.balance().unwrap(), rp(1_240_000));
    assert_eq!(api.current_balance(), rp(1_240_000));
}

/// Test: independent transfers that together exceed the balance.
///
/// The funds check and the optimistic debit happen under one lock, so the
/// local balance never goes below zero.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_never_overdraw() {
    let (api, store) = shared_store().await;

    let mut handles = vec![];
    for _ in 0..TASK_COUNT {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .create_transfer(TransferCommand::new("334455667", rp(400_000), DEMO_PIN))
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().success {
            successes += 1;
        }
    }

    // 1,250,000 covers three transfers of 400,000
    assert_eq!(successes, 3);
    let balance = store.balance().unwrap();
    assert_eq!(balance, rp(50_000));
    assert_eq!(balance, api.current_balance());
    assert!(balance >= Decimal::ZERO);
}

/// Test: mixed top-ups and transfers interleaving.
///
/// Every delta is applied exactly once, so the final local balance matches
/// the backend.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_commands_keep_balance_consistent() {
    let (api, store) = shared_store().await;

    let mut handles = vec![];
    for i in 0..TASK_COUNT {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                store
                    .create_top_up(TopUpCommand::new(rp(20_000), PaymentMethod::PayPal, DEMO_PIN))
                    .await
            } else {
                store
                    .create_transfer(TransferCommand::new("223344556", rp(5_000), DEMO_PIN))
                    .await
            }
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert!(result.success, "{:?}", result.error);
    }

    let state = store.snapshot().unwrap();
    // +4 x 20,000 and -4 x 5,000
    assert_eq!(state.balance, rp(1_310_000));
    assert_eq!(state.balance, api.current_balance());
    assert!(state
        .transactions
        .iter()
        .take(TASK_COUNT)
        .all(|t| t.status == TransactionStatus::Completed));
}

/// Test: a rejected command racing a successful one.
///
/// Compensation reverses only the rejected command's delta.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_compensation_does_not_touch_other_commands() {
    let (api, store) = shared_store().await;
    api.reject_next("Service temporarily unavailable");

    let first = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store
                .create_transfer(TransferCommand::new("223344556", rp(100_000), DEMO_PIN))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store
                .create_top_up(TopUpCommand::new(rp(30_000), PaymentMethod::CreditCard, DEMO_PIN))
                .await
        })
    };

    let first = first.await.unwrap();
    let second = second.await.unwrap();
    assert_ne!(first.success, second.success, "exactly one command is rejected");

    let expected = if first.success {
        rp(1_150_000)
    } else {
        rp(1_280_000)
    };
    assert_eq!(store.balance().unwrap(), expected);
    assert_eq!(api.current_balance(), expected);
}

/// Test: a load that runs while a committed transfer waits for its reply.
///
/// The backend's answer already contains the transfer, the local list holds
/// it as pending. Applying that answer would count the debit twice, so the
/// load leaves the local view alone until the transfer settles.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_load_during_unanswered_transfer_is_not_applied() {
    let (api, store) = store_over(
        InMemoryWalletApi::demo()
            .with_latency(LATENCY)
            .with_reply_delay(Duration::from_millis(200)),
    )
    .await;
    let key = Uuid::new_v4();

    let transfer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store
                .create_transfer(TransferCommand::new("223344556", rp(250_000), DEMO_PIN).with_key(key))
                .await
        })
    };

    // Past the commit, before the reply
    tokio::time::sleep(Duration::from_millis(100)).await;
    let during = store.load().await.unwrap();
    println!(
        "During: balance={} entries={} backend={}",
        during.balance,
        during.transactions.len(),
        api.current_balance()
    );
    assert_eq!(api.current_balance(), rp(1_000_000));
    assert_eq!(during.balance, rp(1_000_000));
    assert_eq!(during.transactions.len(), 8);
    assert!(during.transactions[0].is_pending());

    let result = transfer.await.unwrap();
    assert!(result.success, "{:?}", result.error);
    assert_eq!(store.balance().unwrap(), rp(1_000_000));

    let after = store.load().await.unwrap();
    assert_eq!(after.balance, rp(1_000_000));
    assert_eq!(after.transactions.len(), 8);
    let keyed = after
        .transactions
        .iter()
        .filter(|tx| tx.idempotency_key == Some(key))
        .count();
    assert_eq!(keyed, 1);
}

/// Test: a load already fetching when a transfer starts.
///
/// Its answer predates the transfer, so applying it would drop the debit.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_load_started_before_transfer_is_not_applied() {
    let (api, store) = shared_store().await;

    let load = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.load().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let result = store
        .create_transfer(TransferCommand::new("334455667", rp(100_000), DEMO_PIN))
        .await;
    assert!(result.success, "{:?}", result.error);

    let loaded = load.await.unwrap().unwrap();
    assert_ne!(loaded.balance, rp(1_250_000));

    let state = store.snapshot().unwrap();
    assert_eq!(state.balance, rp(1_150_000));
    assert_eq!(state.balance, api.current_balance());
    assert_eq!(state.transactions.len(), 8);
    assert_eq!(state.transactions[0].status, TransactionStatus::Completed);
}
