use paperdesk::db::init_db;
use paperdesk::{BalanceLedger, Decimal, EngineError, Repository, UserId};
use std::sync::Arc;
use tempfile::TempDir;

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

async fn setup(opening: &str) -> (Arc<BalanceLedger>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    (Arc::new(BalanceLedger::new(repo, d(opening))), temp_dir)
}

#[tokio::test]
async fn test_first_touch_creates_opening_balance() {
    let (ledger, _temp) = setup("100000").await;
    let user = UserId::new("u1");
    assert_eq!(ledger.balance(&user).await.unwrap(), d("100000"));
}

#[tokio::test]
async fn test_debit_and_credit_roundtrip() {
    let (ledger, _temp) = setup("100").await;
    let user = UserId::new("u1");

    let lock = ledger.lock_user(&user).await;
    assert_eq!(ledger.debit(&lock, d("30")).await.unwrap(), d("70"));
    assert_eq!(ledger.credit(&lock, d("10")).await.unwrap(), d("80"));
    drop(lock);

    assert_eq!(ledger.balance(&user).await.unwrap(), d("80"));
}

#[tokio::test]
async fn test_debit_beyond_balance_fails_cleanly() {
    let (ledger, _temp) = setup("100").await;
    let user = UserId::new("u1");

    let lock = ledger.lock_user(&user).await;
    match ledger.debit(&lock, d("150")).await {
        Err(EngineError::InsufficientBalance { needed, available }) => {
            assert_eq!(needed, d("150"));
            assert_eq!(available, d("100"));
        }
        other => panic!("expected InsufficientBalance, got {:?}", other),
    }
    drop(lock);

    assert_eq!(ledger.balance(&user).await.unwrap(), d("100"));
}

#[tokio::test]
async fn test_non_positive_debit_rejected() {
    let (ledger, _temp) = setup("100").await;
    let user = UserId::new("u1");
    let lock = ledger.lock_user(&user).await;
    assert!(matches!(
        ledger.debit(&lock, d("0")).await,
        Err(EngineError::InvalidOrder(_))
    ));
    assert!(matches!(
        ledger.debit(&lock, d("-5")).await,
        Err(EngineError::InvalidOrder(_))
    ));
}

#[tokio::test]
async fn test_zero_credit_is_a_noop() {
    let (ledger, _temp) = setup("100").await;
    let user = UserId::new("u1");
    let lock = ledger.lock_user(&user).await;
    assert_eq!(ledger.credit(&lock, d("0")).await.unwrap(), d("100"));
}

#[tokio::test]
async fn test_concurrent_debits_are_serialized() {
    // Opening 100, twenty tasks each try to debit 10: exactly ten succeed
    // and the final balance is exactly zero. Lost updates would leave a
    // positive balance with more than ten successes.
    let (ledger, _temp) = setup("100").await;
    let user = UserId::new("u1");

    let mut handles = Vec::new();
    for _ in 0..20 {
        let ledger = ledger.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            let lock = ledger.lock_user(&user).await;
            ledger.debit(&lock, d("10")).await.is_ok()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }

    assert_eq!(successes, 10);
    assert_eq!(ledger.balance(&user).await.unwrap(), Decimal::zero());
}

#[tokio::test]
async fn test_users_do_not_contend() {
    let (ledger, _temp) = setup("100").await;
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");

    // Holding alice's lock must not block bob's debit.
    let alice_lock = ledger.lock_user(&alice).await;
    let bob_lock = ledger.lock_user(&bob).await;
    assert_eq!(ledger.debit(&bob_lock, d("40")).await.unwrap(), d("60"));
    assert_eq!(ledger.debit(&alice_lock, d("10")).await.unwrap(), d("90"));
}
