use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use wallet_vault::error::{SessionError, VaultError};
use wallet_vault::storage::{SESSION_KEY, VAULT_KEY};
use wallet_vault::{KeyValueStore, SqliteStore, WalletHandle, WalletSession};

use crate::common::{address_for, fast_crypto, CountingTimer, FakeFactory, Fixture, FlakyStore, PASSWORD};

async fn address_of(wallet: &dyn WalletHandle) -> String {
    wallet
        .get_account(0)
        .await
        .unwrap()
        .get_address()
        .await
        .unwrap()
}

#[tokio::test]
async fn create_lock_unlock_yields_same_address() {
    let fx = Fixture::new();
    let mut session = fx.session();

    let created = address_of(session.create(PASSWORD).await.unwrap()).await;
    assert!(session.is_unlocked());
    assert!(session.exists().await.unwrap());

    session.lock().await.unwrap();
    assert!(session.get().is_none());
    assert!(!session.is_unlocked());

    let unlocked = address_of(session.unlock(PASSWORD).await.unwrap()).await;
    assert_eq!(created, unlocked);
}

#[tokio::test]
async fn wrong_password_leaves_no_state() {
    let fx = Fixture::new();
    fx.session().create(PASSWORD).await.unwrap();
    fx.transient.clear();

    let mut fresh = fx.session();
    let err = fresh.unlock("WrongPassword").await.err().expect("wrong password rejected");
    assert!(matches!(
        err,
        SessionError::Vault(VaultError::InvalidPasswordOrCorrupted)
    ));
    assert_eq!(err.to_string(), "Invalid password or corrupted vault");
    assert!(fresh.get().is_none());
    assert!(!fresh.is_unlocked());
    assert!(fx.transient.get(SESSION_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn unlock_without_vault_reports_no_wallet() {
    let fx = Fixture::new();
    let mut session = fx.session();

    let err = session.unlock("anything").await.err().expect("unlock without vault fails");
    assert_eq!(err.to_string(), "No wallet found. Create one first.");
    assert!(!session.exists().await.unwrap());
    assert_eq!(fx.factory.connects(), 0);
}

#[tokio::test]
async fn create_over_existing_vault_is_rejected_and_vault_untouched() {
    let fx = Fixture::new();
    let mut session = fx.session();
    session.create(PASSWORD).await.unwrap();
    let before = fx.durable.get(VAULT_KEY).await.unwrap().unwrap();

    let err = session.create("another password").await.err().expect("second create fails");
    assert_eq!(err.to_string(), "Wallet already exists. Use unlock() instead.");

    session.lock().await.unwrap();
    let err = session.create("another password").await.err().expect("second create fails");
    assert!(matches!(err, SessionError::AlreadyExists));

    let after = fx.durable.get(VAULT_KEY).await.unwrap().unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn lock_is_idempotent_and_keeps_vault() {
    let fx = Fixture::new();
    let mut session = fx.session();
    session.lock().await.unwrap();
    session.lock().await.unwrap();

    session.create(PASSWORD).await.unwrap();
    assert!(fx.transient.get(SESSION_KEY).await.unwrap().is_some());

    for _ in 0..3 {
        session.lock().await.unwrap();
        assert!(session.get().is_none());
        assert!(!session.is_unlocked());
        assert!(session.exists().await.unwrap());
    }
    assert!(fx.transient.get(SESSION_KEY).await.unwrap().is_none());
    assert_eq!(fx.factory.disposals(), 1);
}

#[tokio::test]
async fn stored_records_carry_no_plaintext() {
    let fx = Fixture::new();
    let mut session = fx.session();
    let address = address_of(session.create(PASSWORD).await.unwrap()).await;

    let vault = fx.durable.get(VAULT_KEY).await.unwrap().unwrap();
    assert_eq!(vault["version"], json!(1));
    assert_eq!(vault["kdf"]["algorithm"], json!("PBKDF2"));
    assert_eq!(vault["kdf"]["hash"], json!("SHA-256"));
    assert_eq!(vault["encryption"]["algorithm"], json!("AES-GCM"));
    assert_eq!(vault["encryption"]["keyLength"], json!(256));

    let record = fx.transient.get(SESSION_KEY).await.unwrap().unwrap();
    let text = format!("{vault}{record}");
    assert!(!text.contains(PASSWORD));
    assert!(!text.contains(&address));
    // A leaked mnemonic would show up as space-separated words.
    assert_eq!(text.matches(' ').count(), 0);
}

#[tokio::test]
async fn every_unlock_writes_a_new_session_key() {
    let fx = Fixture::new();
    let mut session = fx.session();
    session.create(PASSWORD).await.unwrap();
    let first = fx.transient.get(SESSION_KEY).await.unwrap().unwrap()["sessionKey"].clone();

    session.lock().await.unwrap();
    session.unlock(PASSWORD).await.unwrap();
    let second = fx.transient.get(SESSION_KEY).await.unwrap().unwrap()["sessionKey"].clone();

    assert_ne!(first, second);
}

#[tokio::test]
async fn restore_resumes_without_password() {
    let fx = Fixture::new();
    let mut first = fx.session();
    let address = address_of(first.create(PASSWORD).await.unwrap()).await;
    drop(first);

    let mut resumed = fx.session();
    assert!(resumed.restore().await.unwrap());
    assert!(resumed.is_unlocked());
    assert_eq!(address_of(resumed.get().unwrap()).await, address);
}

#[tokio::test]
async fn restore_after_lock_finds_nothing() {
    let fx = Fixture::new();
    let mut session = fx.session();
    session.create(PASSWORD).await.unwrap();
    session.lock().await.unwrap();

    let mut resumed = fx.session();
    assert!(!resumed.restore().await.unwrap());
    assert!(!resumed.is_unlocked());
}

#[tokio::test]
async fn corrupt_session_record_falls_back_to_locked() {
    let fx = Fixture::new();
    fx.session().create(PASSWORD).await.unwrap();

    let mut record = fx.transient.get(SESSION_KEY).await.unwrap().unwrap();
    record["encryptedMnemonic"]["ciphertext"] = json!("AAAA");
    fx.transient.set(SESSION_KEY, record).await.unwrap();

    let mut resumed = fx.session();
    assert!(!resumed.restore().await.unwrap());
    assert!(fx.transient.get(SESSION_KEY).await.unwrap().is_none());

    // Full unlock still works.
    resumed.unlock(PASSWORD).await.unwrap();
    assert!(resumed.is_unlocked());
}

const WINDOW: Duration = Duration::from_secs(15 * 60);

async fn stamp_last_activity(fx: &Fixture, millis: i64) {
    let mut record = fx.transient.get(SESSION_KEY).await.unwrap().unwrap();
    record["lastActivity"] = json!(millis);
    fx.transient.set(SESSION_KEY, record).await.unwrap();
}

#[tokio::test]
async fn restore_refuses_session_idle_past_window() {
    let fx = Fixture::new();
    fx.session().create(PASSWORD).await.unwrap();
    stamp_last_activity(&fx, 0).await;
    let connects = fx.factory.connects();

    let timer = Arc::new(CountingTimer::with_window(WINDOW));
    let mut resumed = fx.session().with_timer(timer.clone());
    assert!(!resumed.restore().await.unwrap());
    assert!(!resumed.is_unlocked());
    assert!(fx.transient.get(SESSION_KEY).await.unwrap().is_none());
    assert_eq!(fx.factory.connects(), connects);
    assert_eq!(timer.arms(), 0);

    // The vault is untouched; a password unlock still works.
    resumed.unlock(PASSWORD).await.unwrap();
    assert!(resumed.is_unlocked());
}

#[tokio::test]
async fn restore_arms_only_the_rest_of_the_window() {
    let fx = Fixture::new();
    fx.session().create(PASSWORD).await.unwrap();
    let ten_minutes_ago = chrono::Utc::now().timestamp_millis() - 10 * 60 * 1000;
    stamp_last_activity(&fx, ten_minutes_ago).await;

    let timer = Arc::new(CountingTimer::with_window(WINDOW));
    let mut resumed = fx.session().with_timer(timer.clone());
    assert!(resumed.restore().await.unwrap());

    let shortened = timer.shortened();
    assert_eq!(shortened.len(), 1);
    assert!(shortened[0] <= Duration::from_secs(5 * 60));
    assert!(shortened[0] > Duration::from_secs(4 * 60));
}

#[tokio::test]
async fn restore_without_window_ignores_idle_time() {
    let fx = Fixture::new();
    fx.session().create(PASSWORD).await.unwrap();
    stamp_last_activity(&fx, 0).await;

    let timer = Arc::new(CountingTimer::default());
    let mut resumed = fx.session().with_timer(timer.clone());
    assert!(resumed.restore().await.unwrap());
    assert_eq!(timer.arms(), 1);
    assert!(timer.shortened().is_empty());
}

#[tokio::test]
async fn update_network_requires_unlock_and_supported_chain() {
    let fx = Fixture::new();
    let mut session = fx.session();

    let err = session.update_network(8453).await.unwrap_err();
    assert_eq!(err.to_string(), "No wallet to switch network");
    assert_eq!(session.network().chain_id, 1);

    session.create(PASSWORD).await.unwrap();
    let err = session.update_network(137).await.unwrap_err();
    assert_eq!(err.to_string(), "Network 137 not found");
    assert_eq!(session.network().chain_id, 1);
    assert_eq!(fx.factory.connects(), 1);
}

#[tokio::test]
async fn update_network_rebinds_from_held_mnemonic() {
    let fx = Fixture::new();
    let mut session = fx.session();
    let address = address_of(session.create(PASSWORD).await.unwrap()).await;

    let mut record = fx.transient.get(SESSION_KEY).await.unwrap().unwrap();
    record["lastActivity"] = json!(1);
    fx.transient.set(SESSION_KEY, record).await.unwrap();

    let network = session.update_network(8453).await.unwrap();
    assert_eq!(network.name, "Base");
    assert_eq!(session.network().chain_id, 8453);
    assert_eq!(
        fx.factory.endpoints(),
        vec!["https://eth.llamarpc.com", "https://base.drpc.org"]
    );
    assert_eq!(fx.factory.disposals(), 1);
    assert_eq!(address_of(session.get().unwrap()).await, address);

    let record = fx.transient.get(SESSION_KEY).await.unwrap().unwrap();
    assert!(record["lastActivity"].as_i64().unwrap() > 1);
}

#[tokio::test]
async fn failed_rebind_keeps_previous_network() {
    let fx = Fixture::new();
    let mut session = fx.session();
    session.create(PASSWORD).await.unwrap();

    fx.factory.set_fail_connect(true);
    assert!(session.update_network(42161).await.is_err());
    assert_eq!(session.network().chain_id, 1);
    assert!(session.is_unlocked());
    assert_eq!(fx.factory.disposals(), 0);
}

#[tokio::test]
async fn unlock_while_unlocked_replaces_handle() {
    let fx = Fixture::new();
    let mut session = fx.session();
    session.create(PASSWORD).await.unwrap();

    assert!(session.unlock("WrongPassword").await.is_err());
    assert!(session.is_unlocked());
    assert_eq!(fx.factory.disposals(), 0);

    session.unlock(PASSWORD).await.unwrap();
    assert!(session.is_unlocked());
    assert_eq!(fx.factory.disposals(), 1);
}

#[tokio::test]
async fn unreadable_vault_blocks_create_and_unlock() {
    let fx = Fixture::new();
    fx.durable
        .set(VAULT_KEY, json!({"version": 99, "ciphertext": "x"}))
        .await
        .unwrap();
    let mut session = fx.session();

    assert!(session.exists().await.unwrap());
    assert!(matches!(
        session.create(PASSWORD).await.err().expect("create fails"),
        SessionError::AlreadyExists
    ));
    assert!(matches!(
        session.unlock(PASSWORD).await.err().expect("unlock fails"),
        SessionError::NoWalletFound
    ));
    assert!(fx.durable.get(VAULT_KEY).await.unwrap().is_some());
}

#[tokio::test]
async fn timer_follows_lock_state() {
    let fx = Fixture::new();
    let timer = Arc::new(CountingTimer::default());
    let mut session = fx.session().with_timer(timer.clone());

    session.create(PASSWORD).await.unwrap();
    assert_eq!(timer.arms(), 1);

    session.touch().await.unwrap();
    assert_eq!(timer.arms(), 2);

    session.lock().await.unwrap();
    assert_eq!(timer.disarms(), 1);

    session.touch().await.unwrap();
    assert_eq!(timer.arms(), 2);

    assert!(fx.session().with_timer(timer.clone()).restore().await.is_ok());
    assert_eq!(timer.arms(), 2);
}

#[tokio::test]
async fn lock_with_failing_store_still_locks_in_memory() {
    let durable = FlakyStore::new();
    let transient = FlakyStore::new();
    let factory = FakeFactory::new();
    let mut session = WalletSession::new(durable.clone(), transient.clone(), factory.clone())
        .with_crypto(fast_crypto());
    session.create(PASSWORD).await.unwrap();

    transient.fail_remove.store(true, Ordering::SeqCst);
    let err = session.lock().await.unwrap_err();
    assert!(matches!(err, SessionError::Storage(_)));
    assert!(!session.is_unlocked());
    assert!(session.get().is_none());
    assert_eq!(factory.disposals(), 1);
}

#[tokio::test]
async fn session_write_failure_leaves_session_locked() {
    let durable = FlakyStore::new();
    let transient = FlakyStore::new();
    let factory = FakeFactory::new();
    let mut session = WalletSession::new(durable.clone(), transient.clone(), factory.clone())
        .with_crypto(fast_crypto());
    session.create(PASSWORD).await.unwrap();
    session.lock().await.unwrap();

    transient.fail_set.store(true, Ordering::SeqCst);
    assert!(session.unlock(PASSWORD).await.is_err());
    assert!(!session.is_unlocked());
    assert_eq!(factory.disposals(), 2);
}

#[tokio::test]
async fn durable_failure_surfaces_as_error() {
    let durable = FlakyStore::new();
    durable.fail_get.store(true, Ordering::SeqCst);
    let mut session = WalletSession::new(durable, FlakyStore::new(), FakeFactory::new())
        .with_crypto(fast_crypto());

    let err = session.unlock(PASSWORD).await.err().expect("unlock fails");
    assert!(!err.is_user_error());
    assert!(err.to_string().contains("injected fault"));
}

#[tokio::test]
async fn sqlite_vault_survives_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wallet.db");
    let factory = FakeFactory::new();

    let address = {
        let durable = Arc::new(SqliteStore::open(&path).unwrap());
        let mut session =
            WalletSession::new(durable, Arc::new(wallet_vault::MemoryStore::new()), factory.clone())
                .with_crypto(fast_crypto());
        address_of(session.create(PASSWORD).await.unwrap()).await
    };

    let durable = Arc::new(SqliteStore::open(&path).unwrap());
    let mut session =
        WalletSession::new(durable, Arc::new(wallet_vault::MemoryStore::new()), factory)
            .with_crypto(fast_crypto());
    assert!(!session.restore().await.unwrap());
    assert!(session.exists().await.unwrap());
    assert_eq!(address_of(session.unlock(PASSWORD).await.unwrap()).await, address);
}

#[tokio::test]
async fn addresses_are_stable_per_mnemonic() {
    assert_eq!(address_for("a b c", 0), address_for("a b c", 0));
    assert_ne!(address_for("a b c", 0), address_for("a b c", 1));
}
