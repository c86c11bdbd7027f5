//! Dynamic membership: the tracked fleet follows the sites file.

use std::path::PathBuf;
use std::time::Duration;

use wakefleet::driver::fake::FakeDriverFactory;
use wakefleet::{Keeper, KeeperConfig, SessionState, SiteRegistry, StatusStore, WakeStrategy};

const SITE_A: &str = "https://a.example/";
const SITE_B: &str = "https://b.example/";
const SITE_C: &str = "https://c.example/";

fn test_config() -> KeeperConfig {
    KeeperConfig {
        ping_interval: Duration::from_secs(300),
        attempt_timeout: Duration::from_millis(20),
        wake_timeout: Duration::from_millis(20),
        retry_delay: Duration::ZERO,
        max_attempts: 3,
        wake_strategies: WakeStrategy::defaults(),
    }
}

struct Fixture {
    keeper: Keeper,
    factory: FakeDriverFactory,
    status: StatusStore,
    sites_path: PathBuf,
    _dir: tempfile::TempDir,
}

fn fixture(sites: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let sites_path = dir.path().join("sites.txt");
    std::fs::write(&sites_path, sites).unwrap();

    let factory = FakeDriverFactory::new();
    let status = StatusStore::new();
    let keeper = Keeper::new(
        test_config(),
        SiteRegistry::new(&sites_path),
        Box::new(factory.clone()),
        status.clone(),
    );

    Fixture {
        keeper,
        factory,
        status,
        sites_path,
        _dir: dir,
    }
}

#[tokio::test]
async fn membership_follows_the_registry() {
    let mut fx = fixture("https://a.example/\nhttps://b.example/\n");
    fx.keeper.run_cycle().await;
    assert_eq!(fx.keeper.tracked(), vec![SITE_A, SITE_B]);

    // {A, B} -> {B, C}
    std::fs::write(&fx.sites_path, "https://b.example/\nhttps://c.example/\n").unwrap();
    fx.keeper.reconcile().await;

    assert_eq!(fx.keeper.tracked(), vec![SITE_B, SITE_C]);

    // A's page handle and record are released.
    assert!(fx.factory.controller(SITE_A).unwrap().closed());
    assert!(fx.status.get(SITE_A).is_none());

    // C has a fresh placeholder before its first visit completes.
    assert_eq!(fx.keeper.session_state(SITE_C), Some(SessionState::Loading));
    let placeholder = fx.status.get(SITE_C).unwrap();
    assert_eq!(placeholder.state, SessionState::Loading);
    assert_eq!(placeholder.retries, 0);

    // B's session survived the reconciliation untouched.
    assert_eq!(fx.keeper.session_state(SITE_B), Some(SessionState::Running));

    fx.keeper.run_cycle().await;
    assert_eq!(fx.keeper.session_state(SITE_C), Some(SessionState::Running));
}

#[tokio::test]
async fn registry_failure_keeps_sessions_and_reports_the_condition() {
    let mut fx = fixture("https://a.example/\n");
    fx.keeper.run_cycle().await;
    let visits_before = fx.factory.controller(SITE_A).unwrap().load_attempts();

    std::fs::remove_file(&fx.sites_path).unwrap();
    fx.keeper.run_cycle().await;

    // Conservative removal: the session survives and is still visited.
    assert_eq!(fx.keeper.tracked(), vec![SITE_A]);
    assert_eq!(fx.keeper.session_state(SITE_A), Some(SessionState::Running));
    assert!(
        fx.factory.controller(SITE_A).unwrap().load_attempts() > visits_before,
        "sites are still pinged while the registry is unavailable"
    );
    assert!(fx.status.snapshot().registry_error.is_some());

    // Restoring the file clears the condition.
    std::fs::write(&fx.sites_path, "https://a.example/\n").unwrap();
    fx.keeper.run_cycle().await;
    assert!(fx.status.snapshot().registry_error.is_none());
}

#[tokio::test]
async fn registry_unavailable_at_startup_tracks_nothing() {
    let mut fx = fixture("");
    std::fs::remove_file(&fx.sites_path).unwrap();

    fx.keeper.run_cycle().await;

    assert!(fx.keeper.tracked().is_empty());
    assert!(fx.status.is_empty());
    assert!(fx.status.snapshot().registry_error.is_some());
}

#[tokio::test]
async fn empty_registry_file_tears_the_fleet_down() {
    let mut fx = fixture("https://a.example/\n");
    fx.keeper.run_cycle().await;
    assert_eq!(fx.keeper.tracked(), vec![SITE_A]);

    // An empty-but-readable file is an explicit "no targets", unlike a
    // read failure.
    std::fs::write(&fx.sites_path, "").unwrap();
    fx.keeper.run_cycle().await;

    assert!(fx.keeper.tracked().is_empty());
    assert!(fx.status.is_empty());
    assert!(fx.factory.controller(SITE_A).unwrap().closed());
}

#[tokio::test]
async fn driver_creation_failure_leaves_target_untracked() {
    let mut fx = fixture("https://a.example/\n");
    fx.factory.fail_create(true);

    fx.keeper.run_cycle().await;
    assert!(fx.keeper.tracked().is_empty());
    assert!(fx.status.is_empty());

    // Once the factory recovers, the next cycle picks the target up.
    fx.factory.fail_create(false);
    fx.keeper.run_cycle().await;
    assert_eq!(fx.keeper.tracked(), vec![SITE_A]);
    assert_eq!(fx.keeper.session_state(SITE_A), Some(SessionState::Running));
}
