//! End-to-end cycles of the keeper against scripted fake drivers.

use std::time::Duration;

use wakefleet::driver::fake::{FakeDriverFactory, FakeScript};
use wakefleet::{Keeper, KeeperConfig, SessionState, SiteRegistry, StatusStore, WakeStrategy};

const SITE_A: &str = "https://a.example/";
const SITE_B: &str = "https://b.example/";
const VIEWER_SELECTOR: &str = r#"button[data-testid="wakeup-button-viewer"]"#;
const OWNER_SELECTOR: &str = r#"button[data-testid="wakeup-button-owner"]"#;

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
    _dir: tempfile::TempDir,
}

fn fixture(sites: &str) -> Fixture {
    fixture_with_config(sites, test_config())
}

fn fixture_with_config(sites: &str, config: KeeperConfig) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sites.txt");
    std::fs::write(&path, sites).unwrap();

    let factory = FakeDriverFactory::new();
    let status = StatusStore::new();
    let keeper = Keeper::new(
        config,
        SiteRegistry::new(&path),
        Box::new(factory.clone()),
        status.clone(),
    );

    Fixture {
        keeper,
        factory,
        status,
        _dir: dir,
    }
}

#[tokio::test]
async fn three_cycle_scenario() {
    let mut fx = fixture("https://a.example/\nhttps://b.example/\n");

    // First cycle: both load successfully, no wake affordance.
    fx.keeper.run_cycle().await;
    assert_eq!(fx.keeper.session_state(SITE_A), Some(SessionState::Running));
    assert_eq!(fx.keeper.session_state(SITE_B), Some(SessionState::Running));

    // Second cycle: "a" shows the wake affordance.
    fx.factory
        .controller(SITE_A)
        .unwrap()
        .present_selector(VIEWER_SELECTOR);
    fx.keeper.run_cycle().await;
    assert_eq!(fx.keeper.session_state(SITE_A), Some(SessionState::WokenUp));
    assert_eq!(fx.keeper.session_state(SITE_B), Some(SessionState::Running));

    // Third cycle: "b" fails every attempt; "a" recovers independently.
    fx.factory.controller(SITE_B).unwrap().fail_next_loads(3);
    fx.keeper.run_cycle().await;
    assert_eq!(fx.keeper.session_state(SITE_A), Some(SessionState::Running));
    assert_eq!(fx.keeper.session_state(SITE_B), Some(SessionState::Error));

    let record = fx.status.get(SITE_B).unwrap();
    assert_eq!(record.state, SessionState::Error);
    assert_eq!(record.retries, 3);
}

#[tokio::test]
async fn running_cycles_are_idempotent() {
    let mut fx = fixture("https://a.example/\n");

    fx.keeper.run_cycle().await;
    fx.keeper.run_cycle().await;
    fx.keeper.run_cycle().await;

    assert_eq!(fx.keeper.session_state(SITE_A), Some(SessionState::Running));
    let record = fx.status.get(SITE_A).unwrap();
    assert_eq!(record.state, SessionState::Running);
    assert_eq!(record.retries, 0);
}

#[tokio::test]
async fn failing_target_ends_error_with_bounded_attempts() {
    let fx = fixture("https://a.example/\n");
    fx.factory.script(
        SITE_A,
        FakeScript {
            fail_loads: 99,
            ..Default::default()
        },
    );
    let mut keeper = fx.keeper;

    keeper.run_cycle().await;

    assert_eq!(keeper.session_state(SITE_A), Some(SessionState::Error));
    let record = fx.status.get(SITE_A).unwrap();
    assert_eq!(record.state, SessionState::Error);
    assert_eq!(record.retries, 3);
    assert_eq!(
        fx.factory.controller(SITE_A).unwrap().load_attempts(),
        3,
        "attempts are bounded per cycle"
    );
}

#[tokio::test]
async fn errored_target_is_reattempted_next_cycle() {
    let fx = fixture("https://a.example/\n");
    fx.factory.script(
        SITE_A,
        FakeScript {
            fail_loads: 3,
            ..Default::default()
        },
    );
    let mut keeper = fx.keeper;

    keeper.run_cycle().await;
    assert_eq!(keeper.session_state(SITE_A), Some(SessionState::Error));

    // The scripted failures are consumed; the next cycle recovers.
    keeper.run_cycle().await;
    assert_eq!(keeper.session_state(SITE_A), Some(SessionState::Running));
    assert_eq!(fx.status.get(SITE_A).unwrap().retries, 0);
}

#[tokio::test]
async fn first_matching_wake_strategy_wins() {
    let config = KeeperConfig {
        wake_strategies: vec![
            WakeStrategy::new("viewer-badge", VIEWER_SELECTOR),
            WakeStrategy::new("owner-badge", OWNER_SELECTOR),
        ],
        ..test_config()
    };
    let fx = fixture_with_config("https://a.example/\n", config);
    fx.factory.script(
        SITE_A,
        FakeScript {
            present_selectors: vec![VIEWER_SELECTOR.to_string(), OWNER_SELECTOR.to_string()],
            ..Default::default()
        },
    );
    let mut keeper = fx.keeper;

    keeper.run_cycle().await;

    assert_eq!(keeper.session_state(SITE_A), Some(SessionState::WokenUp));
    assert_eq!(
        fx.factory.controller(SITE_A).unwrap().activated(),
        vec!["viewer-badge"],
        "both affordances matched, only the first in priority order fires"
    );
}

#[tokio::test]
async fn every_tracked_target_has_exactly_one_record_after_a_cycle() {
    let mut fx = fixture("https://a.example/\nhttps://b.example/\n");

    fx.keeper.run_cycle().await;

    let snapshot = fx.status.snapshot();
    let mut tracked = fx.keeper.tracked();
    tracked.sort();
    let reported: Vec<String> = snapshot.sites.iter().map(|s| s.url.clone()).collect();
    assert_eq!(reported, tracked);
    for site in &snapshot.sites {
        assert!(
            ["running", "woken up", "error"].contains(&site.state.as_str())
                || site.state.starts_with("retrying"),
            "unexpected post-cycle state {:?}",
            site.state
        );
    }
}

#[tokio::test]
async fn snapshot_totals_match_scenario() {
    let mut fx = fixture("https://a.example/\nhttps://b.example/\n");
    fx.keeper.run_cycle().await;

    fx.factory
        .controller(SITE_A)
        .unwrap()
        .present_selector(VIEWER_SELECTOR);
    fx.factory.controller(SITE_B).unwrap().fail_next_loads(3);
    fx.keeper.run_cycle().await;

    let totals = fx.status.snapshot().totals;
    assert_eq!(totals.total, 2);
    assert_eq!(totals.healthy, 1, "woken up counts as healthy");
    assert_eq!(totals.errored, 1);
}
