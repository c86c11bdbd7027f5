use std::time::Duration;

use anyhow::{Result, bail};
use tracing::info;
use wakefleet::driver::DriverFactory;
use wakefleet::{KeeperConfig, SessionState, SiteSession, StatusStore, scheduler};

use crate::driver::CdpDriverFactory;

/// One-shot visit of a single target through the same path the loop uses.
pub async fn execute(
    url: &str,
    timeout_secs: u64,
    wake_timeout_secs: u64,
    factory: CdpDriverFactory,
) -> Result<()> {
    info!(target = "wakefleet", %url, "checking site");

    let config = KeeperConfig {
        attempt_timeout: Duration::from_secs(timeout_secs),
        wake_timeout: Duration::from_secs(wake_timeout_secs),
        max_attempts: 1,
        retry_delay: Duration::ZERO,
        ..KeeperConfig::default()
    };
    let status = StatusStore::new();

    let driver = factory.create(url).await?;
    let mut session = SiteSession::new(url.to_string(), driver);
    scheduler::visit_session(&mut session, &config, &status).await;

    let state = session.state();
    println!("{url}: {state}");
    session.close().await;

    if state == SessionState::Error {
        bail!("site unreachable");
    }
    Ok(())
}
