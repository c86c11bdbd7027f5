use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};
use wakefleet::{Keeper, KeeperConfig, SiteRegistry, StatusStore, WakeStrategy};

use crate::cli::parse_wake_selectors;
use crate::driver::CdpDriverFactory;
use crate::launch::LaunchedBrowser;
use crate::server;

pub struct RunOptions {
    pub sites: PathBuf,
    pub listen: SocketAddr,
    pub interval: u64,
    pub timeout: u64,
    pub wake_timeout: u64,
    pub max_attempts: u32,
    pub retry_delay: u64,
    pub wake_selectors: Vec<String>,
    pub factory: CdpDriverFactory,
    pub browser: Option<LaunchedBrowser>,
}

pub async fn execute(opts: RunOptions) -> Result<()> {
    let wake_strategies = if opts.wake_selectors.is_empty() {
        WakeStrategy::defaults()
    } else {
        parse_wake_selectors(&opts.wake_selectors)?
    };
    let config = KeeperConfig {
        ping_interval: Duration::from_secs(opts.interval),
        attempt_timeout: Duration::from_secs(opts.timeout),
        wake_timeout: Duration::from_secs(opts.wake_timeout),
        retry_delay: Duration::from_secs(opts.retry_delay),
        max_attempts: opts.max_attempts,
        wake_strategies,
    };
    let status = StatusStore::new();

    // The dashboard comes up before the first cycle, so even a missing
    // sites file at startup leaves a live endpoint reporting the condition.
    let listener = tokio::net::TcpListener::bind(opts.listen)
        .await
        .with_context(|| format!("failed to bind status dashboard to {}", opts.listen))?;
    info!(target = "wakefleet", addr = %opts.listen, "status dashboard listening");
    let app = server::router(status.clone());
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!(target = "wakefleet", error = %err, "status dashboard exited");
        }
    });

    // Keep the launched browser process alive for the whole run.
    let _browser = opts.browser;

    let keeper = Keeper::new(
        config,
        SiteRegistry::new(opts.sites),
        Box::new(opts.factory),
        status,
    );
    keeper.run().await;
    Ok(())
}
