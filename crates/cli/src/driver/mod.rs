//! Concrete page drivers and browser attachment.

mod cdp;

pub use cdp::{CdpDriver, CdpDriverFactory, CdpVersionInfo, probe};

use anyhow::Context;
use tracing::info;

use crate::launch::LaunchedBrowser;

pub const DEFAULT_CDP_ENDPOINT: &str = "http://127.0.0.1:9222";
pub const DEFAULT_DEBUG_PORT: u16 = 9222;

/// Resolves the browser to drive: launch a local one with `--launch`, or
/// attach to `cdp_endpoint` (default local port) otherwise.
///
/// The returned [`LaunchedBrowser`], when present, must be kept alive for
/// as long as the factory is in use.
pub async fn resolve_factory(
    cdp_endpoint: Option<&str>,
    launch: bool,
) -> anyhow::Result<(CdpDriverFactory, Option<LaunchedBrowser>)> {
    if launch {
        let browser = LaunchedBrowser::launch(DEFAULT_DEBUG_PORT).await?;
        let factory = CdpDriverFactory::new(browser.endpoint())?;
        return Ok((factory, Some(browser)));
    }

    let endpoint = cdp_endpoint.unwrap_or(DEFAULT_CDP_ENDPOINT);
    let factory = CdpDriverFactory::new(endpoint)?;
    let version = factory.verify().await.with_context(|| {
        format!(
            "no browser with remote debugging found at {endpoint}; \
             start one with --remote-debugging-port or pass --launch"
        )
    })?;
    info!(
        target = "wakefleet",
        %endpoint,
        browser = version.browser.as_deref().unwrap_or("unknown"),
        "attached to browser"
    );
    Ok((factory, None))
}
