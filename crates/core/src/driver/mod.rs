//! The abstract page-driving capability the engine schedules against.
//!
//! A [`PageDriver`] wraps one long-lived browser page (or an equivalent
//! rendering handle) for one target. Every driver is created by a
//! [`DriverFactory`] when its target first appears in the registry and is
//! exclusively owned by that target's session until the target is removed.

pub mod fake;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// One named wake-detection strategy: a CSS selector that identifies the
/// affordance a hibernating app shows to offer a restart.
///
/// Strategies are tried in list order and the first match wins. Upstream UI
/// changes are expected to break individual selectors, so the set is
/// configuration, not a constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeStrategy {
    pub name: String,
    pub selector: String,
}

impl WakeStrategy {
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
        }
    }

    /// The stock strategy list: the stable test-id selector first, the
    /// owner-view variant second.
    pub fn defaults() -> Vec<WakeStrategy> {
        vec![
            WakeStrategy::new("viewer-badge", r#"button[data-testid="wakeup-button-viewer"]"#),
            WakeStrategy::new("owner-badge", r#"button[data-testid="wakeup-button-owner"]"#),
        ]
    }
}

/// Result of one wake-detection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeOutcome {
    /// An affordance matched and was clicked; `strategy` names the winner.
    Activated { strategy: String },
    /// Nothing matched within the window; the app is assumed running.
    Absent,
}

/// Capability to load a target and poke at its page.
///
/// All methods take `&mut self`: a driver handle is never shared and never
/// services two operations concurrently.
#[async_trait]
pub trait PageDriver: Send {
    /// Navigate the page to `url` from scratch.
    async fn open(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Reload whatever the page currently shows.
    async fn reload(&mut self, timeout: Duration) -> Result<()>;

    /// Wait until the page reports its load condition, up to `timeout`.
    async fn await_load(&mut self, timeout: Duration) -> Result<()>;

    /// Try each strategy in order within the overall `timeout` window and
    /// activate the first affordance found.
    async fn wake_if_sleeping(
        &mut self,
        strategies: &[WakeStrategy],
        timeout: Duration,
    ) -> Result<WakeOutcome>;

    /// Inject a little synthetic activity to reset the target's idle timer.
    /// Best-effort: failures never surface to the caller.
    async fn send_activity(&mut self);

    /// Release the underlying page handle. Best-effort teardown.
    async fn close(&mut self);
}

/// Creates one [`PageDriver`] per target at first sight of it.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn create(&self, target: &str) -> Result<Box<dyn PageDriver>>;
}
