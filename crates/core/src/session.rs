//! Per-target session: one page handle, one lifecycle state.

use std::fmt;

use crate::driver::PageDriver;

/// Lifecycle state of a tracked site.
///
/// Level-triggered: every scheduled cycle re-derives the state from a fresh
/// load, so nothing here is terminal across the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created but never successfully loaded.
    Loading,
    /// Last load succeeded with no wake affordance present.
    Running,
    /// Last load found a hibernating app and activated its wake affordance.
    WokenUp,
    /// Mid-cycle: load attempt `n` failed, further attempts remain.
    Retrying(u32),
    /// All attempts exhausted this cycle; re-attempted next cycle.
    Error,
}

impl SessionState {
    /// Running and WokenUp both count as healthy for fleet totals.
    pub fn is_healthy(self) -> bool {
        matches!(self, Self::Running | Self::WokenUp)
    }

    pub fn is_errored(self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::Running => write!(f, "running"),
            Self::WokenUp => write!(f, "woken up"),
            Self::Retrying(attempt) => write!(f, "retrying ({attempt})"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Binds one target URL to one exclusively-owned page driver.
///
/// At most one session exists per target; the scheduler owns the collection
/// and tears a session down only when its target leaves the registry.
pub struct SiteSession {
    target: String,
    driver: Box<dyn PageDriver>,
    state: SessionState,
    retries: u32,
}

impl SiteSession {
    pub fn new(target: String, driver: Box<dyn PageDriver>) -> Self {
        Self {
            target,
            driver,
            state: SessionState::Loading,
            retries: 0,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Attempts since the last successful load this cycle.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn driver_mut(&mut self) -> &mut dyn PageDriver {
        self.driver.as_mut()
    }

    pub fn mark_running(&mut self) {
        self.state = SessionState::Running;
        self.retries = 0;
    }

    pub fn mark_woken(&mut self) {
        self.state = SessionState::WokenUp;
        self.retries = 0;
    }

    pub fn mark_retrying(&mut self, attempt: u32) {
        self.state = SessionState::Retrying(attempt);
        self.retries = attempt;
    }

    pub fn mark_error(&mut self) {
        self.state = SessionState::Error;
    }

    /// Releases the page handle. Consumes the session: a closed driver is
    /// never reused.
    pub async fn close(mut self) {
        self.driver.close().await;
    }
}
