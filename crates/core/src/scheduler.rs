//! The keeper loop: reconcile membership, then visit every site in turn.

use tracing::{debug, error, info, warn};

use crate::config::KeeperConfig;
use crate::driver::{DriverFactory, WakeOutcome};
use crate::registry::{self, SiteRegistry};
use crate::retry::{self, LoadOutcome};
use crate::session::{SessionState, SiteSession};
use crate::status::{StatusRecord, StatusStore};

/// Top-level control loop over the tracked fleet.
///
/// Single-task and cooperative: sites are visited one at a time, so the
/// per-attempt timeouts in [`KeeperConfig`] are what keeps one hung target
/// from stalling the rest of a cycle indefinitely. A cycle may overrun the
/// nominal ping interval; the next sleep simply starts later.
pub struct Keeper {
    config: KeeperConfig,
    registry: SiteRegistry,
    factory: Box<dyn DriverFactory>,
    status: StatusStore,
    sessions: Vec<SiteSession>,
}

impl Keeper {
    pub fn new(
        config: KeeperConfig,
        registry: SiteRegistry,
        factory: Box<dyn DriverFactory>,
        status: StatusStore,
    ) -> Self {
        Self {
            config,
            registry,
            factory,
            status,
            sessions: Vec::new(),
        }
    }

    /// Handle to the shared status store this keeper writes to.
    pub fn status(&self) -> StatusStore {
        self.status.clone()
    }

    /// Currently tracked targets, in tracking order.
    pub fn tracked(&self) -> Vec<String> {
        self.sessions
            .iter()
            .map(|s| s.target().to_string())
            .collect()
    }

    /// Lifecycle state of one tracked target.
    pub fn session_state(&self, target: &str) -> Option<SessionState> {
        self.sessions
            .iter()
            .find(|s| s.target() == target)
            .map(SiteSession::state)
    }

    /// Runs until the process is terminated. The startup pass happens
    /// immediately; every later cycle sleeps the ping interval first.
    pub async fn run(mut self) {
        info!(
            target = "wakefleet",
            interval_secs = self.config.ping_interval.as_secs(),
            sites_file = %self.registry.path().display(),
            "starting keeper"
        );
        self.run_cycle().await;
        loop {
            tokio::time::sleep(self.config.ping_interval).await;
            self.run_cycle().await;
        }
    }

    /// One full pass: reconcile the registry, then visit every site.
    pub async fn run_cycle(&mut self) {
        self.reconcile().await;
        for idx in 0..self.sessions.len() {
            visit_session(&mut self.sessions[idx], &self.config, &self.status).await;
        }
    }

    /// Aligns tracked sessions with the latest registry snapshot.
    ///
    /// A registry read failure keeps the current fleet untouched: tearing
    /// down healthy sessions over a transient config glitch is worse than
    /// running one cycle on stale membership.
    pub async fn reconcile(&mut self) {
        let snapshot = match self.registry.load() {
            Ok(snapshot) => {
                self.status.set_registry_error(None);
                snapshot
            }
            Err(err) => {
                warn!(target = "wakefleet", error = %err, "registry unavailable; keeping current fleet");
                self.status.set_registry_error(Some(err.to_string()));
                return;
            }
        };

        let tracked = self.tracked();
        let diff = registry::diff(&snapshot, &tracked);

        for target in &diff.removed {
            if let Some(pos) = self.sessions.iter().position(|s| s.target() == target) {
                let session = self.sessions.remove(pos);
                info!(target = "wakefleet", url = %target, "site removed from registry");
                session.close().await;
                self.status.remove(target);
            }
        }

        for target in &diff.added {
            match self.factory.create(target).await {
                Ok(driver) => {
                    info!(target = "wakefleet", url = %target, "tracking new site");
                    self.status.set(target, StatusRecord::placeholder());
                    self.sessions
                        .push(SiteSession::new(target.clone(), driver));
                }
                Err(err) => {
                    // Neither tracked nor in the store; the next cycle's
                    // diff will see it as an addition again.
                    error!(target = "wakefleet", url = %target, error = %err, "failed to create page driver");
                }
            }
        }
    }
}

/// Visits one site: load it (with bounded retries), clear a hibernation
/// screen if one is showing, inject idle-reset activity, and publish the
/// resulting record.
///
/// Shared by the keeper loop and the one-shot check path.
pub async fn visit_session(
    session: &mut SiteSession,
    config: &KeeperConfig,
    status: &StatusStore,
) {
    let url = session.target().to_string();
    let policy = config.retry_policy();
    debug!(target = "wakefleet", %url, state = %session.state(), "visiting");

    match retry::attempt_load(session, status, &policy).await {
        LoadOutcome::Success => {}
        LoadOutcome::Exhausted => {
            session.mark_error();
            status.set(&url, StatusRecord::now(SessionState::Error, policy.max_attempts));
            error!(
                target = "wakefleet",
                %url,
                attempts = policy.max_attempts,
                "unreachable; giving up until next cycle"
            );
            return;
        }
    }

    let woke = match session
        .driver_mut()
        .wake_if_sleeping(&config.wake_strategies, config.wake_timeout)
        .await
    {
        Ok(WakeOutcome::Activated { strategy }) => {
            info!(target = "wakefleet", %url, %strategy, "woke sleeping site");
            // Let the page settle after the wake click.
            if let Err(err) = session.driver_mut().await_load(config.attempt_timeout).await {
                debug!(target = "wakefleet", %url, error = %err, "post-wake settle wait failed");
            }
            true
        }
        Ok(WakeOutcome::Absent) => false,
        Err(err) => {
            // A detection miss is not an error; the next cycle retries.
            debug!(target = "wakefleet", %url, error = %err, "wake detection failed; assuming running");
            false
        }
    };

    session.driver_mut().send_activity().await;

    if woke {
        session.mark_woken();
    } else {
        session.mark_running();
    }
    status.set(&url, StatusRecord::now(session.state(), session.retries()));
    debug!(target = "wakefleet", %url, state = %session.state(), "ping complete");
}
