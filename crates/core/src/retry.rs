//! Bounded load retries for one target within one cycle.
//!
//! Retries are capped per cycle so a single dead site cannot starve the
//! rest of the fleet: the worst case per failing target is
//! `max_attempts * (attempt_timeout + retry_delay)`.

use std::time::Duration;

use tracing::warn;

use crate::session::{SessionState, SiteSession};
use crate::status::{StatusRecord, StatusStore};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub retry_delay: Duration,
}

/// Tagged result of a bounded retry run. Exhaustion is a value, not an
/// error: the caller decides what to do with a target that stayed down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Success,
    Exhausted,
}

/// Runs up to `policy.max_attempts` load attempts for the session's target.
///
/// A session that loaded successfully last cycle gets a reload first;
/// anything else (including later attempts) navigates from scratch. Each
/// failed attempt publishes a transient `Retrying(n)` record and sleeps
/// `retry_delay`, except after the final attempt. On [`LoadOutcome::Exhausted`]
/// the session is left in `Retrying(max_attempts)`; transitioning it to
/// `Error` is the caller's decision.
pub async fn attempt_load(
    session: &mut SiteSession,
    status: &StatusStore,
    policy: &RetryPolicy,
) -> LoadOutcome {
    let url = session.target().to_string();
    let reload_first = matches!(
        session.state(),
        SessionState::Running | SessionState::WokenUp
    );

    for attempt in 1..=policy.max_attempts {
        let result = if attempt == 1 && reload_first {
            reload_and_wait(session, policy.attempt_timeout).await
        } else {
            open_and_wait(session, &url, policy.attempt_timeout).await
        };

        match result {
            Ok(()) => return LoadOutcome::Success,
            Err(err) => {
                warn!(
                    target = "wakefleet",
                    %url,
                    attempt,
                    max = policy.max_attempts,
                    error = %err,
                    "load attempt failed"
                );
                session.mark_retrying(attempt);
                status.set(&url, StatusRecord::now(SessionState::Retrying(attempt), attempt));
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.retry_delay).await;
                }
            }
        }
    }

    LoadOutcome::Exhausted
}

async fn reload_and_wait(session: &mut SiteSession, timeout: Duration) -> crate::Result<()> {
    session.driver_mut().reload(timeout).await?;
    session.driver_mut().await_load(timeout).await
}

async fn open_and_wait(session: &mut SiteSession, url: &str, timeout: Duration) -> crate::Result<()> {
    session.driver_mut().open(url, timeout).await?;
    session.driver_mut().await_load(timeout).await
}
