//! Timing and policy knobs for the keeper loop.
//!
//! None of these affect the engine's correctness, only its cadence; the
//! sites file itself is re-read every cycle and is not part of this value.

use std::time::Duration;

use crate::driver::WakeStrategy;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct KeeperConfig {
    /// Pause between activity pings. Skipped before the startup cycle.
    pub ping_interval: Duration,
    /// Per-attempt navigation and load-wait timeout.
    pub attempt_timeout: Duration,
    /// Overall window for wake-affordance detection per visit.
    pub wake_timeout: Duration,
    /// Pause between failed load attempts within one cycle.
    pub retry_delay: Duration,
    /// Load attempts per site per cycle before marking it errored.
    pub max_attempts: u32,
    /// Wake-affordance detection strategies, tried in order.
    pub wake_strategies: Vec<WakeStrategy>,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(300),
            attempt_timeout: Duration::from_secs(60),
            wake_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_secs(5),
            max_attempts: 3,
            wake_strategies: WakeStrategy::defaults(),
        }
    }
}

impl KeeperConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            attempt_timeout: self.attempt_timeout,
            retry_delay: self.retry_delay,
        }
    }
}
