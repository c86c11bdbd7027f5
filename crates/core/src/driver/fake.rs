//! Fake page driver for unit testing the engine without browsers.
//!
//! A [`FakeDriver`] shares its state with a [`FakeDriverController`], so a
//! test can queue load failures, mark wake selectors present, and inspect
//! the exact call sequence afterwards:
//!
//! ```ignore
//! let (mut driver, controller) = FakeDriverBuilder::new()
//!     .fail_next_loads(2)
//!     .build();
//!
//! // ... hand the driver to a session, run a cycle ...
//!
//! assert_eq!(controller.load_attempts(), 3);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{DriverFactory, PageDriver, WakeOutcome, WakeStrategy};
use crate::error::{KeeperError, Result};

/// One recorded driver invocation, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Open(String),
    Reload,
    AwaitLoad,
    Wake(Vec<String>),
    Activity,
    Close,
}

#[derive(Default)]
struct FakeState {
    load_failures: VecDeque<String>,
    present_selectors: Vec<String>,
    calls: Vec<DriverCall>,
    activated: Vec<String>,
    closed: bool,
}

/// Builder for a scripted fake driver.
#[derive(Default)]
pub struct FakeDriverBuilder {
    state: FakeState,
}

impl FakeDriverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `n` consecutive navigation failures; later loads succeed.
    pub fn fail_next_loads(mut self, n: usize) -> Self {
        for _ in 0..n {
            self.state.load_failures.push_back("connection refused".to_string());
        }
        self
    }

    /// Mark a wake-affordance selector as present on the page.
    pub fn present_selector(mut self, selector: impl Into<String>) -> Self {
        self.state.present_selectors.push(selector.into());
        self
    }

    pub fn build(self) -> (FakeDriver, FakeDriverController) {
        let state = Arc::new(Mutex::new(self.state));
        (
            FakeDriver {
                state: Arc::clone(&state),
            },
            FakeDriverController { state },
        )
    }
}

/// In-memory [`PageDriver`] following the scripted state.
pub struct FakeDriver {
    state: Arc<Mutex<FakeState>>,
}

/// Shared handle for scripting a [`FakeDriver`] mid-test and inspecting it.
#[derive(Clone)]
pub struct FakeDriverController {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDriverController {
    pub fn fail_next_loads(&self, n: usize) {
        let mut state = self.state.lock();
        for _ in 0..n {
            state.load_failures.push_back("connection refused".to_string());
        }
    }

    pub fn present_selector(&self, selector: impl Into<String>) {
        self.state.lock().present_selectors.push(selector.into());
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.lock().calls.clone()
    }

    /// Names of the strategies this driver activated, in order.
    pub fn activated(&self) -> Vec<String> {
        self.state.lock().activated.clone()
    }

    /// Number of navigation attempts (`open` or `reload`) seen so far.
    pub fn load_attempts(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, DriverCall::Open(_) | DriverCall::Reload))
            .count()
    }

    pub fn closed(&self) -> bool {
        self.state.lock().closed
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn open(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(DriverCall::Open(url.to_string()));
        match state.load_failures.pop_front() {
            Some(message) => Err(KeeperError::Navigation {
                url: url.to_string(),
                message,
            }),
            None => Ok(()),
        }
    }

    async fn reload(&mut self, _timeout: Duration) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(DriverCall::Reload);
        match state.load_failures.pop_front() {
            Some(message) => Err(KeeperError::Driver(message)),
            None => Ok(()),
        }
    }

    async fn await_load(&mut self, _timeout: Duration) -> Result<()> {
        self.state.lock().calls.push(DriverCall::AwaitLoad);
        Ok(())
    }

    async fn wake_if_sleeping(
        &mut self,
        strategies: &[WakeStrategy],
        _timeout: Duration,
    ) -> Result<WakeOutcome> {
        let mut state = self.state.lock();
        let names = strategies.iter().map(|s| s.name.clone()).collect();
        state.calls.push(DriverCall::Wake(names));
        for strategy in strategies {
            if let Some(pos) = state
                .present_selectors
                .iter()
                .position(|sel| sel == &strategy.selector)
            {
                // The wake click clears the affordance.
                state.present_selectors.remove(pos);
                state.activated.push(strategy.name.clone());
                return Ok(WakeOutcome::Activated {
                    strategy: strategy.name.clone(),
                });
            }
        }
        Ok(WakeOutcome::Absent)
    }

    async fn send_activity(&mut self) {
        self.state.lock().calls.push(DriverCall::Activity);
    }

    async fn close(&mut self) {
        let mut state = self.state.lock();
        state.calls.push(DriverCall::Close);
        state.closed = true;
    }
}

#[derive(Default, Clone)]
pub struct FakeScript {
    pub fail_loads: usize,
    pub present_selectors: Vec<String>,
}

#[derive(Default)]
struct FactoryInner {
    scripts: HashMap<String, FakeScript>,
    controllers: HashMap<String, FakeDriverController>,
    created: Vec<String>,
    fail_create: bool,
}

/// Factory producing one scripted [`FakeDriver`] per target.
///
/// Cloning shares the underlying state, so a test can keep a handle while
/// the scheduler owns the boxed factory.
#[derive(Clone, Default)]
pub struct FakeDriverFactory {
    inner: Arc<Mutex<FactoryInner>>,
}

impl FakeDriverFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the driver that will be created for `target`.
    pub fn script(&self, target: &str, script: FakeScript) {
        self.inner.lock().scripts.insert(target.to_string(), script);
    }

    /// Make every subsequent `create` call fail.
    pub fn fail_create(&self, fail: bool) {
        self.inner.lock().fail_create = fail;
    }

    /// Controller for the driver created for `target`, if any.
    pub fn controller(&self, target: &str) -> Option<FakeDriverController> {
        self.inner.lock().controllers.get(target).cloned()
    }

    /// Targets drivers were created for, in creation order.
    pub fn created(&self) -> Vec<String> {
        self.inner.lock().created.clone()
    }
}

#[async_trait]
impl DriverFactory for FakeDriverFactory {
    async fn create(&self, target: &str) -> Result<Box<dyn PageDriver>> {
        let mut inner = self.inner.lock();
        if inner.fail_create {
            return Err(KeeperError::Driver("factory offline".to_string()));
        }
        let script = inner.scripts.get(target).cloned().unwrap_or_default();
        let mut builder = FakeDriverBuilder::new().fail_next_loads(script.fail_loads);
        for selector in script.present_selectors {
            builder = builder.present_selector(selector);
        }
        let (driver, controller) = builder.build();
        inner.created.push(target.to_string());
        inner.controllers.insert(target.to_string(), controller);
        Ok(Box::new(driver))
    }
}
