//! Concurrent status store: the single source of truth for the dashboard.
//!
//! Exactly one writer role (the scheduler and retry controller, on the
//! keeper's own task) and one reader role (the dashboard). A coarse
//! read-write lock keeps every update visible; stale reads mid-cycle are
//! fine because the dashboard refreshes itself.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde::Serialize;

use crate::session::SessionState;

/// Seconds since the Unix epoch.
pub fn now_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Latest observation for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub state: SessionState,
    /// Wall-clock time of the observation, seconds since epoch.
    pub last_ping: u64,
    pub retries: u32,
}

impl StatusRecord {
    pub fn now(state: SessionState, retries: u32) -> Self {
        Self {
            state,
            last_ping: now_ts(),
            retries,
        }
    }

    /// Well-defined placeholder for a target that was just added and has
    /// not completed its first cycle.
    pub fn placeholder() -> Self {
        Self::now(SessionState::Loading, 0)
    }
}

#[derive(Default)]
struct Inner {
    sites: HashMap<String, StatusRecord>,
    registry_error: Option<String>,
}

/// Cheaply cloneable handle over the shared status map.
#[derive(Clone, Default)]
pub struct StatusStore {
    inner: Arc<RwLock<Inner>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, target: &str, record: StatusRecord) {
        self.inner.write().sites.insert(target.to_string(), record);
    }

    pub fn remove(&self, target: &str) {
        self.inner.write().sites.remove(target);
    }

    pub fn get(&self, target: &str) -> Option<StatusRecord> {
        self.inner.read().sites.get(target).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().sites.is_empty()
    }

    /// Record (or clear) the registry-unavailable condition so the
    /// dashboard can report it.
    pub fn set_registry_error(&self, error: Option<String>) {
        self.inner.write().registry_error = error;
    }

    /// Point-in-time copy of the full fleet status, sorted by target.
    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.inner.read();
        let mut sites: Vec<SiteStatus> = inner
            .sites
            .iter()
            .map(|(target, record)| SiteStatus {
                url: target.clone(),
                state: record.state.to_string(),
                healthy: record.state.is_healthy(),
                last_ping: record.last_ping,
                retries: record.retries,
            })
            .collect();
        sites.sort_by(|a, b| a.url.cmp(&b.url));

        let totals = FleetTotals {
            total: sites.len(),
            healthy: sites.iter().filter(|s| s.healthy).count(),
            errored: inner
                .sites
                .values()
                .filter(|r| r.state.is_errored())
                .count(),
        };

        StatusSnapshot {
            sites,
            totals,
            registry_error: inner.registry_error.clone(),
        }
    }
}

/// One dashboard row.
#[derive(Debug, Clone, Serialize)]
pub struct SiteStatus {
    pub url: String,
    pub state: String,
    pub healthy: bool,
    pub last_ping: u64,
    pub retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FleetTotals {
    pub total: usize,
    pub healthy: usize,
    pub errored: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub sites: Vec<SiteStatus>,
    pub totals: FleetTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_error: Option<String>,
}
