//! Line-oriented site registry, re-read every cycle.
//!
//! The file format is one target URL per line. Blank lines and `#` comments
//! are ignored; duplicate identities collapse to the first occurrence.
//! Membership changes take effect on the next cycle without a restart.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{KeeperError, Result};

pub struct SiteRegistry {
    path: PathBuf,
}

impl SiteRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current target list.
    ///
    /// A missing or unreadable file is the distinguishable
    /// [`KeeperError::RegistryUnavailable`] condition, letting the caller
    /// idle conservatively instead of tearing the fleet down.
    pub fn load(&self) -> Result<Vec<String>> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| {
            KeeperError::RegistryUnavailable {
                path: self.path.clone(),
                source,
            }
        })?;
        let targets = parse_sites(&raw);
        debug!(target = "wakefleet", path = %self.path.display(), count = targets.len(), "registry loaded");
        Ok(targets)
    }
}

/// Parses registry text into an ordered, deduplicated target list.
pub fn parse_sites(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect()
}

/// Pure set comparison between a fresh snapshot and the tracked targets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegistryDiff {
    /// In the snapshot but not tracked yet, in snapshot order.
    pub added: Vec<String>,
    /// Tracked but gone from the snapshot, eligible for teardown.
    pub removed: Vec<String>,
}

pub fn diff(snapshot: &[String], tracked: &[String]) -> RegistryDiff {
    let snap: HashSet<&str> = snapshot.iter().map(String::as_str).collect();
    let have: HashSet<&str> = tracked.iter().map(String::as_str).collect();

    RegistryDiff {
        added: snapshot
            .iter()
            .filter(|t| !have.contains(t.as_str()))
            .cloned()
            .collect(),
        removed: tracked
            .iter()
            .filter(|t| !snap.contains(t.as_str()))
            .cloned()
            .collect(),
    }
}
