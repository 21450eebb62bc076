//! Named results of a session.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use bench_types::{BenchError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analysis::ErrorMetrics;
use crate::bundle::{self, BundleKind};
use crate::trajectory::Trajectory;

/// One stored result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    /// Recorded run; carries its configuration.
    pub trajectory: Trajectory,
    /// Metrics against the run's ground truth, once analyzed.
    pub metrics: Option<ErrorMetrics>,
}

/// Results keyed by configuration name.
///
/// Iteration follows first insertion order. `put` with an existing name
/// replaces the trajectory in place and drops its stale metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultStore {
    entries: BTreeMap<String, ResultEntry>,
    order: Vec<String>,
}

impl ResultStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a result exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Store a trajectory; returns the one it replaced.
    pub fn put(&mut self, name: impl Into<String>, trajectory: Trajectory) -> Option<Trajectory> {
        let name = name.into();
        let entry = ResultEntry {
            trajectory,
            metrics: None,
        };
        match self.entries.insert(name.clone(), entry) {
            Some(previous) => {
                warn!(name = %name, "overwriting stored result");
                Some(previous.trajectory)
            }
            None => {
                debug!(name = %name, "stored result");
                self.order.push(name);
                None
            }
        }
    }

    /// Trajectory stored under a name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Trajectory> {
        self.entries.get(name).map(|e| &e.trajectory)
    }

    /// Entry stored under a name.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&ResultEntry> {
        self.entries.get(name)
    }

    /// Attach metrics to a stored result.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::InvalidConfig`] if no result has that name.
    pub fn set_metrics(&mut self, name: &str, metrics: ErrorMetrics) -> Result<()> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| BenchError::invalid_config(format!("no stored result named {name}")))?;
        entry.metrics = Some(metrics);
        Ok(())
    }

    /// Metrics of a stored result.
    #[must_use]
    pub fn metrics(&self, name: &str) -> Option<&ErrorMetrics> {
        self.entries.get(name)?.metrics.as_ref()
    }

    /// Names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResultEntry)> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name).map(|e| (name.as_str(), e)))
    }

    /// Save the store to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        bundle::write_bundle_file(path.as_ref(), BundleKind::Results, self)
    }

    /// Save the store to a writer.
    pub fn save_writer<W: Write>(&self, writer: &mut W) -> Result<()> {
        bundle::write_bundle(writer, BundleKind::Results, self)
    }

    /// Save the store to a byte vector.
    pub fn save_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.save_writer(&mut buffer)?;
        Ok(buffer)
    }

    /// Load a store from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let store: Self = bundle::read_bundle_file(path.as_ref(), BundleKind::Results)?;
        store.check_consistency()?;
        Ok(store)
    }

    /// Load a store from a reader.
    pub fn load_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let store: Self = bundle::read_bundle(reader, BundleKind::Results)?;
        store.check_consistency()?;
        Ok(store)
    }

    /// Load a store from bytes.
    pub fn load_bytes(bytes: &[u8]) -> Result<Self> {
        Self::load_reader(&mut &bytes[..])
    }

    fn check_consistency(&self) -> Result<()> {
        let consistent = self.order.len() == self.entries.len()
            && self.order.iter().all(|name| self.entries.contains_key(name));
        if consistent {
            Ok(())
        } else {
            Err(BenchError::Serialization(
                "result bundle index does not match its entries".into(),
            ))
        }
    }
}
