//! Tagged in-memory snapshots of engine state.
//!
//! Snapshots are write-once: saving under an existing tag is an error, so the
//! `initial` snapshot taken before loading can never be replaced by a later
//! checkpoint. Every reversal restores from that same snapshot.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExecutionError, LoadTestResult};

use super::SteppingEngine;

/// Name of a saved state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotTag(String);

impl SnapshotTag {
    /// Tag of the pre-loading snapshot.
    pub const INITIAL: &'static str = "initial";

    /// The pre-loading snapshot tag.
    #[must_use]
    pub fn initial() -> Self {
        Self(Self::INITIAL.to_string())
    }

    /// Wrap an arbitrary tag name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Tag name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Write-once store of engine states keyed by tag.
#[derive(Debug, Clone)]
pub struct SnapshotStore<S> {
    saved: HashMap<SnapshotTag, S>,
}

impl<S> Default for SnapshotStore<S> {
    fn default() -> Self {
        Self {
            saved: HashMap::new(),
        }
    }
}

impl<S: Clone> SnapshotStore<S> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture `engine` under `tag`.
    ///
    /// # Errors
    /// `SnapshotExists` if `tag` was already saved.
    pub fn save<E>(&mut self, tag: SnapshotTag, engine: &E) -> LoadTestResult<()>
    where
        E: SteppingEngine<State = S>,
    {
        if self.saved.contains_key(&tag) {
            return Err(ExecutionError::SnapshotExists {
                tag: tag.to_string(),
            }
            .into());
        }
        debug!(tag = %tag, iteration = engine.iteration(), "snapshot saved");
        self.saved.insert(tag, engine.capture());
        Ok(())
    }

    /// Replace `engine` state with the snapshot saved under `tag`.
    ///
    /// # Errors
    /// `SnapshotNotFound` if nothing was saved under `tag`.
    pub fn restore<E>(&self, tag: &SnapshotTag, engine: &mut E) -> LoadTestResult<()>
    where
        E: SteppingEngine<State = S>,
    {
        let state = self.saved.get(tag).ok_or_else(|| ExecutionError::SnapshotNotFound {
            tag: tag.to_string(),
        })?;
        engine.restore(state);
        debug!(tag = %tag, iteration = engine.iteration(), "snapshot restored");
        Ok(())
    }

    /// Borrow a saved state.
    #[must_use]
    pub fn get(&self, tag: &SnapshotTag) -> Option<&S> {
        self.saved.get(tag)
    }

    /// Whether `tag` has been saved.
    #[must_use]
    pub fn contains(&self, tag: &SnapshotTag) -> bool {
        self.saved.contains_key(tag)
    }
}
