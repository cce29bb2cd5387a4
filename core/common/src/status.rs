//! Per-particle status aggregation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Status code the particle store returns on success.
pub const STATUS_OK: u16 = 200;

/// Status codes keyed by particle identifier.
///
/// Every particle operation of a batch leaves exactly one entry here, so a
/// caller always sees the complete outcome, including partial failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMap(BTreeMap<Uuid, u16>);

impl StatusMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the status for a particle, replacing any earlier entry.
    pub fn insert(&mut self, id: Uuid, status: u16) {
        self.0.insert(id, status);
    }

    /// Status recorded for a particle.
    pub fn get(&self, id: &Uuid) -> Option<u16> {
        self.0.get(id).copied()
    }

    /// Fold another map into this one.
    pub fn merge(&mut self, other: StatusMap) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every recorded status is the success code.
    ///
    /// An empty map counts as success.
    pub fn all_ok(&self) -> bool {
        self.0.values().all(|s| *s == STATUS_OK)
    }

    /// Entries whose status is not the success code.
    pub fn failures(&self) -> impl Iterator<Item = (&Uuid, &u16)> {
        self.0.iter().filter(|(_, s)| **s != STATUS_OK)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &u16)> {
        self.0.iter()
    }

    /// Escalate a map with failures into `Error::PartialFailure`.
    pub fn into_result(self) -> Result<Self> {
        if self.all_ok() {
            Ok(self)
        } else {
            Err(Error::PartialFailure(self))
        }
    }
}

impl FromIterator<(Uuid, u16)> for StatusMap {
    fn from_iter<I: IntoIterator<Item = (Uuid, u16)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for StatusMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, status) in &self.0 {
            writeln!(f, " {} {}", id, status)?;
        }
        Ok(())
    }
}
