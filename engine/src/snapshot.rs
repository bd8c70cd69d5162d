//! Snapshot types for persisting and restoring a [`MemoryStore`].
//!
//! Snapshots are the bridge between the in-memory store and a file on disk.
//! Rows are keyed by local id in a `BTreeMap` so that serialization is
//! deterministic and restoring reproduces the same retrieval order.

use crate::{error::Result, store::Rows, Error, LocalId, LocalRow, MemoryStore, SUPER_ROOT_ID};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time copy of every store row, tombstones included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Id the store will hand out next
    pub next_id: LocalId,
    /// All rows by local id
    pub rows: BTreeMap<LocalId, LocalRow>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            next_id: SUPER_ROOT_ID + 1,
            rows: BTreeMap::new(),
        }
    }

    /// Count all rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Count live (non-deleted) rows.
    pub fn active_row_count(&self) -> usize {
        self.rows.values().filter(|r| r.is_active()).count()
    }

    /// Check that the snapshot describes a store that could have produced it.
    pub fn validate(&self) -> Result<()> {
        if self.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                self.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        let mut guids = HashMap::new();
        for (id, row) in &self.rows {
            if *id != row.id {
                return Err(Error::InvalidSnapshot(format!(
                    "row {} is keyed under id {}",
                    row.id, id
                )));
            }
            if *id <= SUPER_ROOT_ID || *id >= self.next_id {
                return Err(Error::InvalidSnapshot(format!(
                    "row id {} outside 1..{}",
                    id, self.next_id
                )));
            }
            if let Some(other) = guids.insert(row.guid.as_str(), *id) {
                return Err(Error::InvalidSnapshot(format!(
                    "GUID {} used by rows {} and {}",
                    row.guid, other, id
                )));
            }
        }
        Ok(())
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON with deterministic ordering.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

impl MemoryStore {
    /// Copy every row into a snapshot.
    pub fn export_snapshot(&self) -> StoreSnapshot {
        let inner = self.inner.lock();
        StoreSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            next_id: inner.next_id,
            rows: inner.rows.clone(),
        }
    }

    /// Rebuild a store from a snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        snapshot.validate()?;
        let by_guid = snapshot
            .rows
            .values()
            .map(|row| (row.guid.clone(), row.id))
            .collect();
        Ok(Self {
            inner: Mutex::new(Rows {
                rows: snapshot.rows,
                by_guid,
                next_id: snapshot.next_id,
            }),
        })
    }
}
