//! Store accessor - the boundary between the session and the local database.
//!
//! The session never touches rows directly. Everything it reads or writes
//! goes through [`BookmarkStore`], which a platform binds to its real
//! database. [`MemoryStore`] is the reference implementation used by tests,
//! benchmarks and the replay tool.

use crate::{
    error::Result, roots::SUPER_ROOT_ID, BookmarkRecord, ChildRow, Error, Guid, LocalId, LocalRow,
    Placement, Position, RecordKind, Timestamp,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A special root the store must hold a row for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootSeed<'a> {
    pub guid: &'a str,
    pub title: &'a str,
}

/// Everything the session needs from the local database.
///
/// Implementations must be safe to share with the finalization task, which
/// runs on another thread once the record stream is done.
pub trait BookmarkStore: Send + Sync {
    /// Create any missing special-root rows under the super-root.
    fn ensure_special_roots_exist(&self, roots: &[RootSeed<'_>], now: Timestamp) -> Result<()>;

    /// `(guid, id)` for every live folder row.
    fn scan_folder_guid_id_pairs(&self) -> Result<Vec<(Guid, LocalId)>>;

    /// Live children of a folder with their raw positions, in the store's
    /// natural retrieval order (creation order).
    fn fetch_children(&self, folder_id: LocalId) -> Result<Vec<ChildRow>>;

    /// Assign position `i` to the row named by `ordered[i]`. Returns how many
    /// rows actually changed.
    fn update_positions(&self, ordered: &[Guid]) -> Result<usize>;

    /// Set a folder's modification time, scheduling it for upload.
    fn bump_modified(&self, folder_id: LocalId, timestamp: Timestamp) -> Result<()>;

    /// Move a row. Returns how many rows were affected.
    fn update_parent_and_position(
        &self,
        guid: &str,
        parent_id: LocalId,
        position: Position,
    ) -> Result<usize>;

    /// Look up a row by GUID, deleted or not.
    fn fetch_by_guid(&self, guid: &str) -> Result<Option<LocalRow>>;

    /// Look up a row by local id, deleted or not.
    fn fetch_by_id(&self, id: LocalId) -> Result<Option<LocalRow>>;

    /// Rows modified after `since`, in natural order.
    fn fetch_modified_since(&self, since: Timestamp) -> Result<Vec<LocalRow>>;

    /// Insert or update the row for `record.guid` at `placement`.
    fn upsert(&self, record: &BookmarkRecord, placement: Placement) -> Result<LocalId>;

    /// Tombstone a row. Returns false if there was no live row to delete.
    fn delete(&self, guid: &str, now: Timestamp) -> Result<bool>;

    /// Whether `ancestor` is `node` or lies on the parent chain above it.
    fn is_ancestor(&self, ancestor: LocalId, node: LocalId) -> Result<bool> {
        let mut seen = HashSet::new();
        let mut current = node;
        loop {
            if current == ancestor {
                return Ok(true);
            }
            if current == SUPER_ROOT_ID || !seen.insert(current) {
                return Ok(false);
            }
            match self.fetch_by_id(current)? {
                Some(row) => current = row.parent_id,
                None => return Ok(false),
            }
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Rows {
    /// Keyed by id, so iteration is creation order.
    pub(crate) rows: BTreeMap<LocalId, LocalRow>,
    pub(crate) by_guid: HashMap<Guid, LocalId>,
    pub(crate) next_id: LocalId,
}

impl Default for Rows {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            by_guid: HashMap::new(),
            next_id: SUPER_ROOT_ID + 1,
        }
    }
}

impl Rows {
    fn insert(&mut self, mut row: LocalRow) -> LocalId {
        let id = self.next_id;
        self.next_id += 1;
        row.id = id;
        self.by_guid.insert(row.guid.clone(), id);
        self.rows.insert(id, row);
        id
    }

    fn get(&self, guid: &str) -> Option<&LocalRow> {
        self.by_guid.get(guid).and_then(|id| self.rows.get(id))
    }

    fn get_mut(&mut self, guid: &str) -> Option<&mut LocalRow> {
        let id = *self.by_guid.get(guid)?;
        self.rows.get_mut(&id)
    }
}

/// An in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub(crate) inner: Mutex<Rows>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row as a local client would, ignoring `row.id`.
    pub fn insert_row(&self, row: LocalRow) -> LocalId {
        self.inner.lock().insert(row)
    }

    /// Get a row by GUID, deleted or not.
    pub fn row(&self, guid: &str) -> Option<LocalRow> {
        self.inner.lock().get(guid).cloned()
    }

    /// All rows in creation order.
    pub fn rows(&self) -> Vec<LocalRow> {
        self.inner.lock().rows.values().cloned().collect()
    }

    /// Live children of a folder sorted by raw position, then creation order.
    pub fn child_guids(&self, folder_id: LocalId) -> Vec<Guid> {
        let inner = self.inner.lock();
        let mut children: Vec<&LocalRow> = inner
            .rows
            .values()
            .filter(|r| r.is_active() && r.parent_id == folder_id)
            .collect();
        children.sort_by_key(|r| (r.position, r.id));
        children.into_iter().map(|r| r.guid.clone()).collect()
    }

    /// Number of rows including tombstones.
    pub fn len(&self) -> usize {
        self.inner.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BookmarkStore for MemoryStore {
    fn ensure_special_roots_exist(&self, roots: &[RootSeed<'_>], now: Timestamp) -> Result<()> {
        let mut inner = self.inner.lock();
        for (position, seed) in roots.iter().enumerate() {
            match inner.get_mut(seed.guid) {
                Some(row) if row.kind != RecordKind::Folder => {
                    return Err(Error::Store(format!(
                        "special root {} is stored as a {}",
                        seed.guid, row.kind
                    )));
                }
                Some(row) => {
                    if row.deleted {
                        row.deleted = false;
                        row.parent_id = SUPER_ROOT_ID;
                        row.last_modified = now;
                    }
                }
                None => {
                    let row = LocalRow::folder(seed.guid, SUPER_ROOT_ID, position as Position)
                        .with_title(seed.title)
                        .modified_at(now);
                    inner.insert(row);
                }
            }
        }
        Ok(())
    }

    fn scan_folder_guid_id_pairs(&self) -> Result<Vec<(Guid, LocalId)>> {
        let inner = self.inner.lock();
        Ok(inner
            .rows
            .values()
            .filter(|r| r.is_active() && r.kind == RecordKind::Folder)
            .map(|r| (r.guid.clone(), r.id))
            .collect())
    }

    fn fetch_children(&self, folder_id: LocalId) -> Result<Vec<ChildRow>> {
        let inner = self.inner.lock();
        Ok(inner
            .rows
            .values()
            .filter(|r| r.is_active() && r.parent_id == folder_id)
            .map(|r| ChildRow::new(r.guid.clone(), r.position))
            .collect())
    }

    fn update_positions(&self, ordered: &[Guid]) -> Result<usize> {
        let mut inner = self.inner.lock();
        let mut changed = 0;
        for (position, guid) in ordered.iter().enumerate() {
            if let Some(row) = inner.get_mut(guid) {
                let position = position as Position;
                if row.is_active() && row.position != position {
                    row.position = position;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    fn bump_modified(&self, folder_id: LocalId, timestamp: Timestamp) -> Result<()> {
        let mut inner = self.inner.lock();
        let row = inner
            .rows
            .get_mut(&folder_id)
            .ok_or_else(|| Error::Store(format!("no row with id {}", folder_id)))?;
        row.last_modified = timestamp;
        Ok(())
    }

    fn update_parent_and_position(
        &self,
        guid: &str,
        parent_id: LocalId,
        position: Position,
    ) -> Result<usize> {
        let mut inner = self.inner.lock();
        match inner.get_mut(guid) {
            Some(row) => {
                row.parent_id = parent_id;
                row.position = position;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn fetch_by_guid(&self, guid: &str) -> Result<Option<LocalRow>> {
        Ok(self.inner.lock().get(guid).cloned())
    }

    fn fetch_by_id(&self, id: LocalId) -> Result<Option<LocalRow>> {
        Ok(self.inner.lock().rows.get(&id).cloned())
    }

    fn fetch_modified_since(&self, since: Timestamp) -> Result<Vec<LocalRow>> {
        let inner = self.inner.lock();
        Ok(inner
            .rows
            .values()
            .filter(|r| r.last_modified > since)
            .cloned()
            .collect())
    }

    fn upsert(&self, record: &BookmarkRecord, placement: Placement) -> Result<LocalId> {
        let mut inner = self.inner.lock();
        if let Some(row) = inner.get_mut(&record.guid) {
            row.kind = record.kind;
            row.title = record.title.clone();
            row.uri = record.uri.clone();
            row.description = record.description.clone();
            row.keyword = record.keyword.clone();
            row.tags = record.tags.clone();
            row.parent_id = placement.parent_id;
            row.position = placement.position;
            row.deleted = false;
            row.last_modified = record.last_modified;
            return Ok(row.id);
        }

        let row = LocalRow {
            id: 0,
            guid: record.guid.clone(),
            kind: record.kind,
            title: record.title.clone(),
            uri: record.uri.clone(),
            description: record.description.clone(),
            keyword: record.keyword.clone(),
            tags: record.tags.clone(),
            parent_id: placement.parent_id,
            position: placement.position,
            deleted: false,
            last_modified: record.last_modified,
        };
        Ok(inner.insert(row))
    }

    fn delete(&self, guid: &str, now: Timestamp) -> Result<bool> {
        let mut inner = self.inner.lock();
        match inner.get_mut(guid) {
            Some(row) if row.is_active() => {
                row.deleted = true;
                row.last_modified = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
