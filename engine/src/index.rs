//! Session-scoped GUID ↔ local id index.

use crate::{roots, Guid, LocalId};
use std::collections::HashMap;

/// Bidirectional map between folder GUIDs and local row ids.
///
/// Built once when a session begins and kept current as folders are stored,
/// so records can be parented without asking the store. The mapping stays a
/// bijection: re-registering a GUID or an id drops the stale pairing.
#[derive(Debug, Clone)]
pub struct IdIndex {
    guid_to_id: HashMap<Guid, LocalId>,
    id_to_guid: HashMap<LocalId, Guid>,
}

impl Default for IdIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl IdIndex {
    /// An index holding only the synthetic super-root.
    pub fn new() -> Self {
        let mut index = Self {
            guid_to_id: HashMap::new(),
            id_to_guid: HashMap::new(),
        };
        tracing::debug!("Tracking {} root as id {}", roots::PLACES, roots::SUPER_ROOT_ID);
        index.register(roots::PLACES, roots::SUPER_ROOT_ID);
        index
    }

    /// An index seeded from a folder scan.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Guid, LocalId)>) -> Self {
        let mut index = Self::new();
        for (guid, id) in pairs {
            tracing::debug!(guid = %guid, id, "GUID maps to id");
            index.register(guid, id);
        }
        index
    }

    /// Record that `guid` lives at row `id`.
    pub fn register(&mut self, guid: impl Into<Guid>, id: LocalId) {
        let guid = guid.into();
        if let Some(old_id) = self.guid_to_id.insert(guid.clone(), id) {
            if old_id != id {
                self.id_to_guid.remove(&old_id);
            }
        }
        if let Some(old_guid) = self.id_to_guid.insert(id, guid.clone()) {
            if old_guid != guid {
                self.guid_to_id.remove(&old_guid);
            }
        }
    }

    /// Local id for a GUID.
    ///
    /// A miss is expected while a parent has not synced yet, so it is logged
    /// rather than treated as an error.
    pub fn id_for(&self, guid: &str) -> Option<LocalId> {
        let id = self.guid_to_id.get(guid).copied();
        if id.is_none() {
            tracing::warn!(guid = %guid, "Couldn't find local id for GUID");
        }
        id
    }

    /// GUID for a local id.
    pub fn guid_for(&self, id: LocalId) -> Option<&str> {
        let guid = self.id_to_guid.get(&id).map(String::as_str);
        tracing::trace!(id, guid = ?guid, "Resolved GUID");
        guid
    }

    /// Whether a GUID is known, without logging a miss.
    pub fn contains(&self, guid: &str) -> bool {
        self.guid_to_id.contains_key(guid)
    }

    /// Drop a GUID and its id.
    pub fn forget(&mut self, guid: &str) -> Option<LocalId> {
        let id = self.guid_to_id.remove(guid)?;
        self.id_to_guid.remove(&id);
        Some(id)
    }

    /// Number of tracked folders, the super-root included.
    pub fn len(&self) -> usize {
        self.guid_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guid_to_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_root_is_preloaded() {
        let index = IdIndex::new();
        assert_eq!(index.id_for("places"), Some(0));
        assert_eq!(index.guid_for(0), Some("places"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn seeded_from_scan() {
        let index = IdIndex::from_pairs(vec![("menu".to_string(), 1), ("unfiled".to_string(), 3)]);
        assert_eq!(index.id_for("unfiled"), Some(3));
        assert_eq!(index.guid_for(1), Some("menu"));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn unknown_lookups_are_none() {
        let index = IdIndex::new();
        assert_eq!(index.id_for("folder-1"), None);
        assert_eq!(index.guid_for(42), None);
        assert!(!index.contains("folder-1"));
    }

    #[test]
    fn reregistering_keeps_bijection() {
        let mut index = IdIndex::new();
        index.register("folder-1", 5);
        index.register("folder-1", 9);
        assert_eq!(index.id_for("folder-1"), Some(9));
        assert_eq!(index.guid_for(5), None);

        index.register("folder-2", 9);
        assert_eq!(index.guid_for(9), Some("folder-2"));
        assert!(!index.contains("folder-1"));
    }

    #[test]
    fn forget_removes_both_directions() {
        let mut index = IdIndex::new();
        index.register("folder-1", 5);
        assert_eq!(index.forget("folder-1"), Some(5));
        assert_eq!(index.guid_for(5), None);
        assert_eq!(index.forget("folder-1"), None);
    }
}
