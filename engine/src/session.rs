//! The sync session state machine.
//!
//! ```text
//! Begin ──begin()──> Processing ──store_done()──> Finalizing ──(task)──> Finished
//!   │                  │  ▲
//!   │ (setup fails)    └──┘ process(record)
//!   └── stays in Begin
//! ```
//!
//! A session owns all of its bookkeeping: the identifier index, the orphan
//! queues and the remote child orders seen so far. None of it outlives the
//! session, so an abandoned session leaves nothing behind but the store, and
//! the next [`Session::begin`] rebuilds everything from there.

use crate::{
    error::Result,
    finalize::Finalization,
    reconcile::{reconcile_records, validate_record},
    reparent_orphans, resolve_child_order, roots, BookmarkRecord, BookmarkStore, Clock, Error,
    FieldReconciler, FinalizeHandle, Guid, IdIndex, LastWriteWins, LocalId, LocalRow,
    OrphanTracker, Placement, Position, Rejection, RemoteRecord, RootSeed, SessionConfig,
    SystemClock, Timestamp, UNORDERED_POSITION,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lifecycle states of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Begin,
    Processing,
    Finalizing,
    Finished,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Begin => "begin",
            SessionState::Processing => "processing",
            SessionState::Finalizing => "finalizing",
            SessionState::Finished => "finished",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What [`Session::process`] did with a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The record was written to the store.
    Stored {
        guid: Guid,
        local_id: LocalId,
        parent_id: LocalId,
        /// Parked in the fallback folder until its parent arrives.
        orphaned: bool,
        /// Waiting children moved into this folder.
        reparented: usize,
    },
    /// A tombstone was applied.
    Deleted {
        guid: Guid,
        /// Whether a live local row was deleted.
        existed: bool,
        /// Children of a deleted folder moved to the fallback folder.
        relocated: usize,
    },
    /// The record was dropped without touching the store.
    Skipped(Rejection),
}

/// One sync session against a local store.
///
/// Calls to [`Session::process`] must be serialized by the caller; only
/// finalization runs off the calling thread.
pub struct Session<S: BookmarkStore + ?Sized + 'static> {
    store: Arc<S>,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    fields: Arc<dyn FieldReconciler>,
    state: Arc<Mutex<SessionState>>,
    index: IdIndex,
    orphans: OrphanTracker,
    /// Remote children arrays, keyed by folder GUID.
    child_orders: BTreeMap<Guid, Vec<Guid>>,
}

impl<S: BookmarkStore + ?Sized + 'static> Session<S> {
    /// Create a session using the system clock and last-write-wins field
    /// reconciliation.
    pub fn new(store: Arc<S>, config: SessionConfig) -> Self {
        Self {
            store,
            config,
            clock: Arc::new(SystemClock),
            fields: Arc::new(LastWriteWins),
            state: Arc::new(Mutex::new(SessionState::Begin)),
            index: IdIndex::new(),
            orphans: OrphanTracker::new(),
            child_orders: BTreeMap::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_field_reconciler(mut self, fields: Arc<dyn FieldReconciler>) -> Self {
        self.fields = fields;
        self
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn index(&self) -> &IdIndex {
        &self.index
    }

    pub fn orphans(&self) -> &OrphanTracker {
        &self.orphans
    }

    /// Children still parked in the fallback folder. Diagnostic only.
    pub fn pending_orphan_count(&self) -> usize {
        self.orphans.pending_count()
    }

    /// The remote children array recorded for a folder.
    pub fn child_order(&self, folder: &str) -> Option<&[Guid]> {
        self.child_orders.get(folder).map(Vec::as_slice)
    }

    /// Every remote children array recorded so far.
    pub fn child_orders(&self) -> &BTreeMap<Guid, Vec<Guid>> {
        &self.child_orders
    }

    fn expect_state(&self, expected: SessionState) -> Result<()> {
        let actual = self.state();
        if actual != expected {
            return Err(Error::InvalidState { expected, actual });
        }
        Ok(())
    }

    /// Make sure the special roots exist and build the identifier index.
    ///
    /// On failure the session stays in [`SessionState::Begin`] and no record
    /// can be processed.
    pub fn begin(&mut self) -> Result<()> {
        self.expect_state(SessionState::Begin)?;
        match self.build_index() {
            Ok(index) => {
                tracing::info!(folders = index.len(), "Session began");
                self.index = index;
                self.orphans = OrphanTracker::new();
                self.child_orders.clear();
                *self.state.lock() = SessionState::Processing;
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Couldn't set up special roots; aborting session");
                Err(Error::BeginFailed(e.to_string()))
            }
        }
    }

    fn build_index(&self) -> Result<IdIndex> {
        let seeds: Vec<RootSeed<'_>> = roots::persisted_roots()
            .map(|root| RootSeed {
                guid: root.guid,
                title: self.config.title_for(root.guid).unwrap_or(root.default_title),
            })
            .collect();
        self.store
            .ensure_special_roots_exist(&seeds, self.clock.now())?;

        let index = IdIndex::from_pairs(self.store.scan_folder_guid_id_pairs()?);
        if let Some(missing) = roots::persisted_roots().find(|root| !index.contains(root.guid)) {
            return Err(Error::Store(format!(
                "special root {} missing after setup",
                missing.guid
            )));
        }
        Ok(index)
    }

    /// Apply one incoming record.
    ///
    /// Records may arrive in any order. Invalid records are skipped, not
    /// errors; an `Err` means the store failed.
    pub fn process(&mut self, record: RemoteRecord) -> Result<ProcessOutcome> {
        self.expect_state(SessionState::Processing)?;

        let local = match record.guid.as_deref() {
            Some(guid) if !guid.is_empty() => self.store.fetch_by_guid(guid)?,
            _ => None,
        };
        let record = match validate_record(record, local.as_ref().map(|row| row.kind)) {
            Ok(record) => record,
            Err(rejection) => {
                tracing::info!(reason = %rejection, "Skipping record");
                return Ok(ProcessOutcome::Skipped(rejection));
            }
        };

        if let Some(parent) = self.orphans.forget(&record.guid) {
            tracing::debug!(guid = %record.guid, parent = %parent, "Record seen again; dropping old orphan entry");
        }

        if record.deleted {
            return self.apply_deletion(record, local);
        }
        let local = local.filter(LocalRow::is_active);
        self.apply_record(record, local)
    }

    fn apply_deletion(
        &mut self,
        record: BookmarkRecord,
        local: Option<LocalRow>,
    ) -> Result<ProcessOutcome> {
        let guid = record.guid;
        if roots::is_special(&guid) {
            tracing::warn!(guid = %guid, "Ignoring deletion of special root");
            return Ok(ProcessOutcome::Skipped(Rejection::ProtectedRoot { guid }));
        }

        let mut relocated = 0;
        if let Some(folder) = local.filter(|row| row.is_active() && row.kind.is_folder()) {
            relocated = self.evacuate_folder(&folder)?;
        }
        self.index.forget(&guid);
        self.child_orders.remove(&guid);

        let existed = self.store.delete(&guid, self.clock.now())?;
        tracing::debug!(guid = %guid, existed, relocated, "Applied deletion");
        Ok(ProcessOutcome::Deleted {
            guid,
            existed,
            relocated,
        })
    }

    /// Move a folder's live children into the fallback folder. Used when the
    /// folder is deleted or turns into a bookmark.
    fn evacuate_folder(&self, folder: &LocalRow) -> Result<usize> {
        let fallback = self.fallback_id()?;
        let children = self.store.fetch_children(folder.id)?;
        for child in &children {
            self.store
                .update_parent_and_position(&child.guid, fallback, UNORDERED_POSITION)?;
        }
        if !children.is_empty() {
            tracing::info!(
                folder = %folder.guid,
                count = children.len(),
                "Moved children of removed folder to {}",
                roots::FALLBACK_FOLDER
            );
        }
        Ok(children.len())
    }

    fn apply_record(
        &mut self,
        record: BookmarkRecord,
        local: Option<LocalRow>,
    ) -> Result<ProcessOutcome> {
        let record = match &local {
            Some(row) => {
                let parent = self.index.guid_for(row.parent_id).map(str::to_string);
                let local_record = BookmarkRecord::from_row(row, parent);
                reconcile_records(&record, &local_record, self.fields.as_ref())
            }
            None => record,
        };

        if self.config.log_personal_info {
            tracing::debug!(
                guid = %record.guid,
                kind = %record.kind,
                title = ?record.title,
                uri = ?record.uri,
                "Storing record"
            );
        } else {
            tracing::debug!(guid = %record.guid, kind = %record.kind, "Storing record");
        }

        let (placement, orphaned) = self.place(&record, local.as_ref())?;
        if let Some(folder) = local.as_ref().filter(|row| row.kind.is_folder()) {
            if !record.kind.is_folder() {
                self.evacuate_folder(folder)?;
            }
        }
        let local_id = self.store.upsert(&record, placement)?;

        let guid = record.guid;
        let mut reparented = 0;
        if record.kind.is_folder() {
            self.index.register(guid.clone(), local_id);
            self.child_orders.insert(guid.clone(), record.children.clone());
            reparented = reparent_orphans(
                &*self.store,
                &mut self.orphans,
                &guid,
                local_id,
                &record.children,
            )?;
        } else if self.index.contains(&guid) {
            // Was a folder locally.
            self.index.forget(&guid);
            self.child_orders.remove(&guid);
        }

        Ok(ProcessOutcome::Stored {
            guid,
            local_id,
            parent_id: placement.parent_id,
            orphaned,
            reparented,
        })
    }

    /// Decide where a record goes. Returns the placement and whether the
    /// record was queued as an orphan.
    fn place(
        &mut self,
        record: &BookmarkRecord,
        local: Option<&LocalRow>,
    ) -> Result<(Placement, bool)> {
        let guid = record.guid.as_str();

        if let Some(parent) = roots::special_parent(guid) {
            let parent_id = self
                .index
                .id_for(parent)
                .ok_or_else(|| Error::FolderNotIndexed(parent.to_string()))?;
            let position = local.map_or(UNORDERED_POSITION, |row| row.position);
            return Ok((Placement { parent_id, position }, false));
        }

        let parent_guid = match record.parent_guid.as_deref().filter(|p| !p.is_empty()) {
            Some(parent) if parent == guid || roots::is_forbidden(parent) => {
                tracing::warn!(guid = %guid, parent = %parent, "Invalid parent; using fallback folder");
                return Ok((self.fallback_placement()?, false));
            }
            Some(parent) => parent,
            None => {
                if let Some(row) = local {
                    return Ok((
                        Placement {
                            parent_id: row.parent_id,
                            position: row.position,
                        },
                        false,
                    ));
                }
                tracing::warn!(guid = %guid, "No parent; using fallback folder");
                return Ok((self.fallback_placement()?, false));
            }
        };

        let Some(parent_id) = self.index.id_for(parent_guid) else {
            tracing::debug!(guid = %guid, parent = %parent_guid, "Parent not seen yet; deferring");
            self.orphans.defer(guid, parent_guid);
            return Ok((self.fallback_placement()?, true));
        };

        if let Some(row) = local.filter(|row| row.kind.is_folder()) {
            if self.store.is_ancestor(row.id, parent_id)? {
                tracing::warn!(guid = %guid, parent = %parent_guid, "Refusing to create a cycle; using fallback folder");
                return Ok((self.fallback_placement()?, false));
            }
        }

        let position = self
            .declared_position(parent_guid, guid)
            .or(record.position)
            .or_else(|| local.filter(|row| row.parent_id == parent_id).map(|row| row.position))
            .unwrap_or(UNORDERED_POSITION);
        Ok((Placement { parent_id, position }, false))
    }

    /// Index of `child` in the children array recorded for `folder`.
    fn declared_position(&self, folder: &str, child: &str) -> Option<Position> {
        self.child_orders
            .get(folder)?
            .iter()
            .position(|c| c == child)
            .map(|p| p as Position)
    }

    fn fallback_id(&self) -> Result<LocalId> {
        self.index
            .id_for(roots::FALLBACK_FOLDER)
            .ok_or_else(|| Error::FolderNotIndexed(roots::FALLBACK_FOLDER.to_string()))
    }

    fn fallback_placement(&self) -> Result<Placement> {
        Ok(Placement {
            parent_id: self.fallback_id()?,
            position: UNORDERED_POSITION,
        })
    }

    /// Signal that every record has been processed and finalize child orders
    /// on the tokio blocking pool.
    ///
    /// Must be called from within a tokio runtime. The store is not final for
    /// this session until the returned handle resolves.
    pub fn store_done(&mut self) -> Result<FinalizeHandle> {
        self.expect_state(SessionState::Processing)?;
        let pending = self.orphans.pending_count();
        tracing::debug!(
            folders = self.child_orders.len(),
            pending,
            "Store done; finalizing"
        );

        let finalization = Finalization {
            store: Arc::clone(&self.store),
            index: self.index.clone(),
            child_orders: self.child_orders.clone(),
            pending_orphans: pending,
            clock: Arc::clone(&self.clock),
            state: Arc::clone(&self.state),
        };
        let handle = FinalizeHandle::spawn(finalization)?;

        let mut state = self.state.lock();
        if *state == SessionState::Processing {
            *state = SessionState::Finalizing;
        }
        Ok(handle)
    }

    /// Build the outgoing record for one local row.
    ///
    /// Returns `None` for forbidden or unknown GUIDs.
    pub fn fetch(&self, guid: &str) -> Result<Option<BookmarkRecord>> {
        self.expect_state(SessionState::Processing)?;
        if roots::is_forbidden(guid) {
            return Ok(None);
        }
        match self.store.fetch_by_guid(guid)? {
            Some(row) => self.retrieve_record(&row),
            None => Ok(None),
        }
    }

    /// Build outgoing records for every row modified after `since`,
    /// tombstones included.
    pub fn fetch_since(&self, since: Timestamp) -> Result<Vec<BookmarkRecord>> {
        self.expect_state(SessionState::Processing)?;
        let mut records = Vec::new();
        for row in self.store.fetch_modified_since(since)? {
            if roots::is_forbidden(&row.guid) {
                continue;
            }
            if let Some(record) = self.retrieve_record(&row)? {
                records.push(record);
            }
        }
        tracing::debug!(since, count = records.len(), "Fetched modified records");
        Ok(records)
    }

    fn retrieve_record(&self, row: &LocalRow) -> Result<Option<BookmarkRecord>> {
        if row.deleted {
            return Ok(Some(BookmarkRecord::from_row(row, None)));
        }

        let known_parent = match roots::special_parent(&row.guid) {
            Some(parent) => Some(parent.to_string()),
            None => self.index.guid_for(row.parent_id).map(str::to_string),
        };
        let (parent_guid, parent_id) = match known_parent {
            Some(parent) => (parent, row.parent_id),
            None => {
                let lost = roots::LOST_AND_FOUND_FOLDER;
                let lost_id = self
                    .index
                    .id_for(lost)
                    .ok_or_else(|| Error::FolderNotIndexed(lost.to_string()))?;
                tracing::warn!(
                    guid = %row.guid,
                    parent_id = row.parent_id,
                    "Parent not known; moving record to {}",
                    lost
                );
                self.store
                    .update_parent_and_position(&row.guid, lost_id, row.position)?;
                (lost.to_string(), lost_id)
            }
        };

        let mut record = BookmarkRecord::from_row(row, Some(parent_guid.clone()));
        if record.kind.is_folder() {
            record.children =
                resolve_child_order(&*self.store, row.id, true, self.clock.as_ref())?.children;
        }

        let parent_name = match self.config.title_for(&parent_guid) {
            Some(title) => Some(title.to_string()),
            None => {
                self.store
                    .fetch_by_id(parent_id)?
                    .ok_or_else(|| Error::ParentNotFound(parent_guid.clone()))?
                    .title
            }
        };

        Ok(roots::compute_parent_fields(
            record,
            Some(parent_guid.as_str()),
            parent_name.as_deref(),
            &self.config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ManualClock, MemoryStore, RecordKind, SUPER_ROOT_ID};

    fn started() -> (Arc<MemoryStore>, Session<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut session = Session::new(store.clone(), SessionConfig::default())
            .with_clock(Arc::new(ManualClock::new(1000)));
        session.begin().unwrap();
        (store, session)
    }

    fn id_of(store: &MemoryStore, guid: &str) -> LocalId {
        store.row(guid).unwrap().id
    }

    #[test]
    fn state_display() {
        assert_eq!(SessionState::Finalizing.to_string(), "finalizing");
        assert_eq!(
            serde_json::to_string(&SessionState::Processing).unwrap(),
            "\"processing\""
        );
    }

    #[test]
    fn begin_creates_roots_and_indexes_them() {
        let (store, session) = started();
        assert_eq!(session.state(), SessionState::Processing);
        for guid in ["menu", "toolbar", "unfiled", "mobile"] {
            assert_eq!(session.index().id_for(guid), Some(id_of(&store, guid)));
        }
        assert!(store.row("tags").is_none());
        assert_eq!(store.row("unfiled").unwrap().title.as_deref(), Some("Unsorted Bookmarks"));
    }

    #[test]
    fn begin_uses_localized_titles() {
        let store = Arc::new(MemoryStore::new());
        let config = SessionConfig::default().with_root_title("mobile", "Mobil");
        let mut session = Session::new(store.clone(), config);
        session.begin().unwrap();
        assert_eq!(store.row("mobile").unwrap().title.as_deref(), Some("Mobil"));
    }

    #[test]
    fn begin_twice_is_invalid() {
        let (_, mut session) = started();
        assert_eq!(
            session.begin(),
            Err(Error::InvalidState {
                expected: SessionState::Begin,
                actual: SessionState::Processing,
            })
        );
    }

    #[test]
    fn process_before_begin_is_invalid() {
        let store = Arc::new(MemoryStore::new());
        let mut session = Session::new(store, SessionConfig::default());
        let result = session.process(RemoteRecord::bookmark("b", "menu"));
        assert!(matches!(result, Err(Error::InvalidState { .. })));
    }

    #[test]
    fn bookmark_under_known_parent() {
        let (store, mut session) = started();
        let outcome = session
            .process(RemoteRecord::bookmark("b1", "menu").with_position(3))
            .unwrap();

        let menu = id_of(&store, "menu");
        assert!(matches!(
            outcome,
            ProcessOutcome::Stored { parent_id, orphaned: false, .. } if parent_id == menu
        ));
        assert_eq!(store.row("b1").unwrap().position, 3);
    }

    #[test]
    fn declared_position_beats_hint() {
        let (store, mut session) = started();
        session
            .process(RemoteRecord::folder("f1", "menu", ["a", "b"]))
            .unwrap();
        session
            .process(RemoteRecord::bookmark("b", "f1").with_position(7))
            .unwrap();
        assert_eq!(store.row("b").unwrap().position, 1);
    }

    #[test]
    fn self_parented_record_goes_to_fallback() {
        let (store, mut session) = started();
        session
            .process(RemoteRecord::folder("f1", "f1", Vec::<String>::new()))
            .unwrap();
        assert_eq!(store.row("f1").unwrap().parent_id, id_of(&store, "unfiled"));
        assert_eq!(session.pending_orphan_count(), 0);
    }

    #[test]
    fn special_root_keeps_static_parent() {
        let (store, mut session) = started();
        let before = store.row("toolbar").unwrap();
        session
            .process(RemoteRecord::folder("toolbar", "unfiled", ["b1"]).with_title("Toolbar"))
            .unwrap();
        let after = store.row("toolbar").unwrap();
        assert_eq!(after.parent_id, SUPER_ROOT_ID);
        assert_eq!(after.position, before.position);
        assert_eq!(after.id, before.id);
        assert_eq!(session.child_order("toolbar"), Some(&["b1".to_string()][..]));
    }

    #[test]
    fn special_root_tombstone_is_ignored() {
        let (store, mut session) = started();
        let outcome = session.process(RemoteRecord::tombstone("menu")).unwrap();
        assert_eq!(
            outcome,
            ProcessOutcome::Skipped(Rejection::ProtectedRoot {
                guid: "menu".into()
            })
        );
        assert!(store.row("menu").unwrap().is_active());
    }

    #[test]
    fn deleted_folder_children_move_to_fallback() {
        let (store, mut session) = started();
        session
            .process(RemoteRecord::folder("f1", "menu", ["a"]))
            .unwrap();
        session.process(RemoteRecord::bookmark("a", "f1")).unwrap();

        let outcome = session.process(RemoteRecord::tombstone("f1")).unwrap();
        assert_eq!(
            outcome,
            ProcessOutcome::Deleted {
                guid: "f1".into(),
                existed: true,
                relocated: 1,
            }
        );
        assert!(store.row("f1").unwrap().deleted);
        assert_eq!(store.row("a").unwrap().parent_id, id_of(&store, "unfiled"));
        assert!(!session.index().contains("f1"));
        assert_eq!(session.child_order("f1"), None);
    }

    #[test]
    fn tombstone_for_unknown_record() {
        let (_, mut session) = started();
        let outcome = session.process(RemoteRecord::tombstone("ghost")).unwrap();
        assert!(matches!(outcome, ProcessOutcome::Deleted { existed: false, .. }));
    }

    #[test]
    fn folder_cannot_move_into_its_descendant() {
        let (store, mut session) = started();
        session
            .process(RemoteRecord::folder("outer", "menu", ["inner"]))
            .unwrap();
        session
            .process(RemoteRecord::folder("inner", "outer", Vec::<String>::new()))
            .unwrap();

        session
            .process(RemoteRecord::folder("outer", "inner", ["inner"]).modified_at(5000))
            .unwrap();
        assert_eq!(store.row("outer").unwrap().parent_id, id_of(&store, "unfiled"));
    }

    #[test]
    fn folder_turned_bookmark_is_unindexed() {
        let (_, mut session) = started();
        session
            .process(RemoteRecord::folder("x", "menu", Vec::<String>::new()))
            .unwrap();
        assert!(session.index().contains("x"));
        session
            .process(RemoteRecord::bookmark("x", "menu").modified_at(5000))
            .unwrap();
        assert!(!session.index().contains("x"));
        assert_eq!(session.child_order("x"), None);
    }

    #[test]
    fn folder_turned_bookmark_gives_up_its_children() {
        let (store, mut session) = started();
        session.process(RemoteRecord::folder("x", "menu", ["a"])).unwrap();
        session.process(RemoteRecord::bookmark("a", "x")).unwrap();
        assert_eq!(store.row("a").unwrap().parent_id, id_of(&store, "x"));

        let outcome = session
            .process(RemoteRecord::bookmark("x", "menu").modified_at(5000))
            .unwrap();
        assert!(matches!(outcome, ProcessOutcome::Stored { .. }));

        let x = store.row("x").unwrap();
        assert_eq!(x.kind, RecordKind::Bookmark);
        let a = store.row("a").unwrap();
        assert!(a.is_active());
        assert_eq!(
            (a.parent_id, a.position),
            (id_of(&store, "unfiled"), UNORDERED_POSITION)
        );
    }

    #[test]
    fn empty_parent_goes_to_fallback_without_queueing() {
        let (store, mut session) = started();
        let mut record = RemoteRecord::bookmark("x", "menu");
        record.parent_guid = Some(String::new());

        let outcome = session.process(record).unwrap();
        assert!(matches!(
            outcome,
            ProcessOutcome::Stored { orphaned: false, .. }
        ));
        assert_eq!(store.row("x").unwrap().parent_id, id_of(&store, "unfiled"));
        assert_eq!(session.pending_orphan_count(), 0);
    }

    #[test]
    fn fetch_builds_outgoing_folder() {
        let (store, mut session) = started();
        session
            .process(RemoteRecord::folder("f1", "menu", Vec::<String>::new()).with_title("Work"))
            .unwrap();
        let f1 = id_of(&store, "f1");
        store.insert_row(LocalRow::bookmark("b", f1, -100));
        store.insert_row(LocalRow::bookmark("a", f1, 0));

        let record = session.fetch("f1").unwrap().unwrap();
        assert_eq!(record.kind, RecordKind::Folder);
        assert_eq!(record.children, vec!["a", "b"]);
        assert_eq!(record.parent_guid.as_deref(), Some("menu"));
        assert_eq!(record.parent_name.as_deref(), Some("Bookmarks Menu"));
        assert_eq!(store.row("b").unwrap().position, 1);

        let child = session.fetch("a").unwrap().unwrap();
        assert_eq!(child.parent_name.as_deref(), Some("Work"));
    }

    #[test]
    fn fetch_skips_forbidden_and_missing() {
        let (_, session) = started();
        assert_eq!(session.fetch("places").unwrap(), None);
        assert_eq!(session.fetch("nope").unwrap(), None);
    }

    #[test]
    fn fetch_moves_dangling_rows_to_mobile() {
        let (store, session) = started();
        store.insert_row(LocalRow::bookmark("lost", 999, 4));

        let record = session.fetch("lost").unwrap().unwrap();
        assert_eq!(record.parent_guid.as_deref(), Some("mobile"));
        assert_eq!(record.parent_name.as_deref(), Some("Mobile Bookmarks"));
        let row = store.row("lost").unwrap();
        assert_eq!((row.parent_id, row.position), (id_of(&store, "mobile"), 4));
    }

    #[test]
    fn fetch_since_includes_tombstones() {
        let (store, mut session) = started();
        session.process(RemoteRecord::bookmark("a", "menu").modified_at(2000)).unwrap();
        session.process(RemoteRecord::bookmark("b", "menu").modified_at(2000)).unwrap();
        store.delete("b", 3000).unwrap();

        let records = session.fetch_since(1500).unwrap();
        let guids: Vec<_> = records.iter().map(|r| (r.guid.as_str(), r.deleted)).collect();
        assert_eq!(guids, vec![("a", false), ("b", true)]);
    }

    #[tokio::test]
    async fn store_done_moves_to_finished() {
        let (_, mut session) = started();
        session
            .process(RemoteRecord::folder("f1", "menu", Vec::<String>::new()))
            .unwrap();

        let handle = session.store_done().unwrap();
        let report = handle.wait().await.unwrap();

        assert_eq!(report.state, SessionState::Finished);
        assert_eq!(session.state(), SessionState::Finished);
        assert!(matches!(
            session.process(RemoteRecord::bookmark("late", "menu")),
            Err(Error::InvalidState { .. })
        ));
    }

    #[test]
    fn store_done_outside_runtime_keeps_processing() {
        let (_, mut session) = started();
        assert!(matches!(session.store_done(), Err(Error::FinalizeTask(_))));
        assert_eq!(session.state(), SessionState::Processing);
    }
}
