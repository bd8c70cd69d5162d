//! End-of-session merge of remote and local child orders.
//!
//! While records stream in, each folder's remote children array is recorded
//! but never written wholesale: the folder's final membership is unknown
//! until every record has been seen. Once the stream is done, every folder
//! that received a remote array is finalized:
//!
//! 1. Resolve the folder's current local order without persisting
//! 2. Keep the remote array's relative order for children present locally
//! 3. Append local-only children in their local relative order
//! 4. Write the combined order and bump the folder's modification time
//!
//! A failing folder is logged and skipped; the rest still finalize.

use crate::{
    error::Result, resolve_child_order, BookmarkStore, Clock, Error, Guid, IdIndex, SessionState,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// A folder whose finalization failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderFailure {
    pub guid: Guid,
    pub error: Error,
}

/// What the finalization pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishReport {
    /// Always [`SessionState::Finished`] once the pass has run.
    pub state: SessionState,
    /// Final persisted child order per folder.
    pub finalized: BTreeMap<Guid, Vec<Guid>>,
    /// Folders that could not be finalized.
    pub failures: Vec<FolderFailure>,
    /// Local-only children appended after remote orders, summed over folders.
    pub local_additions: usize,
    /// Children still parked in the fallback folder. Diagnostic only; a later
    /// session moves them once their parent is known again.
    pub pending_orphans: usize,
}

impl FinishReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.pending_orphans == 0
    }
}

/// Merge a remote children array with a folder's local order.
///
/// Children present on both sides follow the remote order; children only
/// known locally follow, in local order. Remote children that are not in the
/// folder locally are left out so their positions are never written.
pub fn merge_child_orders(remote: &[Guid], local: &[Guid]) -> Vec<Guid> {
    let local_set: HashSet<&str> = local.iter().map(String::as_str).collect();
    let remote_set: HashSet<&str> = remote.iter().map(String::as_str).collect();

    remote
        .iter()
        .filter(|guid| local_set.contains(guid.as_str()))
        .chain(local.iter().filter(|guid| !remote_set.contains(guid.as_str())))
        .cloned()
        .collect()
}

/// The state handed from a session to its finalization task.
pub(crate) struct Finalization<S: BookmarkStore + ?Sized> {
    pub(crate) store: Arc<S>,
    pub(crate) index: IdIndex,
    pub(crate) child_orders: BTreeMap<Guid, Vec<Guid>>,
    pub(crate) pending_orphans: usize,
    pub(crate) clock: Arc<dyn Clock>,
    /// Shared with the session; set to finished once the sweep completes.
    pub(crate) state: Arc<Mutex<SessionState>>,
}

impl<S: BookmarkStore + ?Sized> Finalization<S> {
    /// Finalize every folder that received a remote children array.
    pub(crate) fn run(self) -> FinishReport {
        tracing::debug!(
            folders = self.child_orders.len(),
            "Folders whose children might need repositioning"
        );

        let mut report = FinishReport {
            state: SessionState::Finished,
            finalized: BTreeMap::new(),
            failures: Vec::new(),
            local_additions: 0,
            pending_orphans: self.pending_orphans,
        };

        for (guid, remote) in &self.child_orders {
            match self.finalize_folder(guid, remote) {
                Ok((order, added)) => {
                    tracing::debug!(folder = %guid, added, "Added local-only children");
                    report.local_additions += added;
                    report.finalized.insert(guid.clone(), order);
                }
                Err(error) => {
                    tracing::warn!(folder = %guid, error = %error, "Error repositioning children");
                    report.failures.push(FolderFailure {
                        guid: guid.clone(),
                        error,
                    });
                }
            }
        }

        if report.pending_orphans > 0 {
            tracing::error!(
                pending = report.pending_orphans,
                "Finished with bookmarks left in the fallback folder and not reparented"
            );
        }
        tracing::info!(
            finalized = report.finalized.len(),
            failed = report.failures.len(),
            "Finalization complete"
        );
        *self.state.lock() = SessionState::Finished;
        report
    }

    fn finalize_folder(&self, guid: &str, remote: &[Guid]) -> Result<(Vec<Guid>, usize)> {
        let folder_id = self
            .index
            .id_for(guid)
            .ok_or_else(|| Error::FolderNotIndexed(guid.to_string()))?;

        let local = resolve_child_order(&*self.store, folder_id, false, self.clock.as_ref())?;
        let order = merge_child_orders(remote, &local.children);
        let added = order.len() - remote.iter().filter(|g| local.children.contains(g)).count();

        self.store.update_positions(&order)?;
        self.store.bump_modified(folder_id, self.clock.now())?;
        Ok((order, added))
    }
}

/// Completion signal for an asynchronous finalization pass.
///
/// The store is not final for the session until [`FinalizeHandle::wait`]
/// resolves.
#[derive(Debug)]
pub struct FinalizeHandle {
    task: tokio::task::JoinHandle<FinishReport>,
}

impl FinalizeHandle {
    /// Submit a finalization pass to the tokio blocking pool.
    pub(crate) fn spawn<S>(finalization: Finalization<S>) -> Result<Self>
    where
        S: BookmarkStore + ?Sized + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::FinalizeTask(e.to_string()))?;
        let task = runtime.spawn_blocking(move || finalization.run());
        Ok(Self { task })
    }

    /// Whether the pass has completed.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the pass to complete.
    pub async fn wait(self) -> Result<FinishReport> {
        self.task
            .await
            .map_err(|e| Error::FinalizeTask(e.to_string()))
    }
}
