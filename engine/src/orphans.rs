//! Orphan tracking and deferred reparenting.
//!
//! A record whose parent folder has not been seen yet is stored in the
//! fallback folder and queued here under the GUID of the parent it is
//! waiting for. When that folder is stored, its queue is drained and every
//! waiting child is moved into it.

use crate::{error::Result, BookmarkStore, Guid, LocalId, Position, UNORDERED_POSITION};
use std::collections::HashMap;

/// Children waiting for a parent folder that has not arrived.
#[derive(Debug, Clone, Default)]
pub struct OrphanTracker {
    /// Missing parent GUID -> children in arrival order.
    waiting: HashMap<Guid, Vec<Guid>>,
    /// Child GUID -> the parent it is queued under.
    queued_under: HashMap<Guid, Guid>,
}

impl OrphanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `child` until `parent` is stored.
    ///
    /// A child is only ever queued once. Queuing it under a different parent
    /// moves it. Returns false if it was already waiting on `parent`.
    pub fn defer(&mut self, child: impl Into<Guid>, parent: impl Into<Guid>) -> bool {
        let child = child.into();
        let parent = parent.into();
        if self.queued_under.get(&child) == Some(&parent) {
            return false;
        }
        self.forget(&child);
        self.waiting
            .entry(parent.clone())
            .or_default()
            .push(child.clone());
        self.queued_under.insert(child, parent);
        true
    }

    /// Remove `child` from whatever queue holds it, returning that parent.
    pub fn forget(&mut self, child: &str) -> Option<Guid> {
        let parent = self.queued_under.remove(child)?;
        if let Some(children) = self.waiting.get_mut(&parent) {
            children.retain(|c| c != child);
            if children.is_empty() {
                self.waiting.remove(&parent);
            }
        }
        Some(parent)
    }

    /// Remove and return every child waiting on `parent`.
    pub fn take_waiting(&mut self, parent: &str) -> Vec<Guid> {
        let children = self.waiting.remove(parent).unwrap_or_default();
        for child in &children {
            self.queued_under.remove(child);
        }
        children
    }

    /// Children currently waiting on `parent`.
    pub fn waiting_on(&self, parent: &str) -> Option<&[Guid]> {
        self.waiting.get(parent).map(Vec::as_slice)
    }

    /// Number of children still parked in the fallback folder.
    pub fn pending_count(&self) -> usize {
        self.queued_under.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued_under.is_empty()
    }
}

/// Move every child waiting on `folder_guid` into the folder that was just
/// stored at `folder_id`.
///
/// Each child's position is its index in the folder's declared `children`,
/// or [`UNORDERED_POSITION`] if the folder does not mention it; finalization
/// fixes that up later. A child that would end up containing its own new
/// parent stays in the fallback folder and remains queued, so it still counts
/// as pending. If the store fails part-way, the children not yet moved are
/// queued again.
pub fn reparent_orphans<S>(
    store: &S,
    tracker: &mut OrphanTracker,
    folder_guid: &str,
    folder_id: LocalId,
    children: &[Guid],
) -> Result<usize>
where
    S: BookmarkStore + ?Sized,
{
    let waiting = tracker.take_waiting(folder_guid);
    let mut moved = 0;
    for (i, child) in waiting.iter().enumerate() {
        let position = children
            .iter()
            .position(|c| c == child)
            .map(|p| p as Position)
            .unwrap_or(UNORDERED_POSITION);

        let step = move_orphan(store, child, folder_id, position);
        match step {
            Ok(Move::Moved) => moved += 1,
            Ok(Move::Missing) => {}
            Ok(Move::Refused) => {
                tracker.defer(child.clone(), folder_guid);
            }
            Err(e) => {
                for rest in &waiting[i..] {
                    tracker.defer(rest.clone(), folder_guid);
                }
                return Err(e);
            }
        }
    }
    if !waiting.is_empty() {
        tracing::debug!(
            folder = %folder_guid,
            moved,
            waiting = waiting.len(),
            "Reparented orphans"
        );
    }
    Ok(moved)
}

enum Move {
    Moved,
    Missing,
    Refused,
}

fn move_orphan<S>(store: &S, child: &str, folder_id: LocalId, position: Position) -> Result<Move>
where
    S: BookmarkStore + ?Sized,
{
    if let Some(row) = store.fetch_by_guid(child)? {
        if row.kind.is_folder() && store.is_ancestor(row.id, folder_id)? {
            tracing::warn!(
                guid = %child,
                folder_id,
                "Refusing to move folder beneath itself; leaving it in fallback folder"
            );
            return Ok(Move::Refused);
        }
    }
    if store.update_parent_and_position(child, folder_id, position)? > 0 {
        Ok(Move::Moved)
    } else {
        Ok(Move::Missing)
    }
}
