//! Child-order resolution.
//!
//! Local clients are sloppy about positions: new rows often get a large
//! negative placeholder, and nothing keeps siblings contiguous. This module
//! turns whatever raw positions a folder's children hold into one
//! deterministic order.
//!
//! # Algorithm
//!
//! 1. Bucket children by the magnitude of their raw position
//! 2. Emit buckets in ascending order; within a bucket keep retrieval
//!    (creation) order
//! 3. Skip forbidden GUIDs
//! 4. The order is *changed* unless emitted child `i` already holds raw
//!    position `i` for every `i`
//! 5. If changed and asked to persist, write `0..N-1` back and bump the
//!    folder's modification time when any row actually moved
//!
//! Step 4 is exactly "re-reading after a rewrite reproduces the same list
//! with nothing to fix", so resolution is idempotent.

use crate::{error::Result, roots, BookmarkStore, ChildRow, Clock, Guid, LocalId, Position};
use std::collections::BTreeMap;

/// Position used when a child's place among its siblings is not known yet.
/// Its magnitude sorts it among the first few siblings until the folder is
/// next resolved.
pub const UNORDERED_POSITION: Position = -1;

/// A folder's resolved children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildOrder {
    pub children: Vec<Guid>,
    /// Raw positions did not already spell out this order.
    pub changed: bool,
}

/// Derive an order from raw child rows given in retrieval order.
pub fn order_children(rows: Vec<ChildRow>) -> ChildOrder {
    let mut buckets: BTreeMap<u64, Vec<ChildRow>> = BTreeMap::new();
    for row in rows {
        tracing::trace!(guid = %row.guid, position = row.position, "Child");
        buckets
            .entry(row.position.unsigned_abs())
            .or_default()
            .push(row);
    }

    let mut children = Vec::new();
    let mut changed = false;
    for row in buckets.into_values().flatten() {
        if roots::is_forbidden(&row.guid) {
            continue;
        }
        if row.position != children.len() as Position {
            changed = true;
        }
        children.push(row.guid);
    }

    ChildOrder { children, changed }
}

/// Resolve a folder's child order from the store, optionally persisting a
/// cleaned-up order.
pub fn resolve_child_order<S>(
    store: &S,
    folder_id: LocalId,
    persist: bool,
    clock: &dyn Clock,
) -> Result<ChildOrder>
where
    S: BookmarkStore + ?Sized,
{
    tracing::trace!(folder_id, "Resolving child order");
    let rows = store.fetch_children(folder_id)?;
    if rows.is_empty() {
        tracing::trace!(folder_id, "No children");
        return Ok(ChildOrder::default());
    }
    tracing::debug!(folder_id, count = rows.len(), "Expecting children");

    let order = order_children(rows);
    tracing::trace!(folder_id, children = ?order.children, "Output child array");

    if !order.changed {
        tracing::debug!(folder_id, "Nothing moved; store reflects child array");
        return Ok(order);
    }
    if !persist {
        return Ok(order);
    }

    tracing::debug!(folder_id, "Generating child array required moving records; updating store");
    let now = clock.now();
    if store.update_positions(&order.children)? > 0 {
        tracing::debug!(folder_id, now, "Bumping folder modified time");
        store.bump_modified(folder_id, now)?;
    }
    Ok(order)
}
