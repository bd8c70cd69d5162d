//! Record validation and reconciliation.
//!
//! Every incoming record passes through here before it touches the store:
//!
//! 1. [`validate_record`] checks the GUID and kind and cleans up the
//!    children array
//! 2. If a local counterpart exists, [`reconcile_records`] merges the two:
//!    non-structural fields follow a pluggable [`FieldReconciler`], while the
//!    remote children array always wins

use crate::{roots, BookmarkRecord, Guid, RecordKind, RemoteRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Why an incoming record was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum Rejection {
    /// The record had no GUID.
    MissingGuid,
    /// `places` and `tags` are never synced.
    Forbidden { guid: Guid },
    /// The type was missing or not one this engine handles.
    InvalidKind { guid: Guid, kind: Option<String> },
    /// Special roots cannot be deleted.
    ProtectedRoot { guid: Guid },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::MissingGuid => write!(f, "record has no GUID"),
            Rejection::Forbidden { guid } => write!(f, "{} is never synced", guid),
            Rejection::InvalidKind { guid, kind } => {
                write!(f, "{} has unsupported type {:?}", guid, kind)
            }
            Rejection::ProtectedRoot { guid } => write!(f, "{} is a special root", guid),
        }
    }
}

/// Merge policy for non-structural fields (title, URL, description, tags,
/// keyword, parent).
pub trait FieldReconciler: Send + Sync {
    /// Merge `remote` into `local`. Structural fields are fixed up by
    /// [`reconcile_records`] afterwards.
    fn reconcile(&self, remote: &BookmarkRecord, local: &BookmarkRecord) -> BookmarkRecord;
}

/// The side modified last supplies every field. Ties go to the remote.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastWriteWins;

impl FieldReconciler for LastWriteWins {
    fn reconcile(&self, remote: &BookmarkRecord, local: &BookmarkRecord) -> BookmarkRecord {
        let (winner, loser) = if remote.last_modified >= local.last_modified {
            (remote, local)
        } else {
            (local, remote)
        };

        let mut merged = winner.clone();
        // A local row whose parent is not indexed has no parent GUID.
        if merged.parent_guid.is_none() {
            merged.parent_guid = loser.parent_guid.clone();
            merged.parent_name = loser.parent_name.clone();
        }
        merged
    }
}

/// Turn a wire record into a validated record.
///
/// `local_kind` is the kind of the local row with the same GUID, if any. It
/// lets bare tombstones, which usually carry no type, take their local kind.
pub fn validate_record(
    record: RemoteRecord,
    local_kind: Option<RecordKind>,
) -> Result<BookmarkRecord, Rejection> {
    let guid = match record.guid {
        Some(guid) if !guid.is_empty() => guid,
        _ => return Err(Rejection::MissingGuid),
    };
    if roots::is_forbidden(&guid) {
        return Err(Rejection::Forbidden { guid });
    }

    let kind = match record.record_type.as_deref() {
        Some(raw) => RecordKind::parse(raw),
        None if record.deleted => Some(local_kind.unwrap_or(RecordKind::Bookmark)),
        None => None,
    };
    let kind = match kind {
        Some(RecordKind::Bookmark) if !record.deleted && roots::is_special(&guid) => None,
        other => other,
    };
    let Some(kind) = kind else {
        return Err(Rejection::InvalidKind {
            guid,
            kind: record.record_type,
        });
    };

    if record.deleted {
        return Ok(BookmarkRecord::tombstone(guid, kind, record.modified));
    }

    let children = match kind {
        RecordKind::Folder => sanitize_children(&guid, record.children),
        RecordKind::Bookmark => Vec::new(),
    };

    Ok(BookmarkRecord {
        guid,
        kind,
        parent_guid: record.parent_guid,
        parent_name: record.parent_name,
        title: record.title,
        uri: record.uri,
        description: record.description,
        keyword: record.keyword,
        tags: record.tags,
        position: record.position,
        children,
        deleted: false,
        last_modified: record.modified,
        local_id: None,
        local_position: None,
    })
}

/// Drop forbidden GUIDs, self-references and duplicates, keeping first
/// occurrences in order.
pub fn sanitize_children(folder: &str, children: Vec<Guid>) -> Vec<Guid> {
    let mut seen = HashSet::new();
    children
        .into_iter()
        .filter(|child| {
            !roots::is_forbidden(child) && child != folder && seen.insert(child.clone())
        })
        .collect()
}

/// Merge an incoming record with its local counterpart.
///
/// Field values come from `fields`. Structurally the remote record is
/// authoritative: its kind and children array always win, and the local row
/// id is always kept.
pub fn reconcile_records(
    remote: &BookmarkRecord,
    local: &BookmarkRecord,
    fields: &dyn FieldReconciler,
) -> BookmarkRecord {
    let mut reconciled = fields.reconcile(remote, local);
    reconciled.guid = remote.guid.clone();
    reconciled.kind = remote.kind;
    reconciled.children = remote.children.clone();
    reconciled.deleted = false;
    reconciled.local_id = local.local_id;
    reconciled.local_position = local.local_position;
    tracing::debug!(
        guid = %reconciled.guid,
        remote_modified = remote.last_modified,
        local_modified = local.last_modified,
        "Reconciled record"
    );
    reconciled
}
