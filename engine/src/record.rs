//! Record types: the wire form, the reconciled form and the store row.

use crate::{Guid, LocalId, Position, Timestamp};
use serde::{Deserialize, Serialize};

/// The two kinds of bookmark-tree records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Bookmark,
    Folder,
}

impl RecordKind {
    /// Parse a wire type string. Anything but `bookmark` or `folder`
    /// (case-insensitive) is not a kind this engine handles.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("bookmark") {
            Some(RecordKind::Bookmark)
        } else if raw.eq_ignore_ascii_case("folder") {
            Some(RecordKind::Folder)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Bookmark => "bookmark",
            RecordKind::Folder => "folder",
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, RecordKind::Folder)
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded record as delivered by the remote feed.
///
/// Nothing here is trusted: the GUID may be missing and the type may be
/// anything. [`crate::reconcile::validate_record`] turns it into a
/// [`BookmarkRecord`] or a [`crate::Rejection`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    #[serde(rename = "id", default)]
    pub guid: Option<Guid>,
    #[serde(rename = "type", default)]
    pub record_type: Option<String>,
    #[serde(rename = "parentid", default)]
    pub parent_guid: Option<Guid>,
    #[serde(rename = "parentName", default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "bmkUri", default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Sibling-position hint. Negative values are placeholders.
    #[serde(rename = "pos", default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub children: Vec<Guid>,
    #[serde(default)]
    pub deleted: bool,
    /// Server modification time in milliseconds.
    #[serde(default)]
    pub modified: Timestamp,
}

impl RemoteRecord {
    /// A bookmark under `parent`.
    pub fn bookmark(guid: impl Into<Guid>, parent: impl Into<Guid>) -> Self {
        Self {
            guid: Some(guid.into()),
            record_type: Some(RecordKind::Bookmark.as_str().to_string()),
            parent_guid: Some(parent.into()),
            ..Default::default()
        }
    }

    /// A folder under `parent` declaring `children` in order.
    pub fn folder<I, G>(guid: impl Into<Guid>, parent: impl Into<Guid>, children: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<Guid>,
    {
        Self {
            guid: Some(guid.into()),
            record_type: Some(RecordKind::Folder.as_str().to_string()),
            parent_guid: Some(parent.into()),
            children: children.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// A deletion. Tombstones usually carry nothing but their GUID.
    pub fn tombstone(guid: impl Into<Guid>) -> Self {
        Self {
            guid: Some(guid.into()),
            deleted: true,
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn modified_at(mut self, modified: Timestamp) -> Self {
        self.modified = modified;
        self
    }
}

/// A validated record, either freshly received or reconciled with its local
/// counterpart, or built from a local row for upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRecord {
    pub guid: Guid,
    pub kind: RecordKind,
    pub parent_guid: Option<Guid>,
    pub parent_name: Option<String>,
    pub title: Option<String>,
    pub uri: Option<String>,
    pub description: Option<String>,
    pub keyword: Option<String>,
    pub tags: Vec<String>,
    /// Sibling-position hint as received.
    pub position: Option<Position>,
    /// Ordered child GUIDs. Always empty for bookmarks.
    pub children: Vec<Guid>,
    pub deleted: bool,
    pub last_modified: Timestamp,
    /// Row id in the local store, once known.
    pub local_id: Option<LocalId>,
    /// Raw position of the local row, once known.
    pub local_position: Option<Position>,
}

impl BookmarkRecord {
    /// A bare record with no parent or content.
    pub fn new(guid: impl Into<Guid>, kind: RecordKind) -> Self {
        Self {
            guid: guid.into(),
            kind,
            parent_guid: None,
            parent_name: None,
            title: None,
            uri: None,
            description: None,
            keyword: None,
            tags: Vec::new(),
            position: None,
            children: Vec::new(),
            deleted: false,
            last_modified: 0,
            local_id: None,
            local_position: None,
        }
    }

    /// A deletion marker.
    pub fn tombstone(guid: impl Into<Guid>, kind: RecordKind, last_modified: Timestamp) -> Self {
        Self {
            deleted: true,
            last_modified,
            ..Self::new(guid, kind)
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    /// Build the local view of a store row. Children are left empty; the
    /// caller decides whether they are worth computing.
    pub fn from_row(row: &LocalRow, parent_guid: Option<Guid>) -> Self {
        if row.deleted {
            let mut tombstone = Self::tombstone(row.guid.clone(), row.kind, row.last_modified);
            tombstone.local_id = Some(row.id);
            return tombstone;
        }
        Self {
            guid: row.guid.clone(),
            kind: row.kind,
            parent_guid,
            parent_name: None,
            title: row.title.clone(),
            uri: row.uri.clone(),
            description: row.description.clone(),
            keyword: row.keyword.clone(),
            tags: row.tags.clone(),
            position: None,
            children: Vec::new(),
            deleted: false,
            last_modified: row.last_modified,
            local_id: Some(row.id),
            local_position: Some(row.position),
        }
    }
}

/// A row of the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRow {
    /// Opaque id assigned by the store.
    pub id: LocalId,
    pub guid: Guid,
    pub kind: RecordKind,
    pub title: Option<String>,
    pub uri: Option<String>,
    pub description: Option<String>,
    pub keyword: Option<String>,
    pub tags: Vec<String>,
    pub parent_id: LocalId,
    /// Raw sibling position. Local clients may leave this as a large
    /// negative placeholder.
    pub position: Position,
    pub deleted: bool,
    pub last_modified: Timestamp,
}

impl LocalRow {
    fn new(guid: impl Into<Guid>, kind: RecordKind, parent_id: LocalId, position: Position) -> Self {
        Self {
            id: 0,
            guid: guid.into(),
            kind,
            title: None,
            uri: None,
            description: None,
            keyword: None,
            tags: Vec::new(),
            parent_id,
            position,
            deleted: false,
            last_modified: 0,
        }
    }

    /// A local bookmark row. The id is assigned on insert.
    pub fn bookmark(guid: impl Into<Guid>, parent_id: LocalId, position: Position) -> Self {
        Self::new(guid, RecordKind::Bookmark, parent_id, position)
    }

    /// A local folder row. The id is assigned on insert.
    pub fn folder(guid: impl Into<Guid>, parent_id: LocalId, position: Position) -> Self {
        Self::new(guid, RecordKind::Folder, parent_id, position)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn modified_at(mut self, last_modified: Timestamp) -> Self {
        self.last_modified = last_modified;
        self
    }

    pub fn is_active(&self) -> bool {
        !self.deleted
    }
}

/// A child as seen by the child-order resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRow {
    pub guid: Guid,
    pub position: Position,
}

impl ChildRow {
    pub fn new(guid: impl Into<Guid>, position: Position) -> Self {
        Self {
            guid: guid.into(),
            position,
        }
    }
}

/// Where a record is written: parent row id and sibling position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub parent_id: LocalId,
    pub position: Position,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_kind() {
        assert_eq!(RecordKind::parse("bookmark"), Some(RecordKind::Bookmark));
        assert_eq!(RecordKind::parse("FOLDER"), Some(RecordKind::Folder));
        assert_eq!(RecordKind::parse("livemark"), None);
        assert_eq!(RecordKind::parse("separator"), None);
        assert_eq!(RecordKind::parse(""), None);
    }

    #[test]
    fn decode_wire_record() {
        let value = json!({
            "id": "folder-1",
            "type": "folder",
            "parentid": "menu",
            "parentName": "Bookmarks Menu",
            "title": "Recipes",
            "children": ["bmk-1", "bmk-2"],
            "modified": 1706745600000i64
        });
        let record: RemoteRecord = serde_json::from_value(value).unwrap();

        assert_eq!(record.guid.as_deref(), Some("folder-1"));
        assert_eq!(record.record_type.as_deref(), Some("folder"));
        assert_eq!(record.parent_guid.as_deref(), Some("menu"));
        assert_eq!(record.children, vec!["bmk-1", "bmk-2"]);
        assert!(!record.deleted);
        assert_eq!(record.position, None);
    }

    #[test]
    fn decode_bare_tombstone() {
        let record: RemoteRecord =
            serde_json::from_value(json!({"id": "bmk-9", "deleted": true})).unwrap();
        assert_eq!(record, RemoteRecord::tombstone("bmk-9"));
    }

    #[test]
    fn record_from_live_row() {
        let mut row = LocalRow::bookmark("bmk-1", 7, 3)
            .with_title("Rust")
            .with_uri("https://www.rust-lang.org/")
            .modified_at(2000);
        row.id = 12;

        let record = BookmarkRecord::from_row(&row, Some("folder-7".into()));
        assert_eq!(record.guid, "bmk-1");
        assert_eq!(record.parent_guid.as_deref(), Some("folder-7"));
        assert_eq!(record.local_id, Some(12));
        assert_eq!(record.local_position, Some(3));
        assert_eq!(record.title.as_deref(), Some("Rust"));
        assert!(record.children.is_empty());
    }

    #[test]
    fn record_from_deleted_row() {
        let mut row = LocalRow::folder("folder-1", 1, 0).with_title("Old");
        row.deleted = true;
        row.last_modified = 5000;

        let record = BookmarkRecord::from_row(&row, Some("menu".into()));
        assert!(record.deleted);
        assert!(record.title.is_none());
        assert!(record.parent_guid.is_none());
        assert_eq!(record.last_modified, 5000);
    }
}
