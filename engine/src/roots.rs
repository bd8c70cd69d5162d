//! The fixed set of special root folders.
//!
//! Special roots have well-known GUIDs and statically known parents. They are
//! never reparented by incoming records, never deleted by tombstones, and two
//! of them (`places` and `tags`) never appear in a children array at all.
//!
//! ```text
//! places (synthetic, id 0, never persisted)
//! ├── menu
//! ├── toolbar
//! ├── tags      (not synced)
//! ├── unfiled   (fallback folder)
//! └── mobile
//! ```

use crate::{BookmarkRecord, LocalId, SessionConfig};

pub const PLACES: &str = "places";
pub const MENU: &str = "menu";
pub const TOOLBAR: &str = "toolbar";
pub const TAGS: &str = "tags";
pub const UNFILED: &str = "unfiled";
pub const MOBILE: &str = "mobile";

/// Local id of the synthetic super-root.
pub const SUPER_ROOT_ID: LocalId = 0;

/// Where records with an unknown parent are parked.
pub const FALLBACK_FOLDER: &str = UNFILED;

/// Where live local rows with a dangling parent pointer are moved on fetch.
pub const LOST_AND_FOUND_FOLDER: &str = MOBILE;

/// A well-known folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialRoot {
    pub guid: &'static str,
    /// `None` only for the super-root.
    pub parent: Option<&'static str>,
    pub default_title: &'static str,
    /// Whether the store holds a real row for this root.
    pub persisted: bool,
}

pub const SPECIAL_ROOTS: [SpecialRoot; 6] = [
    SpecialRoot {
        guid: PLACES,
        parent: None,
        default_title: "Bookmarks",
        persisted: false,
    },
    SpecialRoot {
        guid: MENU,
        parent: Some(PLACES),
        default_title: "Bookmarks Menu",
        persisted: true,
    },
    SpecialRoot {
        guid: TOOLBAR,
        parent: Some(PLACES),
        default_title: "Bookmarks Toolbar",
        persisted: true,
    },
    SpecialRoot {
        guid: TAGS,
        parent: Some(PLACES),
        default_title: "Tags",
        persisted: false,
    },
    SpecialRoot {
        guid: UNFILED,
        parent: Some(PLACES),
        default_title: "Unsorted Bookmarks",
        persisted: true,
    },
    SpecialRoot {
        guid: MOBILE,
        parent: Some(PLACES),
        default_title: "Mobile Bookmarks",
        persisted: true,
    },
];

/// Look up a special root by GUID.
pub fn special_root(guid: &str) -> Option<&'static SpecialRoot> {
    SPECIAL_ROOTS.iter().find(|root| root.guid == guid)
}

/// Whether `guid` names a special root.
pub fn is_special(guid: &str) -> bool {
    special_root(guid).is_some()
}

/// The fixed parent of a special root.
pub fn special_parent(guid: &str) -> Option<&'static str> {
    special_root(guid).and_then(|root| root.parent)
}

/// Special roots that must exist as store rows.
pub fn persisted_roots() -> impl Iterator<Item = &'static SpecialRoot> {
    SPECIAL_ROOTS.iter().filter(|root| root.persisted)
}

/// GUIDs that are skipped in child arrays and fetch results.
pub fn is_forbidden(guid: &str) -> bool {
    guid == PLACES || guid == TAGS
}

/// Fill in a record's parent GUID and parent name.
///
/// Special roots always get their static parent, whatever the caller
/// suggests, and a special parent always gets its display title. Returns
/// `None` when the record has no GUID or no parent can be determined.
pub fn compute_parent_fields(
    mut record: BookmarkRecord,
    suggested_parent: Option<&str>,
    suggested_name: Option<&str>,
    config: &SessionConfig,
) -> Option<BookmarkRecord> {
    if record.guid.is_empty() {
        tracing::error!("No GUID when computing parent fields");
        return None;
    }

    let parent = match special_parent(&record.guid) {
        Some(fixed) => {
            if suggested_parent.is_some_and(|s| s != fixed) {
                tracing::debug!(
                    guid = %record.guid,
                    suggested = ?suggested_parent,
                    "Ignoring suggested parent for special root; using {}",
                    fixed
                );
            }
            fixed
        }
        None => match suggested_parent {
            Some(parent) => parent,
            None => {
                tracing::error!(guid = %record.guid, "No parent for record");
                return None;
            }
        },
    };

    let name = config
        .title_for(parent)
        .or(suggested_name)
        .unwrap_or_default();

    record.parent_guid = Some(parent.to_string());
    record.parent_name = Some(name.to_string());
    Some(record)
}
