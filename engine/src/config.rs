//! Per-session configuration.

use crate::{roots, Guid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Settings a session is created with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Localized display titles for special roots, keyed by GUID.
    /// Roots without an entry use their built-in English title.
    pub root_titles: BTreeMap<Guid, String>,
    /// Include titles and URLs in debug logs.
    pub log_personal_info: bool,
}

impl SessionConfig {
    /// Override the display title of a special root.
    pub fn with_root_title(mut self, guid: impl Into<Guid>, title: impl Into<String>) -> Self {
        self.root_titles.insert(guid.into(), title.into());
        self
    }

    /// Enable or disable logging of titles and URLs.
    pub fn with_personal_info_logging(mut self, enabled: bool) -> Self {
        self.log_personal_info = enabled;
        self
    }

    /// Display title for a special root, or `None` for ordinary GUIDs.
    pub fn title_for(&self, guid: &str) -> Option<&str> {
        let root = roots::special_root(guid)?;
        Some(
            self.root_titles
                .get(guid)
                .map(String::as_str)
                .unwrap_or(root.default_title),
        )
    }
}
