//! Dashboard view state owned by whoever renders it.
//!
//! Nothing here is global: each value is created by its component and changed through methods.
//! Search-panel expansion stays local to the page that draws it.

use serde::{Deserialize, Serialize};

const WEB_SEARCH_BASE: &str = "https://www.google.com/search";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

/// Plain web search for `query`, or `None` for a blank query.
pub fn web_search_url(query: &str) -> Option<String> {
    if query.trim().is_empty() {
        return None;
    }
    Some(format!("{}?q={}", WEB_SEARCH_BASE, urlencoding::encode(query)))
}
