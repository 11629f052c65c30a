//! Aura dashboard core: the persisted shortcut grid and the grounded smart search.
//! The gateway binary and any other front end drive these types; nothing here renders.

pub mod config;
pub mod gemini_bridge;
pub mod icons;
pub mod search;
pub mod shortcuts;
pub mod storage;
pub mod view_state;

pub use config::{DashboardConfig, StorageBackend};
pub use gemini_bridge::{
    BridgeError, Citation, GeminiBridge, GroundedAnswer, GroundedQuery, SearchProvider,
};
pub use icons::{resolve_icon, BuiltinIcon, IconSource};
pub use search::{SearchRejection, SearchResult, SearchSource, SmartSearch};
pub use shortcuts::{
    default_shortcuts, normalize_url, Confirmation, ShortcutKind, ShortcutRecord, ShortcutStore,
};
pub use storage::{FileStorage, MemoryStorage, ShortcutStorage, SledStorage, StorageError};
pub use view_state::{web_search_url, Theme};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
