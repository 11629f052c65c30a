//! Application shortcut grid: an ordered, persisted collection of [`ShortcutRecord`]s.
//!
//! The collection is loaded once from a [`ShortcutStorage`] (falling back to the preset seed set
//! when nothing usable is stored) and re-serialized in full after every add/remove.

use crate::storage::{ShortcutStorage, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Preset (shipped) or custom (user-added) shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortcutKind {
    Preset,
    Custom,
}

/// One application link in the grid. Field names match the persisted layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutRecord {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: ShortcutKind,
    /// Built-in icon name; only meaningful for presets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_key: Option<String>,
    /// Style token for the icon tint (e.g. `text-red-500`).
    #[serde(default, rename = "color", skip_serializing_if = "Option::is_none")]
    pub color_hint: Option<String>,
}

impl ShortcutRecord {
    fn preset(id: &str, name: &str, url: &str, icon_key: &str, color_hint: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            kind: ShortcutKind::Preset,
            icon_key: Some(icon_key.to_string()),
            color_hint: Some(color_hint.to_string()),
        }
    }
}

/// Caller-side answer to "Remove this shortcut?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl Confirmation {
    pub fn from_flag(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }
}

/// The fixed seed set used when storage holds nothing usable.
pub fn default_shortcuts() -> Vec<ShortcutRecord> {
    vec![
        ShortcutRecord::preset("1", "CSDN", "https://www.csdn.net/", "code", "text-red-500"),
        ShortcutRecord::preset("2", "NetPan", "#", "cloud", "text-blue-500"),
        ShortcutRecord::preset("3", "Music", "#", "music", "text-emerald-500"),
        ShortcutRecord::preset("4", "Bing", "https://www.bing.com", "aperture", "text-teal-500"),
        ShortcutRecord::preset("5", "OpenAI", "https://chat.openai.com", "cpu", "text-violet-500"),
        ShortcutRecord::preset("6", "GitHub", "https://github.com", "github", "text-gray-600"),
    ]
}

/// True when `url` starts with `scheme://` (RFC 3986 scheme characters).
fn has_scheme(url: &str) -> bool {
    let Some((scheme, _)) = url.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Trim `url` and prefix `https://` when it carries no scheme.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Make a normalized url safe to hand back as a redirect target. Urls carrying control
/// characters go through the url parser, which strips tabs and newlines and percent-encodes
/// the rest; `None` when the parser rejects them.
fn sanitize_url(url: String) -> Option<String> {
    if !url.chars().any(char::is_control) {
        return Some(url);
    }
    match url::Url::parse(&url) {
        Ok(parsed) => Some(parsed.to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "rejecting shortcut url with control characters");
            None
        }
    }
}

/// Drop records whose id was already seen; first occurrence wins.
fn dedupe_ids(records: Vec<ShortcutRecord>) -> (Vec<ShortcutRecord>, usize) {
    let before = records.len();
    let mut seen = HashSet::new();
    let kept: Vec<ShortcutRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

/// In-memory shortcut collection bound to its storage backend.
pub struct ShortcutStore {
    records: Vec<ShortcutRecord>,
    storage: Arc<dyn ShortcutStorage>,
}

impl ShortcutStore {
    /// Load the persisted collection. Missing, unreadable, or malformed data yields the
    /// default collection; no error reaches the caller.
    pub fn load(storage: Arc<dyn ShortcutStorage>) -> Self {
        let stored = match storage.read() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "shortcut storage unreadable; using defaults");
                None
            }
        };

        let parsed = stored.and_then(|bytes| {
            match serde_json::from_slice::<Vec<ShortcutRecord>>(&bytes) {
                Ok(records) => Some(records),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to parse stored shortcuts; using defaults");
                    None
                }
            }
        });

        let (records, rewrite) = match parsed {
            Some(records) => {
                let (records, dropped) = dedupe_ids(records);
                if dropped > 0 {
                    tracing::warn!(dropped, "dropped shortcuts with duplicate ids");
                }
                (records, dropped > 0)
            }
            None => (default_shortcuts(), true),
        };

        let store = Self { records, storage };
        if rewrite {
            if let Err(e) = store.persist() {
                tracing::warn!(error = %e, "failed to persist initial shortcut collection");
            }
        }
        tracing::info!(count = store.records.len(), "shortcut collection loaded");
        store
    }

    /// Current collection in display order.
    pub fn records(&self) -> &[ShortcutRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&ShortcutRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a custom shortcut. Blank `name` or `url` is a silent no-op, as is a url with
    /// control characters the url parser cannot repair.
    ///
    /// On a persist failure the record stays in memory and the error is returned.
    pub fn add(&mut self, name: &str, url: &str) -> Result<&[ShortcutRecord], StorageError> {
        let name = name.trim();
        let url = url.trim();
        if name.is_empty() || url.is_empty() {
            tracing::debug!("ignoring shortcut with empty name or url");
            return Ok(self.records.as_slice());
        }
        let Some(url) = sanitize_url(normalize_url(url)) else {
            return Ok(self.records.as_slice());
        };

        let record = ShortcutRecord {
            id: self.fresh_id(),
            name: name.to_string(),
            url,
            kind: ShortcutKind::Custom,
            icon_key: None,
            color_hint: None,
        };
        tracing::info!(id = %record.id, name = %record.name, url = %record.url, "shortcut added");
        self.records.push(record);
        self.persist()?;
        Ok(self.records.as_slice())
    }

    /// Remove the shortcut with `id` once the caller has confirmed.
    /// Returns the removed record; declined or unknown ids change nothing.
    pub fn remove(
        &mut self,
        id: &str,
        confirmation: Confirmation,
    ) -> Result<Option<ShortcutRecord>, StorageError> {
        if confirmation == Confirmation::Declined {
            tracing::debug!(id, "shortcut removal declined");
            return Ok(None);
        }
        let Some(pos) = self.records.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        let removed = self.records.remove(pos);
        tracing::info!(id, name = %removed.name, "shortcut removed");
        self.persist()?;
        Ok(Some(removed))
    }

    /// Serialize the full collection and overwrite the stored state.
    pub fn persist(&self) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(&self.records)?;
        self.storage.write(&bytes)
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = uuid::Uuid::new_v4().simple().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}
