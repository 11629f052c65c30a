//! Icon resolution for shortcut tiles.
//!
//! Presets map to a fixed built-in icon; everything else gets a remote favicon keyed by the
//! url's host, with the globe glyph as the silent fallback.

use crate::shortcuts::{ShortcutKind, ShortcutRecord};
use serde::Serialize;

const FAVICON_SERVICE: &str = "https://www.google.com/s2/favicons";
const FAVICON_SIZE: u32 = 64;

/// Built-in icons available to presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinIcon {
    Code,
    Cloud,
    Music,
    Aperture,
    Cpu,
    Github,
    /// Generic fallback glyph.
    Globe,
}

impl BuiltinIcon {
    /// Look up a preset icon by its `iconKey`. The fallback glyph is not addressable by key.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "code" => Some(Self::Code),
            "cloud" => Some(Self::Cloud),
            "music" => Some(Self::Music),
            "aperture" => Some(Self::Aperture),
            "cpu" => Some(Self::Cpu),
            "github" => Some(Self::Github),
            _ => None,
        }
    }
}

/// How a tile should draw its icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum IconSource {
    Builtin { icon: BuiltinIcon },
    /// Load `url`; on load failure show `fallback` instead. No retry.
    Favicon { url: String, fallback: BuiltinIcon },
}

/// Favicon lookup url for `host`.
pub fn favicon_url(host: &str) -> String {
    format!(
        "{}?domain={}&sz={}",
        FAVICON_SERVICE,
        urlencoding::encode(host),
        FAVICON_SIZE
    )
}

/// Resolve the icon for a record.
pub fn resolve_icon(record: &ShortcutRecord) -> IconSource {
    if record.kind == ShortcutKind::Preset {
        if let Some(icon) = record.icon_key.as_deref().and_then(BuiltinIcon::from_key) {
            return IconSource::Builtin { icon };
        }
    }

    let host = url::Url::parse(&record.url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string));
    match host {
        Some(host) => IconSource::Favicon {
            url: favicon_url(&host),
            fallback: BuiltinIcon::Globe,
        },
        None => IconSource::Builtin {
            icon: BuiltinIcon::Globe,
        },
    }
}
