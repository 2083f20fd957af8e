//! Data model types for the distribution catalog.
//!
//! Two families of documents live here: the catalog tree rewritten by the
//! version propagator (catalog.json, cores/systems indexes, per-entry
//! documents, release channels) and the flat per-system game list consumed
//! by the ingestion engine. All JSON is written compactly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Catalog tree ────────────────────────────────────────────────────────────

/// Pointer to a child document: relative url plus its cached version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocRef {
    pub url: String,
    #[serde(default)]
    pub version: String,
}

/// Root `catalog.json` document.
///
/// The root `version` is a build-date stamp, while every nested version is a
/// content-derived maximum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub version: String,
    pub cores: DocRef,
    pub systems: DocRef,
    pub releases: DocRef,
}

/// `cores.json` / `systems.json`: named entries pointing at per-entry
/// documents, each carrying a cached version.
pub type EntryIndex = BTreeMap<String, DocRef>;

/// Per-core document: a list of releases, version aggregated bottom-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreDoc {
    #[serde(default)]
    pub version: String,
    pub releases: Vec<Release>,
}

/// Per-system document. The optional `gamesDb` artifact contributes its
/// version to the system; the compiled `db` artifact is a derived cache and
/// does not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemDoc {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub releases: Vec<Release>,
    #[serde(rename = "gamesDb", default, skip_serializing_if = "Option::is_none")]
    pub games_db: Option<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<Artifact>,
}

/// A single versioned release carrying distributable files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub files: Vec<ReleaseFile>,
}

/// A distributable file. `size` and `sha256` are derived every build from
/// the file's current bytes; stale source values are never trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseFile {
    pub url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Auxiliary artifact attached to a system (game list, compiled database).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub sha256: String,
}

/// `releases.json`: named release channels.
pub type ReleasesDoc = BTreeMap<String, Channel>;

/// A release channel. The exposed `version` is pinned to the entry tagged
/// `"latest"` when present, otherwise the numeric maximum over entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub version: String,
    pub entries: Vec<Release>,
}

/// Tag that pins a channel's exposed version to a specific entry.
pub const LATEST_TAG: &str = "latest";

// ── Game list ───────────────────────────────────────────────────────────────

/// Flat per-system game list consumed by the ingestion engine.
#[derive(Debug, Clone, Deserialize)]
pub struct GameList {
    #[serde(default)]
    pub version: Option<String>,
    pub games: Vec<GameEntry>,
}

/// One game entry. `name` is the unmodified fullname and must be unique
/// across the list.
#[derive(Debug, Clone, Deserialize)]
pub struct GameEntry {
    pub name: String,
    #[serde(default)]
    pub shortname: Option<String>,
    #[serde(rename = "nameAlt", default)]
    pub name_alt: Option<String>,
    /// Comma-separated region names.
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub languages: Option<Languages>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sources: Vec<GameSource>,
    /// Playlist name → priority.
    #[serde(default)]
    pub playlists: BTreeMap<String, i64>,
}

/// `languages` appears in the wild both as a single string and as a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Languages {
    One(String),
    Many(Vec<String>),
}

impl Languages {
    /// Normalize to a trimmed, non-empty list.
    pub fn normalize(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            Languages::One(s) => s.split(',').collect(),
            Languages::Many(v) => v.iter().map(String::as_str).collect(),
        };
        raw.iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// A download source for a game: one or more files.
#[derive(Debug, Clone, Deserialize)]
pub struct GameSource {
    #[serde(default)]
    pub files: Vec<SourceFile>,
}

/// One downloadable file of a game source. The hash arrives as a hex string
/// and is stored as raw bytes in the identification database.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceFile {
    #[serde(default)]
    pub extension: Option<String>,
    pub sha256: String,
    pub size: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn languages_from_string() {
        let l = Languages::One("en, fr , ".to_string());
        assert_eq!(l.normalize(), vec!["en", "fr"]);
    }

    #[test]
    fn languages_from_list() {
        let l = Languages::Many(vec![" en ".to_string(), "".to_string(), "ja".to_string()]);
        assert_eq!(l.normalize(), vec!["en", "ja"]);
    }

    #[test]
    fn game_entry_accepts_both_language_shapes() {
        let one: GameEntry =
            serde_json::from_str(r#"{"name":"A","languages":"en"}"#).unwrap();
        let many: GameEntry =
            serde_json::from_str(r#"{"name":"B","languages":["en","fr"]}"#).unwrap();
        assert_eq!(one.languages.unwrap().normalize(), vec!["en"]);
        assert_eq!(many.languages.unwrap().normalize(), vec!["en", "fr"]);
    }
}
