//! Relational ingestion of one system's game list.
//!
//! Each game's free-text name is parsed into structured identification
//! fields; tags, regions, and languages are deduplicated through
//! [`find_or_create`]; and every row for the system is written inside one
//! transaction. The transaction commits only after the last game, then the
//! database is compacted with VACUUM. Any failure rolls the whole system
//! back — partial ingestion is never acceptable.

use std::collections::BTreeMap;

use rusqlite::{Connection, params};
use serde::Deserialize;
use thiserror::Error;

use coredist_catalog::name_parser::parse_game_name;
use coredist_catalog::types::{GameEntry, GameList};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("lookup insert-and-fetch failed for {table} value '{name}'")]
    LookupFailed { table: String, name: String },
    #[error("invalid sha256 hex for game '{game}': {source}")]
    BadHash {
        game: String,
        source: hex::FromHexError,
    },
}

/// System-level metadata ingested alongside the game list. String-valued
/// fields become `Metadata` rows; `tags` become global `SystemTags` rows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemMetadata {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Row counts from one ingestion run.
#[derive(Debug, Default)]
pub struct IngestStats {
    pub games: u64,
    pub sources: u64,
    pub tag_links: u64,
    pub region_links: u64,
    pub language_links: u64,
    pub playlist_links: u64,
}

/// Insert-or-fetch a row in a deduplicated lookup table, returning its id.
///
/// `table` is always a fixed identifier from this module, never user input;
/// the value itself goes through a bound parameter. Two games sharing a name
/// in the same lookup table land on the same row id — this is the dedup
/// invariant the junction tables rely on.
pub fn find_or_create(conn: &Connection, table: &str, name: &str) -> Result<i64, IngestError> {
    conn.execute(
        &format!("INSERT INTO {table} (name) VALUES (?1) ON CONFLICT(name) DO NOTHING"),
        params![name],
    )?;
    let id = conn.query_row(
        &format!("SELECT id FROM {table} WHERE name = ?1"),
        params![name],
        |row| row.get::<_, i64>(0),
    );
    match id {
        Ok(id) => Ok(id),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(IngestError::LookupFailed {
            table: table.to_string(),
            name: name.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Ingest one system's metadata and game list in a single transaction,
/// then compact the database.
///
/// The optional `progress` callback is invoked after each game with
/// (index + 1, total, fullname).
pub fn ingest_system(
    conn: &Connection,
    meta: &SystemMetadata,
    list: &GameList,
    progress: Option<&dyn Fn(usize, usize, &str)>,
) -> Result<IngestStats, IngestError> {
    let mut stats = IngestStats::default();
    let tx = conn.unchecked_transaction()?;

    for (key, value) in &meta.fields {
        if let Some(text) = value.as_str() {
            tx.execute(
                "INSERT INTO Metadata (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, text],
            )?;
        }
    }
    if let Some(version) = &list.version {
        tx.execute(
            "INSERT INTO Metadata (key, value) VALUES ('version', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![version],
        )?;
    }

    for tag in &meta.tags {
        let tag_id = find_or_create(&tx, "Tags", tag)?;
        tx.execute(
            "INSERT OR IGNORE INTO SystemTags (tagId) VALUES (?1)",
            params![tag_id],
        )?;
    }

    let total = list.games.len();
    for (i, game) in list.games.iter().enumerate() {
        ingest_game(&tx, game, &mut stats)?;
        if let Some(p) = progress {
            p(i + 1, total, &game.name);
        }
    }

    tx.commit()?;
    log::info!("ingested {} games, compacting", stats.games);
    conn.execute_batch("VACUUM;")?;
    Ok(stats)
}

/// Insert one game and all of its membership rows.
fn ingest_game(
    conn: &Connection,
    game: &GameEntry,
    stats: &mut IngestStats,
) -> Result<(), IngestError> {
    let parsed = parse_game_name(&game.name);
    let shortname = match &game.shortname {
        Some(s) => s.clone(),
        None => parsed.shortname.clone(),
    };
    let title = if shortname.is_empty() {
        None
    } else {
        Some(shortname)
    };

    // fullname is the unmodified name; the UNIQUE constraint makes a
    // duplicate fatal and aborts the transaction.
    conn.execute(
        "INSERT INTO GamesId (fullname, title, originalTitle, year) VALUES (?1, ?2, ?3, ?4)",
        params![game.name, title, game.name_alt, game.year],
    )?;
    let game_id = conn.last_insert_rowid();
    stats.games += 1;

    // Tags extracted from the name union with the explicit list.
    let mut tags = parsed.tags;
    for tag in &game.tags {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    for tag in &tags {
        let tag_id = find_or_create(conn, "Tags", tag)?;
        conn.execute(
            "INSERT OR IGNORE INTO GamesTags (gameId, tagId) VALUES (?1, ?2)",
            params![game_id, tag_id],
        )?;
        stats.tag_links += 1;
    }

    if let Some(region) = &game.region {
        for part in region.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let region_id = find_or_create(conn, "Regions", part)?;
            conn.execute(
                "INSERT OR IGNORE INTO GamesRegions (gameId, regionId) VALUES (?1, ?2)",
                params![game_id, region_id],
            )?;
            stats.region_links += 1;
        }
    }

    if let Some(languages) = &game.languages {
        for language in languages.normalize() {
            let language_id = find_or_create(conn, "Languages", &language)?;
            conn.execute(
                "INSERT OR IGNORE INTO GamesLanguages (gameId, languageId) VALUES (?1, ?2)",
                params![game_id, language_id],
            )?;
            stats.language_links += 1;
        }
    }

    for source in &game.sources {
        for file in &source.files {
            // Hashes ship as hex strings but are stored as raw bytes.
            let sha256 = hex::decode(&file.sha256).map_err(|e| IngestError::BadHash {
                game: game.name.clone(),
                source: e,
            })?;
            conn.execute(
                "INSERT INTO GamesSources (gameId, extension, sha256, size) VALUES (?1, ?2, ?3, ?4)",
                params![game_id, file.extension, sha256, file.size],
            )?;
            stats.sources += 1;
        }
    }

    for (playlist, priority) in &game.playlists {
        let playlist_id = find_or_create(conn, "Playlists", playlist)?;
        conn.execute(
            "INSERT OR IGNORE INTO PlaylistsGamesId (playlistId, gameId, priority) VALUES (?1, ?2, ?3)",
            params![playlist_id, game_id, priority],
        )?;
        stats.playlist_links += 1;
    }

    Ok(())
}
