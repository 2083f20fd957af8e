use rusqlite::{Connection, params};

use coredist_catalog::types::GameList;
use coredist_db::{IngestError, SystemMetadata, find_or_create, ingest_system, open_memory};

fn games(json: &str) -> GameList {
    serde_json::from_str(json).unwrap()
}

fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

#[test]
fn find_or_create_collapses_duplicates() {
    let conn = open_memory().unwrap();
    let a = find_or_create(&conn, "Tags", "Proto").unwrap();
    let b = find_or_create(&conn, "Tags", "Proto").unwrap();
    let c = find_or_create(&conn, "Tags", "Beta").unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM Tags"), 2);
}

#[test]
fn shared_tags_reference_one_row() {
    let conn = open_memory().unwrap();
    let list = games(
        r#"{"games":[
            {"name":"Alpha Quest (USA) (Proto)","sources":[]},
            {"name":"Beta Raid (Proto)","sources":[]}
        ]}"#,
    );
    ingest_system(&conn, &SystemMetadata::default(), &list, None).unwrap();

    assert_eq!(
        count(&conn, "SELECT COUNT(*) FROM Tags WHERE name = 'Proto'"),
        1
    );
    let proto_links = count(
        &conn,
        "SELECT COUNT(DISTINCT gameId) FROM GamesTags
         JOIN Tags ON Tags.id = GamesTags.tagId WHERE Tags.name = 'Proto'",
    );
    assert_eq!(proto_links, 2);
}

#[test]
fn name_parsing_fills_identification_fields() {
    let conn = open_memory().unwrap();
    let list = games(r#"{"games":[{"name":"Super Game (USA) (Proto)","nameAlt":"Sugoi Game"}]}"#);
    ingest_system(&conn, &SystemMetadata::default(), &list, None).unwrap();

    let (fullname, title, original): (String, String, String) = conn
        .query_row(
            "SELECT fullname, title, originalTitle FROM GamesId",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(fullname, "Super Game (USA) (Proto)");
    assert_eq!(title, "Super Game");
    assert_eq!(original, "Sugoi Game");

    let mut stmt = conn
        .prepare(
            "SELECT Tags.name FROM GamesTags JOIN Tags ON Tags.id = GamesTags.tagId ORDER BY Tags.name",
        )
        .unwrap();
    let tags: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(tags, vec!["Proto", "USA"]);
}

#[test]
fn explicit_shortname_wins_over_derivation() {
    let conn = open_memory().unwrap();
    let list = games(r#"{"games":[{"name":"Game (USA)","shortname":"Custom Title"}]}"#);
    ingest_system(&conn, &SystemMetadata::default(), &list, None).unwrap();

    let title: String = conn
        .query_row("SELECT title FROM GamesId", [], |row| row.get(0))
        .unwrap();
    assert_eq!(title, "Custom Title");
}

#[test]
fn regions_and_languages_normalize() {
    let conn = open_memory().unwrap();
    let list = games(
        r#"{"games":[{"name":"Game","region":"us, eu,, jp ","languages":["en"," fr ",""]}]}"#,
    );
    ingest_system(&conn, &SystemMetadata::default(), &list, None).unwrap();

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM Regions"), 3);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM GamesRegions"), 3);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM Languages"), 2);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM GamesLanguages"), 2);
}

#[test]
fn source_hashes_store_as_raw_bytes() {
    let conn = open_memory().unwrap();
    let digest = "a665a45920422f9d417e4867efdc4fb8a04a1f3fff1fa07e998e86f7f7a27ae3";
    let list = games(&format!(
        r#"{{"games":[{{"name":"Game","sources":[{{"files":[{{"extension":"sfc","sha256":"{digest}","size":1024}}]}}]}}]}}"#,
    ));
    ingest_system(&conn, &SystemMetadata::default(), &list, None).unwrap();

    let (blob, size): (Vec<u8>, i64) = conn
        .query_row("SELECT sha256, size FROM GamesSources", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(blob, hex::decode(digest).unwrap());
    assert_eq!(blob.len(), 32);
    assert_eq!(size, 1024);
}

#[test]
fn bad_hash_hex_rolls_everything_back() {
    let conn = open_memory().unwrap();
    let list = games(
        r#"{"games":[
            {"name":"Fine Game"},
            {"name":"Broken Game","sources":[{"files":[{"sha256":"zz","size":1}]}]}
        ]}"#,
    );
    let err = ingest_system(&conn, &SystemMetadata::default(), &list, None).unwrap_err();
    assert!(matches!(err, IngestError::BadHash { .. }));
    // The first game must not survive the aborted transaction.
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM GamesId"), 0);
}

#[test]
fn duplicate_fullname_aborts_the_transaction() {
    let conn = open_memory().unwrap();
    let list = games(r#"{"games":[{"name":"Twice"},{"name":"Twice"}]}"#);
    let err = ingest_system(&conn, &SystemMetadata::default(), &list, None).unwrap_err();
    assert!(matches!(err, IngestError::Sqlite(_)));
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM GamesId"), 0);
}

#[test]
fn playlists_create_or_reuse_rows() {
    let conn = open_memory().unwrap();
    let list = games(
        r#"{"games":[
            {"name":"A","playlists":{"favorites":1}},
            {"name":"B","playlists":{"favorites":2,"speedruns":1}}
        ]}"#,
    );
    ingest_system(&conn, &SystemMetadata::default(), &list, None).unwrap();

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM Playlists"), 2);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM PlaylistsGamesId"), 3);
    let priority: i64 = conn
        .query_row(
            "SELECT priority FROM PlaylistsGamesId
             JOIN Playlists ON Playlists.id = PlaylistsGamesId.playlistId
             JOIN GamesId ON GamesId.id = PlaylistsGamesId.gameId
             WHERE Playlists.name = 'favorites' AND GamesId.fullname = 'B'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(priority, 2);
}

#[test]
fn system_metadata_lands_in_lookup_tables() {
    let conn = open_memory().unwrap();
    let meta: SystemMetadata = serde_json::from_str(
        r#"{"name":"Super Famicom","manufacturer":"Nintendo","generation":4,"tags":["16-bit","cartridge"]}"#,
    )
    .unwrap();
    let list = games(r#"{"version":"20230601","games":[]}"#);
    ingest_system(&conn, &meta, &list, None).unwrap();

    // Only string-valued keys become Metadata rows; "generation" is numeric.
    let name: String = conn
        .query_row(
            "SELECT value FROM Metadata WHERE key = 'name'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(name, "Super Famicom");
    assert_eq!(
        count(&conn, "SELECT COUNT(*) FROM Metadata WHERE key = 'generation'"),
        0
    );
    let version: String = conn
        .query_row(
            "SELECT value FROM Metadata WHERE key = 'version'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(version, "20230601");

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM SystemTags"), 2);
}

#[test]
fn ingestion_reports_progress() {
    use std::cell::Cell;

    let conn = open_memory().unwrap();
    let list = games(r#"{"games":[{"name":"A"},{"name":"B"},{"name":"C"}]}"#);
    let seen = Cell::new(0usize);
    let callback = |done: usize, total: usize, _name: &str| {
        assert_eq!(total, 3);
        seen.set(done);
    };
    let stats = ingest_system(&conn, &SystemMetadata::default(), &list, Some(&callback)).unwrap();
    assert_eq!(seen.get(), 3);
    assert_eq!(stats.games, 3);
}
