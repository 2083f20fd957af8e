use std::fs;
use std::io::Read;

use coredist_build::{BuildStepRegistry, ScriptArchiveStep, Transformer};
use coredist_integrity::{HashAlgorithm, hash_and_size};

#[test]
fn script_archive_step_wraps_payload_in_one_entry() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();

    fs::create_dir_all(source.path().join("systems/dos")).unwrap();
    fs::write(source.path().join("systems/dos/loader.js"), "// loader\n").unwrap();
    fs::write(source.path().join("systems/dos/system.toml"), "kind = \"dos\"\n").unwrap();

    let mut registry = BuildStepRegistry::new();
    registry.register(
        "systems/dos",
        Box::new(ScriptArchiveStep {
            script: "loader.js".to_string(),
            archive_name: "loader.json.zip".to_string(),
            entry_name: "loader.json".to_string(),
        }),
    );
    Transformer::new(source.path(), registry)
        .run(dest.path())
        .unwrap();

    let out = dest.path().join("systems/dos");
    // Regular contents still ship, with conversions applied.
    assert!(out.join("loader.js").exists());
    assert!(out.join("system.json").exists());

    // The archive holds exactly one JSON entry describing the script.
    let file = fs::File::open(out.join("loader.json.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    assert_eq!(archive.len(), 1);

    let mut entry = archive.by_name("loader.json").unwrap();
    let mut body = String::new();
    entry.read_to_string(&mut body).unwrap();
    let payload: serde_json::Value = serde_json::from_str(&body).unwrap();

    let (size, sha256) =
        hash_and_size(&out.join("loader.js"), HashAlgorithm::Sha256).unwrap();
    assert_eq!(payload["url"], "loader.js");
    assert_eq!(payload["size"], size);
    assert_eq!(payload["sha256"], serde_json::Value::String(sha256));
}
