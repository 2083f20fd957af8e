//! Catalog version propagation.
//!
//! Runs after the tree transformer over the produced distribution tree.
//! Three idempotent passes (cores, systems, releases) recompute every
//! distributable file's size, hash, and optional detached signature, and
//! re-derive each level's version from its children, folding in the
//! previously stamped value so a rerun never moves a version backward.
//!
//! The root catalog version is the build date, not a child maximum: the
//! root stamp answers "when was this distribution produced", nested stamps
//! answer "what is the newest content reachable here".
//!
//! Every `url` field is a path relative to the distribution root.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use coredist_catalog::types::{
    Artifact, Catalog, Channel, CoreDoc, DocRef, EntryIndex, LATEST_TAG, ReleaseFile, ReleasesDoc,
    SystemDoc,
};
use coredist_catalog::version::{fold_version, max_version};
use coredist_integrity::{
    HashAlgorithm, VerifyingKey, hash_and_size, release_public_key, verify_signature,
};

use crate::error::BuildError;

pub struct Propagator {
    dist_root: PathBuf,
    algo: HashAlgorithm,
    key: VerifyingKey,
    build_date: Option<String>,
}

impl Propagator {
    /// Create a propagator over a built distribution tree, verifying
    /// signatures against the embedded release key.
    pub fn new(dist_root: impl Into<PathBuf>) -> Result<Self, BuildError> {
        Ok(Self {
            dist_root: dist_root.into(),
            algo: HashAlgorithm::Sha256,
            key: release_public_key()?,
            build_date: None,
        })
    }

    /// Override the verifying key (tests sign with their own key pair).
    pub fn with_verifying_key(mut self, key: VerifyingKey) -> Self {
        self.key = key;
        self
    }

    /// Override the root build-date stamp instead of using today's date.
    pub fn with_build_date(mut self, date: impl Into<String>) -> Self {
        self.build_date = Some(date.into());
        self
    }

    /// Run all three passes and restamp `catalog.json`.
    pub fn run(&self) -> Result<Catalog, BuildError> {
        let catalog_path = self.dist_root.join("catalog.json");
        let mut catalog: Catalog = self.read_json(&catalog_path)?;

        catalog.cores.version = self.propagate_cores(&catalog.cores)?;
        catalog.systems.version = self.propagate_systems(&catalog.systems)?;
        catalog.releases.version = self.propagate_releases(&catalog.releases)?;

        catalog.version = match &self.build_date {
            Some(date) => date.clone(),
            None => chrono::Local::now().format("%Y%m%d").to_string(),
        };

        self.write_json(&catalog_path, &catalog)?;
        log::info!(
            "catalog stamped: build {}, cores {}, systems {}, releases {}",
            catalog.version,
            catalog.cores.version,
            catalog.systems.version,
            catalog.releases.version
        );
        Ok(catalog)
    }

    // ── Cores pass ──────────────────────────────────────────────────────────

    fn propagate_cores(&self, index_ref: &DocRef) -> Result<String, BuildError> {
        let index_path = self.dist_root.join(&index_ref.url);
        let mut index: EntryIndex = self.read_json(&index_path)?;

        let mut versions = Vec::new();
        for entry in index.values_mut() {
            let doc_path = self.dist_root.join(&entry.url);
            let mut doc: CoreDoc = self.read_json(&doc_path)?;

            let mut release_versions = Vec::new();
            for release in &mut doc.releases {
                for file in &mut release.files {
                    self.stamp_file(file)?;
                }
                release_versions.push(release.version.clone());
            }

            doc.version = fold_version(&doc.version, release_versions)?;
            self.write_json(&doc_path, &doc)?;

            entry.version = doc.version.clone();
            versions.push(doc.version.clone());
        }

        self.write_json(&index_path, &index)?;
        Ok(fold_version(&index_ref.version, versions)?)
    }

    // ── Systems pass ────────────────────────────────────────────────────────

    fn propagate_systems(&self, index_ref: &DocRef) -> Result<String, BuildError> {
        let index_path = self.dist_root.join(&index_ref.url);
        let mut index: EntryIndex = self.read_json(&index_path)?;

        let mut versions = Vec::new();
        for entry in index.values_mut() {
            let doc_path = self.dist_root.join(&entry.url);
            let mut doc: SystemDoc = self.read_json(&doc_path)?;

            let mut release_versions = Vec::new();
            for release in &mut doc.releases {
                for file in &mut release.files {
                    self.stamp_file(file)?;
                }
                release_versions.push(release.version.clone());
            }

            // The games database is a versioned source: a newer one raises
            // the system's version.
            if let Some(games_db) = &mut doc.games_db {
                self.stamp_artifact(games_db)?;
                if let Some(v) = &games_db.version {
                    release_versions.push(v.clone());
                }
            }

            // The compiled db is a derived cache: hash and size only.
            if let Some(db) = &mut doc.db {
                self.stamp_artifact(db)?;
            }

            doc.version = fold_version(&doc.version, release_versions)?;
            self.write_json(&doc_path, &doc)?;

            entry.version = doc.version.clone();
            versions.push(doc.version.clone());
        }

        self.write_json(&index_path, &index)?;
        Ok(fold_version(&index_ref.version, versions)?)
    }

    // ── Releases pass ───────────────────────────────────────────────────────

    fn propagate_releases(&self, doc_ref: &DocRef) -> Result<String, BuildError> {
        let doc_path = self.dist_root.join(&doc_ref.url);
        let mut channels: ReleasesDoc = self.read_json(&doc_path)?;

        let mut versions = Vec::new();
        for channel in channels.values_mut() {
            self.propagate_channel(channel)?;
            versions.push(channel.version.clone());
        }

        self.write_json(&doc_path, &channels)?;
        Ok(fold_version(&doc_ref.version, versions)?)
    }

    fn propagate_channel(&self, channel: &mut Channel) -> Result<(), BuildError> {
        let mut pinned = None;
        let mut entry_versions = Vec::new();

        for entry in &mut channel.entries {
            for file in &mut entry.files {
                self.stamp_file(file)?;
            }
            // "latest" is an explicit pointer, not necessarily the newest
            // by date.
            if pinned.is_none() && entry.tags.iter().any(|t| t == LATEST_TAG) {
                pinned = Some(entry.version.clone());
            }
            entry_versions.push(entry.version.clone());
        }

        channel.version = match pinned {
            Some(version) => version,
            None => max_version(entry_versions)?,
        };
        Ok(())
    }

    // ── Stamping ────────────────────────────────────────────────────────────

    fn stamp_file(&self, file: &mut ReleaseFile) -> Result<(), BuildError> {
        let path = self.dist_root.join(&file.url);
        let (size, digest) = hash_and_size(&path, self.algo)?;
        file.size = size;
        file.sha256 = digest;
        file.signature = verify_signature(&path, &self.key)?;
        Ok(())
    }

    fn stamp_artifact(&self, artifact: &mut Artifact) -> Result<(), BuildError> {
        let path = self.dist_root.join(&artifact.url);
        let (size, digest) = hash_and_size(&path, self.algo)?;
        artifact.size = size;
        artifact.sha256 = digest;
        Ok(())
    }

    // ── JSON I/O ────────────────────────────────────────────────────────────

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, BuildError> {
        let text = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| BuildError::json(path, e))
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), BuildError> {
        let json = serde_json::to_string(value).map_err(|e| BuildError::json(path, e))?;
        fs::write(path, json).map_err(|e| BuildError::io(path, e))
    }
}
