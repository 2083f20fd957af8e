//! Build step that ships a script asset wrapped in a one-entry archive.
//!
//! Some systems distribute an auxiliary loader script next to their catalog
//! documents. This step copies the directory as usual, then writes a
//! compressed single-entry archive containing a compact JSON payload with
//! the script's url, size, and content hash.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use coredist_integrity::{HashAlgorithm, hash_and_size};

use crate::error::BuildError;
use crate::step::{BuildStep, DirCopier};

pub struct ScriptArchiveStep {
    /// Script file, relative to the step's directory.
    pub script: String,
    /// Archive file name written into the destination.
    pub archive_name: String,
    /// Name of the JSON entry inside the archive.
    pub entry_name: String,
}

impl BuildStep for ScriptArchiveStep {
    fn build(&self, copier: &DirCopier<'_>, dest: &Path) -> Result<(), BuildError> {
        // The directory's regular contents still ship; the archive is a
        // side artifact.
        for child in copier.children()? {
            copier.copy(&child, None)?;
        }

        let script_path = copier.resolve(&self.script)?;
        let (size, sha256) = hash_and_size(&script_path, HashAlgorithm::Sha256)?;
        let payload = serde_json::json!({
            "url": self.script,
            "size": size,
            "sha256": sha256,
        });
        let body = payload.to_string();

        let archive_path = dest.join(&self.archive_name);
        let file = File::create(&archive_path).map_err(|e| BuildError::io(&archive_path, e))?;
        let mut zip = ZipWriter::new(file);
        zip.start_file(self.entry_name.as_str(), SimpleFileOptions::default())?;
        zip.write_all(body.as_bytes())
            .map_err(|e| BuildError::io(&archive_path, e))?;
        zip.finish()?;

        log::debug!(
            "wrote script archive {} ({} bytes payload)",
            archive_path.display(),
            body.len()
        );
        Ok(())
    }
}
