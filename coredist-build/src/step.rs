//! Directory-local build overrides.
//!
//! Any source directory may override the default "copy every child"
//! behavior with a [`BuildStep`]. Steps are registered once at startup in a
//! [`BuildStepRegistry`] keyed by the directory's source-relative path; the
//! registry is the only indirection point, and the copy helper handed to a
//! step is scoped to the step's own directory (no process-wide working
//! directory changes).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BuildError;
use crate::transform::Transformer;

/// A directory-local build override.
///
/// When the transformer reaches a registered directory, the step is fully
/// responsible for populating the destination; the transformer does not
/// also copy files the step chose to skip.
pub trait BuildStep {
    fn build(&self, copier: &DirCopier<'_>, dest: &Path) -> Result<(), BuildError>;
}

/// Registry mapping source-relative directory paths to build steps.
#[derive(Default)]
pub struct BuildStepRegistry {
    steps: HashMap<PathBuf, Box<dyn BuildStep>>,
}

impl BuildStepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, dir: impl Into<PathBuf>, step: Box<dyn BuildStep>) {
        self.steps.insert(dir.into(), step);
    }

    pub fn get(&self, dir: &Path) -> Option<&dyn BuildStep> {
        self.steps.get(dir).map(|s| s.as_ref())
    }
}

/// Copy helper handed to a build step, bound to the step's own directory on
/// the source side and its resolved destination on the output side.
pub struct DirCopier<'a> {
    transformer: &'a Transformer,
    base: PathBuf,
    dest: PathBuf,
}

impl<'a> DirCopier<'a> {
    pub(crate) fn new(transformer: &'a Transformer, base: PathBuf, dest: PathBuf) -> Self {
        Self {
            transformer,
            base,
            dest,
        }
    }

    /// Copy `source` (relative to the step's directory) into the step's
    /// destination, optionally under a different relative name. The usual
    /// format conversions and sandbox checks apply.
    pub fn copy(&self, source: &str, dest: Option<&str>) -> Result<(), BuildError> {
        let rel = self.base.join(source);
        let out = self.dest.join(dest.unwrap_or(source));
        self.transformer.copy(&rel, &out)
    }

    /// Absolute path of a file inside the step's directory, sandbox-checked.
    pub fn resolve(&self, source: &str) -> Result<PathBuf, BuildError> {
        self.transformer.resolve(&self.base.join(source))
    }

    /// Names of the immediate children of the step's directory.
    pub fn children(&self) -> Result<Vec<String>, BuildError> {
        let dir = self.transformer.resolve(&self.base)?;
        let entries = fs::read_dir(&dir).map_err(|e| BuildError::io(&dir, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| BuildError::io(&dir, e))?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// The step's resolved destination directory.
    pub fn dest_dir(&self) -> &Path {
        &self.dest
    }
}
