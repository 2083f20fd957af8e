//! Recursive source → distribution tree transformer.
//!
//! Walks the source tree and produces the raw distribution tree:
//! - `.toml` descriptors are re-serialized as compact `.json`
//! - `.md` documentation is dropped
//! - `.json` files are parsed and minified (validation + minification)
//! - everything else is copied byte-for-byte, dereferencing symlinks
//!
//! A directory with a registered [`BuildStep`](crate::step::BuildStep) hands
//! control to the step instead of copying its children; the step is fully
//! responsible for populating the destination.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::BuildError;
use crate::step::{BuildStepRegistry, DirCopier};

pub struct Transformer {
    source_root: PathBuf,
    registry: BuildStepRegistry,
}

impl Transformer {
    pub fn new(source_root: impl Into<PathBuf>, registry: BuildStepRegistry) -> Self {
        Self {
            source_root: source_root.into(),
            registry,
        }
    }

    /// Transform the whole source tree into `dest_root`.
    pub fn run(&self, dest_root: &Path) -> Result<(), BuildError> {
        log::info!(
            "transforming {} -> {}",
            self.source_root.display(),
            dest_root.display()
        );
        self.copy(Path::new(""), dest_root)
    }

    /// Copy `source_rel` (relative to the source root) to the absolute
    /// destination path, applying format conversions and build steps.
    pub fn copy(&self, source_rel: &Path, dest: &Path) -> Result<(), BuildError> {
        let src = self.resolve(source_rel)?;
        // metadata() follows symlinks, so link targets are classified here.
        let meta = fs::metadata(&src).map_err(|e| BuildError::io(&src, e))?;

        if meta.is_dir() {
            fs::create_dir_all(dest).map_err(|e| BuildError::io(dest, e))?;

            if let Some(step) = self.registry.get(source_rel) {
                log::debug!("running build step for {}", source_rel.display());
                let copier = DirCopier::new(self, source_rel.to_path_buf(), dest.to_path_buf());
                return step.build(&copier, dest).map_err(|e| BuildError::Step {
                    dir: source_rel.display().to_string(),
                    source: Box::new(e),
                });
            }

            // Sibling order is not significant; each child is independent.
            let entries = fs::read_dir(&src).map_err(|e| BuildError::io(&src, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| BuildError::io(&src, e))?;
                let name = entry.file_name();
                self.copy(&source_rel.join(&name), &dest.join(&name))?;
            }
            return Ok(());
        }

        self.copy_file(&src, dest)
    }

    /// Resolve a source-relative path against the source root, rejecting
    /// absolute paths and any traversal that escapes the root.
    pub(crate) fn resolve(&self, source_rel: &Path) -> Result<PathBuf, BuildError> {
        if source_rel.is_absolute() {
            return Err(BuildError::sandbox(source_rel));
        }

        let mut resolved = self.source_root.clone();
        let mut depth = 0usize;
        for component in source_rel.components() {
            match component {
                Component::Normal(c) => {
                    resolved.push(c);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(BuildError::sandbox(source_rel));
                    }
                    resolved.pop();
                    depth -= 1;
                }
                _ => return Err(BuildError::sandbox(source_rel)),
            }
        }
        Ok(resolved)
    }

    fn copy_file(&self, src: &Path, dest: &Path) -> Result<(), BuildError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }

        let ext = src
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "toml" => {
                let text = fs::read_to_string(src).map_err(|e| BuildError::io(src, e))?;
                let value: toml::Value =
                    toml::from_str(&text).map_err(|e| BuildError::toml(src, e))?;
                let json = serde_json::to_string(&value).map_err(|e| BuildError::json(src, e))?;
                let out = dest.with_extension("json");
                fs::write(&out, json).map_err(|e| BuildError::io(&out, e))?;
            }
            "md" => {
                // Documentation is not distributed.
            }
            "json" => {
                let text = fs::read_to_string(src).map_err(|e| BuildError::io(src, e))?;
                let value: serde_json::Value =
                    serde_json::from_str(&text).map_err(|e| BuildError::json(src, e))?;
                let json = serde_json::to_string(&value).map_err(|e| BuildError::json(src, e))?;
                fs::write(dest, json).map_err(|e| BuildError::io(dest, e))?;
            }
            _ => {
                // fs::copy follows symlinks, copying the target's contents.
                fs::copy(src, dest).map_err(|e| BuildError::io(src, e))?;
            }
        }
        Ok(())
    }
}
