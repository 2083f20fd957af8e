use std::path::Path;

use thiserror::Error;

/// Errors raised by the build pipeline. All of them are fatal: nothing is
/// caught and retried, every failure unwinds to the caller with the
/// offending artifact in the message.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("source path escapes the build root: {path}")]
    SandboxViolation { path: String },

    #[error("build step failed in {dir}: {source}")]
    Step {
        dir: String,
        #[source]
        source: Box<BuildError>,
    },

    #[error("TOML parse error in {path}: {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error(transparent)]
    Integrity(#[from] coredist_integrity::IntegrityError),

    #[error(transparent)]
    Version(#[from] coredist_catalog::version::VersionError),
}

impl BuildError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn toml(path: &Path, source: toml::de::Error) -> Self {
        Self::Toml {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn sandbox(path: &Path) -> Self {
        Self::SandboxViolation {
            path: path.display().to_string(),
        }
    }
}
