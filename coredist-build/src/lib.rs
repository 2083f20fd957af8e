//! Catalog build pipeline: tree transformation and version propagation.
//!
//! The [`transform::Transformer`] turns a source tree of declarative
//! metadata (TOML/JSON descriptors plus binary artifacts) into a raw
//! distribution tree; the [`propagate::Propagator`] then rewrites every
//! catalog document in that tree with fresh sizes, hashes, signatures, and
//! bottom-up aggregated versions. Both phases are full, stateless rebuilds:
//! any failure aborts the run, since a partially built distribution tree is
//! worse than no tree.

pub mod archive;
pub mod error;
pub mod propagate;
pub mod step;
pub mod transform;

pub use archive::ScriptArchiveStep;
pub use error::BuildError;
pub use propagate::Propagator;
pub use step::{BuildStep, BuildStepRegistry, DirCopier};
pub use transform::Transformer;
