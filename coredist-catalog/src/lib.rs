//! Data model types, version aggregation, and game-name parsing for the
//! distribution catalog.
//!
//! This crate defines the JSON documents that make up a built catalog
//! (catalog → cores/systems/releases → entries → files) and the flat
//! per-system game list consumed by `coredist-db`. It has no filesystem or
//! database dependencies; consumers use these types for serialization and
//! pass them to `coredist-build` and `coredist-db` for the heavy lifting.

pub mod name_parser;
pub mod types;
pub mod version;

pub use name_parser::{ParsedGameName, parse_game_name};
pub use types::*;
pub use version::{VersionError, compare, fold_version, max_version};
