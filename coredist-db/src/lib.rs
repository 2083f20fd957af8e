//! SQLite identification database for one system's game list.
//!
//! Normalizes a flat game list into a relational store: free-text names are
//! parsed into title/tags/regions/languages, lookup values are deduplicated,
//! and every row for one system is written inside a single transaction. The
//! whole database is rebuilt from scratch on each run — there is no
//! migration path, only the fixed schema contract in `schema.sql`.

pub mod ingest;
pub mod schema;

pub use ingest::{IngestError, IngestStats, SystemMetadata, find_or_create, ingest_system};
pub use schema::{SchemaError, create_database, open_memory};
