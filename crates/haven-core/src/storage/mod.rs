//! Local persistence.
//!
//! One sqlite database per session holds the identity singleton, the
//! attestation and membership audit trails, the room catalog, the capped
//! encrypted message log, and abuse reports.

mod database;
mod schema;

pub use database::{Database, DatabaseConfig};
pub use schema::SCHEMA_VERSION;

/// Default database file name.
pub const DEFAULT_DB_NAME: &str = "haven.db";
