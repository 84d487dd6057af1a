//! `SQLite` schema definitions for the account store.

/// SQL statement to create the accounts table.
///
/// Each row holds one whole account record as JSON, mirroring the document
/// backend. `rowid` order is insertion order and survives upserts.
pub const CREATE_ACCOUNTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS accounts (
    phone TEXT PRIMARY KEY,
    record TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_ACCOUNTS_TABLE, CREATE_METADATA_TABLE];
