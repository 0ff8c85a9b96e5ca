//! `SQLite` schema definitions.

/// SQL statement to create the formations table.
///
/// `created_at` is RFC 3339 UTC with a fixed-width fraction so that text
/// order matches time order.
pub const CREATE_FORMATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS formations (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    description TEXT NOT NULL CHECK (length(trim(description)) > 0),
    duration TEXT,
    students TEXT,
    modules TEXT,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create an index on `created_at` for ordered listing.
pub const CREATE_CREATED_AT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_formations_created_at ON formations(created_at ASC)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to create the sessions table (schema version 2).
pub const CREATE_SESSIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    token TEXT PRIMARY KEY NOT NULL,
    email TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
)
";

/// SQL statement to create an index on session expiry for pruning.
pub const CREATE_SESSIONS_EXPIRY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)
";

/// Base schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_FORMATIONS_TABLE,
    CREATE_CREATED_AT_INDEX,
    CREATE_METADATA_TABLE,
];
