//! Database schema definitions.

/// Schema version for migrations.
pub const SCHEMA_VERSION: u32 = 1;

/// SQL to create the database schema.
pub const CREATE_SCHEMA: &str = r#"
-- Identity (singleton per session)
CREATE TABLE IF NOT EXISTS identity (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    identity_id TEXT NOT NULL,
    alias TEXT NOT NULL,
    secret_seed BLOB NOT NULL,
    created_at INTEGER NOT NULL
);

-- Attestation history (most recent row per identity is the active one)
CREATE TABLE IF NOT EXISTS attestations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    identity_id TEXT NOT NULL,
    category TEXT NOT NULL,
    issued_at INTEGER NOT NULL,
    proof BLOB NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_attestations_identity ON attestations(identity_id, active);

-- Membership audit trail (at most one active row per identity/group pair)
CREATE TABLE IF NOT EXISTS memberships (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    identity_id TEXT NOT NULL,
    group_id TEXT NOT NULL REFERENCES rooms(id),
    joined_at INTEGER NOT NULL,
    membership_proof BLOB NOT NULL,
    bond_amount INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_memberships_pair ON memberships(identity_id, group_id, active);

-- Room catalog (rowid preserves insertion order for stable listing)
CREATE TABLE IF NOT EXISTS rooms (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    member_count INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

-- Encrypted message log, capped per room by the store
CREATE TABLE IF NOT EXISTS messages (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    message_id TEXT NOT NULL UNIQUE,
    room_id TEXT NOT NULL REFERENCES rooms(id),
    sender_commitment TEXT NOT NULL,
    ciphertext BLOB NOT NULL,
    nullifier BLOB NOT NULL,
    sent_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_room ON messages(room_id, seq);

-- Abuse reports (audit only)
CREATE TABLE IF NOT EXISTS reports (
    report_id TEXT PRIMARY KEY,
    room_id TEXT NOT NULL,
    reason TEXT NOT NULL,
    proof BLOB NOT NULL,
    created_at INTEGER NOT NULL
);

-- Settings
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL
);

INSERT OR REPLACE INTO settings (key, value) VALUES ('schema_version', ?);
"#;
