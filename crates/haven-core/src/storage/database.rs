//! Local database operations.
//!
//! Every multi-statement mutation runs inside a transaction so the
//! durable state can never be observed (or left) between steps: append
//! plus eviction is one step, join plus member-count increment is one
//! step, and the identity cascade is one step. In-memory callers update
//! their mirrors only after the transaction commits, which is what keeps
//! the rollback rule of the error contract: a failed persist leaves both
//! sides at the pre-mutation state.

use super::schema::{CREATE_SCHEMA, SCHEMA_VERSION};
use crate::crypto::proof::ProofBackend;
use crate::error::{Error, Result};
use crate::identity::{Attestation, Category, Identity, SecretSeed, SEED_SIZE};
use crate::membership::Membership;
use crate::rooms::{Room, StoredMessage};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the database file.
    pub path: String,
    /// Whether to use an in-memory database (for testing).
    pub in_memory: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: super::DEFAULT_DB_NAME.to_string(),
            in_memory: false,
        }
    }
}

/// Local database handle.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the database.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let conn = if config.in_memory {
            Connection::open_in_memory()
        } else {
            if let Some(parent) = Path::new(&config.path).parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::Storage(format!("failed to create directory: {}", e)))?;
            }

            Connection::open_with_flags(
                &config.path,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
        }
        .map_err(|e| Error::Storage(format!("failed to open database: {}", e)))?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = DELETE;
            PRAGMA secure_delete = ON;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            "#,
        )
        .map_err(|e| Error::Storage(format!("failed to set pragmas: {}", e)))?;

        let db = Self { conn };
        db.init_schema()?;

        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(&CREATE_SCHEMA.replace('?', &SCHEMA_VERSION.to_string()))
            .map_err(|e| Error::Storage(format!("failed to create schema: {}", e)))?;
        Ok(())
    }

    // ---- identity ----

    /// Store the session identity. Fails if one is already stored.
    pub fn store_identity(&self, identity: &Identity) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO identity (id, identity_id, alias, secret_seed, created_at)
                 VALUES (1, ?, ?, ?, ?)",
                params![
                    identity.id,
                    identity.alias,
                    identity.seed().as_bytes().as_slice(),
                    identity.created_at
                ],
            )
            .map_err(|e| Error::Storage(format!("failed to store identity: {}", e)))?;
        Ok(())
    }

    /// Load the session identity, re-deriving its public values.
    pub fn load_identity(&self, backend: &dyn ProofBackend) -> Result<Option<Identity>> {
        let mut stmt = self
            .conn
            .prepare("SELECT identity_id, alias, secret_seed, created_at FROM identity WHERE id = 1")?;

        let row = stmt.query_row([], |row| {
            let identity_id: String = row.get(0)?;
            let alias: String = row.get(1)?;
            let seed: Vec<u8> = row.get(2)?;
            let created_at: i64 = row.get(3)?;
            Ok((identity_id, alias, seed, created_at))
        });

        match row {
            Ok((identity_id, alias, seed, created_at)) => {
                let seed: [u8; SEED_SIZE] = seed
                    .try_into()
                    .map_err(|_| Error::Storage("stored seed has wrong length".into()))?;
                let identity = Identity::from_parts(
                    SecretSeed::from_bytes(seed),
                    identity_id,
                    alias,
                    created_at,
                    backend,
                )?;
                Ok(Some(identity))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::Storage(e.to_string())),
        }
    }

    /// Delete the identity and everything derived from it, in one step:
    /// attestations, membership rows (decrementing member counts for the
    /// active ones), the locally cached message log, and the identity row
    /// itself. Idempotent: a missing identity deletes nothing.
    pub fn delete_identity_cascade(&self, identity_id: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "UPDATE rooms SET member_count = CASE WHEN member_count > 0
                 THEN member_count - 1 ELSE 0 END
             WHERE id IN (SELECT group_id FROM memberships
                          WHERE identity_id = ? AND active = 1)",
            params![identity_id],
        )?;
        tx.execute(
            "DELETE FROM memberships WHERE identity_id = ?",
            params![identity_id],
        )?;
        tx.execute(
            "DELETE FROM attestations WHERE identity_id = ?",
            params![identity_id],
        )?;
        // The message log is this session's local cache; it does not
        // survive the identity that populated it.
        tx.execute("DELETE FROM messages", [])?;
        tx.execute("DELETE FROM identity WHERE id = 1", [])?;

        tx.commit()?;
        Ok(())
    }

    // ---- attestations ----

    /// Insert a new attestation, superseding any active one.
    pub fn insert_attestation(&self, attestation: &Attestation) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "UPDATE attestations SET active = 0 WHERE identity_id = ? AND active = 1",
            params![attestation.identity_id],
        )?;
        tx.execute(
            "INSERT INTO attestations (identity_id, category, issued_at, proof, active)
             VALUES (?, ?, ?, ?, 1)",
            params![
                attestation.identity_id,
                attestation.category.as_str(),
                attestation.issued_at,
                attestation.proof
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// The active attestation for an identity, if any.
    pub fn active_attestation(&self, identity_id: &str) -> Result<Option<Attestation>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, issued_at, proof FROM attestations
             WHERE identity_id = ? AND active = 1",
        )?;

        let row = stmt.query_row(params![identity_id], |row| {
            let category: String = row.get(0)?;
            let issued_at: i64 = row.get(1)?;
            let proof: Vec<u8> = row.get(2)?;
            Ok((category, issued_at, proof))
        });

        match row {
            Ok((category, issued_at, proof)) => Ok(Some(Attestation {
                identity_id: identity_id.to_string(),
                category: Category::parse(&category)?,
                issued_at,
                proof,
                active: true,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::Storage(e.to_string())),
        }
    }

    /// Number of attestation rows for an identity (audit trail depth).
    pub fn attestation_count(&self, identity_id: &str) -> Result<u64> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM attestations WHERE identity_id = ?",
            params![identity_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ---- memberships ----

    /// Insert a membership row and bump the room's member count, in one
    /// step.
    pub fn insert_membership(&self, membership: &Membership) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO memberships
                 (identity_id, group_id, joined_at, membership_proof, bond_amount, active)
             VALUES (?, ?, ?, ?, ?, 1)",
            params![
                membership.identity_id,
                membership.group_id,
                membership.joined_at,
                membership.membership_proof,
                membership.bond_amount
            ],
        )?;
        tx.execute(
            "UPDATE rooms SET member_count = member_count + 1 WHERE id = ?",
            params![membership.group_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Deactivate the active membership row for a pair and decrement the
    /// room's member count (floored at zero), in one step.
    pub fn deactivate_membership(&self, identity_id: &str, group_id: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "UPDATE memberships SET active = 0
             WHERE identity_id = ? AND group_id = ? AND active = 1",
            params![identity_id, group_id],
        )?;
        tx.execute(
            "UPDATE rooms SET member_count = CASE WHEN member_count > 0
                 THEN member_count - 1 ELSE 0 END
             WHERE id = ?",
            params![group_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// The active membership for a pair, if any.
    pub fn active_membership(
        &self,
        identity_id: &str,
        group_id: &str,
    ) -> Result<Option<Membership>> {
        let mut stmt = self.conn.prepare(
            "SELECT joined_at, membership_proof, bond_amount FROM memberships
             WHERE identity_id = ? AND group_id = ? AND active = 1",
        )?;

        let row = stmt.query_row(params![identity_id, group_id], |row| {
            let joined_at: i64 = row.get(0)?;
            let membership_proof: Vec<u8> = row.get(1)?;
            let bond_amount: u64 = row.get(2)?;
            Ok((joined_at, membership_proof, bond_amount))
        });

        match row {
            Ok((joined_at, membership_proof, bond_amount)) => Ok(Some(Membership {
                identity_id: identity_id.to_string(),
                group_id: group_id.to_string(),
                joined_at,
                membership_proof,
                bond_amount,
                active: true,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::Storage(e.to_string())),
        }
    }

    /// Total membership rows for a pair (audit trail depth).
    pub fn membership_row_count(&self, identity_id: &str, group_id: &str) -> Result<u64> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM memberships WHERE identity_id = ? AND group_id = ?",
            params![identity_id, group_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Membership rows remaining for an identity (any state).
    pub fn memberships_for_identity(&self, identity_id: &str) -> Result<u64> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM memberships WHERE identity_id = ?",
            params![identity_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ---- rooms ----

    /// Seed the room catalog if it is empty.
    pub fn seed_rooms_if_empty(&self, rooms: &[Room]) -> Result<()> {
        let count: u64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM rooms", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        for room in rooms {
            tx.execute(
                "INSERT INTO rooms (id, name, description, member_count, created_at)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    room.id,
                    room.name,
                    room.description,
                    room.member_count,
                    room.created_at
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// All rooms in insertion order.
    pub fn list_rooms(&self) -> Result<Vec<Room>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, member_count, created_at
             FROM rooms ORDER BY rowid",
        )?;

        let rooms = stmt
            .query_map([], |row| {
                Ok(Room {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    member_count: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rooms)
    }

    /// A single room by id.
    pub fn room(&self, room_id: &str) -> Result<Option<Room>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, member_count, created_at FROM rooms WHERE id = ?",
        )?;

        let row = stmt.query_row(params![room_id], |row| {
            Ok(Room {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                member_count: row.get(3)?,
                created_at: row.get(4)?,
            })
        });

        match row {
            Ok(room) => Ok(Some(room)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::Storage(e.to_string())),
        }
    }

    // ---- messages ----

    /// Append a message and evict oldest rows beyond `cap`, in one step.
    /// Readers never observe the log above the cap.
    pub fn append_message(&self, message: &StoredMessage, cap: usize) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO messages
                 (message_id, room_id, sender_commitment, ciphertext, nullifier, sent_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                message.id,
                message.room_id,
                message.sender_commitment,
                message.ciphertext,
                message.nullifier,
                message.sent_at
            ],
        )?;
        tx.execute(
            "DELETE FROM messages WHERE room_id = ?1 AND seq NOT IN
                 (SELECT seq FROM messages WHERE room_id = ?1
                  ORDER BY seq DESC LIMIT ?2)",
            params![message.room_id, cap as i64],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// All messages for a room, chronological. Repeatable: the same query
    /// without intervening sends returns the same sequence.
    pub fn messages(&self, room_id: &str) -> Result<Vec<StoredMessage>> {
        let mut stmt = self.conn.prepare(
            "SELECT message_id, sender_commitment, ciphertext, nullifier, sent_at
             FROM messages WHERE room_id = ? ORDER BY seq",
        )?;

        let messages = stmt
            .query_map(params![room_id], |row| {
                Ok(StoredMessage {
                    id: row.get(0)?,
                    room_id: room_id.to_string(),
                    sender_commitment: row.get(1)?,
                    ciphertext: row.get(2)?,
                    nullifier: row.get(3)?,
                    sent_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(messages)
    }

    /// Number of messages currently retained for a room.
    pub fn message_count(&self, room_id: &str) -> Result<u64> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE room_id = ?",
            params![room_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Drop all messages for a room.
    pub fn clear_room_messages(&self, room_id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM messages WHERE room_id = ?", params![room_id])?;
        Ok(())
    }

    /// Nullifiers of messages sent at or after `since`, for repopulating
    /// the in-memory registry on open.
    pub fn nullifiers_since(&self, since: i64) -> Result<Vec<(String, Vec<u8>, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT room_id, nullifier, sent_at FROM messages WHERE sent_at >= ?",
        )?;

        let rows = stmt
            .query_map(params![since], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    // ---- reports ----

    /// Persist an abuse report.
    pub fn insert_report(
        &self,
        report_id: &str,
        room_id: &str,
        reason: &str,
        proof: &[u8],
        created_at: i64,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO reports (report_id, room_id, reason, proof, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![report_id, room_id, reason, proof, created_at],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::proof::HashCommitmentBackend;
    use crate::rooms::default_rooms;

    fn open_db() -> Database {
        Database::open(&DatabaseConfig {
            path: String::new(),
            in_memory: true,
        })
        .expect("open in-memory db")
    }

    #[test]
    fn test_identity_round_trip() {
        let db = open_db();
        let backend = HashCommitmentBackend;

        assert!(db.load_identity(&backend).expect("load").is_none());

        let identity = Identity::generate(&backend, 1_700_000_000).expect("generate");
        db.store_identity(&identity).expect("store");

        let loaded = db
            .load_identity(&backend)
            .expect("load")
            .expect("identity present");
        assert_eq!(loaded.id, identity.id);
        assert_eq!(loaded.public_commitment, identity.public_commitment);
    }

    #[test]
    fn test_second_identity_rejected_by_schema() {
        let db = open_db();
        let backend = HashCommitmentBackend;

        let a = Identity::generate(&backend, 0).expect("generate");
        let b = Identity::generate(&backend, 0).expect("generate");

        db.store_identity(&a).expect("store");
        assert!(db.store_identity(&b).is_err());
    }

    #[test]
    fn test_room_seeding_is_idempotent() {
        let db = open_db();
        db.seed_rooms_if_empty(&default_rooms(0)).expect("seed");
        db.seed_rooms_if_empty(&default_rooms(99)).expect("reseed");

        let rooms = db.list_rooms().expect("list");
        assert_eq!(rooms.len(), 4);
        assert_eq!(rooms[0].created_at, 0);
    }

    #[test]
    fn test_append_message_evicts_oldest() {
        let db = open_db();
        db.seed_rooms_if_empty(&default_rooms(0)).expect("seed");

        for i in 0..5u32 {
            let message = StoredMessage {
                id: format!("m{}", i),
                room_id: "general-support".into(),
                sender_commitment: "c".into(),
                ciphertext: vec![0; 16],
                nullifier: vec![i as u8; 32],
                sent_at: i as i64,
            };
            db.append_message(&message, 3).expect("append");
        }

        let messages = db.messages("general-support").expect("messages");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].id, "m2");
        assert_eq!(messages[2].id, "m4");
    }
}
