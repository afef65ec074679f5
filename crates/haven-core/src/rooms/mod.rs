//! Rooms and the encrypted message log.
//!
//! A room is externally provisioned metadata plus an append-only,
//! bounded log of encrypted messages. Message plaintext is encrypted
//! under a key derived from the room's shared secret (distribution of
//! that secret is a collaborator concern, see
//! [`RoomSecretProvider`](crate::session::RoomSecretProvider)); the room
//! id is bound as AEAD associated data so a ciphertext cannot be replayed
//! into another room's log.

use crate::crypto::{self, KEY_SIZE};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Maximum messages retained per room before oldest-first eviction.
pub const DEFAULT_MESSAGE_CAP: usize = 100;

/// Room metadata.
///
/// `member_count` is derived: it is mutated only by join/leave and by
/// the cascade of an identity deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Stable room id, e.g. `anxiety-support`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Number of active memberships.
    pub member_count: u64,
    /// Creation time, Unix seconds.
    pub created_at: i64,
}

/// The default room catalog, seeded when the store is empty.
pub fn default_rooms(now: i64) -> Vec<Room> {
    let rooms = [
        (
            "general-support",
            "General Support",
            "Open support for all mental health topics",
        ),
        (
            "anxiety-support",
            "Anxiety Support",
            "Support group for anxiety-related concerns",
        ),
        (
            "depression-support",
            "Depression Support",
            "Support group for depression-related concerns",
        ),
        (
            "crisis-support",
            "Crisis Support",
            "Immediate support for crisis situations",
        ),
    ];

    rooms
        .iter()
        .map(|(id, name, description)| Room {
            id: (*id).to_string(),
            name: (*name).to_string(),
            description: (*description).to_string(),
            member_count: 0,
            created_at: now,
        })
        .collect()
}

/// An accepted, stored message. Immutable once accepted; plaintext never
/// appears here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Opaque message id (random, hex-encoded).
    pub id: String,
    /// Room the message belongs to.
    pub room_id: String,
    /// Sender's public commitment (hex). The only sender-linkable value.
    pub sender_commitment: String,
    /// AEAD ciphertext, nonce-prepended.
    #[serde(with = "hex::serde")]
    pub ciphertext: Vec<u8>,
    /// Rate-limit nullifier the message was accepted under.
    #[serde(with = "hex::serde")]
    pub nullifier: Vec<u8>,
    /// Send time, Unix seconds.
    pub sent_at: i64,
}

/// Encrypt plaintext for a room.
pub fn encrypt_message(
    room_id: &str,
    room_secret: &[u8; KEY_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let key = crypto::derive_room_key(room_id, room_secret)?;
    crypto::encrypt_with_random_nonce(&key, plaintext, room_id.as_bytes())
}

/// Decrypt a stored message with the room key material.
///
/// Fails with [`Error::DecryptionFailed`](crate::Error::DecryptionFailed)
/// if the ciphertext is corrupt or the key does not match; callers must
/// treat that as "message unreadable", not a crash.
pub fn decrypt_message(
    message: &StoredMessage,
    room_secret: &[u8; KEY_SIZE],
) -> Result<Zeroizing<Vec<u8>>> {
    let key = crypto::derive_room_key(&message.room_id, room_secret)?;
    crypto::decrypt_with_prepended_nonce(&key, &message.ciphertext, message.room_id.as_bytes())
}
