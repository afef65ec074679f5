//! Rate-limit nullifiers (RLN).
//!
//! A nullifier is `H(seed ‖ room ‖ epoch)` where the epoch is a coarse
//! time bucket. Within one epoch the derivation is constant, so a second
//! send from the same identity to the same room produces the same value
//! and is rejected, bounding flood rate to one accepted message per
//! identity per room per epoch without revealing which identity sent it.
//!
//! The registry is the shared mutable resource here: check-and-insert
//! must be atomic so two concurrent sends cannot both observe "not seen"
//! and both be accepted.

use crate::crypto::proof::{ProofBackend, ProofContext};
use crate::error::Result;
use crate::identity::Identity;
use crate::logging::RedactedBytes;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, trace};

/// Rate-limit policy constants.
///
/// The epoch width bounds the accepted send rate; it is policy, not
/// protocol, and tolerates a few seconds of clock skew at the default.
#[derive(Debug, Clone, Copy)]
pub struct RlnConfig {
    /// Width of one epoch in seconds.
    pub epoch_width_secs: i64,
    /// Epochs to remember seen nullifiers for. Anything older cannot
    /// collide with the current window and may be forgotten.
    pub retain_epochs: i64,
}

impl Default for RlnConfig {
    fn default() -> Self {
        Self {
            epoch_width_secs: 60,
            retain_epochs: 2,
        }
    }
}

impl RlnConfig {
    /// The epoch containing `timestamp`.
    pub fn epoch_for(&self, timestamp: i64) -> i64 {
        timestamp.div_euclid(self.epoch_width_secs)
    }
}

/// A derived nullifier, scoped to a room and epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nullifier {
    /// Room the nullifier is scoped to.
    pub room_id: String,
    /// Epoch number it was derived for.
    pub epoch: i64,
    /// The derived value.
    pub value: Vec<u8>,
}

/// Derive the nullifier for (identity, room, epoch-of-`timestamp`).
///
/// Pure: no state is consulted or recorded.
pub fn issue_nullifier(
    backend: &dyn ProofBackend,
    identity: &Identity,
    room_id: &str,
    timestamp: i64,
    config: &RlnConfig,
) -> Result<Nullifier> {
    let epoch = config.epoch_for(timestamp);
    let value = backend.generate(
        ProofContext::MessageNullifier,
        &[
            identity.seed().as_bytes(),
            room_id.as_bytes(),
            &epoch.to_be_bytes(),
        ],
    )?;

    Ok(Nullifier {
        room_id: room_id.to_string(),
        epoch,
        value,
    })
}

/// Per-room set of recently seen nullifiers.
///
/// Bounded by construction: entries are pruned once older than
/// `retain_epochs`, so the set holds at most a few epochs of traffic.
#[derive(Debug, Default)]
pub struct NullifierRegistry {
    // room id -> (nullifier value -> epoch first seen)
    seen: Mutex<HashMap<String, HashMap<Vec<u8>, i64>>>,
    config: RlnConfig,
}

impl NullifierRegistry {
    /// Create a registry with the given policy.
    pub fn new(config: RlnConfig) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// The policy this registry was built with.
    pub fn config(&self) -> &RlnConfig {
        &self.config
    }

    /// Atomically check whether `nullifier` was already seen and record
    /// it if not.
    ///
    /// Returns `true` if the nullifier was fresh (send may proceed),
    /// `false` if it was a duplicate. Check and insert happen under one
    /// lock acquisition; concurrent senders can never both see "fresh".
    /// Stale entries for the room are pruned on the way.
    pub fn check_and_record(&self, nullifier: &Nullifier) -> bool {
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            // A poisoned lock still holds consistent data for this use:
            // the map is updated in a single statement.
            Err(poisoned) => poisoned.into_inner(),
        };

        let room = seen.entry(nullifier.room_id.clone()).or_default();

        let horizon = nullifier.epoch - self.config.retain_epochs;
        room.retain(|_, epoch| *epoch > horizon);

        if room.contains_key(&nullifier.value) {
            debug!(
                room_id = %nullifier.room_id,
                epoch = nullifier.epoch,
                nullifier = %RedactedBytes(&nullifier.value),
                "duplicate nullifier rejected"
            );
            return false;
        }

        room.insert(nullifier.value.clone(), nullifier.epoch);
        trace!(
            room_id = %nullifier.room_id,
            epoch = nullifier.epoch,
            "nullifier recorded"
        );
        true
    }

    /// Remove a previously recorded nullifier.
    ///
    /// Used to roll the registry back when the durable append that the
    /// nullifier was accepted for fails: in-memory state must never run
    /// ahead of storage.
    pub fn forget(&self, nullifier: &Nullifier) {
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(room) = seen.get_mut(&nullifier.room_id) {
            room.remove(&nullifier.value);
        }
    }

    /// Record a nullifier observed in the durable message log without a
    /// freshness check. Used to repopulate the registry on open so a
    /// restart inside an epoch does not reopen the flood window.
    pub fn preload(&self, room_id: &str, value: Vec<u8>, epoch: i64) {
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        seen.entry(room_id.to_string()).or_default().insert(value, epoch);
    }
}
