//! Group membership and anonymous rate limiting.
//!
//! Membership is a many-to-many relation between identities and rooms
//! with at most one *active* row per pair. The lifecycle is strictly
//! append-only for auditability:
//!
//! ```text
//! NonMember -> (join) -> Active -> (leave) -> Inactive
//! Inactive  -> (join) -> Active   (a new row, never a revival)
//! ```
//!
//! The [`rln`] submodule provides the anti-flood primitive: a per-epoch
//! nullifier that lets the room store reject duplicate sends from the
//! same identity without learning which identity sent them.

pub mod rln;

pub use rln::{Nullifier, NullifierRegistry, RlnConfig};

use crate::crypto::proof::{ProofBackend, ProofContext};
use crate::error::Result;
use crate::identity::Identity;
use serde::{Deserialize, Serialize};

/// A membership row.
///
/// Rows are immutable once written except for the `active` flag, which
/// `leave` clears. Re-joining inserts a fresh row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    /// Identity this membership belongs to.
    pub identity_id: String,
    /// Room / group id.
    pub group_id: String,
    /// Join time, Unix seconds.
    pub joined_at: i64,
    /// One-way proof binding seed, group and join time.
    #[serde(with = "hex::serde")]
    pub membership_proof: Vec<u8>,
    /// Bond posted on join. Settlement is out of scope; recorded only.
    pub bond_amount: u64,
    /// Whether this row is the pair's active membership.
    pub active: bool,
}

/// Build a membership row for `identity` joining `group_id`.
pub fn issue_membership(
    backend: &dyn ProofBackend,
    identity: &Identity,
    group_id: &str,
    bond_amount: u64,
    now: i64,
) -> Result<Membership> {
    let membership_proof = backend.generate(
        ProofContext::Membership,
        &[
            identity.seed().as_bytes(),
            group_id.as_bytes(),
            &now.to_be_bytes(),
        ],
    )?;

    Ok(Membership {
        identity_id: identity.id.clone(),
        group_id: group_id.to_string(),
        joined_at: now,
        membership_proof,
        bond_amount,
        active: true,
    })
}
