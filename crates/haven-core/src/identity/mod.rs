//! Anonymous identity management.
//!
//! An identity is a locally generated secret seed plus values derived
//! from it. There are no usernames, emails, or recovery mechanisms:
//! the seed is the sole ownership token and its loss is unrecoverable.
//!
//! ## Identity Properties
//!
//! - 256-bit secret seed from the OS entropy source, zeroized on drop
//! - Public commitment `H(seed ‖ id)`, the only value shared externally
//! - Nullifier base, the per-identity input to rate-limit nullifiers
//! - A display alias with no cryptographic meaning
//!
//! An identity is immutable once created except for attaching at most one
//! active condition attestation (see [`attestation`]).

mod alias;
pub mod attestation;

pub use alias::generate_alias;
pub use attestation::{Attestation, Category};

use crate::crypto::proof::{ProofBackend, ProofContext};
use crate::crypto::{random_bytes, KEY_SIZE};
use crate::error::Result;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the secret seed in bytes (256 bits).
pub const SEED_SIZE: usize = KEY_SIZE;

/// Size of the opaque identity id in bytes.
pub const ID_SIZE: usize = 16;

/// The secret seed backing an identity.
///
/// Zeroized on drop. Never serialized outward, never logged.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretSeed([u8; SEED_SIZE]);

impl SecretSeed {
    /// Create from raw bytes (restoring from local storage).
    pub fn from_bytes(bytes: [u8; SEED_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    ///
    /// # Security
    /// Handle with care - this exposes the ownership token.
    pub fn as_bytes(&self) -> &[u8; SEED_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SecretSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretSeed([REDACTED])")
    }
}

/// An anonymous identity.
///
/// Everything except `secret_seed` may be shared with collaborators;
/// the commitment is the stable public identifier.
#[derive(Clone)]
pub struct Identity {
    /// Opaque identity id (random, hex-encoded).
    pub id: String,
    /// Display alias, e.g. `GentleOwl417`.
    pub alias: String,
    /// Public commitment binding the seed to the id.
    pub public_commitment: Vec<u8>,
    /// Per-identity nullifier input.
    pub nullifier_base: Vec<u8>,
    /// Creation time, Unix seconds.
    pub created_at: i64,
    secret_seed: SecretSeed,
}

impl Identity {
    /// Generate a new identity.
    ///
    /// Fails only if the proof backend cannot produce the commitment
    /// (for the default backend this cannot happen; entropy-source
    /// exhaustion aborts inside the OS RNG and is not recoverable).
    pub fn generate(backend: &dyn ProofBackend, now: i64) -> Result<Self> {
        let seed = SecretSeed(random_bytes());
        let id = hex::encode(random_bytes::<ID_SIZE>());
        Self::from_parts(seed, id, generate_alias(), now, backend)
    }

    /// Rebuild an identity from stored parts, re-deriving public values.
    pub fn from_parts(
        secret_seed: SecretSeed,
        id: String,
        alias: String,
        created_at: i64,
        backend: &dyn ProofBackend,
    ) -> Result<Self> {
        let public_commitment = backend.generate(
            ProofContext::Commitment,
            &[secret_seed.as_bytes(), id.as_bytes()],
        )?;
        let nullifier_base = backend.generate(
            ProofContext::NullifierBase,
            &[secret_seed.as_bytes(), id.as_bytes()],
        )?;

        Ok(Self {
            id,
            alias,
            public_commitment,
            nullifier_base,
            created_at,
            secret_seed,
        })
    }

    /// The secret seed. Crate-internal: proofs are derived from it but it
    /// never crosses the crate boundary.
    pub(crate) fn seed(&self) -> &SecretSeed {
        &self.secret_seed
    }

    /// Hex form of the public commitment, for display and storage keys.
    pub fn commitment_hex(&self) -> String {
        hex::encode(&self.public_commitment)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("alias", &self.alias)
            .field("commitment", &crate::logging::RedactedBytes(&self.public_commitment))
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
