//! Cryptographic primitives for the Haven core.
//!
//! All cryptography uses well-audited primitives:
//!
//! - **SHA-256**: one-way commitments and nullifiers (domain-separated)
//! - **HKDF-SHA256**: room key derivation
//! - **ChaCha20-Poly1305**: authenticated encryption of room messages
//!
//! The commitment/nullifier constructions here are deliberately plain
//! keyed hashes. They give one-wayness and binding but not zero-knowledge;
//! swapping in a real proving scheme happens behind
//! [`proof::ProofBackend`] without touching callers.
//!
//! ## Forbidden
//!
//! - Custom cryptography
//! - Unaudited primitives

mod aead;
pub mod proof;

pub use aead::{
    decrypt_with_prepended_nonce, encrypt_with_random_nonce, Nonce, NONCE_SIZE, TAG_SIZE,
};

use crate::error::{Error, Result};
use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Key size for ChaCha20-Poly1305 and all derived secrets.
pub const KEY_SIZE: usize = 32;

/// Size of a SHA-256 digest in bytes.
pub const DIGEST_SIZE: usize = 32;

/// Compute a domain-separated SHA-256 digest over the given parts.
///
/// The domain tag is hashed first so digests from different contexts
/// (commitment, nullifier, attestation, membership) can never collide
/// even over identical inputs. Each part is length-prefixed to prevent
/// ambiguity between adjacent variable-length inputs.
pub fn domain_hash(domain: &[u8], parts: &[&[u8]]) -> [u8; DIGEST_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update((domain.len() as u64).to_be_bytes());
    hasher.update(domain);
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Derive keys using HKDF-SHA256.
pub fn hkdf_derive(
    salt: Option<&[u8]>,
    input_key_material: &[u8],
    info: &[u8],
    output_length: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let hkdf = Hkdf::<Sha256>::new(salt, input_key_material);
    let mut output = Zeroizing::new(vec![0u8; output_length]);
    hkdf.expand(info, &mut output)
        .map_err(|_| Error::Crypto("HKDF expansion failed".into()))?;
    Ok(output)
}

/// Derive the symmetric key for a room from its shared secret.
///
/// The room id is the salt so two rooms sharing a secret (misconfigured
/// provider) still get distinct keys.
pub fn derive_room_key(room_id: &str, room_secret: &[u8; KEY_SIZE]) -> Result<[u8; KEY_SIZE]> {
    let okm = hkdf_derive(
        Some(room_id.as_bytes()),
        room_secret,
        b"haven-room-key-v1",
        KEY_SIZE,
    )?;
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&okm);
    Ok(key)
}

/// Generate cryptographically secure random bytes.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut bytes);
    bytes
}

/// Constant-time comparison of byte slices.
///
/// Prevents timing attacks when comparing proof values.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
