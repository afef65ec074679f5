//! Authenticated encryption using ChaCha20-Poly1305.
//!
//! Room messages are encrypted with AEAD so a wrong key or a tampered
//! ciphertext fails authentication explicitly instead of yielding
//! garbage plaintext. The room id is bound as associated data.

use crate::error::{Error, Result};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce as ChaNonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

use super::KEY_SIZE;

/// Size of nonce in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

/// A nonce for AEAD encryption.
///
/// Must be unique per key. Random nonces are safe here: room keys see at
/// most one message per member per epoch, far below collision bounds.
#[derive(Clone, Copy, Debug)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Create a new random nonce.
    pub fn random() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

fn encrypt(
    key: &[u8; KEY_SIZE],
    nonce: &Nonce,
    plaintext: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let cha_nonce = ChaNonce::from_slice(nonce.as_bytes());

    cipher
        .encrypt(
            cha_nonce,
            Payload {
                msg: plaintext,
                aad: associated_data,
            },
        )
        .map_err(|_| Error::Crypto("encryption failed".into()))
}

fn decrypt(
    key: &[u8; KEY_SIZE],
    nonce: &Nonce,
    ciphertext: &[u8],
    associated_data: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let cha_nonce = ChaNonce::from_slice(nonce.as_bytes());

    let plaintext = cipher
        .decrypt(
            cha_nonce,
            Payload {
                msg: ciphertext,
                aad: associated_data,
            },
        )
        .map_err(|_| Error::DecryptionFailed)?;

    Ok(Zeroizing::new(plaintext))
}

/// Encrypt with a random nonce, prepending it to output.
///
/// Output format: `nonce (12 bytes) || ciphertext || tag (16 bytes)`
///
/// This keeps nonce management automatic for stored messages.
pub fn encrypt_with_random_nonce(
    key: &[u8; KEY_SIZE],
    plaintext: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>> {
    let nonce = Nonce::random();
    let ciphertext = encrypt(key, &nonce, plaintext, associated_data)?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(nonce.as_bytes());
    output.extend_from_slice(&ciphertext);

    Ok(output)
}

/// Decrypt data encrypted with `encrypt_with_random_nonce`.
///
/// Expects format: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
/// Returns [`Error::DecryptionFailed`] on a wrong key, wrong associated
/// data, or any tampering; callers treat that as "message unreadable".
pub fn decrypt_with_prepended_nonce(
    key: &[u8; KEY_SIZE],
    data: &[u8],
    associated_data: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    if data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::DecryptionFailed);
    }

    let nonce = Nonce::from_bytes(
        data[..NONCE_SIZE]
            .try_into()
            .map_err(|_| Error::DecryptionFailed)?,
    );
    let ciphertext = &data[NONCE_SIZE..];

    decrypt(key, &nonce, ciphertext, associated_data)
}
