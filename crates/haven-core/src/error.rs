//! Error types for the Haven core.
//!
//! Every variant is recoverable by the caller: each maps to a concrete
//! corrective action in the client (complete onboarding, wait before
//! resending, and so on). Storage failures are reported distinctly so
//! callers can tell "you did something wrong" from "the device did".

use thiserror::Error;

/// Core error type for Haven operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No identity exists in this session.
    #[error("no identity")]
    NoIdentity,

    /// An identity already exists; it must be deleted explicitly first.
    #[error("identity already exists")]
    AlreadyExists,

    /// The identity has no active condition attestation.
    #[error("identity not attested")]
    NotAttested,

    /// An active membership already exists for this group.
    #[error("already a member")]
    AlreadyMember,

    /// No active membership exists for this group.
    #[error("not a member")]
    NotMember,

    /// A message with the same nullifier was already accepted this epoch.
    #[error("rate limited")]
    RateLimited,

    /// Ciphertext is corrupt or the key does not match.
    /// Details are intentionally vague to prevent oracle attacks.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Attestation is malformed and cannot be checked.
    #[error("invalid attestation")]
    InvalidAttestation(String),

    /// The proof backend failed or timed out. Timeouts fail closed.
    #[error("proof generation failed")]
    ProofGenerationFailed(String),

    /// Storage operation failed. In-memory state is rolled back to match
    /// durable state whenever this is returned from a mutation.
    #[error("storage error")]
    Storage(String),

    /// Cryptographic operation failed (entropy source, AEAD internals).
    #[error("cryptographic operation failed")]
    Crypto(String),

    /// Resource not found.
    #[error("not found")]
    NotFound(String),
}

/// Result type alias using Haven's Error.
pub type Result<T> = std::result::Result<T, Error>;

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}
