//! Condition attestations.
//!
//! A self-asserted support-category claim bound to an identity by a
//! one-way proof over the secret seed. Anyone holding the seed can
//! recompute and check the proof; nobody can reverse it to recover the
//! seed. At most one attestation is active per identity; a new one
//! supersedes the old, which is retained for audit.

use crate::crypto::proof::{ProofBackend, ProofContext};
use crate::error::{Error, Result};
use crate::identity::Identity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of support categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Anxiety-related concerns.
    Anxiety,
    /// Depression-related concerns.
    Depression,
    /// Trauma and PTSD.
    Trauma,
    /// Addiction and recovery.
    Addiction,
    /// Anything not covered above.
    Other,
}

impl Category {
    /// Stable string form, used in proofs and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anxiety => "anxiety",
            Self::Depression => "depression",
            Self::Trauma => "trauma",
            Self::Addiction => "addiction",
            Self::Other => "other",
        }
    }

    /// Parse from the stable string form.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "anxiety" => Ok(Self::Anxiety),
            "depression" => Ok(Self::Depression),
            "trauma" => Ok(Self::Trauma),
            "addiction" => Ok(Self::Addiction),
            "other" => Ok(Self::Other),
            _ => Err(Error::InvalidAttestation(format!(
                "unknown category: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A condition attestation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attestation {
    /// Identity this attestation belongs to.
    pub identity_id: String,
    /// Attested support category.
    pub category: Category,
    /// Issuance time, Unix seconds.
    pub issued_at: i64,
    /// One-way proof binding seed, category and issuance time.
    #[serde(with = "hex::serde")]
    pub proof: Vec<u8>,
    /// False once a newer attestation supersedes this one.
    pub active: bool,
}

/// Build an attestation for `identity` over `category`.
///
/// Deterministic given its inputs, so it can be independently recomputed
/// and compared, but preimage-resistant: the proof does not reveal the
/// seed.
pub fn attest(
    backend: &dyn ProofBackend,
    identity: &Identity,
    category: Category,
    now: i64,
) -> Result<Attestation> {
    let proof = backend.generate(
        ProofContext::Attestation,
        &[
            identity.seed().as_bytes(),
            category.as_str().as_bytes(),
            &now.to_be_bytes(),
        ],
    )?;

    Ok(Attestation {
        identity_id: identity.id.clone(),
        category,
        issued_at: now,
        proof,
        active: true,
    })
}

/// Verify an attestation against an expected category.
///
/// Pure: recomputes the proof and compares in constant time. Fails only
/// on malformed input (empty proof); a well-formed attestation for the
/// wrong category simply returns `false`.
pub fn verify(
    backend: &dyn ProofBackend,
    identity: &Identity,
    attestation: &Attestation,
    expected_category: Category,
) -> Result<bool> {
    if attestation.proof.is_empty() {
        return Err(Error::InvalidAttestation("empty proof".into()));
    }
    if attestation.identity_id != identity.id {
        return Ok(false);
    }

    backend.verify(
        ProofContext::Attestation,
        &[
            identity.seed().as_bytes(),
            expected_category.as_str().as_bytes(),
            &attestation.issued_at.to_be_bytes(),
        ],
        &attestation.proof,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::proof::HashCommitmentBackend;

    fn test_identity() -> Identity {
        Identity::generate(&HashCommitmentBackend, 1_700_000_000).expect("generate")
    }

    #[test]
    fn test_attest_and_verify() {
        let backend = HashCommitmentBackend;
        let identity = test_identity();

        let attestation =
            attest(&backend, &identity, Category::Anxiety, 1_700_000_100).expect("attest");
        assert!(attestation.active);
        assert!(
            verify(&backend, &identity, &attestation, Category::Anxiety).expect("verify")
        );
    }

    #[test]
    fn test_verify_wrong_category() {
        let backend = HashCommitmentBackend;
        let identity = test_identity();

        let attestation = attest(&backend, &identity, Category::Anxiety, 0).expect("attest");
        assert!(
            !verify(&backend, &identity, &attestation, Category::Trauma).expect("verify")
        );
    }

    #[test]
    fn test_verify_wrong_identity() {
        let backend = HashCommitmentBackend;
        let identity = test_identity();
        let other = test_identity();

        let attestation = attest(&backend, &identity, Category::Other, 0).expect("attest");
        assert!(!verify(&backend, &other, &attestation, Category::Other).expect("verify"));
    }

    #[test]
    fn test_malformed_attestation_rejected() {
        let backend = HashCommitmentBackend;
        let identity = test_identity();

        let mut attestation = attest(&backend, &identity, Category::Other, 0).expect("attest");
        attestation.proof.clear();

        assert!(matches!(
            verify(&backend, &identity, &attestation, Category::Other),
            Err(Error::InvalidAttestation(_))
        ));
    }

    #[test]
    fn test_category_round_trip() {
        for category in [
            Category::Anxiety,
            Category::Depression,
            Category::Trauma,
            Category::Addiction,
            Category::Other,
        ] {
            assert_eq!(Category::parse(category.as_str()).expect("parse"), category);
        }
        assert!(Category::parse("bliss").is_err());
    }
}
