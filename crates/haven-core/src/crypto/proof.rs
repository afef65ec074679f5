//! Proof backend seam.
//!
//! All proof values in the core (identity commitments, attestation proofs,
//! membership proofs, message nullifiers) are produced through this trait.
//! The default backend is a domain-separated SHA-256 commitment: one-way
//! and binding, but not zero-knowledge. A real proving system (circuit
//! prover + verifier) slots in behind the same interface; callers see the
//! identical success/failure contract either way, and a backend timeout
//! must surface as failure, never success.

use crate::error::Result;

use super::{constant_time_eq, domain_hash, DIGEST_SIZE};

/// The context a proof is generated for.
///
/// Contexts double as hash domains in the local backend and would map to
/// circuit identifiers in a real one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofContext {
    /// Binding of a secret seed to a public identity commitment.
    Commitment,
    /// Per-identity nullifier base.
    NullifierBase,
    /// Condition attestation.
    Attestation,
    /// Group membership.
    Membership,
    /// Per-message rate-limit nullifier.
    MessageNullifier,
    /// Abuse report binding.
    Report,
}

impl ProofContext {
    fn domain(self) -> &'static [u8] {
        match self {
            Self::Commitment => b"haven.commitment.v1",
            Self::NullifierBase => b"haven.nullifier-base.v1",
            Self::Attestation => b"haven.attest.v1",
            Self::Membership => b"haven.member.v1",
            Self::MessageNullifier => b"haven.rln.v1",
            Self::Report => b"haven.report.v1",
        }
    }
}

/// A pluggable proof system.
///
/// `generate` consumes private inputs (the secret seed among them) and
/// returns an opaque proof value; `verify` checks a proof against the same
/// inputs. The local backend makes `verify` a recompute-and-compare, which
/// requires the verifier to know the private inputs too. A real ZK
/// backend lifts that restriction without changing this signature, since
/// public inputs are a subset of `inputs`.
pub trait ProofBackend: Send + Sync {
    /// Generate a proof over the given inputs.
    fn generate(&self, context: ProofContext, inputs: &[&[u8]]) -> Result<Vec<u8>>;

    /// Verify a proof against the given inputs.
    fn verify(&self, context: ProofContext, inputs: &[&[u8]], proof: &[u8]) -> Result<bool>;
}

/// Default backend: domain-separated SHA-256 commitments.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashCommitmentBackend;

impl ProofBackend for HashCommitmentBackend {
    fn generate(&self, context: ProofContext, inputs: &[&[u8]]) -> Result<Vec<u8>> {
        Ok(domain_hash(context.domain(), inputs).to_vec())
    }

    fn verify(&self, context: ProofContext, inputs: &[&[u8]], proof: &[u8]) -> Result<bool> {
        if proof.len() != DIGEST_SIZE {
            return Ok(false);
        }
        let expected = domain_hash(context.domain(), inputs);
        Ok(constant_time_eq(&expected, proof))
    }
}
