//! BLS12-381 signatures, wrapping `blst` the way spec.md §4.A requires: sign, verify, and
//! aggregate over the min-pubkey-size/max-signature-size ciphersuite Ethereum consensus uses
//! (`BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_`).
//!
//! The teacher crate never signs or verifies anything itself (it reads already-finalized beacon
//! states), so this module has no direct teacher counterpart; it is grounded in spec.md §4.A's
//! explicit component description and uses `blst`, the BLS crate the rest of the retrieval pack
//! (e.g. sigp/lighthouse-derived fork-choice code) builds on.

use blst::min_pk::{
    AggregatePublicKey, AggregateSignature, PublicKey as BlstPublicKey, SecretKey as BlstSecretKey,
    Signature as BlstSignature,
};
use blst::BLST_ERROR;

use crate::error::SszError;
use crate::primitives::{BlsPubkeyBytes, BlsSecretBytes, BlsSignatureBytes};

const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// A validated BLS12-381 public key (G1 point).
#[derive(Debug, Clone)]
pub struct BlsPublicKey(BlstPublicKey);

impl BlsPublicKey {
    pub fn from_bytes(bytes: &BlsPubkeyBytes) -> Result<Self, SszError> {
        BlstPublicKey::key_validate(bytes.as_ref())
            .map(BlsPublicKey)
            .map_err(|_| SszError::InvalidLength {
                expected: 48,
                actual: bytes.as_ref().len(),
            })
    }

    pub fn to_bytes(&self) -> BlsPubkeyBytes {
        BlsPubkeyBytes::from(self.0.to_bytes())
    }
}

/// A validated BLS12-381 signature (G2 point).
#[derive(Debug, Clone)]
pub struct BlsSignatureValue(BlstSignature);

impl BlsSignatureValue {
    pub fn from_bytes(bytes: &BlsSignatureBytes) -> Result<Self, SszError> {
        BlstSignature::sig_validate(bytes.as_ref(), true)
            .map(BlsSignatureValue)
            .map_err(|_| SszError::InvalidLength {
                expected: 96,
                actual: bytes.as_ref().len(),
            })
    }

    pub fn to_bytes(&self) -> BlsSignatureBytes {
        BlsSignatureBytes::from(self.0.to_bytes())
    }

    /// Verifies this signature against a single `(pubkey, message)` pair.
    pub fn verify(&self, pubkey: &BlsPublicKey, message: &[u8]) -> bool {
        matches!(
            self.0.verify(true, message, DST, &[], &pubkey.0, true),
            BLST_ERROR::BLST_SUCCESS
        )
    }

    /// Verifies this signature as the aggregate of each `pubkeys[i]` signing `messages[i]`,
    /// per spec.md's `AttesterSlashing`/aggregate-attestation verification needs. Distinct
    /// messages are required for this fast-aggregate-style check to be sound against rogue-key
    /// attacks; callers verifying identical-message aggregates (single-attestation signatures)
    /// should use `verify_fast_aggregate` instead.
    pub fn verify_aggregate(&self, pubkeys: &[&BlsPublicKey], messages: &[&[u8]]) -> bool {
        if pubkeys.len() != messages.len() || pubkeys.is_empty() {
            return false;
        }
        let pks: Vec<&BlstPublicKey> = pubkeys.iter().map(|pk| &pk.0).collect();
        matches!(
            self.0
                .aggregate_verify(true, messages, DST, &pks, true),
            BLST_ERROR::BLST_SUCCESS
        )
    }

    /// Verifies this signature as the aggregate of every key in `pubkeys` signing the same
    /// `message` (the common case: all attesters in a committee attesting to one `AttestationData`).
    pub fn verify_fast_aggregate(&self, pubkeys: &[&BlsPublicKey], message: &[u8]) -> bool {
        if pubkeys.is_empty() {
            return false;
        }
        let pks: Vec<&BlstPublicKey> = pubkeys.iter().map(|pk| &pk.0).collect();
        matches!(
            self.0.fast_aggregate_verify(true, message, DST, &pks),
            BLST_ERROR::BLST_SUCCESS
        )
    }
}

/// Combines individual signatures into one aggregate signature.
pub fn aggregate_signatures(signatures: &[&BlsSignatureValue]) -> Result<BlsSignatureValue, SszError> {
    if signatures.is_empty() {
        return Err(SszError::InvalidLength {
            expected: 1,
            actual: 0,
        });
    }
    let sigs: Vec<&BlstSignature> = signatures.iter().map(|s| &s.0).collect();
    let aggregate = AggregateSignature::aggregate(&sigs, true).map_err(|_| SszError::InvalidLength {
        expected: 96,
        actual: 0,
    })?;
    Ok(BlsSignatureValue(aggregate.to_signature()))
}

/// Combines individual public keys into one aggregate public key, used when a committee's
/// participants are known but no aggregate signature is being built (e.g. computing the
/// expected signer set for a sync-committee-free phase-0 attestation).
pub fn aggregate_pubkeys(pubkeys: &[&BlsPublicKey]) -> Result<BlsPublicKey, SszError> {
    if pubkeys.is_empty() {
        return Err(SszError::InvalidLength {
            expected: 1,
            actual: 0,
        });
    }
    let pks: Vec<&BlstPublicKey> = pubkeys.iter().map(|pk| &pk.0).collect();
    let aggregate = AggregatePublicKey::aggregate(&pks, true).map_err(|_| SszError::InvalidLength {
        expected: 48,
        actual: 0,
    })?;
    Ok(BlsPublicKey(aggregate.to_public_key()))
}

/// A secret key, used only by test fixtures and by a `Signer` implementation upstream of this
/// crate (spec.md explicitly places a real validator `Signer` out of scope here).
pub struct BlsSecretKey(BlstSecretKey);

impl BlsSecretKey {
    pub fn from_bytes(bytes: &BlsSecretBytes) -> Result<Self, SszError> {
        BlstSecretKey::from_bytes(bytes.as_ref())
            .map(BlsSecretKey)
            .map_err(|_| SszError::InvalidLength {
                expected: 32,
                actual: bytes.as_ref().len(),
            })
    }

    pub fn public_key(&self) -> BlsPublicKey {
        BlsPublicKey(self.0.sk_to_pk())
    }

    pub fn sign(&self, message: &[u8]) -> BlsSignatureValue {
        BlsSignatureValue(self.0.sign(message, DST, &[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret_key(seed: u8) -> BlsSecretKey {
        let ikm = [seed; 32];
        BlsSecretKey(BlstSecretKey::key_gen(&ikm, &[]).unwrap())
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let sk = secret_key(1);
        let pk = sk.public_key();
        let sig = sk.sign(b"attestation-data");
        assert!(sig.verify(&pk, b"attestation-data"));
        assert!(!sig.verify(&pk, b"different-message"));
    }

    #[test]
    fn fast_aggregate_verify_combines_committee_signatures() {
        let sks: Vec<_> = (1u8..=5).map(secret_key).collect();
        let pks: Vec<_> = sks.iter().map(BlsSecretKey::public_key).collect();
        let sigs: Vec<_> = sks.iter().map(|sk| sk.sign(b"block-root")).collect();

        let sig_refs: Vec<&BlsSignatureValue> = sigs.iter().collect();
        let aggregate = aggregate_signatures(&sig_refs).unwrap();

        let pk_refs: Vec<&BlsPublicKey> = pks.iter().collect();
        assert!(aggregate.verify_fast_aggregate(&pk_refs, b"block-root"));
    }

    #[test]
    fn aggregate_verify_rejects_wrong_pairing() {
        let sk_a = secret_key(7);
        let sk_b = secret_key(8);
        let sig_a = sk_a.sign(b"msg-a");
        let sig_b = sk_b.sign(b"msg-b");
        let aggregate = aggregate_signatures(&[&sig_a, &sig_b]).unwrap();

        let pk_a = sk_a.public_key();
        let pk_b = sk_b.public_key();
        assert!(aggregate.verify_aggregate(&[&pk_a, &pk_b], &[b"msg-a", b"msg-b"]));
        assert!(!aggregate.verify_aggregate(&[&pk_b, &pk_a], &[b"msg-a", b"msg-b"]));
    }
}
