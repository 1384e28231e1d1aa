use phase0_ssz::{ArithmeticError, Bytes32};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForkChoiceError {
    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] ArithmeticError),

    #[error("no viable head descends from justified root {0:?}")]
    NotViableHead(Bytes32),

    #[error("block {0:?} already present in proto-array")]
    DuplicateBlock(Bytes32),

    #[error("parent {0:?} referenced by a new block is not present in proto-array")]
    MissingParent(Bytes32),

    #[error("block {0:?} referenced by proto-array index is missing")]
    MissingProtoArrayBlock(Bytes32),

    #[error("delta vector length {given} does not match node count {expected}")]
    InvalidDeltaLength { given: usize, expected: usize },

    #[error("invalid attestation: {0}")]
    InvalidAttestation(&'static str),

    #[error("proto-array invariant violated: {0}")]
    Invariant(&'static str),
}
