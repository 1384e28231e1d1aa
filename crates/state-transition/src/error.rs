//! Error taxonomy for the state-transition function, per spec.md §7: everything that can reject
//! a block is surfaced as an `InvalidBlock` variant (non-fatal to the node); only `Arithmetic`
//! is fatal.

use phase0_ssz::ArithmeticError;
use phase0_types::TypesError;
use thiserror::Error;

/// The operation kind a per-operation failure occurred in, for `InvalidBlock::Operation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    ProposerSlashing,
    AttesterSlashing,
    Attestation,
    Deposit,
    VoluntaryExit,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OperationKind::ProposerSlashing => "proposer_slashing",
            OperationKind::AttesterSlashing => "attester_slashing",
            OperationKind::Attestation => "attestation",
            OperationKind::Deposit => "deposit",
            OperationKind::VoluntaryExit => "voluntary_exit",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    Block,
    Attestation,
    Exit,
    ProposerSlashing,
    AttesterSlashing,
    Deposit,
    Randao,
}

impl std::fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Error)]
pub enum StateTransitionError {
    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] ArithmeticError),

    #[error("domain model error: {0}")]
    Types(#[from] TypesError),

    #[error("invalid block header: {0}")]
    InvalidHeader(&'static str),

    #[error("invalid randao reveal")]
    InvalidRandao,

    #[error("invalid {kind} operation: {reason}")]
    InvalidOperation {
        kind: OperationKind,
        reason: &'static str,
    },

    #[error("invalid {0} signature")]
    InvalidSignature(SignatureKind),

    #[error("slot {requested} is not ahead of state slot {current}")]
    SlotNotAhead { current: u64, requested: u64 },

    #[error("too many {kind} operations in block body: {given} > {max}")]
    TooManyOperations {
        kind: OperationKind,
        given: usize,
        max: usize,
    },
}

pub type Result<T> = std::result::Result<T, StateTransitionError>;
