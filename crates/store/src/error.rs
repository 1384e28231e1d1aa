//! Error taxonomy for the chain store, per spec.md §7: the three kinds specific to a store —
//! `UnknownBlock`/`UnknownState` (a miss, not fatal to the node) and `Corrupt`/`Conflict`
//! (a violated invariant or a concurrent conflicting finalization, both fail-fast).

use phase0_ssz::{ArithmeticError, Bytes32};
use phase0_state_transition::StateTransitionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] ArithmeticError),

    #[error("block {0:?} is unknown to the store")]
    UnknownBlock(Bytes32),

    #[error("state {0:?} is unknown to the store")]
    UnknownState(Bytes32),

    #[error("state transition failed while regenerating state for block {root:?}: {source}")]
    Regeneration {
        root: Bytes32,
        #[source]
        source: StateTransitionError,
    },

    #[error("store invariant violated: {0}")]
    Corrupt(&'static str),

    #[error("conflicting finalization: new checkpoint at epoch {new_epoch} does not extend the current finalized checkpoint at epoch {current_epoch}")]
    Conflict { current_epoch: u64, new_epoch: u64 },
}

pub type Result<T> = std::result::Result<T, StoreError>;
