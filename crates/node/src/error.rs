//! Error taxonomy for the orchestrator: a thin `#[from]` wrapper over the three crates it drives,
//! per spec.md §7's per-crate-enum pattern rather than one monolithic error type.

use phase0_fork_choice::ForkChoiceError;
use phase0_state_transition::StateTransitionError;
use phase0_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("fork choice error: {0}")]
    ForkChoice(#[from] ForkChoiceError),

    #[error("state transition error: {0}")]
    StateTransition(#[from] StateTransitionError),

    #[error("orchestrator cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, NodeError>;
