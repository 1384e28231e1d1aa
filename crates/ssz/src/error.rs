use thiserror::Error;

/// Checked-arithmetic failure on a primitive domain unit (`Slot`, `Epoch`, `Gwei`, …).
///
/// Per spec: must never occur on valid inputs; a state-transition caller that sees this
/// treats it as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("integer overflow")]
    Overflow,
    #[error("integer underflow")]
    Underflow,
}

/// SSZ wire-format framing errors, raised at the decode boundary.
///
/// Non-fatal to the node: an untrusted peer message that fails to decode is simply dropped
/// by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SszError {
    #[error("buffer length {actual} does not match expected fixed size {expected}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("offset {offset} out of bounds for buffer of length {len}")]
    OffsetOutOfBounds { offset: usize, len: usize },
    #[error("offsets are not monotonically non-decreasing: {prev} then {next}")]
    OffsetsNotSorted { prev: usize, next: usize },
    #[error("list length {len} exceeds maximum {max}")]
    MaxLengthExceeded { len: usize, max: usize },
    #[error("non-zero padding bit found at position {0} of a bitvector/bitlist")]
    NonZeroPadding(usize),
    #[error("bitlist is missing its length-delimiting sentinel bit")]
    MissingLengthBit,
    #[error("bitlist/bitvector of bit-length {0} cannot be represented in the declared byte width")]
    BitLengthMismatch(usize),
}

/// Errors from the generalized-index persistent tree (`get`/`set`/packing).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("generalized index {0} does not address a node in a tree of depth {1}")]
    IndexOutOfRange(u64, usize),
    #[error("generalized index {0} addresses an internal node, not a leaf")]
    NotALeaf(u64),
    #[error(transparent)]
    Ssz(#[from] SszError),
}
