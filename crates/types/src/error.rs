//! Error taxonomy for the domain model crate, one `thiserror` enum per the teacher's
//! per-module `Error` convention (`eth_io::Error`, `util::IntegerError`).

use phase0_ssz::{ArithmeticError, SszError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("ssz error: {0}")]
    Ssz(#[from] SszError),

    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] ArithmeticError),

    #[error("list {field} exceeds maximum length {max}")]
    MaxLengthExceeded { field: &'static str, max: usize },

    #[error("index {index} out of bounds for {field} (len {len})")]
    IndexOutOfBounds {
        field: &'static str,
        index: usize,
        len: usize,
    },
}
