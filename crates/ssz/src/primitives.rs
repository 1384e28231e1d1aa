//! Fixed-width domain primitives.
//!
//! Every consensus quantity that is logically a distinct unit (a slot is not an epoch is not
//! a validator index) is wrapped in its own newtype instead of passed around as a bare `u64`.
//! This generalizes the single `ReferenceSlot`-over-`Slot` wrapper the teacher reaches for once
//! (`io/eth_io.rs`) to every unit in the data model, and routes every add/sub through
//! `ArithmeticError` instead of a silent wraparound — mirroring `util::erroring_add`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ArithmeticError;

macro_rules! checked_u64_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn as_u64(self) -> u64 {
                self.0
            }

            pub fn checked_add(self, rhs: u64) -> Result<Self, ArithmeticError> {
                self.0
                    .checked_add(rhs)
                    .map(Self)
                    .ok_or(ArithmeticError::Overflow)
            }

            pub fn checked_sub(self, rhs: u64) -> Result<Self, ArithmeticError> {
                self.0
                    .checked_sub(rhs)
                    .map(Self)
                    .ok_or(ArithmeticError::Underflow)
            }

            pub fn saturating_sub(self, rhs: u64) -> Self {
                Self(self.0.saturating_sub(rhs))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

checked_u64_newtype!(Slot);
checked_u64_newtype!(Epoch);
checked_u64_newtype!(ValidatorIndex);
checked_u64_newtype!(Gwei);
checked_u64_newtype!(CommitteeIndex);

/// `2**64 - 1`: sentinel meaning "unset" for `activation_epoch`/`exit_epoch`/… fields.
pub const FAR_FUTURE_EPOCH: Epoch = Epoch::new(u64::MAX);

pub fn erroring_add_u64(lhs: u64, rhs: u64) -> Result<u64, ArithmeticError> {
    lhs.checked_add(rhs).ok_or(ArithmeticError::Overflow)
}

pub fn erroring_sub_u64(lhs: u64, rhs: u64) -> Result<u64, ArithmeticError> {
    lhs.checked_sub(rhs).ok_or(ArithmeticError::Underflow)
}

/// Immutable fixed-width byte string, used for roots and cross-fork domain tags.
macro_rules! fixed_bytes {
    ($name:ident, $len:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(#[serde(with = "serde_bytes_array")] pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub const fn zero() -> Self {
                Self([0u8; $len])
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::zero()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{})", stringify!($name), hex::encode(self.0))
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(value: [u8; $len]) -> Self {
                Self(value)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

// Serde helper for fixed-size byte arrays (serde's derive only covers arrays up to 32 natively
// on older serde; spelled out explicitly here the way ethereum_serde_utils does for the teacher).
mod serde_bytes_array {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(bytes: &[u8; N], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(d: D) -> Result<[u8; N], D::Error> {
        use serde::de::Error;
        let s = String::deserialize(d)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(s).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("unexpected byte length"))
    }
}

fixed_bytes!(Bytes32, 32);
fixed_bytes!(Bytes4, 4);
fixed_bytes!(BlsPubkeyBytes, 48);
fixed_bytes!(BlsSignatureBytes, 96);
fixed_bytes!(BlsSecretBytes, 32);

impl Bytes32 {
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(data).ok().map(Self)
    }
}
