//! Pollbridge Types - Value types shared by both sides of the bridge.
//!
//! This crate provides:
//! - Addresses (20-byte, Bech32m encoded)
//! - Hashes (32-byte, blake3 digests), also used as message ids
//! - Chain selectors identifying a relay endpoint

pub mod address;
pub mod hash;
pub mod chain;
pub mod error;

#[cfg(any(feature = "serde", feature = "borsh"))]
mod serialization;

pub use address::Address;
pub use hash::{Hash, MessageId};
pub use chain::ChainSelector;
pub use error::TypesError;

/// Fee-token amount in the token's smallest unit.
pub type Amount = u128;

/// Basis-point denominator (10000 = 100%).
pub const MAX_BPS: u16 = 10_000;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Address, Amount, ChainSelector, Hash, MessageId, TypesError, MAX_BPS};
}
