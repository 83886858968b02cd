use crate::error::TypesError;
use std::fmt;
use std::str::FromStr;

/// blake3 digest. Doubles as relay message id and record key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash([u8; 32]);

/// Relay message identifier. Zero means "no message".
pub type MessageId = Hash;

impl Hash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self, TypesError> {
        <[u8; 32]>::try_from(slice)
            .map(Self)
            .map_err(|_| TypesError::InvalidHashLength(slice.len()))
    }

    pub fn compute(data: &[u8]) -> Self {
        blake3::hash(data).into()
    }

    /// Digest of the concatenation of `parts`, without allocating it.
    pub fn compute_multi(parts: &[&[u8]]) -> Self {
        parts
            .iter()
            .fold(blake3::Hasher::new(), |mut hasher, part| {
                hasher.update(part);
                hasher
            })
            .finalize()
            .into()
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl From<blake3::Hash> for Hash {
    fn from(digest: blake3::Hash) -> Self {
        Self(*digest.as_bytes())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

/// Accepts hex with or without a `0x` prefix.
impl FromStr for Hash {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        Self::from_slice(&hex::decode(digits)?)
    }
}
