//! serde and borsh for the fixed-width types.
//!
//! serde goes through `Display`/`FromStr`, so JSON shows `0x…` hashes and
//! `poll1…` addresses. borsh writes the bare bytes with no length prefix.

use crate::{Address, Hash};

#[cfg(feature = "serde")]
macro_rules! serde_via_string {
    ($ty:ty) => {
        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
                text.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

#[cfg(feature = "borsh")]
macro_rules! borsh_as_bytes {
    ($ty:ty, $len:expr) => {
        impl borsh::BorshSerialize for $ty {
            fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
                writer.write_all(self.as_bytes())
            }
        }

        impl borsh::BorshDeserialize for $ty {
            fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
                let mut bytes = [0u8; $len];
                reader.read_exact(&mut bytes)?;
                Ok(<$ty>::from_bytes(bytes))
            }
        }
    };
}

#[cfg(feature = "serde")]
serde_via_string!(Hash);
#[cfg(feature = "serde")]
serde_via_string!(Address);

#[cfg(feature = "borsh")]
borsh_as_bytes!(Hash, 32);
#[cfg(feature = "borsh")]
borsh_as_bytes!(Address, 20);
