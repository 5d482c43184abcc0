use std::fmt;
use std::str::FromStr;

use crate::error::ScriptError;
use crate::util::decode_hex;

macro_rules! define_bytes_type {
    ($(#[$meta:meta])* $name:ident, $len:literal, $what:literal, reversed: $reversed:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            /// Builds a value from its display (big-endian) bytes.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, ScriptError> {
                match <[u8; $len]>::try_from(bytes) {
                    Ok(bytes) => Ok(Self(bytes)),
                    Err(_) => Err(ScriptError::InvalidLength {
                        what: $what,
                        expected: $len,
                        actual: bytes.len(),
                    }),
                }
            }

            /// Builds a value from the bytes as they appear in a script.
            pub fn from_wire(bytes: &[u8]) -> Result<Self, ScriptError> {
                let mut value = Self::from_slice(bytes)?;
                if $reversed {
                    value.0.reverse();
                }
                Ok(value)
            }

            /// Bytes as they appear in a script.
            pub fn to_wire(&self) -> [u8; $len] {
                let mut bytes = self.0;
                if $reversed {
                    bytes.reverse();
                }
                bytes
            }

            #[inline]
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = ScriptError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_slice(&decode_hex(s)?)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({self})", stringify!($name))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

define_bytes_type!(
    /// 20-byte script hash in display (big-endian) order.
    UInt160, 20, "script hash", reversed: true
);

define_bytes_type!(
    /// 32-byte hash in display (big-endian) order.
    UInt256, 32, "hash", reversed: true
);

define_bytes_type!(
    /// Compressed secp256r1 public key.
    PublicKey, 33, "public key", reversed: false
);

impl PublicKey {
    /// Whether the first byte is a valid compressed point prefix.
    pub fn is_compressed(&self) -> bool {
        matches!(self.0[0], 0x02 | 0x03)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_hash_orders() -> anyhow::Result<()> {
        let hash: UInt160 = "0x5b7074e873973a6ed3708862f219a6fbf4d1c411".parse()?;
        assert_eq!(hash.to_string(), "5b7074e873973a6ed3708862f219a6fbf4d1c411");
        assert_eq!(
            hex::encode(hash.to_wire()),
            "11c4d1f4fba619f2628870d36e3a9773e874705b"
        );
        assert_eq!(UInt160::from_wire(&hash.to_wire())?, hash);
        Ok(())
    }

    #[test]
    fn wrong_lengths() {
        assert!(matches!(
            "0102".parse::<UInt160>(),
            Err(ScriptError::InvalidLength {
                expected: 20,
                actual: 2,
                ..
            })
        ));
        assert!(UInt256::from_slice(&[0; 31]).is_err());
        assert!(PublicKey::from_slice(&[2; 32]).is_err());
    }

    #[test]
    fn public_key_is_not_reversed() -> anyhow::Result<()> {
        let key: PublicKey =
            "02028a99826edc0c97d18e22b6932373d908d323aa7f92656a77ec26e8861699ef".parse()?;
        assert_eq!(key.to_wire(), key.0);
        assert!(key.is_compressed());
        Ok(())
    }

    #[test]
    fn serde_as_hex() -> anyhow::Result<()> {
        let hash = UInt160([0xab; 20]);
        let json = serde_json::to_string(&hash)?;
        assert_eq!(json, format!("\"{}\"", "ab".repeat(20)));
        assert_eq!(serde_json::from_str::<UInt160>(&json)?, hash);
        Ok(())
    }
}
