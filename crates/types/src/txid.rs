//! 32-byte transaction identifier.
//!
//! This module provides the [`Txid`] type, the Keccak256 digest of a
//! transaction's canonical RLP encoding. It is the unique key for pool
//! membership, spend tracking and orphan dependency sets.

use crate::{Error, Result};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// Size of a transaction identifier in bytes
pub const TXID_SIZE: usize = 32;

/// A 32-byte transaction identifier.
///
/// Identifiers are derived by hashing the canonical transaction encoding,
/// so equal identifiers imply byte-identical transactions.
///
/// # Example
///
/// ```rust
/// use embercore_types::Txid;
///
/// let id = Txid::keccak256(b"raw transaction bytes");
///
/// // Parse from hex
/// let parsed: Txid = id.to_hex().parse().unwrap();
/// assert_eq!(parsed, id);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Txid([u8; TXID_SIZE]);

impl Txid {
    /// The zero identifier - never produced by hashing real bytes.
    pub const ZERO: Self = Self([0u8; TXID_SIZE]);

    /// Creates a new identifier from a 32-byte array.
    #[inline]
    pub const fn new(bytes: [u8; TXID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates an identifier from a slice.
    ///
    /// Returns an error if the slice length is not exactly 32 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != TXID_SIZE {
            return Err(Error::InvalidLength {
                expected: TXID_SIZE,
                actual: slice.len(),
            });
        }
        let mut bytes = [0u8; TXID_SIZE];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Computes the Keccak256 digest of the given data.
    pub fn keccak256(data: &[u8]) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(data);
        let result = hasher.finalize();
        let mut bytes = [0u8; TXID_SIZE];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }

    /// Returns the identifier as a byte slice.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the identifier as a fixed-size byte array.
    #[inline]
    pub const fn as_fixed_bytes(&self) -> &[u8; TXID_SIZE] {
        &self.0
    }

    /// Checks if this is the zero identifier.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self == &Self::ZERO
    }

    /// Creates an identifier from its hex representation.
    ///
    /// The input can optionally have a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let s = s.strip_prefix("0X").unwrap_or(s);

        if s.len() != 64 {
            return Err(Error::InvalidTxid(format!(
                "expected 64 hex characters, got {}",
                s.len()
            )));
        }

        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }

    /// Returns the hex representation with 0x prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txid(0x{})", hex::encode(self.0))
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::LowerHex for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "0x")?;
        }
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl FromStr for Txid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl From<[u8; TXID_SIZE]> for Txid {
    fn from(bytes: [u8; TXID_SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<Txid> for [u8; TXID_SIZE] {
    fn from(id: Txid) -> Self {
        id.0
    }
}

impl AsRef<[u8]> for Txid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Txid {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Txid {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl Encodable for Txid {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.encoder().encode_value(&self.0);
    }
}

impl Decodable for Txid {
    fn decode(rlp: &Rlp<'_>) -> std::result::Result<Self, DecoderError> {
        let bytes: Vec<u8> = rlp.as_val()?;
        if bytes.len() != TXID_SIZE {
            return Err(DecoderError::RlpInvalidLength);
        }
        let mut arr = [0u8; TXID_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256_empty() {
        // Keccak256("") = c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470
        let id = Txid::keccak256(b"");
        assert_eq!(
            id.to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_keccak256_hello() {
        // Keccak256("hello") = 1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8
        let id = Txid::keccak256(b"hello");
        assert_eq!(
            id.to_hex(),
            "0x1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn test_hex_roundtrip() {
        let id = Txid::keccak256(b"roundtrip");
        let parsed = Txid::from_hex(&id.to_hex()).unwrap();
        assert_eq!(parsed, id);

        // Without prefix
        let bare = id.to_hex().trim_start_matches("0x").to_string();
        assert_eq!(Txid::from_hex(&bare).unwrap(), id);
    }

    #[test]
    fn test_from_hex_rejects_bad_length() {
        assert!(Txid::from_hex("0x1234").is_err());
        assert!(Txid::from_hex("").is_err());
    }

    #[test]
    fn test_from_slice_rejects_bad_length() {
        let err = Txid::from_slice(&[0u8; 31]).unwrap_err();
        match err {
            Error::InvalidLength { expected, actual } => {
                assert_eq!(expected, 32);
                assert_eq!(actual, 31);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero() {
        assert!(Txid::ZERO.is_zero());
        assert!(!Txid::keccak256(b"x").is_zero());
        assert_eq!(Txid::default(), Txid::ZERO);
    }

    #[test]
    fn test_ordering_is_bytewise() {
        let a = Txid::new([0u8; 32]);
        let mut high = [0u8; 32];
        high[0] = 1;
        let b = Txid::new(high);
        assert!(a < b);
    }

    #[test]
    fn test_rlp_roundtrip() {
        let id = Txid::keccak256(b"rlp");
        let encoded = rlp::encode(&id);
        let decoded: Txid = rlp::decode(&encoded).unwrap();
        assert_eq!(decoded, id);
    }

    #[test]
    fn test_serde_is_hex_string() {
        let id = Txid::keccak256(b"serde");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));
        let back: Txid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
