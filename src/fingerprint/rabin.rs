//! 64-bit Rabin fingerprint (CRC-64-AVRO)
//!
//! Computed over a schema's canonical text. The wire form is the 64-bit
//! value in little-endian byte order; the textual form is those eight bytes
//! as lowercase hex.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::errors::FingerprintError;
use crate::schema::{canonical_form, SchemaNode};

/// Fingerprint of the empty string; also the table polynomial
pub const EMPTY: u64 = 0xc15d_213a_a4d7_a795;

const TABLE: [u64; 256] = build_table();

const fn build_table() -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut i = 0;
    while i < 256 {
        let mut fp = i as u64;
        let mut j = 0;
        while j < 8 {
            fp = (fp >> 1) ^ (EMPTY & (fp & 1).wrapping_neg());
            j += 1;
        }
        table[i] = fp;
        i += 1;
    }
    table
}

/// 8-byte schema fingerprint, stored in wire byte order
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 8]);

impl Fingerprint {
    /// Fingerprint of a schema's canonical form
    pub fn of(schema: &SchemaNode) -> Self {
        Self::of_canonical(&canonical_form(schema))
    }

    /// Fingerprint of already canonical text
    pub fn of_canonical(text: &str) -> Self {
        let mut fp = EMPTY;
        for byte in text.as_bytes() {
            fp = (fp >> 8) ^ TABLE[((fp ^ *byte as u64) & 0xff) as usize];
        }
        Self::from_u64(fp)
    }

    pub fn from_u64(value: u64) -> Self {
        Self(value.to_le_bytes())
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_u64(&self) -> u64 {
        u64::from_le_bytes(self.0)
    }

    /// Bytes in wire order
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Lowercase hex of the wire bytes
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FingerprintError::InvalidHex { text: s.to_string() };
        if s.len() != 16 || !s.is_ascii() {
            return Err(invalid());
        }
        let mut bytes = [0u8; 8];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
