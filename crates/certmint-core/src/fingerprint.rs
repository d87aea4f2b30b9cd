//! Short content fingerprints for template bodies.
//!
//! A fingerprint is the Blake3 hash of the body truncated to 8 bytes and
//! shown as 16 lowercase hex characters. It is used to spot duplicate
//! templates, not as a security boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of hash bytes kept.
pub const FINGERPRINT_LEN: usize = 8;

/// An 8-byte content fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Fingerprint a byte payload.
    pub fn of(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        let mut bytes = [0u8; FINGERPRINT_LEN];
        bytes.copy_from_slice(&hash.as_bytes()[..FINGERPRINT_LEN]);
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Lowercase hex form, always 16 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from 16 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != FINGERPRINT_LEN {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; FINGERPRINT_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

/// Fingerprint a template body.
pub fn fingerprint(body: &str) -> Fingerprint {
    Fingerprint::of(body.as_bytes())
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

impl FromStr for Fingerprint {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_hex()
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = hex::FromHexError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_shape() {
        let fp = fingerprint("<p>{{titular}}</p>");
        let hex = fp.to_hex();
        assert_eq!(hex.len(), 16);
        assert!(hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_fingerprint_deterministic() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
    }

    #[test]
    fn test_empty_body_has_fingerprint() {
        assert_eq!(fingerprint("").to_hex().len(), 16);
    }

    #[test]
    fn test_matches_truncated_blake3() {
        let full = blake3::hash(b"certificado").to_hex();
        assert_eq!(fingerprint("certificado").to_hex(), &full.as_str()[..16]);
    }

    #[test]
    fn test_hex_roundtrip() {
        let fp = fingerprint("modelo");
        assert_eq!(fp.to_string().parse::<Fingerprint>().unwrap(), fp);
        assert!(Fingerprint::from_hex("abcd").is_err());
    }
}
