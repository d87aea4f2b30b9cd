//! Human-typable unique certificate codes.
//!
//! Codes are 12 characters drawn uniformly from an alphabet without visually
//! confusable glyphs (`0`, `O`, `1`, `I` and `l` are all excluded). The
//! generator makes no uniqueness promise: the store reports collisions and
//! the caller draws again.

use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CodeParseError;

/// Characters a code may contain.
pub const ALPHABET: &[u8] = b"abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Number of characters in a code.
pub const CODE_LEN: usize = 12;

/// A unique certificate code.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct UniqueCode(String);

impl UniqueCode {
    /// Draw a new code from the thread-local CSPRNG.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Draw a new code from the given generator.
    pub fn generate_with<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        let code = (0..CODE_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Parse and validate a code typed or scanned by a user.
    pub fn parse(s: &str) -> Result<Self, CodeParseError> {
        if let Some(c) = s.chars().find(|c| !is_code_char(*c)) {
            return Err(CodeParseError::Character(c));
        }
        if s.len() != CODE_LEN {
            return Err(CodeParseError::Length(s.chars().count()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Generate a fresh code.
pub fn generate() -> UniqueCode {
    UniqueCode::generate()
}

/// Whether `c` belongs to the code alphabet.
pub fn is_code_char(c: char) -> bool {
    c.is_ascii() && ALPHABET.contains(&(c as u8))
}

impl fmt::Display for UniqueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for UniqueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UniqueCode({})", self.0)
    }
}

impl AsRef<str> for UniqueCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for UniqueCode {
    type Err = CodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<UniqueCode> for String {
    fn from(code: UniqueCode) -> Self {
        code.0
    }
}

impl TryFrom<String> for UniqueCode {
    type Error = CodeParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}
