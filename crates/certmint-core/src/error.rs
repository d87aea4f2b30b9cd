//! Error types for certmint core.

use thiserror::Error;

/// Errors from the content codec.
///
/// The two variants are kept apart so callers can tell "this is not a code
/// we could have produced" from "this looked like ours but is damaged".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    #[error("compression failed: {0}")]
    Compression(String),
}

/// Errors raised while constructing or decoding [`Content`](crate::Content).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    #[error("field {field} must have between {min} and {max} characters, got {actual}")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("extension field {0} collides with a reserved field")]
    ReservedField(String),

    #[error("invalid field name: {0:?}")]
    InvalidFieldName(String),

    #[error("field {0} holds a non-finite number")]
    NonFinite(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("malformed content: {0}")]
    Malformed(String),

    #[error(transparent)]
    Encoding(#[from] CodecError),
}

/// Error returned when parsing a unique code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeParseError {
    #[error("code must have 12 characters, got {0}")]
    Length(usize),

    #[error("character {0:?} is not allowed in a code")]
    Character(char),
}

/// Errors raised by token verification.
///
/// Deliberately a single variant: the reason a token was rejected is logged,
/// never returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invalid token")]
    InvalidToken,
}

/// Errors raised by the signature primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature")]
    InvalidSignature,
}

/// Errors raised while parsing key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid signing key: {0}")]
    InvalidSigningKey(String),

    #[error("invalid verifying key: {0}")]
    InvalidVerifyingKey(String),
}

/// Errors raised while composing verification links.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    #[error("identifier is not path-segment safe: {0:?}")]
    UnsafeIdentifier(String),
}
