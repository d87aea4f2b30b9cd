//! Self-contained signed tokens.
//!
//! A token carries its content and signature together, so it can be checked
//! with nothing but the issuer's public key.
//!
//! ```text
//! token    = codec(envelope)
//! envelope = canonical CBOR { "v": 1, "sig": bstr(64), "payload": bstr }
//! payload  = canonical CBOR of the content fields
//! signed   = SIGN_DOMAIN || payload
//! ```
//!
//! The algorithm is fixed to Ed25519 by the envelope version; nothing in the
//! token selects it. Verification accepts only the exact token string that
//! signing would have produced for the recovered content.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::canonical::{
    canonical_content_bytes, decode_content, encode_bytes, encode_integer, encode_map_canonical,
    encode_text,
};
use crate::codec;
use crate::content::Content;
use crate::crypto::{Ed25519PublicKey, Ed25519Signature, Keypair};
use crate::error::{CodecError, TokenError};

/// Domain separation prefix for content signatures.
pub const SIGN_DOMAIN: &[u8] = b"certmint/content-sig/v1";

/// Envelope format version.
pub const TOKEN_VERSION: i64 = 1;

const KEY_VERSION: &str = "v";
const KEY_SIGNATURE: &str = "sig";
const KEY_PAYLOAD: &str = "payload";

/// An opaque, URL-safe, self-verifying encoding of [`Content`].
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedToken(String);

impl SignedToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.0.chars().take(16).collect();
        write!(f, "SignedToken({}...)", head)
    }
}

impl AsRef<str> for SignedToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Sign content and wrap it into a token.
pub fn sign(content: &Content, keypair: &Keypair) -> Result<SignedToken, CodecError> {
    let payload = canonical_content_bytes(content);
    let signature = keypair.sign(&signing_message(&payload));
    let envelope = encode_envelope(&payload, &signature);
    Ok(SignedToken(codec::encode(&envelope)?))
}

/// Verify a token and recover its content.
///
/// Every failure is reported as [`TokenError::InvalidToken`]; the cause is
/// only logged.
pub fn verify(token: &str, public_key: &Ed25519PublicKey) -> Result<Content, TokenError> {
    let envelope = codec::decode(token).map_err(|e| reject(&e))?;

    if codec::encode(&envelope).map_err(|e| reject(&e))? != token {
        return Err(reject(&"non-canonical token encoding"));
    }

    let (payload, signature) = decode_envelope(&envelope).map_err(|e| reject(&e))?;

    public_key
        .verify(&signing_message(&payload), &signature)
        .map_err(|e| reject(&e))?;

    decode_content(&payload).map_err(|e| reject(&e))
}

fn reject(cause: &dyn fmt::Display) -> TokenError {
    debug!(cause = %cause, "token rejected");
    TokenError::InvalidToken
}

fn signing_message(payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(SIGN_DOMAIN.len() + payload.len());
    message.extend_from_slice(SIGN_DOMAIN);
    message.extend_from_slice(payload);
    message
}

fn encode_envelope(payload: &[u8], signature: &Ed25519Signature) -> Vec<u8> {
    let entry = |key: &str, value: Vec<u8>| {
        let mut k = Vec::new();
        encode_text(&mut k, key);
        (k, value)
    };

    let mut version = Vec::new();
    encode_integer(&mut version, TOKEN_VERSION);
    let mut sig = Vec::new();
    encode_bytes(&mut sig, signature.as_bytes());
    let mut body = Vec::new();
    encode_bytes(&mut body, payload);

    let mut buf = Vec::new();
    encode_map_canonical(
        &mut buf,
        vec![
            entry(KEY_VERSION, version),
            entry(KEY_SIGNATURE, sig),
            entry(KEY_PAYLOAD, body),
        ],
    );
    buf
}

fn decode_envelope(bytes: &[u8]) -> Result<(Vec<u8>, Ed25519Signature), String> {
    let value: Value = ciborium::from_reader(bytes).map_err(|e| e.to_string())?;
    let entries = match value {
        Value::Map(entries) => entries,
        _ => return Err("envelope is not a map".into()),
    };
    if entries.len() != 3 {
        return Err(format!("envelope has {} entries", entries.len()));
    }

    let mut version = None;
    let mut signature = None;
    let mut payload = None;
    for (key, value) in entries {
        match (key.as_text(), value) {
            (Some(KEY_VERSION), Value::Integer(v)) => version = i64::try_from(v).ok(),
            (Some(KEY_SIGNATURE), Value::Bytes(b)) => signature = Ed25519Signature::from_slice(&b),
            (Some(KEY_PAYLOAD), Value::Bytes(b)) => payload = Some(b),
            (key, _) => return Err(format!("unexpected envelope entry {:?}", key)),
        }
    }

    if version != Some(TOKEN_VERSION) {
        return Err(format!("unsupported envelope version {:?}", version));
    }
    let signature = signature.ok_or("missing or malformed signature")?;
    let payload = payload.ok_or("missing payload")?;

    if encode_envelope(&payload, &signature) != bytes {
        return Err("non-canonical envelope".into());
    }

    Ok((payload, signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::is_codec_char;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn ana() -> Content {
        Content::new(
            "Ana Silva",
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            "GruPy-SP",
            "Participou do evento",
        )
        .unwrap()
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let keypair = Keypair::from_seed(&[1u8; 32]);
        let token = sign(&ana(), &keypair).unwrap();
        assert_eq!(verify(token.as_str(), &keypair.public_key()).unwrap(), ana());
    }

    #[test]
    fn test_token_is_url_safe() {
        let keypair = Keypair::from_seed(&[1u8; 32]);
        let token = sign(&ana(), &keypair).unwrap();
        assert!(token.as_str().chars().all(is_codec_char));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let keypair = Keypair::from_seed(&[1u8; 32]);
        assert_eq!(
            sign(&ana(), &keypair).unwrap(),
            sign(&ana(), &keypair).unwrap()
        );
    }

    #[test]
    fn test_extensions_survive() {
        let keypair = Keypair::from_seed(&[2u8; 32]);
        let content = Content::builder(
            "Ana Silva",
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            "GruPy-SP",
            "Participou do evento",
        )
        .field("carga_horaria", 8i64)
        .field("nota", 9.75f64)
        .field("palestra", "Rust para pythonistas")
        .field("inicio", NaiveDate::from_ymd_opt(2024, 3, 8).unwrap())
        .build()
        .unwrap();

        let token = sign(&content, &keypair).unwrap();
        assert_eq!(verify(token.as_str(), &keypair.public_key()).unwrap(), content);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let signer = Keypair::from_seed(&[1u8; 32]);
        let other = Keypair::from_seed(&[2u8; 32]);
        let token = sign(&ana(), &signer).unwrap();
        assert_eq!(
            verify(token.as_str(), &other.public_key()),
            Err(TokenError::InvalidToken)
        );
    }

    #[test]
    fn test_every_single_character_mutation_rejected() {
        let keypair = Keypair::from_seed(&[3u8; 32]);
        let token = sign(&ana(), &keypair).unwrap().into_string();
        let pk = keypair.public_key();

        for (i, original) in token.char_indices() {
            for replacement in ['A', 'b', '7', '-', '_', '~'] {
                if replacement == original {
                    continue;
                }
                let mut mutated = token.clone();
                mutated.replace_range(i..i + 1, &replacement.to_string());
                assert_eq!(
                    verify(&mutated, &pk),
                    Err(TokenError::InvalidToken),
                    "mutation at {} to {:?} was accepted",
                    i,
                    replacement
                );
            }
        }
    }

    #[test]
    fn test_garbage_rejected() {
        let pk = Keypair::from_seed(&[3u8; 32]).public_key();
        for garbage in ["", "abc", "!!!", "~~~~", &codec::encode_str("not cbor").unwrap()] {
            assert_eq!(verify(garbage, &pk), Err(TokenError::InvalidToken));
        }
    }

    #[test]
    fn test_forged_envelope_rejected() {
        let keypair = Keypair::from_seed(&[4u8; 32]);
        let payload = canonical_content_bytes(&ana());
        let forged = encode_envelope(&payload, &Ed25519Signature::from_bytes([0u8; 64]));
        assert_eq!(
            verify(&codec::encode(&forged).unwrap(), &keypair.public_key()),
            Err(TokenError::InvalidToken)
        );
    }

    #[test]
    fn test_signature_over_other_domain_rejected() {
        let keypair = Keypair::from_seed(&[5u8; 32]);
        let payload = canonical_content_bytes(&ana());
        let signature = keypair.sign(&payload);
        let envelope = encode_envelope(&payload, &signature);
        assert_eq!(
            verify(&codec::encode(&envelope).unwrap(), &keypair.public_key()),
            Err(TokenError::InvalidToken)
        );
    }

    #[test]
    fn test_signed_but_invalid_content_rejected() {
        // A correctly signed payload that does not describe valid content.
        let keypair = Keypair::from_seed(&[6u8; 32]);
        let payload = vec![0xa0];
        let signature = keypair.sign(&signing_message(&payload));
        let envelope = encode_envelope(&payload, &signature);
        assert_eq!(
            verify(&codec::encode(&envelope).unwrap(), &keypair.public_key()),
            Err(TokenError::InvalidToken)
        );
    }

    fn content_strategy() -> impl Strategy<Value = Content> {
        (
            "[A-Za-zÀ-ú ]{5,50}",
            0i64..40_000,
            "[A-Za-z0-9 -]{5,50}",
            "\\PC{5,250}",
            prop::collection::btree_map("[a-z_][a-z0-9_]{0,15}", any::<i64>(), 0..4),
        )
            .prop_filter_map("reserved names", |(titular, days, emissora, texto, extra)| {
                let emissao = NaiveDate::from_ymd_opt(1970, 1, 1)?
                    .checked_add_days(chrono::Days::new(days as u64))?;
                let mut builder = Content::builder(titular, emissao, emissora, texto);
                for (name, value) in extra {
                    builder = builder.field(name, value);
                }
                builder.build().ok()
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_sign_verify_roundtrip(content in content_strategy(), seed in any::<[u8; 32]>()) {
            let keypair = Keypair::from_seed(&seed);
            let token = sign(&content, &keypair).unwrap();
            prop_assert_eq!(verify(token.as_str(), &keypair.public_key()).unwrap(), content);
        }
    }
}
