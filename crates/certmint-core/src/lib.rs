//! # certmint core
//!
//! Pure primitives for issuing and verifying certificates: the content model,
//! the compact codec, fingerprints, unique codes, signed tokens and
//! verification links.
//!
//! This crate performs no I/O. Storage lives in `certmint-store` and
//! document rendering in `certmint-render`.
//!
//! ## Key Types
//!
//! - [`Content`] - The structured payload of a certificate
//! - [`SignedToken`] - Self-verifying encoding of content
//! - [`UniqueCode`] - Store-issued, human-typable identifier
//! - [`Fingerprint`] - Short digest of a template body
//! - [`Identity`] - Either of the two identifiers above
//! - [`ValidationLinkBuilder`] - Composes verification URLs
//!
//! ## Canonicalization
//!
//! Signed content is encoded using deterministic CBOR. See [`canonical`].

pub mod canonical;
pub mod code;
pub mod codec;
pub mod content;
pub mod crypto;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod link;
pub mod records;
pub mod token;
pub mod types;

pub use canonical::{canonical_content_bytes, decode_content};
pub use code::UniqueCode;
pub use content::{Content, ContentBuilder, FieldMap, FieldValue};
pub use crypto::{Ed25519PublicKey, Ed25519Signature, Keypair};
pub use error::{CodeParseError, CodecError, ContentError, CryptoError, KeyError, LinkError, TokenError};
pub use fingerprint::{fingerprint, Fingerprint};
pub use identity::Identity;
pub use link::ValidationLinkBuilder;
pub use records::{Certificate, Issuer, Template, TemplateDraft};
pub use token::SignedToken;
pub use types::{IssuerId, TemplateId};
