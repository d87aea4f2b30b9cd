//! Error types for the certificate service.

use certmint_core::{
    CodeParseError, CodecError, ContentError, IssuerId, KeyError, LinkError, TemplateId,
    TokenError, UniqueCode,
};
use certmint_render::RenderError;
use certmint_store::StoreError;
use thiserror::Error;

/// Errors that can occur during service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Rendering error (missing field or engine failure).
    #[error("rendering error: {0}")]
    Render(#[from] RenderError),

    /// A signed token failed verification.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Certificate content failed validation.
    #[error("invalid content: {0}")]
    Content(#[from] ContentError),

    /// Key material could not be parsed.
    #[error("invalid key material: {0}")]
    Key(#[from] KeyError),

    /// A verification link could not be built.
    #[error("invalid link: {0}")]
    Link(#[from] LinkError),

    /// A stored template body could not be decompressed.
    #[error("corrupt template body: {0}")]
    Codec(#[from] CodecError),

    /// A lookup code is not a well-formed unique code.
    #[error("invalid code: {0}")]
    InvalidCode(#[from] CodeParseError),

    /// Every drawn code was already taken.
    #[error("no free unique code after {attempts} attempts")]
    CodeCollision { attempts: u32 },

    /// Certificate not found.
    #[error("certificate not found: {0}")]
    CertificateNotFound(UniqueCode),

    /// Template not found.
    #[error("template not found: {0}")]
    TemplateNotFound(TemplateId),

    /// Issuer not found.
    #[error("issuer not found: {0}")]
    IssuerNotFound(IssuerId),

    /// The operation needs key material that was not configured.
    #[error("no {0} key configured")]
    MissingKey(&'static str),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A blocking task was cancelled or panicked.
    #[error("blocking task failed: {0}")]
    Task(String),
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
