//! Error types for certificate rendering.

use std::fmt;

use thiserror::Error;

/// Stage of the rendering pipeline an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStep {
    Template,
    QrCode,
    Markup,
    Layout,
    Document,
    Preview,
}

impl fmt::Display for RenderStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderStep::Template => "template",
            RenderStep::QrCode => "qr_code",
            RenderStep::Markup => "markup",
            RenderStep::Layout => "layout",
            RenderStep::Document => "document",
            RenderStep::Preview => "preview",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while rendering a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The template references a field the context does not provide.
    #[error("template references missing field: {0}")]
    MissingField(String),

    #[error("rendering failed at {step}: {message}")]
    RenderingFailure { step: RenderStep, message: String },
}

impl RenderError {
    pub(crate) fn at(step: RenderStep, message: impl fmt::Display) -> Self {
        RenderError::RenderingFailure {
            step,
            message: message.to_string(),
        }
    }
}

/// Result type for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;
