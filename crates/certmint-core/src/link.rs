//! Verification links.
//!
//! Both identity modes reduce to an identifier string that is appended to
//! `<base>/v/`. The same URL is shown as text and encoded in the QR code.

use url::Url;

use crate::codec::is_codec_char;
use crate::error::LinkError;

/// Path segment under which verification pages live.
pub const VERIFY_SEGMENT: &str = "v";

/// Builds verification URLs against a fixed base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationLinkBuilder {
    prefix: Url,
}

impl ValidationLinkBuilder {
    /// Create a builder for the given base URL.
    ///
    /// The base may or may not already end in the verification segment;
    /// `https://x.org`, `https://x.org/`, `https://x.org/v` and
    /// `https://x.org/v/` all normalise to `https://x.org/v/`.
    pub fn new(base_url: &str) -> Result<Self, LinkError> {
        let mut url =
            Url::parse(base_url.trim()).map_err(|e| LinkError::InvalidBaseUrl(e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(LinkError::InvalidBaseUrl(format!(
                "{} cannot be a base",
                base_url
            )));
        }
        url.set_query(None);
        url.set_fragment(None);

        let mut path = url.path().trim_end_matches('/').to_string();
        let segment = format!("/{}", VERIFY_SEGMENT);
        if !path.ends_with(&segment) {
            path.push_str(&segment);
        }
        path.push('/');
        url.set_path(&path);

        Ok(Self { prefix: url })
    }

    /// The normalised prefix every link starts with.
    pub fn prefix(&self) -> &Url {
        &self.prefix
    }

    /// Build the verification URL for an identifier.
    pub fn build(&self, identifier: &str) -> Result<Url, LinkError> {
        check_identifier(identifier)?;
        self.prefix
            .join(identifier)
            .map_err(|e| LinkError::UnsafeIdentifier(format!("{}: {}", identifier, e)))
    }
}

/// Build a verification URL in one step.
pub fn build(base_url: &str, identifier: &str) -> Result<Url, LinkError> {
    ValidationLinkBuilder::new(base_url)?.build(identifier)
}

/// Identifiers come from the code generator or the codec, whose alphabets
/// are both path-segment safe. Anything else is refused rather than escaped.
fn check_identifier(identifier: &str) -> Result<(), LinkError> {
    if identifier.is_empty() || !identifier.chars().all(is_codec_char) {
        return Err(LinkError::UnsafeIdentifier(identifier.to_string()));
    }
    Ok(())
}
