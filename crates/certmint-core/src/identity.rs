//! The two ways a certificate can be identified.

use std::fmt;

use url::Url;

use crate::code::UniqueCode;
use crate::error::LinkError;
use crate::link::ValidationLinkBuilder;
use crate::token::SignedToken;

/// How a certificate is looked up by a verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// A store-issued code; verification requires a store lookup.
    StoredCode(UniqueCode),
    /// A signed token; verification requires only the public key.
    SelfContained(SignedToken),
}

impl Identity {
    /// The identifier string that goes into the verification URL.
    pub fn identifier(&self) -> &str {
        match self {
            Identity::StoredCode(code) => code.as_str(),
            Identity::SelfContained(token) => token.as_str(),
        }
    }

    /// Build this identity's verification URL.
    pub fn verification_url(&self, links: &ValidationLinkBuilder) -> Result<Url, LinkError> {
        links.build(self.identifier())
    }

    pub fn is_stateless(&self) -> bool {
        matches!(self, Identity::SelfContained(_))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl From<UniqueCode> for Identity {
    fn from(code: UniqueCode) -> Self {
        Identity::StoredCode(code)
    }
}

impl From<SignedToken> for Identity {
    fn from(token: SignedToken) -> Self {
        Identity::SelfContained(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Content;
    use crate::crypto::Keypair;
    use crate::token::sign;
    use chrono::NaiveDate;

    #[test]
    fn test_both_modes_share_link_shape() {
        let links = ValidationLinkBuilder::new("https://example.org").unwrap();

        let code = UniqueCode::parse("abcdefghijkm").unwrap();
        let stored = Identity::from(code);
        assert_eq!(
            stored.verification_url(&links).unwrap().as_str(),
            "https://example.org/v/abcdefghijkm"
        );
        assert!(!stored.is_stateless());

        let content = Content::new(
            "Ana Silva",
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            "GruPy-SP",
            "Participou do evento",
        )
        .unwrap();
        let token = sign(&content, &Keypair::from_seed(&[9u8; 32])).unwrap();
        let stateless = Identity::from(token.clone());
        assert!(stateless.is_stateless());
        assert_eq!(
            stateless.verification_url(&links).unwrap().as_str(),
            format!("https://example.org/v/{}", token)
        );
    }
}
