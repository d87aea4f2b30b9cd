//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use chrono::NaiveDate;

use certmint::{CertificateService, ServiceConfig};
use certmint_core::{Content, Ed25519PublicKey, Keypair, SignedToken, Template, UniqueCode};
use certmint_store::MemoryStore;

/// Base URL used by fixtures.
pub const BASE_URL: &str = "https://certificados.example.org/";

/// A short template exercising the reserved fields.
pub const SHORT_TEMPLATE: &str = "Certifico que {{titular}} participou em {{emissao}}";

/// A complete certificate template with QR code and link.
pub const FULL_TEMPLATE: &str = r#"<html>
<head><style>body { text-align: center; }</style></head>
<body>
  <h1>Certificado</h1>
  <p>Certificamos que <strong>{{titular}}</strong> participou do evento
     promovido por {{emissora}} em {{format_date data "%d/%m/%Y"}}.</p>
  <p>{{texto}}</p>
  <img src="data:image/png;base64,{{qrcode}}">
  <p>{{url_validacao}}</p>
</body>
</html>"#;

/// The content used across the scenario tests.
pub fn sample_content() -> Content {
    content_for("Ana Silva")
}

/// Sample content for another recipient.
pub fn content_for(titular: &str) -> Content {
    Content::new(
        titular,
        NaiveDate::from_ymd_opt(2024, 3, 10).expect("valid date"),
        "GruPy-SP",
        "Participou do evento",
    )
    .expect("fixture content is valid")
}

/// A test fixture with a keypair and a memory-backed service config.
pub struct TestFixture {
    pub keypair: Keypair,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self {
            keypair: Keypair::generate(),
        }
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            keypair: Keypair::from_seed(&seed),
        }
    }

    /// Get the keypair's public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }

    /// A service configuration holding this fixture's signing key.
    pub fn config(&self) -> ServiceConfig {
        ServiceConfig {
            base_url: BASE_URL.to_string(),
            signing_key: Some(hex::encode(self.keypair.seed())),
            ..ServiceConfig::default()
        }
    }

    /// A fresh service over an empty memory store.
    pub fn service(&self) -> CertificateService<MemoryStore> {
        CertificateService::new(MemoryStore::new(), &self.config())
            .expect("fixture config is valid")
    }

    /// A service with one issuer and one template already registered.
    pub async fn service_with_template(
        &self,
        body: &str,
    ) -> (CertificateService<MemoryStore>, Template) {
        let service = self.service();
        let issuer = service
            .register_issuer("GruPy-SP")
            .await
            .expect("register issuer");
        let template = service
            .register_template("participação", issuer.id, body)
            .await
            .expect("register template")
            .template;
        (service, template)
    }

    /// Sign content with this fixture's key.
    pub fn sign(&self, content: &Content) -> SignedToken {
        certmint_core::token::sign(content, &self.keypair).expect("sign content")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixed, valid unique code.
pub fn sample_code() -> UniqueCode {
    UniqueCode::parse("abcdefghijkm").expect("valid code")
}
