//! The certificate service: unified API over store, keys and renderer.
//!
//! Two identity modes share one content shape:
//! - **Stored code**: the certificate is persisted under a [`UniqueCode`]
//!   and verified by looking it up.
//! - **Self-contained**: the content is signed into a [`SignedToken`] and
//!   verified with the public key alone.
//!
//! Both end up as a verification URL built by the same
//! [`ValidationLinkBuilder`].

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use url::Url;

use certmint_core::content::{validate_extension, EMISSAO, EMISSORA};
use certmint_core::{
    token, Certificate, Content, Ed25519PublicKey, FieldMap, FieldValue, Identity, Issuer,
    IssuerId, Keypair, SignedToken, Template, TemplateDraft, TemplateId, UniqueCode,
    ValidationLinkBuilder,
};
use certmint_render::renderer::DATA;
use certmint_render::{RenderedDocument, TemplateRenderer};
use certmint_store::{InsertResult, Store};

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};

/// Outcome of registering a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRegistration {
    /// The stored template.
    pub template: Template,
    /// Earlier templates with the same fingerprint, oldest first.
    pub duplicates: Vec<TemplateId>,
}

/// A stored certificate with the records it refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCertificate {
    pub certificate: Certificate,
    pub template: Template,
    pub issuer: Issuer,
}

impl StoredCertificate {
    /// The rendering context: the certificate fields plus issuer name and
    /// certificate date.
    pub fn context(&self) -> FieldMap {
        let mut fields = self.certificate.fields.clone();
        fields.insert(EMISSORA.to_string(), FieldValue::Text(self.issuer.name.clone()));
        fields.insert(DATA.to_string(), FieldValue::Date(self.certificate.date));
        fields
            .entry(EMISSAO.to_string())
            .or_insert(FieldValue::Date(self.certificate.date));
        fields
    }
}

/// Issues, looks up, verifies and renders certificates.
pub struct CertificateService<S: Store> {
    store: Arc<S>,
    renderer: Arc<TemplateRenderer>,
    links: ValidationLinkBuilder,
    signing_key: Option<Keypair>,
    verifying_key: Option<Ed25519PublicKey>,
    max_code_attempts: u32,
}

impl<S: Store> CertificateService<S> {
    /// Create a service over `store`.
    ///
    /// Fails if the base URL or any configured key material is invalid, or
    /// if both keys are configured and do not belong together.
    pub fn new(store: S, config: &ServiceConfig) -> Result<Self> {
        config.validate()?;
        let links = ValidationLinkBuilder::new(&config.base_url)?;

        let signing_key = config
            .signing_key
            .as_deref()
            .map(Keypair::parse)
            .transpose()?;
        let verifying_key = match config.verifying_key.as_deref() {
            Some(material) => Some(Ed25519PublicKey::parse(material)?),
            None => signing_key.as_ref().map(Keypair::public_key),
        };

        if let (Some(signing), Some(verifying)) = (&signing_key, &verifying_key) {
            if signing.public_key() != *verifying {
                return Err(ServiceError::Config(
                    "verifying key does not match signing key".into(),
                ));
            }
        }

        info!(
            base_url = %links.prefix(),
            environment = ?config.environment,
            can_sign = signing_key.is_some(),
            can_verify = verifying_key.is_some(),
            "certificate service ready"
        );

        Ok(Self {
            store: Arc::new(store),
            renderer: Arc::new(TemplateRenderer::new()),
            links,
            signing_key,
            verifying_key,
            max_code_attempts: config.max_code_attempts,
        })
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn links(&self) -> &ValidationLinkBuilder {
        &self.links
    }

    /// The key tokens are verified against, if configured.
    pub fn public_key(&self) -> Option<Ed25519PublicKey> {
        self.verifying_key
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Issuers and Templates
    // ─────────────────────────────────────────────────────────────────────────

    /// Register an issuing entity.
    pub async fn register_issuer(&self, name: &str) -> Result<Issuer> {
        let issuer = self.store.insert_issuer(name).await?;
        debug!(issuer = %issuer.id, name = %issuer.name, "registered issuer");
        Ok(issuer)
    }

    /// Compress, fingerprint and store a template body.
    ///
    /// Identical bodies are allowed; earlier ones are reported in
    /// [`TemplateRegistration::duplicates`].
    pub async fn register_template(
        &self,
        name: &str,
        issuer_id: IssuerId,
        body: &str,
    ) -> Result<TemplateRegistration> {
        let draft = TemplateDraft::new(name, issuer_id, body)?;
        let duplicates: Vec<TemplateId> = self
            .store
            .find_template_by_fingerprint(&draft.fingerprint)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();

        let template = self.store.insert_template(&draft).await?;
        if !duplicates.is_empty() {
            debug!(
                template = %template.id,
                fingerprint = %template.fingerprint,
                duplicates = duplicates.len(),
                "template body already stored"
            );
        }

        Ok(TemplateRegistration {
            template,
            duplicates,
        })
    }

    /// The decompressed body of a stored template.
    pub async fn template_body(&self, id: TemplateId) -> Result<String> {
        let template = self.require_template(id).await?;
        Ok(template.body()?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stored-Code Certificates
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue a certificate under a fresh unique code.
    ///
    /// `date` is the event date (the last day for multi-day events). A code
    /// already in use is redrawn, up to the configured number of attempts.
    pub async fn issue(
        &self,
        template_id: TemplateId,
        date: NaiveDate,
        fields: FieldMap,
    ) -> Result<Certificate> {
        validate_extension(&fields)?;
        self.require_template(template_id).await?;

        let mut certificate = Certificate::new(UniqueCode::generate(), template_id, date, fields);
        for attempt in 1..=self.max_code_attempts {
            match self.store.insert_certificate(&certificate).await? {
                InsertResult::Inserted => {
                    debug!(code = %certificate.code, template = %template_id, "issued certificate");
                    return Ok(certificate);
                }
                InsertResult::CodeCollision => {
                    warn!(
                        code = %certificate.code,
                        attempt,
                        max_attempts = self.max_code_attempts,
                        "unique code already taken, drawing another"
                    );
                    certificate = certificate.with_code(UniqueCode::generate());
                }
            }
        }

        Err(ServiceError::CodeCollision {
            attempts: self.max_code_attempts,
        })
    }

    /// Issue a stored certificate whose fields are exactly `content`.
    pub async fn issue_content(
        &self,
        template_id: TemplateId,
        content: &Content,
    ) -> Result<Certificate> {
        self.issue(template_id, content.emissao(), content.to_fields())
            .await
    }

    /// Look up a certificate by code.
    pub async fn find(&self, code: &UniqueCode) -> Result<Option<Certificate>> {
        Ok(self.store.find_certificate_by_code(code).await?)
    }

    /// Look up a certificate by user-supplied text.
    ///
    /// Text that cannot be a code yields `None`, like an unknown code.
    pub async fn find_str(&self, code: &str) -> Result<Option<Certificate>> {
        match UniqueCode::parse(code.trim()) {
            Ok(code) => self.find(&code).await,
            Err(e) => {
                debug!(error = %e, "lookup with malformed code");
                Ok(None)
            }
        }
    }

    /// Look up a certificate along with its template and issuer.
    pub async fn lookup(&self, code: &UniqueCode) -> Result<Option<StoredCertificate>> {
        let certificate = match self.find(code).await? {
            Some(certificate) => certificate,
            None => return Ok(None),
        };
        let template = self.require_template(certificate.template_id).await?;
        let issuer = self
            .store
            .find_issuer(template.issuer_id)
            .await?
            .ok_or(ServiceError::IssuerNotFound(template.issuer_id))?;

        Ok(Some(StoredCertificate {
            certificate,
            template,
            issuer,
        }))
    }

    /// Delete a certificate. Returns whether it existed.
    ///
    /// Signed tokens are unaffected: they never depended on the store.
    pub async fn delete(&self, code: &UniqueCode) -> Result<bool> {
        let deleted = self.store.delete_certificate(code).await?;
        debug!(code = %code, deleted, "delete certificate");
        Ok(deleted)
    }

    /// Render a stored certificate to a document and preview.
    pub async fn render_stored(&self, code: &UniqueCode) -> Result<RenderedDocument> {
        let stored = self
            .lookup(code)
            .await?
            .ok_or_else(|| ServiceError::CertificateNotFound(code.clone()))?;

        let body = stored.template.body()?;
        let fields = stored.context();
        let url = self.links.build(code.as_str())?;

        let renderer = Arc::clone(&self.renderer);
        blocking(move || renderer.render_fields(&body, &fields, &url)).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Self-Contained Tokens
    // ─────────────────────────────────────────────────────────────────────────

    /// Sign content into a self-contained token.
    pub fn issue_token(&self, content: &Content) -> Result<SignedToken> {
        let keypair = self
            .signing_key
            .as_ref()
            .ok_or(ServiceError::MissingKey("signing"))?;
        let signed = token::sign(content, keypair)?;
        debug!(token_len = signed.as_str().len(), "issued signed token");
        Ok(signed)
    }

    /// Verify a token and return its content.
    ///
    /// Every failure is [`TokenError::InvalidToken`](certmint_core::TokenError).
    pub fn verify_token(&self, token: &str) -> Result<Content> {
        let public_key = self
            .verifying_key
            .as_ref()
            .ok_or(ServiceError::MissingKey("verifying"))?;
        Ok(token::verify(token, public_key)?)
    }

    /// Verify a token and render its content with a stored template.
    pub async fn render_token(
        &self,
        template_id: TemplateId,
        token: &str,
    ) -> Result<RenderedDocument> {
        let content = self.verify_token(token)?;
        let body = self.require_template(template_id).await?.body()?;
        let url = self.links.build(token)?;

        let renderer = Arc::clone(&self.renderer);
        blocking(move || renderer.render(&body, &content, &url)).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Links and Previews
    // ─────────────────────────────────────────────────────────────────────────

    /// The verification URL for an identifier.
    pub fn validation_url(&self, identity: &Identity) -> Result<Url> {
        Ok(identity.verification_url(&self.links)?)
    }

    /// Preview an unsaved template body as PNG.
    pub async fn draft_preview(&self, body: &str) -> Result<Vec<u8>> {
        let body = body.to_string();
        let renderer = Arc::clone(&self.renderer);
        blocking(move || renderer.draft_preview(&body)).await
    }

    async fn require_template(&self, id: TemplateId) -> Result<Template> {
        self.store
            .find_template(id)
            .await?
            .ok_or(ServiceError::TemplateNotFound(id))
    }
}

/// Run a render step on the blocking pool.
async fn blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> certmint_render::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let rendered = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServiceError::Task(e.to_string()))?;
    Ok(rendered?)
}
