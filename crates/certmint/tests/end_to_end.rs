//! Full issuance flows through the service: register, issue, look up,
//! render, delete, in both identity modes.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use certmint::core::{Fingerprint, TemplateDraft};
use certmint::store::{InsertResult, MemoryStore, SqliteStore, Store};
use certmint::{
    CertificateService, Certificate, Content, FieldMap, FieldValue, Identity, Issuer, IssuerId,
    Keypair, ServiceConfig, ServiceError, Template, TemplateId, UniqueCode,
};
use chrono::NaiveDate;
use lopdf::Document;

const BASE_URL: &str = "https://certificados.example.org";
const BODY: &str = "<h1>Certificado</h1>\
    <p>Certifico que {{titular}} participou em {{emissao}}.</p>\
    <p>{{texto}}</p>\
    <p>Emitido por {{emissora}} em {{data}}</p>\
    <img src=\"data:image/png;base64,{{qrcode}}\">";

fn config() -> ServiceConfig {
    ServiceConfig {
        base_url: BASE_URL.to_string(),
        signing_key: Some(hex_seed(7)),
        ..ServiceConfig::default()
    }
}

fn hex_seed(byte: u8) -> String {
    format!("{:02x}", byte).repeat(32)
}

fn ana() -> Content {
    Content::new(
        "Ana Silva",
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        "GruPy-SP",
        "Participou do evento",
    )
    .unwrap()
}

fn pdf_text(bytes: &[u8]) -> String {
    let doc = Document::load_mem(bytes).unwrap();
    doc.extract_text(&[1]).unwrap()
}

async fn setup<S: Store>(store: S) -> (CertificateService<S>, Template) {
    let service = CertificateService::new(store, &config()).unwrap();
    let issuer = service.register_issuer("GruPy-SP").await.unwrap();
    let template = service
        .register_template("participação", issuer.id, BODY)
        .await
        .unwrap()
        .template;
    (service, template)
}

#[tokio::test]
async fn test_stored_code_flow() {
    let (service, template) = setup(SqliteStore::open_memory().unwrap()).await;

    let certificate = service.issue_content(template.id, &ana()).await.unwrap();
    assert_eq!(certificate.code.as_str().len(), 12);

    let found = service.find(&certificate.code).await.unwrap();
    assert_eq!(found, Some(certificate.clone()));

    let rendered = service.render_stored(&certificate.code).await.unwrap();
    let text = pdf_text(&rendered.document);
    assert!(text.contains("Ana Silva"), "text was {:?}", text);
    assert!(text.contains("2024-03-10"));
    assert!(text.contains("Participou do evento"));
    assert!(text.contains("Emitido por GruPy-SP"));

    let url = service
        .validation_url(&Identity::StoredCode(certificate.code.clone()))
        .unwrap();
    assert_eq!(
        url.as_str(),
        format!("{}/v/{}", BASE_URL, certificate.code)
    );

    assert!(service.delete(&certificate.code).await.unwrap());
    assert_eq!(service.find(&certificate.code).await.unwrap(), None);
    assert!(matches!(
        service.render_stored(&certificate.code).await,
        Err(ServiceError::CertificateNotFound(_))
    ));
}

#[tokio::test]
async fn test_stored_certificate_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("certificados.db");

    let code = {
        let (service, template) = setup(SqliteStore::open(&path).unwrap()).await;
        service.issue_content(template.id, &ana()).await.unwrap().code
    };

    let service = CertificateService::new(SqliteStore::open(&path).unwrap(), &config()).unwrap();
    let stored = service.lookup(&code).await.unwrap().unwrap();
    assert_eq!(stored.issuer.name, "GruPy-SP");
    let text = pdf_text(&service.render_stored(&code).await.unwrap().document);
    assert!(text.contains("Ana Silva"), "text was {:?}", text);
}

#[tokio::test]
async fn test_self_contained_flow() {
    let (service, template) = setup(MemoryStore::new()).await;

    let token = service.issue_token(&ana()).unwrap();
    assert_eq!(service.verify_token(token.as_str()).unwrap(), ana());

    let rendered = service
        .render_token(template.id, token.as_str())
        .await
        .unwrap();
    let text = pdf_text(&rendered.document);
    assert!(text.contains("Ana Silva"));
    assert!(text.contains("GruPy-SP"));

    let identity = Identity::from(token.clone());
    assert!(identity.is_stateless());
    let url = service.validation_url(&identity).unwrap();
    assert!(url.as_str().ends_with(token.as_str()));
}

#[tokio::test]
async fn test_token_survives_certificate_deletion() {
    let (service, template) = setup(MemoryStore::new()).await;

    let certificate = service.issue_content(template.id, &ana()).await.unwrap();
    let token = service.issue_token(&ana()).unwrap();
    service.delete(&certificate.code).await.unwrap();

    assert_eq!(service.verify_token(token.as_str()).unwrap(), ana());
}

#[tokio::test]
async fn test_extension_fields_flow() {
    let (service, _) = setup(MemoryStore::new()).await;
    let issuer = service
        .store()
        .find_issuer_by_name("GruPy-SP")
        .await
        .unwrap()
        .unwrap();
    let template = service
        .register_template(
            "palestra",
            issuer.id,
            "<p>{{titular}} apresentou {{titulo_da_palestra}} ({{duracao}}h)</p>",
        )
        .await
        .unwrap()
        .template;

    let mut fields = FieldMap::new();
    fields.insert("titular".into(), "Ana Silva".into());
    fields.insert("titulo_da_palestra".into(), "Rust para pythonistas".into());
    fields.insert("duracao".into(), FieldValue::Integer(2));

    let certificate = service
        .issue(template.id, NaiveDate::from_ymd_opt(2024, 3, 12).unwrap(), fields)
        .await
        .unwrap();
    let text = pdf_text(&service.render_stored(&certificate.code).await.unwrap().document);
    assert!(text.contains("Rust para pythonistas (2h)"), "text was {:?}", text);
}

#[tokio::test]
async fn test_missing_field_reported() {
    let (service, _) = setup(MemoryStore::new()).await;
    let issuer = service.store().find_issuer(IssuerId(1)).await.unwrap().unwrap();
    let template = service
        .register_template("palestra", issuer.id, "<p>{{titulo_da_palestra}}</p>")
        .await
        .unwrap()
        .template;

    let certificate = service.issue_content(template.id, &ana()).await.unwrap();
    let err = service.render_stored(&certificate.code).await.unwrap_err();
    assert!(
        matches!(
            err,
            ServiceError::Render(certmint::render::RenderError::MissingField(ref name))
                if name == "titulo_da_palestra"
        ),
        "unexpected error {:?}",
        err
    );
}

#[tokio::test]
async fn test_duplicate_template_detected() {
    let (service, template) = setup(MemoryStore::new()).await;

    let again = service
        .register_template("cópia", template.issuer_id, BODY)
        .await
        .unwrap();
    assert_eq!(again.duplicates, vec![template.id]);
    assert_eq!(again.template.fingerprint, template.fingerprint);

    let trailing = service
        .register_template("espaço", template.issuer_id, &format!("{} ", BODY))
        .await
        .unwrap();
    assert!(trailing.duplicates.is_empty());
    assert_ne!(trailing.template.fingerprint, template.fingerprint);

    assert_eq!(service.template_body(template.id).await.unwrap(), BODY);
}

#[tokio::test]
async fn test_issue_requires_template() {
    let service = CertificateService::new(MemoryStore::new(), &config()).unwrap();
    assert!(matches!(
        service.issue_content(TemplateId(42), &ana()).await,
        Err(ServiceError::TemplateNotFound(TemplateId(42)))
    ));
}

#[tokio::test]
async fn test_find_str_tolerates_garbage() {
    let (service, template) = setup(MemoryStore::new()).await;
    let certificate = service.issue_content(template.id, &ana()).await.unwrap();

    assert_eq!(
        service.find_str(&format!(" {} ", certificate.code)).await.unwrap(),
        Some(certificate)
    );
    assert_eq!(service.find_str("0OIl").await.unwrap(), None);
}

#[tokio::test]
async fn test_draft_preview() {
    let service = CertificateService::new(MemoryStore::new(), &config()).unwrap();
    let png = service
        .draft_preview("<h1>{{ titular }}</h1><img src=\"data:image/png;base64,{{ qrcode }}\">")
        .await
        .unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
}

#[tokio::test]
async fn test_keys_required_for_tokens() {
    let config = ServiceConfig {
        base_url: BASE_URL.to_string(),
        ..ServiceConfig::default()
    };
    let service = CertificateService::new(MemoryStore::new(), &config).unwrap();
    assert!(matches!(
        service.issue_token(&ana()),
        Err(ServiceError::MissingKey("signing"))
    ));
    assert!(matches!(
        service.verify_token("abc"),
        Err(ServiceError::MissingKey("verifying"))
    ));
}

#[tokio::test]
async fn test_verify_only_service() {
    let signer = CertificateService::new(MemoryStore::new(), &config()).unwrap();
    let token = signer.issue_token(&ana()).unwrap();

    let public_key = signer.public_key().unwrap();
    let verifier = CertificateService::new(
        MemoryStore::new(),
        &ServiceConfig {
            base_url: BASE_URL.to_string(),
            verifying_key: Some(public_key.to_hex()),
            ..ServiceConfig::default()
        },
    )
    .unwrap();

    assert_eq!(verifier.verify_token(token.as_str()).unwrap(), ana());
    assert!(matches!(
        verifier.issue_token(&ana()),
        Err(ServiceError::MissingKey("signing"))
    ));
}

#[tokio::test]
async fn test_mismatched_keys_rejected() {
    let other = Keypair::from_seed(&[9; 32]).public_key();
    let config = ServiceConfig {
        verifying_key: Some(other.to_hex()),
        ..config()
    };
    assert!(matches!(
        CertificateService::new(MemoryStore::new(), &config),
        Err(ServiceError::Config(_))
    ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Code collisions
// ─────────────────────────────────────────────────────────────────────────────

/// A store that reports the first `collisions` certificate inserts as taken.
struct CollidingStore {
    inner: MemoryStore,
    collisions: usize,
    attempts: AtomicUsize,
}

impl CollidingStore {
    fn new(collisions: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            collisions,
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Store for CollidingStore {
    async fn insert_issuer(&self, name: &str) -> certmint::store::Result<Issuer> {
        self.inner.insert_issuer(name).await
    }

    async fn find_issuer(&self, id: IssuerId) -> certmint::store::Result<Option<Issuer>> {
        self.inner.find_issuer(id).await
    }

    async fn find_issuer_by_name(&self, name: &str) -> certmint::store::Result<Option<Issuer>> {
        self.inner.find_issuer_by_name(name).await
    }

    async fn insert_template(&self, draft: &TemplateDraft) -> certmint::store::Result<Template> {
        self.inner.insert_template(draft).await
    }

    async fn find_template(&self, id: TemplateId) -> certmint::store::Result<Option<Template>> {
        self.inner.find_template(id).await
    }

    async fn find_template_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> certmint::store::Result<Vec<Template>> {
        self.inner.find_template_by_fingerprint(fingerprint).await
    }

    async fn list_templates(&self, issuer_id: IssuerId) -> certmint::store::Result<Vec<Template>> {
        self.inner.list_templates(issuer_id).await
    }

    async fn insert_certificate(
        &self,
        certificate: &Certificate,
    ) -> certmint::store::Result<InsertResult> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) < self.collisions {
            return Ok(InsertResult::CodeCollision);
        }
        self.inner.insert_certificate(certificate).await
    }

    async fn find_certificate_by_code(
        &self,
        code: &UniqueCode,
    ) -> certmint::store::Result<Option<Certificate>> {
        self.inner.find_certificate_by_code(code).await
    }

    async fn delete_certificate(&self, code: &UniqueCode) -> certmint::store::Result<bool> {
        self.inner.delete_certificate(code).await
    }
}

#[tokio::test]
async fn test_collision_is_retried() {
    let (service, template) = setup(CollidingStore::new(3)).await;

    let certificate = service.issue_content(template.id, &ana()).await.unwrap();
    assert_eq!(service.store().attempts.load(Ordering::SeqCst), 4);
    assert!(service.find(&certificate.code).await.unwrap().is_some());
}

#[tokio::test]
async fn test_collision_retry_is_bounded() {
    let (service, template) = setup(CollidingStore::new(usize::MAX)).await;

    let err = service.issue_content(template.id, &ana()).await.unwrap_err();
    assert!(matches!(err, ServiceError::CodeCollision { attempts: 5 }));
    assert_eq!(service.store().attempts.load(Ordering::SeqCst), 5);
}
