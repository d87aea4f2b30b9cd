//! # certmint
//!
//! Issue tamper-evident certificates and let anyone verify them.
//!
//! ## Overview
//!
//! A certificate is a [`Content`] value (recipient, date, issuer, free
//! text, extension fields) bound to an identifier and rendered from an
//! issuer's template into a one-page PDF with a QR code pointing at its
//! verification URL. There are two kinds of identifier:
//!
//! - **Unique code**: 12 confusable-free characters, stored with the
//!   certificate; verification is a lookup
//! - **Signed token**: the content itself, signed with Ed25519 and packed
//!   into a URL-safe string; verification needs only the public key
//!
//! ## Usage
//!
//! ```rust,no_run
//! use certmint::{CertificateService, ServiceConfig};
//! use certmint::core::Content;
//! use certmint::store::SqliteStore;
//! use chrono::NaiveDate;
//!
//! async fn example() -> certmint::Result<()> {
//!     let config = ServiceConfig::from_env()?;
//!     certmint::logging::init(config.log_level);
//!
//!     let store = SqliteStore::open("certificados.db")?;
//!     let service = CertificateService::new(store, &config)?;
//!
//!     let issuer = service.register_issuer("GruPy-SP").await?;
//!     let template = service
//!         .register_template("participação", issuer.id, "Certifico que {{titular}} participou em {{emissao}}")
//!         .await?
//!         .template;
//!
//!     let content = Content::new(
//!         "Ana Silva",
//!         NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
//!         "GruPy-SP",
//!         "Participou do evento",
//!     )?;
//!     let certificate = service.issue_content(template.id, &content).await?;
//!     let pdf = service.render_stored(&certificate.code).await?.document;
//!     # let _ = pdf;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `certmint::core` - Content, codec, codes, fingerprints, keys, tokens, links
//! - `certmint::render` - Template substitution, PDF and preview engines
//! - `certmint::store` - Storage abstraction and SQLite

pub mod config;
pub mod error;
pub mod logging;
pub mod service;

pub use certmint_core as core;
pub use certmint_render as render;
pub use certmint_store as store;

pub use config::{Environment, ServiceConfig};
pub use error::{Result, ServiceError};
pub use service::{CertificateService, StoredCertificate, TemplateRegistration};

pub use certmint_core::{
    Certificate, Content, Ed25519PublicKey, FieldMap, FieldValue, Identity, Issuer, IssuerId,
    Keypair, SignedToken, Template, TemplateId, UniqueCode, ValidationLinkBuilder,
};
pub use certmint_render::RenderedDocument;
