//! Store trait: the abstract interface for certificate persistence.
//!
//! The core never talks to a database directly. The facade drives issuance
//! through this trait, and implementations include SQLite (primary) and
//! in-memory (for tests).

use async_trait::async_trait;
use certmint_core::{
    Certificate, Fingerprint, Issuer, IssuerId, Template, TemplateDraft, TemplateId, UniqueCode,
};

use crate::error::Result;

/// Result of inserting a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Certificate was inserted.
    Inserted,
    /// Another certificate already holds this code. Nothing was written;
    /// the caller should draw a new code and retry.
    CodeCollision,
}

/// The Store trait: async interface for certificate persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Atomic code check**: `insert_certificate` checks for an existing code
///   and inserts in one step, and reports a taken code as `CodeCollision`
///   rather than an error.
/// - **Duplicate templates**: Templates with identical bodies are allowed;
///   `find_template_by_fingerprint` returns all of them.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Issuer Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register an issuing entity. Names are unique.
    async fn insert_issuer(&self, name: &str) -> Result<Issuer>;

    /// Get an issuer by id.
    async fn find_issuer(&self, id: IssuerId) -> Result<Option<Issuer>>;

    /// Get an issuer by its exact name.
    async fn find_issuer_by_name(&self, name: &str) -> Result<Option<Issuer>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Template Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a template and assign it an id.
    async fn insert_template(&self, draft: &TemplateDraft) -> Result<Template>;

    /// Get a template by id.
    async fn find_template(&self, id: TemplateId) -> Result<Option<Template>>;

    /// All templates with the given fingerprint, oldest first.
    async fn find_template_by_fingerprint(&self, fingerprint: &Fingerprint)
        -> Result<Vec<Template>>;

    /// All templates of an issuer, oldest first.
    async fn list_templates(&self, issuer_id: IssuerId) -> Result<Vec<Template>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Certificate Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a certificate under its code.
    ///
    /// # Returns
    /// - `Inserted` if the code was free.
    /// - `CodeCollision` if the code is already taken.
    async fn insert_certificate(&self, certificate: &Certificate) -> Result<InsertResult>;

    /// Get a certificate by its code.
    async fn find_certificate_by_code(&self, code: &UniqueCode) -> Result<Option<Certificate>>;

    /// Delete a certificate. Returns whether it existed.
    async fn delete_certificate(&self, code: &UniqueCode) -> Result<bool>;
}
