//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use certmint_core::records::validate_name;
use certmint_core::{
    Certificate, Fingerprint, Issuer, IssuerId, Template, TemplateDraft, TemplateId, UniqueCode,
};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Issuers indexed by id.
    issuers: BTreeMap<IssuerId, Issuer>,

    /// Name index: name -> issuer id.
    issuer_names: HashMap<String, IssuerId>,

    /// Templates indexed by id; ids grow, so iteration is oldest first.
    templates: BTreeMap<TemplateId, Template>,

    /// Certificates indexed by code.
    certificates: HashMap<UniqueCode, Certificate>,

    next_issuer: i64,
    next_template: i64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|e| StoreError::Lock(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|e| StoreError::Lock(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_issuer(&self, name: &str) -> Result<Issuer> {
        validate_name("nome", name).map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let mut inner = self.write()?;

        if inner.issuer_names.contains_key(name) {
            return Err(StoreError::DuplicateIssuer(name.to_string()));
        }

        inner.next_issuer += 1;
        let issuer = Issuer {
            id: IssuerId(inner.next_issuer),
            name: name.to_string(),
        };
        inner.issuer_names.insert(issuer.name.clone(), issuer.id);
        inner.issuers.insert(issuer.id, issuer.clone());

        Ok(issuer)
    }

    async fn find_issuer(&self, id: IssuerId) -> Result<Option<Issuer>> {
        let inner = self.read()?;
        Ok(inner.issuers.get(&id).cloned())
    }

    async fn find_issuer_by_name(&self, name: &str) -> Result<Option<Issuer>> {
        let inner = self.read()?;
        Ok(inner
            .issuer_names
            .get(name)
            .and_then(|id| inner.issuers.get(id))
            .cloned())
    }

    async fn insert_template(&self, draft: &TemplateDraft) -> Result<Template> {
        let mut inner = self.write()?;

        if !inner.issuers.contains_key(&draft.issuer_id) {
            return Err(StoreError::UnknownIssuer(draft.issuer_id));
        }

        inner.next_template += 1;
        let template = draft.clone().into_template(TemplateId(inner.next_template));
        inner.templates.insert(template.id, template.clone());

        Ok(template)
    }

    async fn find_template(&self, id: TemplateId) -> Result<Option<Template>> {
        let inner = self.read()?;
        Ok(inner.templates.get(&id).cloned())
    }

    async fn find_template_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<Template>> {
        let inner = self.read()?;
        Ok(inner
            .templates
            .values()
            .filter(|t| &t.fingerprint == fingerprint)
            .cloned()
            .collect())
    }

    async fn list_templates(&self, issuer_id: IssuerId) -> Result<Vec<Template>> {
        let inner = self.read()?;
        Ok(inner
            .templates
            .values()
            .filter(|t| t.issuer_id == issuer_id)
            .cloned()
            .collect())
    }

    async fn insert_certificate(&self, certificate: &Certificate) -> Result<InsertResult> {
        let mut inner = self.write()?;

        if !inner.templates.contains_key(&certificate.template_id) {
            return Err(StoreError::UnknownTemplate(certificate.template_id));
        }

        // Check-and-insert under one write lock
        if inner.certificates.contains_key(&certificate.code) {
            return Ok(InsertResult::CodeCollision);
        }
        inner
            .certificates
            .insert(certificate.code.clone(), certificate.clone());

        Ok(InsertResult::Inserted)
    }

    async fn find_certificate_by_code(&self, code: &UniqueCode) -> Result<Option<Certificate>> {
        let inner = self.read()?;
        Ok(inner.certificates.get(code).cloned())
    }

    async fn delete_certificate(&self, code: &UniqueCode) -> Result<bool> {
        let mut inner = self.write()?;
        Ok(inner.certificates.remove(code).is_some())
    }
}
