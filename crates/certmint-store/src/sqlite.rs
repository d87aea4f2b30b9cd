//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use certmint_core::canonical::{canonical_fields_bytes, decode_fields};
use certmint_core::content::DATE_FORMAT;
use certmint_core::records::validate_name;
use certmint_core::{
    Certificate, Fingerprint, Issuer, IssuerId, Template, TemplateDraft, TemplateId, UniqueCode,
};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{InsertResult, Store};

const TEMPLATE_COLUMNS: &str = "id, name, issuer_id, body_encoded, fingerprint";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path.as_ref())?;
        migration::migrate(&mut conn)?;
        tracing::debug!(path = %path.as_ref().display(), "opened certificate store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| StoreError::Lock(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

fn row_to_issuer(row: &rusqlite::Row<'_>) -> rusqlite::Result<Issuer> {
    Ok(Issuer {
        id: IssuerId(row.get("id")?),
        name: row.get("name")?,
    })
}

fn row_to_template(row: &rusqlite::Row<'_>) -> rusqlite::Result<Template> {
    let fingerprint: String = row.get("fingerprint")?;
    let fingerprint = Fingerprint::from_hex(&fingerprint).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Template {
        id: TemplateId(row.get("id")?),
        name: row.get("name")?,
        issuer_id: IssuerId(row.get("issuer_id")?),
        body_encoded: row.get("body_encoded")?,
        fingerprint,
    })
}

/// Raw certificate columns, converted outside the row callback so that
/// bad data surfaces as `InvalidData`.
struct CertificateRow {
    code: String,
    template_id: i64,
    date: String,
    fields: Vec<u8>,
}

impl CertificateRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            code: row.get("code")?,
            template_id: row.get("template_id")?,
            date: row.get("date")?,
            fields: row.get("fields")?,
        })
    }

    fn into_certificate(self) -> Result<Certificate> {
        let code = UniqueCode::parse(&self.code)
            .map_err(|e| StoreError::InvalidData(format!("certificate code: {}", e)))?;
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT)
            .map_err(|e| StoreError::InvalidData(format!("certificate {} date: {}", code, e)))?;
        let fields = decode_fields(&self.fields)
            .map_err(|e| StoreError::InvalidData(format!("certificate {} fields: {}", code, e)))?;

        Ok(Certificate::new(code, TemplateId(self.template_id), date, fields))
    }
}

fn query_templates(conn: &Connection, filter: &str, param: &dyn rusqlite::ToSql) -> Result<Vec<Template>> {
    let sql = format!(
        "SELECT {} FROM template WHERE {} = ?1 ORDER BY id",
        TEMPLATE_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([param], row_to_template)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(StoreError::from)
}

#[async_trait]
impl Store for SqliteStore {
    // ─────────────────────────────────────────────────────────────────────────
    // Issuer Operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_issuer(&self, name: &str) -> Result<Issuer> {
        validate_name("nome", name).map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let name = name.to_string();

        self.blocking(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO issuer (name, created_at) VALUES (?1, ?2)
                 ON CONFLICT(name) DO NOTHING",
                params![name, now_millis()],
            )?;
            if inserted == 0 {
                return Err(StoreError::DuplicateIssuer(name));
            }
            Ok(Issuer {
                id: IssuerId(conn.last_insert_rowid()),
                name,
            })
        })
        .await
    }

    async fn find_issuer(&self, id: IssuerId) -> Result<Option<Issuer>> {
        self.blocking(move |conn| {
            conn.query_row(
                "SELECT id, name FROM issuer WHERE id = ?1",
                params![id.0],
                row_to_issuer,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn find_issuer_by_name(&self, name: &str) -> Result<Option<Issuer>> {
        let name = name.to_string();
        self.blocking(move |conn| {
            conn.query_row(
                "SELECT id, name FROM issuer WHERE name = ?1",
                params![name],
                row_to_issuer,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Template Operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_template(&self, draft: &TemplateDraft) -> Result<Template> {
        let draft = draft.clone();

        self.blocking(move |conn| {
            let issuer: Option<i64> = conn
                .query_row(
                    "SELECT id FROM issuer WHERE id = ?1",
                    params![draft.issuer_id.0],
                    |row| row.get(0),
                )
                .optional()?;
            if issuer.is_none() {
                return Err(StoreError::UnknownIssuer(draft.issuer_id));
            }

            conn.execute(
                "INSERT INTO template (name, fingerprint, body_encoded, issuer_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    draft.name,
                    draft.fingerprint.to_hex(),
                    draft.body_encoded,
                    draft.issuer_id.0,
                    now_millis(),
                ],
            )?;
            let id = TemplateId(conn.last_insert_rowid());
            Ok(draft.into_template(id))
        })
        .await
    }

    async fn find_template(&self, id: TemplateId) -> Result<Option<Template>> {
        self.blocking(move |conn| {
            let sql = format!("SELECT {} FROM template WHERE id = ?1", TEMPLATE_COLUMNS);
            conn.query_row(&sql, params![id.0], row_to_template)
                .optional()
                .map_err(StoreError::from)
        })
        .await
    }

    async fn find_template_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<Template>> {
        let hex = fingerprint.to_hex();
        self.blocking(move |conn| query_templates(conn, "fingerprint", &hex))
            .await
    }

    async fn list_templates(&self, issuer_id: IssuerId) -> Result<Vec<Template>> {
        self.blocking(move |conn| query_templates(conn, "issuer_id", &issuer_id.0))
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Certificate Operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_certificate(&self, certificate: &Certificate) -> Result<InsertResult> {
        let certificate = certificate.clone();

        self.blocking(move |conn| {
            let template: Option<i64> = conn
                .query_row(
                    "SELECT id FROM template WHERE id = ?1",
                    params![certificate.template_id.0],
                    |row| row.get(0),
                )
                .optional()?;
            if template.is_none() {
                return Err(StoreError::UnknownTemplate(certificate.template_id));
            }

            // A taken code leaves the existing row untouched.
            let inserted = conn.execute(
                "INSERT INTO certificate (code, template_id, date, fields, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(code) DO NOTHING",
                params![
                    certificate.code.as_str(),
                    certificate.template_id.0,
                    certificate.date.format(DATE_FORMAT).to_string(),
                    canonical_fields_bytes(&certificate.fields),
                    now_millis(),
                ],
            )?;
            if inserted == 0 {
                return Ok(InsertResult::CodeCollision);
            }

            Ok(InsertResult::Inserted)
        })
        .await
    }

    async fn find_certificate_by_code(&self, code: &UniqueCode) -> Result<Option<Certificate>> {
        let code = code.clone();
        self.blocking(move |conn| {
            let row = conn
                .query_row(
                    "SELECT code, template_id, date, fields FROM certificate WHERE code = ?1",
                    params![code.as_str()],
                    CertificateRow::read,
                )
                .optional()?;
            row.map(CertificateRow::into_certificate).transpose()
        })
        .await
    }

    async fn delete_certificate(&self, code: &UniqueCode) -> Result<bool> {
        let code = code.clone();
        self.blocking(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM certificate WHERE code = ?1",
                params![code.as_str()],
            )?;
            Ok(deleted > 0)
        })
        .await
    }
}
