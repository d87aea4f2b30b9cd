//! Stored records: issuing entities, templates and certificates.
//!
//! These are the shapes the store persists. They carry no behaviour beyond
//! construction-time validation and the derived template fields.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::code::UniqueCode;
use crate::codec;
use crate::content::{Content, FieldMap};
use crate::error::{CodecError, ContentError};
use crate::fingerprint::{fingerprint, Fingerprint};
use crate::types::{IssuerId, TemplateId};

/// Length bounds (in characters) of issuer and template names.
pub const NAME_LEN: (usize, usize) = (1, 100);

/// An issuing entity (a community or organisation). Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    pub id: IssuerId,
    pub name: String,
}

/// Validate an issuer or template display name.
pub fn validate_name(field: &'static str, name: &str) -> Result<(), ContentError> {
    let actual = name.chars().count();
    if actual < NAME_LEN.0 || actual > NAME_LEN.1 || name.trim().is_empty() {
        return Err(ContentError::Length {
            field,
            min: NAME_LEN.0,
            max: NAME_LEN.1,
            actual,
        });
    }
    Ok(())
}

/// A template that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDraft {
    pub name: String,
    pub issuer_id: IssuerId,
    pub body_encoded: String,
    pub fingerprint: Fingerprint,
}

impl TemplateDraft {
    /// Prepare a template body for storage.
    ///
    /// The body is compressed through the codec; the fingerprint is taken
    /// over the uncompressed text.
    pub fn new(
        name: impl Into<String>,
        issuer_id: IssuerId,
        body: &str,
    ) -> Result<Self, ContentError> {
        let name = name.into();
        validate_name("nome", &name)?;
        Ok(Self {
            name,
            issuer_id,
            body_encoded: codec::encode_str(body)?,
            fingerprint: fingerprint(body),
        })
    }

    /// Attach the identifier assigned by the store.
    pub fn into_template(self, id: TemplateId) -> Template {
        Template {
            id,
            name: self.name,
            issuer_id: self.issuer_id,
            body_encoded: self.body_encoded,
            fingerprint: self.fingerprint,
        }
    }
}

/// A stored template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub issuer_id: IssuerId,
    pub body_encoded: String,
    pub fingerprint: Fingerprint,
}

impl Template {
    /// Decompress the template body.
    pub fn body(&self) -> Result<String, CodecError> {
        codec::decode_str(&self.body_encoded)
    }
}

/// One issuance of a template under a stored code.
#[derive(Debug, Clone, PartialEq)]
pub struct Certificate {
    pub code: UniqueCode,
    pub template_id: TemplateId,
    /// Date of the event; for multi-day events, the last day.
    pub date: NaiveDate,
    pub fields: FieldMap,
}

impl Certificate {
    pub fn new(code: UniqueCode, template_id: TemplateId, date: NaiveDate, fields: FieldMap) -> Self {
        Self {
            code,
            template_id,
            date,
            fields,
        }
    }

    /// A certificate whose fields are exactly the given content.
    pub fn from_content(code: UniqueCode, template_id: TemplateId, content: &Content) -> Self {
        Self::new(code, template_id, content.emissao(), content.to_fields())
    }

    /// Same certificate under a freshly drawn code.
    pub fn with_code(self, code: UniqueCode) -> Self {
        Self { code, ..self }
    }
}
