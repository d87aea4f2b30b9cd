//! Content: the structured payload of a certificate.
//!
//! Four reserved fields are strongly typed and always present; everything
//! else lives in an ordered extension map that is carried opaquely through
//! signing and rendering.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ContentError;

/// Recipient name.
pub const TITULAR: &str = "titular";
/// Event date.
pub const EMISSAO: &str = "emissao";
/// Issuing entity name.
pub const EMISSORA: &str = "emissora";
/// Free-text body.
pub const TEXTO: &str = "texto";

/// All reserved field names.
pub const RESERVED_FIELDS: [&str; 4] = [TITULAR, EMISSAO, EMISSORA, TEXTO];

/// Length bounds (in characters) of the short text fields.
pub const SHORT_TEXT: (usize, usize) = (5, 50);
/// Length bounds (in characters) of the free-text body.
pub const LONG_TEXT: (usize, usize) = (5, 250);

/// Maximum length of a field name.
pub const MAX_FIELD_NAME_LEN: usize = 64;

/// Format used for dates everywhere a date becomes text.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
}

impl FieldValue {
    /// Short name of the value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Date(_) => "date",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Float(x)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

/// Ordered field-name → value mapping.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Check that a field name can be referenced from a template placeholder.
pub fn validate_field_name(name: &str) -> Result<(), ContentError> {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && name.len() <= MAX_FIELD_NAME_LEN {
        Ok(())
    } else {
        Err(ContentError::InvalidFieldName(name.to_string()))
    }
}

/// Check every name and value in an extension map.
pub fn validate_extension(fields: &FieldMap) -> Result<(), ContentError> {
    for (name, value) in fields {
        validate_field_name(name)?;
        if let FieldValue::Float(x) = value {
            if !x.is_finite() {
                return Err(ContentError::NonFinite(name.clone()));
            }
        }
    }
    Ok(())
}

/// The payload of a certificate. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    titular: String,
    emissao: NaiveDate,
    emissora: String,
    texto: String,
    extensions: FieldMap,
}

impl Content {
    /// Build content with no extension fields.
    pub fn new(
        titular: impl Into<String>,
        emissao: NaiveDate,
        emissora: impl Into<String>,
        texto: impl Into<String>,
    ) -> Result<Self, ContentError> {
        ContentBuilder::new(titular, emissao, emissora, texto).build()
    }

    /// Start a builder, for content with extension fields.
    pub fn builder(
        titular: impl Into<String>,
        emissao: NaiveDate,
        emissora: impl Into<String>,
        texto: impl Into<String>,
    ) -> ContentBuilder {
        ContentBuilder::new(titular, emissao, emissora, texto)
    }

    /// Rebuild content from a flat field map (reserved and extension fields together).
    pub fn from_fields(mut fields: FieldMap) -> Result<Self, ContentError> {
        let titular = take_text(&mut fields, TITULAR)?;
        let emissao = match fields.remove(EMISSAO) {
            Some(FieldValue::Date(d)) => d,
            Some(other) => {
                return Err(ContentError::Malformed(format!(
                    "{} must be a date, got {}",
                    EMISSAO,
                    other.type_name()
                )))
            }
            None => return Err(ContentError::MissingField(EMISSAO)),
        };
        let emissora = take_text(&mut fields, EMISSORA)?;
        let texto = take_text(&mut fields, TEXTO)?;

        let mut builder = ContentBuilder::new(titular, emissao, emissora, texto);
        builder.extensions = fields;
        builder.build()
    }

    pub fn titular(&self) -> &str {
        &self.titular
    }

    pub fn emissao(&self) -> NaiveDate {
        self.emissao
    }

    pub fn emissora(&self) -> &str {
        &self.emissora
    }

    pub fn texto(&self) -> &str {
        &self.texto
    }

    /// Extension fields, in key order.
    pub fn extensions(&self) -> &FieldMap {
        &self.extensions
    }

    /// Look up any field, reserved or extension.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        match name {
            TITULAR => Some(FieldValue::Text(self.titular.clone())),
            EMISSAO => Some(FieldValue::Date(self.emissao)),
            EMISSORA => Some(FieldValue::Text(self.emissora.clone())),
            TEXTO => Some(FieldValue::Text(self.texto.clone())),
            _ => self.extensions.get(name).cloned(),
        }
    }

    /// Flatten into a single map holding reserved and extension fields.
    pub fn to_fields(&self) -> FieldMap {
        let mut fields = self.extensions.clone();
        fields.insert(TITULAR.into(), FieldValue::Text(self.titular.clone()));
        fields.insert(EMISSAO.into(), FieldValue::Date(self.emissao));
        fields.insert(EMISSORA.into(), FieldValue::Text(self.emissora.clone()));
        fields.insert(TEXTO.into(), FieldValue::Text(self.texto.clone()));
        fields
    }
}

fn take_text(fields: &mut FieldMap, name: &'static str) -> Result<String, ContentError> {
    match fields.remove(name) {
        Some(FieldValue::Text(s)) => Ok(s),
        Some(other) => Err(ContentError::Malformed(format!(
            "{} must be text, got {}",
            name,
            other.type_name()
        ))),
        None => Err(ContentError::MissingField(name)),
    }
}

fn check_length(field: &'static str, value: &str, bounds: (usize, usize)) -> Result<(), ContentError> {
    let actual = value.chars().count();
    if actual < bounds.0 || actual > bounds.1 {
        return Err(ContentError::Length {
            field,
            min: bounds.0,
            max: bounds.1,
            actual,
        });
    }
    Ok(())
}

/// Builder for [`Content`].
#[derive(Debug, Clone)]
pub struct ContentBuilder {
    titular: String,
    emissao: NaiveDate,
    emissora: String,
    texto: String,
    extensions: FieldMap,
}

impl ContentBuilder {
    pub fn new(
        titular: impl Into<String>,
        emissao: NaiveDate,
        emissora: impl Into<String>,
        texto: impl Into<String>,
    ) -> Self {
        Self {
            titular: titular.into(),
            emissao,
            emissora: emissora.into(),
            texto: texto.into(),
            extensions: FieldMap::new(),
        }
    }

    /// Add an extension field. Later values for the same name win.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.extensions.insert(name.into(), value.into());
        self
    }

    /// Add several extension fields at once.
    pub fn fields(mut self, fields: FieldMap) -> Self {
        self.extensions.extend(fields);
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<Content, ContentError> {
        check_length(TITULAR, &self.titular, SHORT_TEXT)?;
        check_length(EMISSORA, &self.emissora, SHORT_TEXT)?;
        check_length(TEXTO, &self.texto, LONG_TEXT)?;

        if let Some(name) = self
            .extensions
            .keys()
            .find(|k| RESERVED_FIELDS.contains(&k.as_str()))
        {
            return Err(ContentError::ReservedField(name.clone()));
        }
        validate_extension(&self.extensions)?;

        Ok(Content {
            titular: self.titular,
            emissao: self.emissao,
            emissora: self.emissora,
            texto: self.texto,
            extensions: self.extensions,
        })
    }
}
