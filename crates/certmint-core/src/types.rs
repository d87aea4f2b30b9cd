//! Strong identifier types for stored records.
//!
//! Row identifiers are assigned by the store; wrapping them keeps a template
//! id from being passed where an issuer id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an issuing entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssuerId(pub i64);

/// Identifier of a stored template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub i64);

impl fmt::Display for IssuerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "issuer#{}", self.0)
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template#{}", self.0)
    }
}

impl From<i64> for IssuerId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<i64> for TemplateId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}
