//! Placeholder substitution and the rendering pipeline.
//!
//! Templates use handlebars syntax. The context is the certificate's fields
//! plus the derived values below. Rendering runs in strict mode, and a
//! reference to an absent field fails with [`RenderError::MissingField`]
//! naming it.
//!
//! Derived context values:
//! - `qrcode`: base64 PNG of the verification URL, for
//!   `<img src="data:image/png;base64,{{qrcode}}">`
//! - `url_validacao`: the verification URL as text
//! - `data`: the certificate date, when the caller does not supply one
//!
//! Helpers:
//! - `format_date`: reformat an ISO date, e.g. `{{format_date emissao "%d/%m/%Y"}}`

use std::fmt::Write as _;
use std::sync::OnceLock;

use certmint_core::content::{Content, FieldMap, FieldValue, DATE_FORMAT};
use chrono::NaiveDate;
use handlebars::template::{HelperTemplate, Parameter, Template, TemplateElement};
use handlebars::{
    handlebars_helper, Handlebars, Path, RenderError as HandlebarsError, RenderErrorReason,
};
use regex::{NoExpand, Regex};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::engine::{DocumentEngine, PdfEngine, RenderedDocument};
use crate::error::{RenderError, RenderStep, Result};
use crate::qr::{qr_base64, DRAFT_PLACEHOLDER};

/// Context key holding the QR code.
pub const QRCODE: &str = "qrcode";
/// Context key holding the verification URL.
pub const URL_VALIDACAO: &str = "url_validacao";
/// Context key holding the certificate date.
pub const DATA: &str = "data";

handlebars_helper!(format_date: |value: str, pattern: str| reformat_date(value, pattern));

fn reformat_date(value: &str, pattern: &str) -> String {
    let date = match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => date,
        Err(_) => return value.to_string(),
    };
    let mut out = String::new();
    match write!(out, "{}", date.format(pattern)) {
        Ok(()) => out,
        Err(_) => value.to_string(),
    }
}

/// Substitutes certificate fields into template bodies and hands the result
/// to a document engine.
pub struct TemplateRenderer<E = PdfEngine> {
    handlebars: Handlebars<'static>,
    engine: E,
}

impl TemplateRenderer<PdfEngine> {
    /// A renderer backed by the built-in PDF engine.
    pub fn new() -> Self {
        Self::with_engine(PdfEngine::default())
    }
}

impl Default for TemplateRenderer<PdfEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DocumentEngine> TemplateRenderer<E> {
    pub fn with_engine(engine: E) -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_helper("format_date", Box::new(format_date));
        Self { handlebars, engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Render content into a document and a preview.
    pub fn render(
        &self,
        template_body: &str,
        content: &Content,
        verification_url: &Url,
    ) -> Result<RenderedDocument> {
        let mut fields = content.to_fields();
        fields
            .entry(DATA.to_string())
            .or_insert(FieldValue::Date(content.emissao()));
        self.render_fields(template_body, &fields, verification_url)
    }

    /// Render an arbitrary field map into a document and a preview.
    pub fn render_fields(
        &self,
        template_body: &str,
        fields: &FieldMap,
        verification_url: &Url,
    ) -> Result<RenderedDocument> {
        let markup = self.substitute(template_body, fields, verification_url)?;
        let rendered = self.engine.render(&markup)?;
        debug!(
            document_bytes = rendered.document.len(),
            preview_bytes = rendered.preview.len(),
            "rendered certificate"
        );
        Ok(rendered)
    }

    /// Produce the finished markup without running the document engine.
    pub fn substitute(
        &self,
        template_body: &str,
        fields: &FieldMap,
        verification_url: &Url,
    ) -> Result<String> {
        let mut context = fields_to_json(fields);
        context.insert(QRCODE.into(), Value::String(qr_base64(verification_url.as_str())?));
        context.insert(
            URL_VALIDACAO.into(),
            Value::String(verification_url.to_string()),
        );
        self.fill(template_body, &context)
    }

    /// Preview an unsaved template body.
    ///
    /// Only `{{ qrcode }}` is filled in, with a QR code of placeholder text;
    /// every other placeholder is left visible in the preview.
    pub fn draft_preview(&self, template_body: &str) -> Result<Vec<u8>> {
        let qr = qr_base64(DRAFT_PLACEHOLDER)?;
        let markup = qrcode_placeholder().replace_all(template_body, NoExpand(&qr));
        self.engine.preview(&markup)
    }

    fn fill(&self, template_body: &str, context: &Map<String, Value>) -> Result<String> {
        let template =
            Template::compile(template_body).map_err(|e| RenderError::at(RenderStep::Template, e))?;
        if let Some(missing) = helper_param_roots(&template)
            .into_iter()
            .find(|name| !context.contains_key(name))
        {
            return Err(RenderError::MissingField(missing));
        }

        self.handlebars
            .render_template(template_body, context)
            .map_err(template_error)
    }
}

/// Convert fields into template context values.
pub fn fields_to_json(fields: &FieldMap) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| {
            let json = match value {
                FieldValue::Text(s) => Value::String(s.clone()),
                FieldValue::Integer(i) => Value::from(*i),
                FieldValue::Float(x) => {
                    serde_json::Number::from_f64(*x).map_or(Value::Null, Value::Number)
                }
                FieldValue::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
            };
            (name.clone(), json)
        })
        .collect()
}

fn qrcode_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{ *qrcode *\}\}").expect("valid regex"))
}

/// Root names of the context variables passed to helpers.
///
/// Strict mode reports a missing plain `{{name}}` on its own, but helpers
/// such as `if` accept missing parameters silently, so those are collected
/// here and checked before rendering.
fn helper_param_roots(template: &Template) -> Vec<String> {
    let mut roots = Vec::new();
    collect_roots(template, &mut roots);
    roots
}

fn collect_roots(template: &Template, roots: &mut Vec<String>) {
    for element in &template.elements {
        match element {
            TemplateElement::Expression(helper)
            | TemplateElement::HtmlExpression(helper)
            | TemplateElement::HelperBlock(helper) => collect_helper_roots(helper, roots),
            _ => {}
        }
    }
}

fn collect_helper_roots(helper: &HelperTemplate, roots: &mut Vec<String>) {
    for param in helper.params.iter().chain(helper.hash.values()) {
        match param {
            Parameter::Path(path) => {
                if let Some(root) = path_root(path) {
                    if !roots.contains(&root) {
                        roots.push(root);
                    }
                }
            }
            Parameter::Subexpression(sub) => {
                if let TemplateElement::Expression(inner) = sub.element.as_ref() {
                    collect_helper_roots(inner, roots);
                }
            }
            Parameter::Name(_) | Parameter::Literal(_) => {}
        }
    }
    for block in [&helper.template, &helper.inverse].into_iter().flatten() {
        collect_roots(block, roots);
    }
}

/// The first segment of a context path; `None` for `this`, parent and
/// `@` data paths.
fn path_root(path: &Path) -> Option<String> {
    let raw = match path {
        Path::Relative((_, raw)) => raw.as_str(),
        Path::Local(_) => return None,
    };
    let raw = raw
        .strip_prefix("this.")
        .or_else(|| raw.strip_prefix("./"))
        .unwrap_or(raw);
    if raw == "this" || raw.starts_with("..") || raw.starts_with('@') {
        return None;
    }
    let root = raw.split(['.', '/']).next()?;
    let root = root
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .unwrap_or(root);
    (!root.is_empty()).then(|| root.to_string())
}

/// Map a strict-mode failure to the field it names.
fn template_error(err: HandlebarsError) -> RenderError {
    match err.reason() {
        RenderErrorReason::MissingVariable(Some(path)) => RenderError::MissingField(path.clone()),
        _ => RenderError::at(RenderStep::Template, err),
    }
}
