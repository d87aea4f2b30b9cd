//! End-to-end rendering: template body and content in, PDF and PNG out.
//!
//! Assertions are on extracted text and structure, never on exact bytes.

use certmint_core::{Content, FieldMap, FieldValue};
use certmint_render::{RenderError, TemplateRenderer};
use chrono::NaiveDate;
use image::ImageFormat;
use lopdf::Document;
use proptest::prelude::*;
use url::Url;

const CERTIFICATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Certificado</title>
  <style>body { font-family: sans-serif; }</style>
</head>
<body>
  <h1>Certificado</h1>
  <p>Certificamos que <strong>{{titular}}</strong> participou do evento
     promovido por {{emissora}} em {{format_date emissao "%d/%m/%Y"}}.</p>
  <p>{{texto}}</p>
  <img src="data:image/png;base64,{{qrcode}}">
  <p>Valide em {{url_validacao}}</p>
</body>
</html>"#;

fn ana() -> Content {
    Content::new(
        "Ana Silva",
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        "GruPy-SP",
        "Participou do evento",
    )
    .unwrap()
}

fn verification_url() -> Url {
    Url::parse("https://certificados.example.org/v/abcdefghijkm").unwrap()
}

fn pdf_text(bytes: &[u8]) -> String {
    let doc = Document::load_mem(bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 1, "certificate must be one page");
    doc.extract_text(&[1]).unwrap()
}

#[test]
fn test_short_template_scenario() {
    let renderer = TemplateRenderer::new();
    let rendered = renderer
        .render(
            "Certifico que {{titular}} participou em {{emissao}}",
            &ana(),
            &verification_url(),
        )
        .unwrap();

    let text = pdf_text(&rendered.document);
    assert!(text.contains("Ana Silva"), "text was {:?}", text);
    assert!(text.contains("2024-03-10"), "text was {:?}", text);
}

#[test]
fn test_full_certificate() {
    let renderer = TemplateRenderer::new();
    let rendered = renderer
        .render(CERTIFICATE, &ana(), &verification_url())
        .unwrap();

    let text = pdf_text(&rendered.document);
    assert!(text.contains("Ana Silva"));
    assert!(text.contains("GruPy-SP"));
    assert!(text.contains("Participou do evento"));
    assert!(text.contains("10/03/2024"));
    assert!(!text.contains("font-family"));

    let doc = Document::load_mem(&rendered.document).unwrap();
    let has_image = doc.objects.values().any(|obj| {
        obj.as_stream()
            .ok()
            .and_then(|s| s.dict.get(b"Subtype").ok())
            .and_then(|s| s.as_name().ok())
            == Some(b"Image".as_slice())
    });
    assert!(has_image, "QR code image should be embedded");

    let preview = image::load_from_memory_with_format(&rendered.preview, ImageFormat::Png).unwrap();
    assert_eq!((preview.width(), preview.height()), (842, 595));
}

#[test]
fn test_missing_field_names_the_field() {
    let renderer = TemplateRenderer::new();
    let err = renderer
        .render(
            "{{titular}} apresentou {{titulo_da_palestra}}",
            &ana(),
            &verification_url(),
        )
        .unwrap_err();
    assert_eq!(err, RenderError::MissingField("titulo_da_palestra".into()));
}

#[test]
fn test_extension_fields_render() {
    let content = Content::builder(
        "Ana Silva",
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        "GruPy-SP",
        "Participou do evento",
    )
    .field("titulo_da_palestra", "Rust para pythonistas")
    .field("duracao", 2i64)
    .build()
    .unwrap();

    let renderer = TemplateRenderer::new();
    let rendered = renderer
        .render(
            "<p>{{titular}} apresentou {{titulo_da_palestra}} ({{duracao}}h)</p>",
            &content,
            &verification_url(),
        )
        .unwrap();
    let text = pdf_text(&rendered.document);
    assert!(text.contains("Rust para pythonistas (2h)"));
}

#[test]
fn test_render_fields_with_issuer_context() {
    let mut fields = FieldMap::new();
    fields.insert("titular".into(), "Ana Silva".into());
    fields.insert("emissora".into(), "GruPy-SP".into());
    fields.insert(
        "data".into(),
        FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()),
    );

    let renderer = TemplateRenderer::new();
    let rendered = renderer
        .render_fields(
            "<p>{{titular}}</p><p>{{emissora}} {{data}}</p>",
            &fields,
            &verification_url(),
        )
        .unwrap();
    let text = pdf_text(&rendered.document);
    assert!(text.contains("GruPy-SP 2024-03-10"));
}

#[test]
fn test_rendering_is_stable() {
    let renderer = TemplateRenderer::new();
    let a = renderer.render(CERTIFICATE, &ana(), &verification_url()).unwrap();
    let b = renderer.render(CERTIFICATE, &ana(), &verification_url()).unwrap();
    assert_eq!(pdf_text(&a.document), pdf_text(&b.document));
    assert_eq!(a.preview, b.preview);
}

#[test]
fn test_draft_preview_keeps_other_placeholders() {
    let renderer = TemplateRenderer::new();
    let preview = renderer
        .draft_preview(r#"<h1>{{ titular }}</h1><img src="data:image/png;base64,{{ qrcode }}">"#)
        .unwrap();
    let img = image::load_from_memory_with_format(&preview, ImageFormat::Png).unwrap();
    assert_eq!((img.width(), img.height()), (842, 595));
}

#[test]
fn test_names_outside_latin1_survive() {
    let renderer = TemplateRenderer::new();
    for (titular, emissora) in [
        ("Łukasz Nowak", "Fundacja Wolności"),
        ("Nguyễn Văn An", "Cộng đồng Python"),
        ("Алексей Иванов", "Сообщество Rust"),
        ("王小明先生", "北京开源社区"),
    ] {
        let content = Content::new(
            titular,
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            emissora,
            "Participou do evento",
        )
        .unwrap();
        let rendered = renderer
            .render(
                "<p>Certifico que {{titular}} participou</p><p>{{emissora}}</p><p>{{texto}}</p>",
                &content,
                &verification_url(),
            )
            .unwrap();

        let text = pdf_text(&rendered.document);
        assert!(
            text.contains(&format!("Certifico que {} participou", titular)),
            "text was {:?}",
            text
        );
        assert!(text.contains(emissora), "text was {:?}", text);
        assert!(text.contains("Participou do evento"), "text was {:?}", text);
    }
}

#[test]
fn test_missing_accented_field_names_the_field() {
    let renderer = TemplateRenderer::new();
    let err = renderer
        .render("Emitido em {{ emissão }}", &ana(), &verification_url())
        .unwrap_err();
    assert_eq!(err, RenderError::MissingField("emissão".into()));
}

fn extension_fields() -> impl Strategy<Value = FieldMap> {
    prop::collection::btree_map(
        "campo_[a-zà-öø-ú0-9_]{1,12}",
        "[A-Za-z0-9][A-Za-z0-9 ]{0,19}".prop_map(FieldValue::Text),
        1..6,
    )
}

fn body_for(fields: &FieldMap) -> String {
    fields
        .keys()
        .map(|name| format!("{{{{{}}}}}", name))
        .collect::<Vec<_>>()
        .join(" | ")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_substitution_fills_every_placeholder(fields in extension_fields()) {
        let renderer = TemplateRenderer::new();
        let body = body_for(&fields);
        let expected = fields
            .values()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" | ");

        let first = renderer.substitute(&body, &fields, &verification_url()).unwrap();
        let second = renderer.substitute(&body, &fields, &verification_url()).unwrap();
        prop_assert_eq!(&first, &expected);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_dropped_field_is_reported(fields in extension_fields()) {
        let renderer = TemplateRenderer::new();
        let body = body_for(&fields);
        let mut partial = fields.clone();
        let dropped = partial.keys().next().cloned().unwrap();
        partial.remove(&dropped);

        let err = renderer.substitute(&body, &partial, &verification_url()).unwrap_err();
        prop_assert_eq!(err, RenderError::MissingField(dropped));
    }
}
