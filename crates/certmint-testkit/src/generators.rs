//! Proptest generators for property-based testing.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;

use certmint_core::content::RESERVED_FIELDS;
use certmint_core::{Content, FieldMap, FieldValue, Keypair};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// A date between 1970 and roughly 2079.
pub fn date() -> impl Strategy<Value = NaiveDate> {
    (0u64..40_000).prop_filter_map("date in range", |days| {
        NaiveDate::from_ymd_opt(1970, 1, 1)?.checked_add_days(Days::new(days))
    })
}

/// A valid recipient or issuer name (5 to 50 characters) in any script.
pub fn short_text() -> impl Strategy<Value = String> {
    "\\p{L}[\\p{L} .-]{4,49}"
}

/// A valid free-text body (5 to 250 printable characters).
pub fn long_text() -> impl Strategy<Value = String> {
    "\\PC{5,250}"
}

/// A valid extension field name that is not reserved.
pub fn field_name() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,20}".prop_filter("reserved name", |name| {
        !RESERVED_FIELDS.contains(&name.as_str())
    })
}

/// Any field value; floats are finite.
pub fn field_value() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        "\\PC{0,60}".prop_map(FieldValue::Text),
        any::<i64>().prop_map(FieldValue::Integer),
        (-1.0e12f64..1.0e12f64).prop_map(FieldValue::Float),
        date().prop_map(FieldValue::Date),
    ]
}

/// Up to `max` extension fields.
pub fn extensions(max: usize) -> impl Strategy<Value = FieldMap> {
    prop::collection::btree_map(field_name(), field_value(), 0..=max)
}

/// Valid content with up to four extension fields.
pub fn content() -> impl Strategy<Value = Content> {
    (short_text(), date(), short_text(), long_text(), extensions(4)).prop_map(
        |(titular, emissao, emissora, texto, extra)| {
            Content::builder(titular, emissao, emissora, texto)
                .fields(extra)
                .build()
                .expect("generated content is valid")
        },
    )
}

/// A template body referencing the reserved fields, padded with markup.
pub fn template_body() -> impl Strategy<Value = String> {
    ("[A-Za-z ]{0,40}", prop::sample::select(vec!["p", "div", "h2"])).prop_map(|(filler, tag)| {
        format!(
            "<{tag}>{filler}</{tag}><p>Certifico que {{{{titular}}}} participou em {{{{emissao}}}}</p>"
        )
    })
}
