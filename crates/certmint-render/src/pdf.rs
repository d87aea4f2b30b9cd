//! PDF output for a laid-out page.
//!
//! No font program is embedded. Lines that fit WinAnsi use the standard
//! Helvetica font; any other line uses a CID-keyed font on the predefined
//! `UniGB-UCS2-H` CMap, whose codes are UTF-16BE code units, so viewers
//! and text extractors recover the original characters. Images become
//! uncompressed RGB XObjects before the document-wide stream compression
//! pass.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};

use crate::error::{RenderError, RenderStep, Result};
use crate::layout::{PageLayout, Placed};

const LATIN_FONT: &str = "F1";
const UNICODE_FONT: &str = "F2";

const WIN_ANSI: &str = "WinAnsiEncoding";
const UCS2_CMAP: &str = "UniGB-UCS2-H";
const CID_BASE_FONT: &str = "STSong-Light";

/// Write a single-page PDF.
pub fn write_pdf(page: &PageLayout) -> Result<Vec<u8>> {
    let fail = |e: &dyn std::fmt::Display| RenderError::at(RenderStep::Document, e);
    let height = page.settings.height as i64;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let latin_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => WIN_ANSI,
    });
    let unicode_font_id = add_unicode_font(&mut doc);

    let mut xobjects = Dictionary::new();
    let mut operations = Vec::new();

    for item in &page.items {
        match item {
            Placed::Line {
                x,
                baseline,
                size,
                text,
            } => {
                let (font, encoded) = encode_line(text);
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new(
                    "Tf",
                    vec![Object::Name(font.into()), (*size as i64).into()],
                ));
                operations.push(Operation::new(
                    "Td",
                    vec![(*x as i64).into(), (height - *baseline as i64).into()],
                ));
                operations.push(Operation::new(
                    "Tj",
                    vec![encoded],
                ));
                operations.push(Operation::new("ET", vec![]));
            }
            Placed::Image {
                x,
                top,
                width,
                height: image_height,
                pixels,
            } => {
                let name = format!("Im{}", xobjects.len() + 1);
                let image_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => pixels.width() as i64,
                        "Height" => pixels.height() as i64,
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8,
                    },
                    pixels.as_raw().clone(),
                ));
                xobjects.set(name.as_bytes().to_vec(), image_id);

                let bottom = height - (*top as i64) - (*image_height as i64);
                operations.push(Operation::new("q", vec![]));
                operations.push(Operation::new(
                    "cm",
                    vec![
                        (*width as i64).into(),
                        0.into(),
                        0.into(),
                        (*image_height as i64).into(),
                        (*x as i64).into(),
                        bottom.into(),
                    ],
                ));
                operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
                operations.push(Operation::new("Q", vec![]));
            }
        }
    }

    let content = Content { operations };
    let content_bytes = content.encode().map_err(|e| fail(&e))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            LATIN_FONT => latin_font_id,
            UNICODE_FONT => unicode_font_id,
        },
        "XObject" => xobjects,
    });

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            (page.settings.width as i64).into(),
            height.into(),
        ],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|e| fail(&e))?;
    Ok(bytes)
}

/// Pick a font for one line and encode the line for it.
///
/// WinAnsi drops characters it cannot map, so a line stays on the Latin
/// font only when it decodes back unchanged.
fn encode_line(text: &str) -> (&'static str, Object) {
    let latin = Document::encode_text(Some(WIN_ANSI), text);
    if Document::decode_text(Some(WIN_ANSI), &latin) == text {
        return (LATIN_FONT, Object::string_literal(latin));
    }
    let utf16: Vec<u8> = text.encode_utf16().flat_map(u16::to_be_bytes).collect();
    (UNICODE_FONT, Object::String(utf16, StringFormat::Hexadecimal))
}

/// A Type0 font over Adobe-GB1, addressed through the UCS-2 CMap.
fn add_unicode_font(doc: &mut Document) -> lopdf::ObjectId {
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => CID_BASE_FONT,
        "Flags" => 6,
        "FontBBox" => vec![(-25).into(), (-254).into(), 1000.into(), 880.into()],
        "ItalicAngle" => 0,
        "Ascent" => 880,
        "Descent" => -120,
        "CapHeight" => 880,
        "StemV" => 93,
    });
    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType0",
        "BaseFont" => CID_BASE_FONT,
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("GB1"),
            "Supplement" => 2,
        },
        "FontDescriptor" => descriptor_id,
        "DW" => 1000,
    });
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => CID_BASE_FONT,
        "Encoding" => UCS2_CMAP,
        "DescendantFonts" => vec![cid_font_id.into()],
    })
}
