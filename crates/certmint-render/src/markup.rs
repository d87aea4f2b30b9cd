//! A reader for the small HTML subset certificate templates use.
//!
//! The reader flattens markup into a sequence of blocks:
//! - `h1`..`h6` open a heading block at that level
//! - `p`, `div`, `section`, `li`, `tr` and `br` end the current line
//! - `<img src="data:image/png;base64,...">` becomes an image block
//! - `head`, `style`, `script` and `title` are skipped with their content
//! - every other tag is dropped and its text kept
//!
//! Whitespace collapses as in HTML and character references are decoded.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::warn;

use crate::error::{RenderError, RenderStep, Result};

const PNG_DATA_URI: &str = "data:image/png;base64,";

const SKIPPED: [&str; 4] = ["head", "style", "script", "title"];
const BREAKING: [&str; 8] = ["p", "div", "section", "li", "tr", "br", "body", "table"];

/// Typographic role of a text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    Body,
    Heading(u8),
}

/// One block of flattened markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Text { role: TextRole, text: String },
    Image { png: Vec<u8> },
}

/// Parse markup into blocks.
pub fn parse(markup: &str) -> Result<Vec<Block>> {
    let mut reader = Reader::default();
    let mut rest = markup;

    while let Some(lt) = rest.find('<') {
        reader.push_text(&rest[..lt]);
        rest = &rest[lt..];

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map_or("", |end| &after[end + 3..]);
            continue;
        }

        let gt = match rest.find('>') {
            Some(gt) => gt,
            None => {
                // A stray '<' with no closing bracket is text.
                reader.push_text(rest);
                rest = "";
                break;
            }
        };
        let tag = Tag::parse(&rest[1..gt]);
        rest = &rest[gt + 1..];

        if !tag.closing && SKIPPED.contains(&tag.name.as_str()) {
            rest = skip_element(rest, &tag.name);
            continue;
        }
        reader.handle_tag(&tag)?;
    }
    reader.push_text(rest);
    reader.flush();

    Ok(reader.blocks)
}

/// Skip past the closing tag of `name`.
fn skip_element<'a>(rest: &'a str, name: &str) -> &'a str {
    let lower = rest.to_ascii_lowercase();
    let closing = format!("</{}", name);
    match lower.find(&closing) {
        Some(pos) => match rest[pos..].find('>') {
            Some(gt) => &rest[pos + gt + 1..],
            None => "",
        },
        None => "",
    }
}

#[derive(Default)]
struct Reader {
    blocks: Vec<Block>,
    line: String,
    role: Option<TextRole>,
}

impl Reader {
    fn push_text(&mut self, raw: &str) {
        let decoded = decode_entities(raw);
        for c in decoded.chars() {
            if c.is_whitespace() && c != '\u{a0}' {
                if !self.line.is_empty() && !self.line.ends_with(' ') {
                    self.line.push(' ');
                }
            } else {
                self.line.push(if c == '\u{a0}' { ' ' } else { c });
            }
        }
    }

    fn flush(&mut self) {
        let text = self.line.trim().to_string();
        self.line.clear();
        if !text.is_empty() {
            self.blocks.push(Block::Text {
                role: self.role.unwrap_or(TextRole::Body),
                text,
            });
        }
    }

    fn handle_tag(&mut self, tag: &Tag) -> Result<()> {
        if let Some(level) = heading_level(&tag.name) {
            self.flush();
            self.role = if tag.closing {
                None
            } else {
                Some(TextRole::Heading(level))
            };
            return Ok(());
        }

        if BREAKING.contains(&tag.name.as_str()) {
            self.flush();
            return Ok(());
        }

        if tag.name == "img" && !tag.closing {
            self.flush();
            if let Some(png) = image_source(tag)? {
                self.blocks.push(Block::Image { png });
            }
        }
        Ok(())
    }
}

fn heading_level(name: &str) -> Option<u8> {
    match name.as_bytes() {
        [b'h', d @ b'1'..=b'6'] => Some(d - b'0'),
        _ => None,
    }
}

/// Decode the PNG carried by an `img` tag, if it is an inline data URI.
fn image_source(tag: &Tag) -> Result<Option<Vec<u8>>> {
    let src = match tag.attr("src") {
        Some(src) => src,
        None => return Ok(None),
    };
    match src.trim().strip_prefix(PNG_DATA_URI) {
        Some(data) => {
            let data: String = data.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(data)
                .map(Some)
                .map_err(|e| RenderError::at(RenderStep::Markup, format!("img data uri: {}", e)))
        }
        None => {
            warn!(src = %truncated(src), "skipping image that is not an inline png");
            Ok(None)
        }
    }
}

fn truncated(s: &str) -> String {
    s.chars().take(40).collect()
}

/// A parsed start or end tag.
#[derive(Debug)]
struct Tag {
    name: String,
    closing: bool,
    attrs: Vec<(String, String)>,
}

impl Tag {
    fn parse(inner: &str) -> Self {
        let inner = inner.trim().trim_end_matches('/');
        let (closing, inner) = match inner.strip_prefix('/') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, inner),
        };
        let name_end = inner
            .find(|c: char| c.is_whitespace())
            .unwrap_or(inner.len());
        let name = inner[..name_end].to_ascii_lowercase();
        let attrs = parse_attrs(&inner[name_end..]);
        Tag {
            name,
            closing,
            attrs,
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

fn parse_attrs(mut s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    loop {
        s = s.trim_start();
        if s.is_empty() {
            break;
        }
        let key_end = s
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(s.len());
        let key = s[..key_end].to_ascii_lowercase();
        s = s[key_end..].trim_start();

        let value = if let Some(after_eq) = s.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            match after_eq.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    let end = body.find(q).unwrap_or(body.len());
                    s = body.get(end + 1..).unwrap_or("");
                    body[..end].to_string()
                }
                _ => {
                    let end = after_eq
                        .find(|c: char| c.is_whitespace())
                        .unwrap_or(after_eq.len());
                    s = &after_eq[end..];
                    after_eq[..end].to_string()
                }
            }
        } else {
            String::new()
        };

        if !key.is_empty() {
            attrs.push((key, decode_entities(&value)));
        }
    }
    attrs
}

/// Decode HTML character references.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_reference(&rest[1..semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '©',
        "ordm" => 'º',
        "ordf" => 'ª',
        "mdash" => '—',
        "ndash" => '–',
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(blocks: &[Block]) -> Vec<(TextRole, &str)> {
        blocks
            .iter()
            .filter_map(|b| match b {
                Block::Text { role, text } => Some((*role, text.as_str())),
                Block::Image { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_blocks_and_headings() {
        let blocks = parse(
            "<html><body><h1>Certificado</h1><p>Certifico que <b>Ana Silva</b>\n   participou.</p>Fim</body></html>",
        )
        .unwrap();
        assert_eq!(
            texts(&blocks),
            vec![
                (TextRole::Heading(1), "Certificado"),
                (TextRole::Body, "Certifico que Ana Silva participou."),
                (TextRole::Body, "Fim"),
            ]
        );
    }

    #[test]
    fn test_skipped_elements() {
        let blocks = parse(
            "<head><title>x</title><style>p { color: red }</style></head><p>visível</p><script>alert(1)</script>",
        )
        .unwrap();
        assert_eq!(texts(&blocks), vec![(TextRole::Body, "visível")]);
    }

    #[test]
    fn test_comments_dropped() {
        let blocks = parse("<p>a<!-- {{ segredo }} -->b</p>").unwrap();
        assert_eq!(texts(&blocks), vec![(TextRole::Body, "ab")]);
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt; &#x3D; &#61; &quot;"), "a & b <c> = = \"");
        assert_eq!(decode_entities("R&D &bogus; &"), "R&D &bogus; &");
    }

    #[test]
    fn test_inline_png() {
        let blocks = parse(r#"<p>antes</p><img alt="qr" src="data:image/png;base64,iVBORw0KGgo&#x3D;"/><p>depois</p>"#)
            .unwrap();
        assert_eq!(blocks.len(), 3);
        match &blocks[1] {
            Block::Image { png } => assert_eq!(&png[..4], b"\x89PNG"),
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[test]
    fn test_remote_image_skipped() {
        let blocks = parse(r#"<img src="https://example.org/logo.png"><p>x</p>"#).unwrap();
        assert_eq!(texts(&blocks), vec![(TextRole::Body, "x")]);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_bad_data_uri_is_markup_failure() {
        let err = parse(r#"<img src="data:image/png;base64,@@@">"#).unwrap_err();
        assert!(matches!(
            err,
            RenderError::RenderingFailure {
                step: RenderStep::Markup,
                ..
            }
        ));
    }

    #[test]
    fn test_plain_text_template() {
        let blocks = parse("Certifico que Ana Silva participou em 2024-03-10").unwrap();
        assert_eq!(
            texts(&blocks),
            vec![(TextRole::Body, "Certifico que Ana Silva participou em 2024-03-10")]
        );
    }

    #[test]
    fn test_stray_angle_bracket_is_text() {
        let blocks = parse("1 < 2").unwrap();
        assert_eq!(texts(&blocks), vec![(TextRole::Body, "1 < 2")]);
    }
}
