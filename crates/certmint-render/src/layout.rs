//! Single-page layout of flattened markup.
//!
//! Coordinates are whole points measured from the top-left corner of the
//! page. Blocks are stacked top to bottom and centred horizontally; text is
//! word-wrapped with approximate Helvetica metrics. Whatever does not fit
//! above the bottom margin is dropped.

use image::RgbImage;
use tracing::warn;

use crate::error::{RenderError, RenderStep, Result};
use crate::markup::{Block, TextRole};

/// Page geometry in points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSettings {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
}

impl PageSettings {
    /// A4 landscape with 48pt margins.
    pub const A4_LANDSCAPE: Self = Self {
        width: 842,
        height: 595,
        margin: 48,
    };

    fn content_width(&self) -> u32 {
        self.width.saturating_sub(2 * self.margin)
    }
}

impl Default for PageSettings {
    fn default() -> Self {
        Self::A4_LANDSCAPE
    }
}

/// Body text size, in points.
pub const BODY_SIZE: u32 = 14;

/// Gap after each block, in points.
const BLOCK_GAP: u32 = 6;

/// A positioned element on the page.
#[derive(Debug, Clone)]
pub enum Placed {
    /// One line of text. `baseline` is measured from the top of the page.
    Line {
        x: u32,
        baseline: u32,
        size: u32,
        text: String,
    },
    Image {
        x: u32,
        top: u32,
        width: u32,
        height: u32,
        pixels: RgbImage,
    },
}

/// The laid-out page.
#[derive(Debug, Clone)]
pub struct PageLayout {
    pub settings: PageSettings,
    pub items: Vec<Placed>,
    /// Whether content ran past the bottom margin.
    pub clipped: bool,
}

impl PageLayout {
    /// All text on the page, one line per entry.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            Placed::Line { text, .. } => Some(text.as_str()),
            Placed::Image { .. } => None,
        })
    }
}

/// Font size for a text role.
pub fn font_size(role: TextRole) -> u32 {
    match role {
        TextRole::Body => BODY_SIZE,
        TextRole::Heading(1) => 32,
        TextRole::Heading(2) => 26,
        TextRole::Heading(3) => 20,
        TextRole::Heading(4) => 18,
        TextRole::Heading(_) => 16,
    }
}

/// Approximate advance width of `c` at 1000 units per em.
fn char_units(c: char) -> u32 {
    match c {
        ' ' | 'i' | 'j' | 'l' | '.' | ',' | ';' | ':' | '\'' | '!' | '|' | 'I' => 278,
        'f' | 't' | 'r' | '(' | ')' | '-' | '/' => 333,
        'm' | 'w' | 'M' | 'W' => 833,
        // CJK and other full-width scripts.
        c if c as u32 >= 0x2e80 => 1000,
        c if c.is_uppercase() => 667,
        _ => 556,
    }
}

/// Approximate rendered width of `text` at `size` points.
pub fn text_width(text: &str, size: u32) -> u32 {
    let units: u32 = text.chars().map(char_units).sum();
    (units * size + 999) / 1000
}

/// Lay blocks out on a single page.
pub fn layout(blocks: &[Block], settings: PageSettings) -> Result<PageLayout> {
    let mut page = PageLayout {
        settings,
        items: Vec::new(),
        clipped: false,
    };
    let bottom = settings.height.saturating_sub(settings.margin);
    let max_width = settings.content_width();
    let mut cursor = settings.margin;

    'blocks: for block in blocks {
        match block {
            Block::Text { role, text } => {
                let size = font_size(*role);
                let line_height = size * 7 / 5;
                for line in wrap(text, size, max_width) {
                    if cursor + line_height > bottom {
                        page.clipped = true;
                        break 'blocks;
                    }
                    let x = centred(settings, text_width(&line, size));
                    let baseline = cursor + size;
                    page.items.push(Placed::Line {
                        x,
                        baseline,
                        size,
                        text: line,
                    });
                    cursor += line_height;
                }
            }
            Block::Image { png } => {
                let pixels = decode_png(png)?;
                let pixels = fit_width(pixels, max_width);
                let (width, height) = pixels.dimensions();
                if cursor + height > bottom {
                    page.clipped = true;
                    break 'blocks;
                }
                page.items.push(Placed::Image {
                    x: centred(settings, width),
                    top: cursor,
                    width,
                    height,
                    pixels,
                });
                cursor += height;
            }
        }
        cursor += BLOCK_GAP;
    }

    if page.clipped {
        warn!(
            placed = page.items.len(),
            total_blocks = blocks.len(),
            "certificate content overflows the page; remainder clipped"
        );
    }
    Ok(page)
}

fn centred(settings: PageSettings, width: u32) -> u32 {
    let free = settings.width.saturating_sub(width);
    (free / 2).max(settings.margin.min(free))
}

/// Greedy word wrap. A single word wider than the line is kept whole.
fn wrap(text: &str, size: u32, max_width: u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split(' ').filter(|w| !w.is_empty()) {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{} {}", current, word);
        if text_width(&candidate, size) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn decode_png(png: &[u8]) -> Result<RgbImage> {
    image::load_from_memory_with_format(png, image::ImageFormat::Png)
        .map(|img| img.to_rgb8())
        .map_err(|e| RenderError::at(RenderStep::Layout, format!("embedded image: {}", e)))
}

fn fit_width(pixels: RgbImage, max_width: u32) -> RgbImage {
    let (width, height) = pixels.dimensions();
    if width <= max_width {
        return pixels;
    }
    let scaled_height = (height * max_width / width).max(1);
    image::imageops::resize(
        &pixels,
        max_width,
        scaled_height,
        image::imageops::FilterType::Nearest,
    )
}
