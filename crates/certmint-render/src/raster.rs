//! PNG preview of a laid-out page, at one pixel per point.
//!
//! Images are drawn as-is. Text is greeked: each word becomes a grey bar of
//! its approximate width, which is enough to judge layout at thumbnail size.

use std::io::Cursor;

use image::{imageops, ImageFormat, Rgb, RgbImage};

use crate::error::{RenderError, RenderStep, Result};
use crate::layout::{text_width, PageLayout, Placed};

const PAPER: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([96, 96, 96]);

/// Rasterize a page into PNG bytes.
pub fn write_png(page: &PageLayout) -> Result<Vec<u8>> {
    let canvas = rasterize(page);
    let mut png = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| RenderError::at(RenderStep::Preview, e))?;
    Ok(png)
}

/// Rasterize a page into an RGB image.
pub fn rasterize(page: &PageLayout) -> RgbImage {
    let settings = page.settings;
    let mut canvas = RgbImage::from_pixel(settings.width, settings.height, PAPER);

    for item in &page.items {
        match item {
            Placed::Line {
                x,
                baseline,
                size,
                text,
            } => {
                let bar_height = (size * 3 / 5).max(1);
                let space = text_width(" ", *size);
                let mut left = *x;
                for word in text.split(' ') {
                    let width = text_width(word, *size);
                    let top = baseline.saturating_sub(bar_height);
                    fill_rect(&mut canvas, left, top, width, bar_height);
                    left += width + space;
                }
            }
            Placed::Image { x, top, pixels, .. } => {
                imageops::overlay(&mut canvas, pixels, *x as i64, *top as i64);
            }
        }
    }
    canvas
}

fn fill_rect(canvas: &mut RgbImage, x: u32, y: u32, width: u32, height: u32) {
    let x_end = (x + width).min(canvas.width());
    let y_end = (y + height).min(canvas.height());
    for py in y..y_end {
        for px in x..x_end {
            canvas.put_pixel(px, py, INK);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{layout, PageSettings};
    use crate::markup::{Block, TextRole};

    #[test]
    fn test_preview_dimensions() {
        let page = layout(&[], PageSettings::default()).unwrap();
        let png = write_png(&page).unwrap();
        let img = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        assert_eq!((img.width(), img.height()), (842, 595));
    }

    #[test]
    fn test_text_leaves_ink() {
        let blank = rasterize(&layout(&[], PageSettings::default()).unwrap());
        let page = layout(
            &[Block::Text {
                role: TextRole::Heading(1),
                text: "Certificado".into(),
            }],
            PageSettings::default(),
        )
        .unwrap();
        let inked = rasterize(&page);
        assert!(blank.pixels().all(|p| *p == PAPER));
        assert!(inked.pixels().any(|p| *p == INK));
    }

    #[test]
    fn test_rasterize_is_deterministic() {
        let blocks = vec![Block::Text {
            role: TextRole::Body,
            text: "Ana Silva participou".into(),
        }];
        let page = layout(&blocks, PageSettings::default()).unwrap();
        assert_eq!(write_png(&page).unwrap(), write_png(&page).unwrap());
    }
}
