//! Document engines turn finished markup into a document and a preview.

use tracing::debug;

use crate::error::Result;
use crate::layout::{layout, PageLayout, PageSettings};
use crate::markup;
use crate::pdf::write_pdf;
use crate::raster::write_png;

/// A rendered certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// The paginated document (PDF).
    pub document: Vec<u8>,
    /// The first page as PNG.
    pub preview: Vec<u8>,
}

/// Converts finished markup into output formats.
///
/// Implementations must be deterministic for a fixed version: the same
/// markup yields the same text and pixels.
pub trait DocumentEngine: Send + Sync {
    /// Produce the document and its first-page preview.
    fn render(&self, markup: &str) -> Result<RenderedDocument>;

    /// Produce only the first-page preview.
    fn preview(&self, markup: &str) -> Result<Vec<u8>> {
        self.render(markup).map(|rendered| rendered.preview)
    }
}

/// The built-in engine: single-page PDF plus a PNG raster of that page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfEngine {
    page: PageSettings,
}

impl PdfEngine {
    pub fn new(page: PageSettings) -> Self {
        Self { page }
    }

    pub fn page_settings(&self) -> PageSettings {
        self.page
    }

    /// Parse and lay out markup.
    pub fn layout(&self, markup: &str) -> Result<PageLayout> {
        let blocks = markup::parse(markup)?;
        let page = layout(&blocks, self.page)?;
        debug!(
            blocks = blocks.len(),
            items = page.items.len(),
            clipped = page.clipped,
            "laid out page"
        );
        Ok(page)
    }
}

impl DocumentEngine for PdfEngine {
    fn render(&self, markup: &str) -> Result<RenderedDocument> {
        let page = self.layout(markup)?;
        Ok(RenderedDocument {
            document: write_pdf(&page)?,
            preview: write_png(&page)?,
        })
    }

    fn preview(&self, markup: &str) -> Result<Vec<u8>> {
        write_png(&self.layout(markup)?)
    }
}
