//! # certmint render
//!
//! Turns a template body and certificate fields into a finished document
//! (single-page PDF) and a PNG preview of that page.
//!
//! The pipeline is:
//! 1. [`TemplateRenderer`] substitutes fields, the QR code and the
//!    verification URL into the template
//! 2. a [`DocumentEngine`] reads the resulting markup, lays it out and
//!    writes both outputs
//!
//! Rendering is CPU-bound and holds no shared state; callers running under
//! an async runtime should move it to a blocking thread.

pub mod engine;
pub mod error;
pub mod layout;
pub mod markup;
pub mod pdf;
pub mod qr;
pub mod raster;
pub mod renderer;

pub use engine::{DocumentEngine, PdfEngine, RenderedDocument};
pub use error::{RenderError, RenderStep, Result};
pub use layout::PageSettings;
pub use qr::{qr_base64, qr_png};
pub use renderer::TemplateRenderer;
