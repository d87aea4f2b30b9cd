//! QR codes for verification links.
//!
//! Settings are fixed: error correction L, 2×2 pixel modules and the
//! standard 4-module quiet zone. The symbol version grows with the data.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};

use crate::error::{RenderError, RenderStep, Result};

/// Error correction level.
pub const EC_LEVEL: EcLevel = EcLevel::L;

/// Pixels per module edge.
pub const MODULE_PX: u32 = 2;

/// Quiet zone width, in modules.
pub const QUIET_ZONE_MODULES: u32 = 4;

/// Text encoded in the QR code of a draft preview.
pub const DRAFT_PLACEHOLDER: &str = "a";

/// Render `data` as a QR code PNG.
pub fn qr_png(data: &str) -> Result<Vec<u8>> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EC_LEVEL)
        .map_err(|e| RenderError::at(RenderStep::QrCode, e))?;

    let image = code
        .render::<Luma<u8>>()
        .module_dimensions(MODULE_PX, MODULE_PX)
        .quiet_zone(true)
        .build();

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| RenderError::at(RenderStep::QrCode, e))?;
    Ok(png)
}

/// Render `data` as a QR code PNG, base64-encoded for a `data:` URI.
pub fn qr_base64(data: &str) -> Result<String> {
    qr_png(data).map(|png| STANDARD.encode(png))
}
