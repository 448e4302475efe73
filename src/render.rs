//! Display surface for accepted payloads
//!
//! Decodes the base64 payload, checks that it is an image the `image`
//! crate can open, and writes the original bytes to disk.

use crate::Result;
use base64::Engine as _;
use image::ImageFormat;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub path: PathBuf,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// Writes `payload` to `output`.
///
/// When `output` has no extension, one is added from the detected format.
pub fn render_to_file(payload: &str, output: &Path) -> Result<RenderedImage> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;

    let format = image::guess_format(&bytes)?;
    let decoded = image::load_from_memory_with_format(&bytes, format)?;

    let path = if output.extension().is_none() {
        let extension = format.extensions_str().first().copied().unwrap_or("img");
        output.with_extension(extension)
    } else {
        output.to_path_buf()
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, &bytes)?;

    tracing::info!(
        "Saved {:?} image ({}x{}) to {}",
        format,
        decoded.width(),
        decoded.height(),
        path.display()
    );

    Ok(RenderedImage {
        path,
        format,
        width: decoded.width(),
        height: decoded.height(),
    })
}
