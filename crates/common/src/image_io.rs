//! Image loading for the detection pipeline
//!
//! Decoding is delegated to the `image` crate; this module only enforces the
//! accepted upload formats and size limit and normalizes everything to RGB.

use crate::{ProcessingError, Result};
use image::RgbImage;
use std::fs;
use std::path::Path;
use tracing::debug;

/// File extensions accepted for uploaded photographs
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Maximum accepted upload size (16 MiB)
pub const MAX_IMAGE_BYTES: u64 = 16 * 1024 * 1024;

/// Check whether a path has one of the supported image extensions
#[must_use]
pub fn is_supported_extension<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Load an image from disk and convert it to 3-channel RGB
///
/// # Example
/// ```no_run
/// use snackscan_common::image_io::load_image;
/// let img = load_image("shelf.jpg")?;
/// # Ok::<(), snackscan_common::ProcessingError>(())
/// ```
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let path = path.as_ref();

    if !is_supported_extension(path) {
        return Err(ProcessingError::UnsupportedFormat(format!(
            "{} (expected one of: {})",
            path.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        )));
    }

    let size = fs::metadata(path)?.len();
    if size > MAX_IMAGE_BYTES {
        return Err(ProcessingError::FileTooLarge {
            size,
            max: MAX_IMAGE_BYTES,
        });
    }

    let bytes = fs::read(path)?;
    let img = load_image_from_memory(&bytes)?;
    debug!(
        "Loaded {} ({}x{})",
        path.display(),
        img.width(),
        img.height()
    );
    Ok(img)
}

/// Decode an in-memory encoded image (PNG, JPEG, ...) to RGB
pub fn load_image_from_memory(bytes: &[u8]) -> Result<RgbImage> {
    if bytes.len() as u64 > MAX_IMAGE_BYTES {
        return Err(ProcessingError::FileTooLarge {
            size: bytes.len() as u64,
            max: MAX_IMAGE_BYTES,
        });
    }
    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}
