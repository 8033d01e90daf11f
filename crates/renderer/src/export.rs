use std::path::Path;

use image::GrayImage;

use crate::error::RenderError;
use crate::raster::PixelBuffer;

/// Writes `pixels` as an 8-bit grayscale PNG, creating parent directories.
pub fn write_png(pixels: &PixelBuffer, path: &Path) -> Result<(), RenderError> {
    let fail = |reason: String| RenderError::Export {
        path: path.display().to_string(),
        reason,
    };
    if pixels.is_empty() {
        return Err(fail("frame has no pixels".to_string()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|err| fail(err.to_string()))?;
    }
    let image = GrayImage::from_raw(pixels.width(), pixels.height(), pixels.data().to_vec())
        .ok_or_else(|| fail("pixel buffer does not match its dimensions".to_string()))?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|err| fail(err.to_string()))?;
    tracing::debug!(path = %path.display(), width = pixels.width(), height = pixels.height(), "wrote frame");
    Ok(())
}
