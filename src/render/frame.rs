//! RGBA frames and PNG encoding.

use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{TilecheckError, TilecheckResult};
use crate::foundation::math::{blend_src_over_premul, unpremultiply_rgba8_in_place};
use image::ImageEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use std::path::Path;

/// A rendered frame as RGBA8 pixels.
///
/// Frames produced by the pipeline are **premultiplied alpha**. The `premultiplied` flag makes
/// this explicit at API boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Transparent premultiplied frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
            premultiplied: true,
        }
    }

    /// Pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Composite `color` over every pixel.
    pub fn fill_all(&mut self, color: Rgba8Premul) {
        if color.a == 0 {
            return;
        }
        let src = color.to_array();
        for px in self.data.chunks_exact_mut(4) {
            blend_src_over_premul(px, src);
        }
    }

    /// Composite `color` over the half-open pixel span `[x0, x1)` of row `y`.
    pub(crate) fn blend_span(&mut self, y: u32, x0: u32, x1: u32, color: Rgba8Premul) {
        if y >= self.height {
            return;
        }
        let x1 = x1.min(self.width);
        if x0 >= x1 {
            return;
        }
        let row = y as usize * self.width as usize * 4;
        let src = color.to_array();
        let span = &mut self.data[row + x0 as usize * 4..row + x1 as usize * 4];
        for px in span.chunks_exact_mut(4) {
            blend_src_over_premul(px, src);
        }
    }
}

/// Encode `frame` as PNG bytes.
///
/// Compression and filter settings are fixed, so the output depends only on the pixels.
pub fn encode_png(frame: &FrameRGBA) -> TilecheckResult<Vec<u8>> {
    let expected = frame.width as usize * frame.height as usize * 4;
    if frame.data.len() != expected {
        return Err(TilecheckError::render(format!(
            "frame buffer has {} bytes, expected {expected} for {}x{}",
            frame.data.len(),
            frame.width,
            frame.height
        )));
    }

    let mut straight = frame.data.clone();
    if frame.premultiplied {
        unpremultiply_rgba8_in_place(&mut straight);
    }

    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, CompressionType::Default, FilterType::Adaptive)
        .write_image(
            &straight,
            frame.width,
            frame.height,
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| TilecheckError::render(format!("encode png: {e}")))?;
    Ok(out)
}

/// Decode PNG bytes into a straight-alpha frame.
pub fn decode_png(bytes: &[u8]) -> TilecheckResult<FrameRGBA> {
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map_err(|e| TilecheckError::validation(format!("decode png: {e}")))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    Ok(FrameRGBA {
        width,
        height,
        data: img.into_raw(),
        premultiplied: false,
    })
}

/// Encode `frame` as PNG and write it to `path`, creating parent directories.
pub fn write_png(frame: &FrameRGBA, path: &Path) -> TilecheckResult<()> {
    use anyhow::Context as _;
    let bytes = encode_png(frame)?;
    ensure_parent_dir(path)?;
    std::fs::write(path, bytes).with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> TilecheckResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
