//! Tiled text stamp for previews shown to non-subscribers.
//!
//! Glyphs come from the built-in 8x8 bitmap font, so output depends only on
//! the input bytes and the text.

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, Rgba, RgbaImage};

use crate::errors::WatermarkError;
use crate::models::content::ImageFormat;

const GLYPH_SIZE: u32 = 8;
const SPACING_X: u32 = 20;
const SPACING_Y: u32 = 40;
const JPEG_QUALITY: u8 = 75;
const STAMP_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

#[derive(Debug, Default, Clone, Copy)]
pub struct WatermarkRenderer;

impl WatermarkRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Decodes `bytes`, stamps `text` over it and re-encodes in `format`.
    pub fn apply(&self, bytes: &[u8], format: ImageFormat, text: &str) -> Result<Vec<u8>, WatermarkError> {
        let decoded = image::load_from_memory_with_format(bytes, codec(format))
            .map_err(WatermarkError::Decode)?;
        let mut canvas = decoded.to_rgba8();
        tile_text(&mut canvas, text);
        encode(canvas, format)
    }
}

fn codec(format: ImageFormat) -> image::ImageFormat {
    match format {
        ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        ImageFormat::Png => image::ImageFormat::Png,
    }
}

fn text_width(text: &str) -> u32 {
    text.chars().count() as u32 * GLYPH_SIZE
}

/// Repeats `text` in rows whose baselines start at `SPACING_Y` and recur
/// every `SPACING_Y` pixels. Anything past the image edge is dropped.
fn tile_text(canvas: &mut RgbaImage, text: &str) {
    let (width, height) = canvas.dimensions();
    let step_x = text_width(text) + SPACING_X;

    let mut baseline = SPACING_Y;
    while baseline < height {
        let mut x = 0;
        while x < width {
            draw_text(canvas, text, x, baseline);
            x += step_x;
        }
        baseline += SPACING_Y;
    }
}

fn draw_text(canvas: &mut RgbaImage, text: &str, x: u32, baseline: u32) {
    let top = baseline.saturating_sub(GLYPH_SIZE);
    for (index, ch) in text.chars().enumerate() {
        let origin_x = x + index as u32 * GLYPH_SIZE;
        if origin_x >= canvas.width() {
            break;
        }
        // Characters outside the font leave a blank cell.
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            continue;
        };
        draw_glyph(canvas, &glyph, origin_x, top);
    }
}

fn draw_glyph(canvas: &mut RgbaImage, glyph: &[u8; 8], origin_x: u32, top: u32) {
    for (row, bits) in glyph.iter().enumerate() {
        let y = top + row as u32;
        if y >= canvas.height() {
            return;
        }
        for col in 0..GLYPH_SIZE {
            let x = origin_x + col;
            if x < canvas.width() && bits & (1 << col) != 0 {
                canvas.put_pixel(x, y, STAMP_COLOR);
            }
        }
    }
}

fn encode(canvas: RgbaImage, format: ImageFormat) -> Result<Vec<u8>, WatermarkError> {
    let mut out = Vec::new();
    match format {
        ImageFormat::Png => {
            DynamicImage::ImageRgba8(canvas)
                .write_with_encoder(PngEncoder::new(&mut out))
                .map_err(WatermarkError::Encode)?;
        }
        ImageFormat::Jpeg => {
            // JPEG carries no alpha channel.
            let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
            DynamicImage::ImageRgb8(rgb)
                .write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))
                .map_err(WatermarkError::Encode)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::common::WATERMARK_TEXT;
    use image::{GenericImageView, Rgb, RgbImage};
    use std::io::Cursor;

    pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([30, 60, 200, 255]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    pub(crate) fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([30, 60, 200]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Jpeg)
            .unwrap();
        out
    }

    #[test]
    fn test_png_keeps_format_and_dimensions() {
        let original = sample_png(300, 120);
        let stamped = WatermarkRenderer::new().apply(&original, ImageFormat::Png, WATERMARK_TEXT).unwrap();

        assert_eq!(image::guess_format(&stamped).unwrap(), image::ImageFormat::Png);
        let before = image::load_from_memory(&original).unwrap();
        let after = image::load_from_memory(&stamped).unwrap();
        assert_eq!(after.dimensions(), (300, 120));
        assert_ne!(before.to_rgba8().into_raw(), after.to_rgba8().into_raw());
    }

    #[test]
    fn test_jpeg_keeps_format_and_dimensions() {
        let original = sample_jpeg(200, 90);
        let stamped = WatermarkRenderer::new().apply(&original, ImageFormat::Jpeg, WATERMARK_TEXT).unwrap();

        assert_eq!(image::guess_format(&stamped).unwrap(), image::ImageFormat::Jpeg);
        let after = image::load_from_memory(&stamped).unwrap();
        assert_eq!(after.dimensions(), (200, 90));
    }

    #[test]
    fn test_output_is_deterministic() {
        let original = sample_png(160, 100);
        let renderer = WatermarkRenderer::new();
        let a = renderer.apply(&original, ImageFormat::Png, WATERMARK_TEXT).unwrap();
        let b = renderer.apply(&original, ImageFormat::Png, WATERMARK_TEXT).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tiling_starts_below_top_margin() {
        let mut canvas = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
        tile_text(&mut canvas, "HHHH");

        // Nothing above the first glyph row.
        for y in 0..(SPACING_Y - GLYPH_SIZE) {
            for x in 0..100 {
                assert_ne!(*canvas.get_pixel(x, y), STAMP_COLOR);
            }
        }
        // Second row of stamps sits one spacing lower.
        let first_row = (SPACING_Y - GLYPH_SIZE..SPACING_Y)
            .any(|y| (0..100).any(|x| *canvas.get_pixel(x, y) == STAMP_COLOR));
        let second_row = (2 * SPACING_Y - GLYPH_SIZE..2 * SPACING_Y)
            .any(|y| (0..100).any(|x| *canvas.get_pixel(x, y) == STAMP_COLOR));
        assert!(first_row);
        assert!(second_row);
    }

    #[test]
    fn test_stamp_clipped_at_edges() {
        // Narrower than one copy of the text; must not panic.
        let mut canvas = RgbaImage::from_pixel(13, 45, Rgba([0, 0, 0, 255]));
        tile_text(&mut canvas, WATERMARK_TEXT);
        assert_eq!(canvas.dimensions(), (13, 45));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let err = WatermarkRenderer::new()
            .apply(b"not an image", ImageFormat::Png, WATERMARK_TEXT)
            .unwrap_err();
        assert!(matches!(err, WatermarkError::Decode(_)));
    }
}
