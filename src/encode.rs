//! Encoding originals into derivative formats.
//!
//! The pipeline only sees the [`Transcode`] trait. [`RasterTranscoder`] is
//! the built-in implementation: `image` decodes every supported original
//! and encodes PNG, JPEG and WebP; `ravif` encodes AVIF.

use std::fs;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::DynamicImage;
use ravif::{Img, RGBA8};

use crate::error::{EncodeError, Error, Result};
use crate::format::{Descriptor, EncodeParams};

/// Opaque `encode(image, format, params) -> bytes` transform.
pub trait Transcode: Send + Sync {
    fn transcode(&self, source: &[u8], descriptor: &Descriptor)
    -> Result<Vec<u8>, EncodeError>;
}

/// Read `original` and transcode it, attributing failures to the file.
pub fn transcode_file(
    transcoder: &dyn Transcode,
    original: &Path,
    descriptor: &Descriptor,
) -> Result<Vec<u8>> {
    let source = fs::read(original).map_err(|e| Error::io(original, e))?;
    transcoder
        .transcode(&source, descriptor)
        .map_err(|source| Error::Encode {
            path: original.to_path_buf(),
            format: descriptor.format,
            source,
        })
}

// ============================================================================
// RasterTranscoder
// ============================================================================

/// Built-in transcoder backed by `image` and `ravif`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterTranscoder;

impl Transcode for RasterTranscoder {
    fn transcode(
        &self,
        source: &[u8],
        descriptor: &Descriptor,
    ) -> Result<Vec<u8>, EncodeError> {
        let image = image::load_from_memory(source).map_err(EncodeError::Decode)?;

        match descriptor.params {
            EncodeParams::Avif { quality, effort } => encode_avif(&image, quality, effort),
            EncodeParams::Webp => encode_webp(&image),
            EncodeParams::Png { effort, .. } => encode_png(&image, png_compression(effort)),
            // NOTE: `image` writes baseline JPEG only; `progressive` and
            // `optimize_coding` have no counterpart there
            EncodeParams::Jpeg { quality, .. } => encode_jpeg(&image, quality),
        }
    }
}

/// AVIF via ravif. Effort 0..=9 maps onto ravif speed 10..=1.
#[allow(clippy::cast_possible_truncation)]
fn encode_avif(image: &DynamicImage, quality: f32, effort: u8) -> Result<Vec<u8>, EncodeError> {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels: Vec<RGBA8> = rgba
        .pixels()
        .map(|p| RGBA8::new(p[0], p[1], p[2], p[3]))
        .collect();

    let speed = 10u8.saturating_sub(effort.min(9));
    let encoded = ravif::Encoder::new()
        .with_quality(quality)
        .with_speed(speed)
        .encode_rgba(Img::new(pixels.as_slice(), width as usize, height as usize))
        .map_err(|e| EncodeError::Avif(e.to_string()))?;

    Ok(encoded.avif_file)
}

fn encode_webp(image: &DynamicImage) -> Result<Vec<u8>, EncodeError> {
    let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
    let mut out = Vec::new();
    rgba.write_with_encoder(WebPEncoder::new_lossless(&mut out))?;
    Ok(out)
}

/// Effort 0..=9 picks the deflate setting; the zlib level itself is not
/// exposed by the encoder.
fn png_compression(effort: u8) -> CompressionType {
    match effort {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

fn encode_png(image: &DynamicImage, compression: CompressionType) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    image.write_with_encoder(PngEncoder::new_with_quality(
        &mut out,
        compression,
        FilterType::Adaptive,
    ))?;
    Ok(out)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, EncodeError> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use image::ImageFormat;
    use tempfile::TempDir;

    use super::*;
    use crate::format::variants_for;
    use crate::testing::sample_png;

    #[test]
    fn test_transcodes_every_png_variant() {
        let source = sample_png();
        let set = variants_for("png").unwrap();

        for descriptor in &set {
            let bytes = RasterTranscoder.transcode(&source, descriptor).unwrap();
            let guessed = image::guess_format(&bytes).ok();
            match descriptor.key() {
                "avif" => assert_eq!(&bytes[4..8], b"ftyp"),
                "webp" => assert_eq!(guessed, Some(ImageFormat::WebP)),
                "fallback" => assert_eq!(guessed, Some(ImageFormat::Png)),
                other => panic!("unexpected key {other}"),
            }
        }
    }

    #[test]
    fn test_png_fallback_uses_best_compression() {
        let set = variants_for("png").unwrap();
        let EncodeParams::Png { effort, .. } = set.fallback().params else {
            panic!("png fallback must carry png params");
        };
        assert_eq!(png_compression(effort), CompressionType::Best);
        assert_eq!(png_compression(0), CompressionType::Fast);
        assert_eq!(png_compression(5), CompressionType::Default);
    }

    #[test]
    fn test_jpeg_drops_alpha() {
        let set = variants_for("jpg").unwrap();
        let bytes = RasterTranscoder
            .transcode(&sample_png(), set.fallback())
            .unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let set = variants_for("png").unwrap();
        let err = RasterTranscoder
            .transcode(b"not an image", set.fallback())
            .unwrap_err();
        assert!(matches!(err, EncodeError::Decode(_)));
    }

    #[test]
    fn test_transcode_file_wraps_path_and_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"zzz").unwrap();

        let set = variants_for("png").unwrap();
        let descriptor = set.iter().next().unwrap();
        match transcode_file(&RasterTranscoder, &path, descriptor) {
            Err(Error::Encode { path: p, format, .. }) => {
                assert_eq!(p, path);
                assert_eq!(format, descriptor.format);
            }
            other => panic!("expected Encode error, got {other:?}"),
        }
    }

    #[test]
    fn test_transcode_file_missing_original() {
        let set = variants_for("png").unwrap();
        let err = transcode_file(&RasterTranscoder, Path::new("/nope/x.png"), set.fallback())
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
