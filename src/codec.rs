//! Codec adapter: HEIC/HEIF decoding and JPG/PNG encoding
//!
//! Decoding goes through libheif (behind the default `heif` feature), encoding
//! through the `image` crate. The rest of the crate only sees the [`Codec`]
//! trait so tests and alternative back ends can swap the implementation.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::DynamicImage;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::cli::OutputFormat;

/// Decode/encode capability used by the conversion job
pub trait Codec: Send + Sync {
    /// Decode the primary image of the file at `path`
    fn decode(&self, path: &Path) -> Result<DynamicImage>;

    /// Encode `image` as `format` and write it to `path`
    ///
    /// `quality` applies to JPEG only; PNG is always lossless.
    fn encode(
        &self,
        image: &DynamicImage,
        path: &Path,
        format: OutputFormat,
        quality: u8,
    ) -> Result<()>;
}

/// Production codec: libheif for decoding, `image` for encoding
#[derive(Debug, Default, Clone, Copy)]
pub struct HeifCodec;

impl HeifCodec {
    pub fn new() -> Self {
        Self
    }

    /// Whether this build can decode HEIF at all
    pub fn is_available() -> bool {
        cfg!(feature = "heif")
    }
}

impl Codec for HeifCodec {
    fn decode(&self, path: &Path) -> Result<DynamicImage> {
        decode_heif(path)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        path: &Path,
        format: OutputFormat,
        quality: u8,
    ) -> Result<()> {
        encode_image(image, path, format, quality)
    }
}

#[cfg(feature = "heif")]
fn decode_heif(path: &Path) -> Result<DynamicImage> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let path_str = path
        .to_str()
        .with_context(|| format!("Path is not valid UTF-8: {}", path.display()))?;

    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_file(path_str)
        .map_err(|e| anyhow::anyhow!("Failed to read HEIF container: {}", e))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| anyhow::anyhow!("Failed to get primary image: {}", e))?;

    let has_alpha = handle.has_alpha_channel();
    let (chroma, channels) = if has_alpha {
        (RgbChroma::Rgba, 4usize)
    } else {
        (RgbChroma::Rgb, 3usize)
    };

    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(chroma), None)
        .map_err(|e| anyhow::anyhow!("Failed to decode HEIF image: {}", e))?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .context("Decoded image has no interleaved RGB plane")?;

    let width = plane.width;
    let height = plane.height;
    let pixels = pack_rows(plane.data, plane.stride, width as usize * channels, height as usize)?;

    let image = if has_alpha {
        image::RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8)
    } else {
        image::RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
    };

    image.with_context(|| format!("Decoded buffer does not match {}x{}", width, height))
}

#[cfg(not(feature = "heif"))]
fn decode_heif(path: &Path) -> Result<DynamicImage> {
    anyhow::bail!(
        "Cannot decode {}: built without HEIF support (rebuild with --features heif)",
        path.display()
    )
}

/// Copy `height` rows of `row_bytes` out of a buffer whose rows are `stride` apart
#[cfg_attr(not(feature = "heif"), allow(dead_code))]
fn pack_rows(data: &[u8], stride: usize, row_bytes: usize, height: usize) -> Result<Vec<u8>> {
    if stride < row_bytes {
        anyhow::bail!("Row stride {} is smaller than row size {}", stride, row_bytes);
    }
    if height > 0 && data.len() < stride * (height - 1) + row_bytes {
        anyhow::bail!("Pixel buffer is truncated ({} bytes)", data.len());
    }

    if stride == row_bytes {
        return Ok(data[..row_bytes * height].to_vec());
    }

    let mut pixels = Vec::with_capacity(row_bytes * height);
    for row in 0..height {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    Ok(pixels)
}

/// Encode an image to `path` as JPG (RGB, given quality) or PNG (lossless)
pub fn encode_image(
    image: &DynamicImage,
    path: &Path,
    format: OutputFormat,
    quality: u8,
) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Jpg => {
            // JPEG has no alpha channel
            let rgb = image.to_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            rgb.write_with_encoder(encoder)
                .context("Failed to encode JPEG")?;
        }
        OutputFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut writer, CompressionType::Best, FilterType::Adaptive);
            image
                .write_with_encoder(encoder)
                .context("Failed to encode PNG")?;
        }
    }

    writer.flush().context("Failed to flush output file")?;
    let file = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush output file: {}", e.error()))?;
    file.sync_all().context("Failed to sync output file")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba};

    fn create_gradient_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128])
        }))
    }

    #[test]
    fn test_encode_jpg_keeps_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        encode_image(&create_gradient_image(40, 30), &path, OutputFormat::Jpg, 95).unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
        let sniffed = image::ImageReader::open(&path)
            .unwrap()
            .with_guessed_format()
            .unwrap()
            .format();
        assert_eq!(sniffed, Some(image::ImageFormat::Jpeg));
    }

    #[test]
    fn test_encode_png_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let source = create_gradient_image(16, 9);
        encode_image(&source, &path, OutputFormat::Png, 95).unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.to_rgb8(), source.to_rgb8());
    }

    #[test]
    fn test_encode_jpg_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alpha.jpg");
        let source = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(8, 8, Rgba([10, 20, 30, 0])));
        encode_image(&source, &path, OutputFormat::Jpg, 95).unwrap();

        let decoded = image::open(&path).unwrap();
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_encode_png_keeps_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alpha.png");
        let source = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(4, 4, Rgba([1, 2, 3, 4])));
        encode_image(&source, &path, OutputFormat::Png, 95).unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0), &Rgba([1, 2, 3, 4]));
    }

    #[test]
    fn test_lower_quality_gives_smaller_jpg() {
        let dir = tempfile::tempdir().unwrap();
        let high = dir.path().join("high.jpg");
        let low = dir.path().join("low.jpg");
        let source = create_gradient_image(64, 64);
        encode_image(&source, &high, OutputFormat::Jpg, 100).unwrap();
        encode_image(&source, &low, OutputFormat::Jpg, 10).unwrap();

        let high_len = std::fs::metadata(&high).unwrap().len();
        let low_len = std::fs::metadata(&low).unwrap().len();
        assert!(low_len < high_len);
    }

    #[test]
    fn test_encode_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.png");
        let err = encode_image(&create_gradient_image(2, 2), &path, OutputFormat::Png, 95);
        assert!(err.is_err());
    }

    #[test]
    fn test_pack_rows_strips_padding() {
        // 2 rows of 3 bytes, stride 4
        let data = [1, 2, 3, 0, 4, 5, 6, 0];
        assert_eq!(pack_rows(&data, 4, 3, 2).unwrap(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(pack_rows(&data[..6], 3, 3, 2).unwrap(), vec![1, 2, 3, 0, 4, 5]);
    }

    #[test]
    fn test_pack_rows_rejects_truncated_buffer() {
        assert!(pack_rows(&[1, 2, 3], 4, 3, 2).is_err());
        assert!(pack_rows(&[1, 2, 3, 4], 2, 3, 1).is_err());
    }

    #[test]
    fn test_decode_missing_file_fails() {
        let codec = HeifCodec::new();
        assert!(codec.decode(Path::new("/definitely/not/here.heic")).is_err());
    }
}
