use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::DynamicImage;
use strum_macros::{Display, EnumIter};

/// JPEG quality for the standard export
pub const JPEG_QUALITY: u8 = 85;
/// Lossy WebP quality for the standard export and web variants
pub const WEBP_QUALITY: u8 = 90;
/// AVIF quality for the standard export
pub const AVIF_QUALITY: u8 = 85;
/// rav1e speed preset, 1 (slowest) to 10 (fastest)
pub const AVIF_SPEED: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
    WebP,
    Avif,
    Svg,
    Ico,
    Html,
    Manifest,
    Zip,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
            OutputFormat::Avif => "avif",
            OutputFormat::Svg => "svg",
            OutputFormat::Ico => "ico",
            OutputFormat::Html => "html",
            OutputFormat::Manifest => "webmanifest",
            OutputFormat::Zip => "zip",
        }
    }

    /// Raster formats written by `encode_raster`
    pub fn is_raster(&self) -> bool {
        matches!(
            self,
            OutputFormat::Png | OutputFormat::Jpeg | OutputFormat::WebP | OutputFormat::Avif
        )
    }
}

/// Whether this build can write AVIF files
pub fn avif_available() -> bool {
    cfg!(feature = "avif")
}

/// Encode a raster format
///
/// Returns `Ok(None)` when the format's codec is not compiled in.
pub fn encode_raster(
    img: &DynamicImage,
    format: OutputFormat,
    quality: Option<u8>,
) -> Result<Option<Vec<u8>>> {
    let encoded = match format {
        OutputFormat::Png => encode_png(img)?,
        OutputFormat::Jpeg => encode_jpeg(img, quality.unwrap_or(JPEG_QUALITY))?,
        OutputFormat::WebP => encode_webp(img, quality.unwrap_or(WEBP_QUALITY))?,
        OutputFormat::Avif => return encode_avif(img, quality.unwrap_or(AVIF_QUALITY)),
        other => return Err(anyhow!("{} is not a raster format", other)),
    };
    Ok(Some(encoded))
}

/// PNG with maximum compression and adaptive filtering; alpha preserved
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder)
        .context("Failed to encode PNG")?;
    Ok(buf)
}

/// JPEG at the given quality; the alpha channel is dropped, not composited
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)
        .context("Failed to encode JPEG")?;
    Ok(buf)
}

/// Lossy WebP at the given quality (libwebp); alpha preserved
pub fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    // libwebp only accepts 8-bit RGB and RGBA layouts
    let converted;
    let source = match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
        other if other.color().has_alpha() => {
            converted = DynamicImage::ImageRgba8(other.to_rgba8());
            &converted
        }
        other => {
            converted = DynamicImage::ImageRgb8(other.to_rgb8());
            &converted
        }
    };

    let encoder = webp::Encoder::from_image(source)
        .map_err(|e| anyhow!("Failed to prepare WebP encoder: {}", e))?;
    Ok(encoder.encode(quality as f32).to_vec())
}

#[cfg(feature = "avif")]
pub fn encode_avif(img: &DynamicImage, quality: u8) -> Result<Option<Vec<u8>>> {
    use image::codecs::avif::AvifEncoder;

    let mut buf = Vec::new();
    let encoder = AvifEncoder::new_with_speed_quality(&mut buf, AVIF_SPEED, quality);
    img.write_with_encoder(encoder)
        .context("Failed to encode AVIF")?;
    Ok(Some(buf))
}

#[cfg(not(feature = "avif"))]
pub fn encode_avif(_img: &DynamicImage, _quality: u8) -> Result<Option<Vec<u8>>> {
    Ok(None)
}
