use anyhow::{Context, Result};
use exif::{In, Reader, Tag, Value};
use image::{DynamicImage, ImageReader};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// EXIF orientation values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExifOrientation {
    /// No orientation specified or undefined
    Undefined = 0,
    /// Normal orientation (0 degrees)
    TopLeft = 1,
    /// Horizontally flipped
    TopRight = 2,
    /// Rotated 180 degrees
    BottomRight = 3,
    /// Vertically flipped
    BottomLeft = 4,
    /// Transposed (rotated 90 degrees CW + horizontally flipped)
    LeftTop = 5,
    /// Rotated 90 degrees CW
    RightTop = 6,
    /// Transversed (rotated 90 degrees CCW + horizontally flipped)
    RightBottom = 7,
    /// Rotated 90 degrees CCW
    LeftBottom = 8,
}

impl From<u32> for ExifOrientation {
    fn from(value: u32) -> Self {
        match value {
            1 => ExifOrientation::TopLeft,
            2 => ExifOrientation::TopRight,
            3 => ExifOrientation::BottomRight,
            4 => ExifOrientation::BottomLeft,
            5 => ExifOrientation::LeftTop,
            6 => ExifOrientation::RightTop,
            7 => ExifOrientation::RightBottom,
            8 => ExifOrientation::LeftBottom,
            _ => ExifOrientation::Undefined,
        }
    }
}

impl ExifOrientation {
    pub fn description(&self) -> &'static str {
        match self {
            ExifOrientation::Undefined => "Undefined",
            ExifOrientation::TopLeft => "Normal",
            ExifOrientation::TopRight => "Horizontally flipped",
            ExifOrientation::BottomRight => "Rotated 180°",
            ExifOrientation::BottomLeft => "Vertically flipped",
            ExifOrientation::LeftTop => "Transposed",
            ExifOrientation::RightTop => "Rotated 90° CW",
            ExifOrientation::RightBottom => "Transversed",
            ExifOrientation::LeftBottom => "Rotated 90° CCW",
        }
    }

    /// Whether applying this orientation changes the pixel data
    pub fn needs_transform(&self) -> bool {
        !matches!(self, ExifOrientation::Undefined | ExifOrientation::TopLeft)
    }
}

/// A decoded source image ready for encoding
#[derive(Debug)]
pub struct SourceImage {
    /// RGBA8 when the source carries alpha, RGB8 otherwise
    pub image: DynamicImage,
    pub has_alpha: bool,
    pub orientation: ExifOrientation,
}

impl SourceImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Open an image, apply its EXIF orientation and normalize the pixel mode
pub fn load_source(path: &Path) -> Result<SourceImage> {
    let decoded = ImageReader::open(path)
        .with_context(|| format!("Failed to open image: {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("Failed to detect image format: {}", path.display()))?
        .decode()
        .with_context(|| format!("Failed to decode image: {}", path.display()))?;

    let orientation = read_exif_orientation(path).unwrap_or(ExifOrientation::Undefined);
    let oriented = if orientation.needs_transform() {
        apply_orientation(decoded, orientation)
    } else {
        decoded
    };
    let (image, has_alpha) = normalize_mode(oriented);

    Ok(SourceImage {
        image,
        has_alpha,
        orientation,
    })
}

/// Convert any decoded buffer to 8-bit RGB or RGBA, keeping alpha if present
pub fn normalize_mode(img: DynamicImage) -> (DynamicImage, bool) {
    match img {
        DynamicImage::ImageRgb8(_) => (img, false),
        DynamicImage::ImageRgba8(_) => (img, true),
        other if other.color().has_alpha() => (DynamicImage::ImageRgba8(other.to_rgba8()), true),
        other => (DynamicImage::ImageRgb8(other.to_rgb8()), false),
    }
}

/// Read EXIF orientation tag from an image file
fn read_exif_orientation(image_path: &Path) -> Result<ExifOrientation> {
    let file = File::open(image_path).with_context(|| {
        format!(
            "Failed to open image for EXIF reading: {}",
            image_path.display()
        )
    })?;

    let mut buf_reader = BufReader::new(file);
    let exif = Reader::new()
        .read_from_container(&mut buf_reader)
        .context("Failed to read EXIF data")?;

    if let Some(field) = exif.get_field(Tag::Orientation, In::PRIMARY) {
        if let Value::Short(values) = &field.value {
            if let Some(&orientation_value) = values.first() {
                return Ok(ExifOrientation::from(orientation_value as u32));
            }
        }
    }

    Ok(ExifOrientation::Undefined)
}

/// Apply EXIF rotation to an image
///
/// Handles all 8 EXIF orientations with the matching combination of
/// rotations and flips.
pub fn apply_orientation(img: DynamicImage, orientation: ExifOrientation) -> DynamicImage {
    match orientation {
        ExifOrientation::Undefined | ExifOrientation::TopLeft => img,
        ExifOrientation::TopRight => img.fliph(),
        ExifOrientation::BottomRight => img.rotate180(),
        ExifOrientation::BottomLeft => img.flipv(),
        ExifOrientation::LeftTop => img.rotate90().fliph(),
        ExifOrientation::RightTop => img.rotate90(),
        ExifOrientation::RightBottom => img.rotate270().fliph(),
        ExifOrientation::LeftBottom => img.rotate270(),
    }
}
