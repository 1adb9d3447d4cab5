use anyhow::{anyhow, Result};
use fast_image_resize::{images::Image, PixelType, ResizeOptions, Resizer};
use image::{DynamicImage, ImageBuffer};

/// Center-crop an image to a square using its shorter side
pub fn crop_to_square(img: &DynamicImage) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    let side = width.min(height);

    if width == height {
        return img.clone();
    }

    let crop_x = (width - side) / 2;
    let crop_y = (height - side) / 2;
    img.crop_imm(crop_x, crop_y, side, side)
}

/// Height that keeps the aspect ratio at the given width (never below 1)
pub fn scaled_height(src_width: u32, src_height: u32, target_width: u32) -> u32 {
    let height = (src_height as f64 * target_width as f64 / src_width as f64).round() as u32;
    height.max(1)
}

/// Resize to the given width keeping the aspect ratio
pub fn resize_to_width(img: &DynamicImage, width: u32) -> Result<DynamicImage> {
    let height = scaled_height(img.width(), img.height(), width);
    resize_image(img, width, height)
}

/// Resize an image to exact dimensions using high-quality convolution
///
/// Expects the normalized RGB8/RGBA8 buffers produced by decoding.
pub fn resize_image(img: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage> {
    let (src_width, src_height) = (img.width(), img.height());

    if src_width == width && src_height == height {
        return Ok(img.clone());
    }
    if width == 0 || height == 0 {
        return Err(anyhow!("Target size must be non-zero, got {}x{}", width, height));
    }
    if src_width == 0 || src_height == 0 {
        return Err(anyhow!("Source image is empty"));
    }

    let (pixel_type, src_pixels) = match img {
        DynamicImage::ImageRgb8(rgb) => (PixelType::U8x3, rgb.as_raw().clone()),
        DynamicImage::ImageRgba8(rgba) => (PixelType::U8x4, rgba.as_raw().clone()),
        other => (PixelType::U8x4, other.to_rgba8().into_raw()),
    };

    let src_image = Image::from_vec_u8(src_width, src_height, src_pixels, pixel_type)?;
    let mut dst_image = Image::new(width, height, pixel_type);

    let mut resizer = Resizer::new();
    resizer.resize(&src_image, &mut dst_image, Some(&ResizeOptions::default()))?;

    let dst_pixels = dst_image.buffer().to_vec();
    let resized = match pixel_type {
        PixelType::U8x3 => ImageBuffer::from_raw(width, height, dst_pixels)
            .map(DynamicImage::ImageRgb8),
        _ => ImageBuffer::from_raw(width, height, dst_pixels).map(DynamicImage::ImageRgba8),
    };

    resized.ok_or_else(|| anyhow!("Resized buffer does not match {}x{}", width, height))
}
