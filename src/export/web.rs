use anyhow::{Context, Result};
use image::DynamicImage;

use super::encode::{encode_jpeg, encode_webp, OutputFormat, WEBP_QUALITY};
use super::resize::resize_to_width;
use super::RenderedFile;

/// Responsive widths rendered for websites
pub const WEB_WIDTHS: [u32; 3] = [480, 960, 1920];

/// JPEG quality for the responsive fallbacks
pub const WEB_JPEG_QUALITY: u8 = 80;

/// Widths to render for a source of the given width, plus the widths dropped
/// because they would upscale
///
/// When any configured width is dropped the source width itself is rendered
/// instead, so the largest variant is always full resolution.
pub fn plan_widths(src_width: u32) -> (Vec<u32>, Vec<u32>) {
    let mut widths: Vec<u32> = WEB_WIDTHS.iter().copied().filter(|&w| w < src_width).collect();
    let dropped: Vec<u32> = WEB_WIDTHS.iter().copied().filter(|&w| w > src_width).collect();

    if WEB_WIDTHS.iter().any(|&w| w >= src_width) {
        widths.push(src_width);
    }

    (widths, dropped)
}

/// Rendered responsive variants for one image
#[derive(Debug)]
pub struct WebVariants {
    pub files: Vec<RenderedFile>,
    pub dropped_widths: Vec<u32>,
}

pub fn variant_name(stem: &str, width: u32, format: OutputFormat) -> String {
    format!("{}-{}w.{}", stem, width, format.extension())
}

pub fn generate_web_variants(img: &DynamicImage, stem: &str) -> Result<WebVariants> {
    let (widths, dropped_widths) = plan_widths(img.width());
    let mut files = Vec::with_capacity(widths.len() * 2 + 1);
    let mut sizes = Vec::with_capacity(widths.len());

    for width in widths {
        let variant = resize_to_width(img, width)
            .with_context(|| format!("Failed to resize web variant to {}px", width))?;
        sizes.push((variant.width(), variant.height()));

        files.push(RenderedFile::new(
            variant_name(stem, width, OutputFormat::WebP),
            OutputFormat::WebP,
            encode_webp(&variant, WEBP_QUALITY)?,
            Some(width),
        ));
        files.push(RenderedFile::new(
            variant_name(stem, width, OutputFormat::Jpeg),
            OutputFormat::Jpeg,
            encode_jpeg(&variant, WEB_JPEG_QUALITY)?,
            Some(width),
        ));
    }

    files.push(RenderedFile::new(
        format!("{}.html", stem),
        OutputFormat::Html,
        render_picture_snippet(stem, &sizes).into_bytes(),
        None,
    ));

    Ok(WebVariants {
        files,
        dropped_widths,
    })
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn srcset(stem: &str, sizes: &[(u32, u32)], format: OutputFormat) -> String {
    sizes
        .iter()
        .map(|&(w, _)| format!("{} {}w", escape_attr(&variant_name(stem, w, format)), w))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `<picture>` element serving WebP with a JPEG fallback
///
/// The middle variant is the `src` fallback; intrinsic size comes from the largest.
pub fn render_picture_snippet(stem: &str, sizes: &[(u32, u32)]) -> String {
    let Some(&(largest_w, largest_h)) = sizes.last() else {
        return String::new();
    };
    let (fallback_w, _) = sizes[sizes.len() / 2];

    format!(
        "<picture>\n  \
         <source type=\"image/webp\" srcset=\"{webp}\" sizes=\"(max-width: {max}px) 100vw, {max}px\">\n  \
         <img src=\"{fallback}\" srcset=\"{jpeg}\" sizes=\"(max-width: {max}px) 100vw, {max}px\" \
         width=\"{max}\" height=\"{height}\" alt=\"{alt}\" loading=\"lazy\" decoding=\"async\">\n\
         </picture>\n",
        webp = srcset(stem, sizes, OutputFormat::WebP),
        jpeg = srcset(stem, sizes, OutputFormat::Jpeg),
        fallback = escape_attr(&variant_name(stem, fallback_w, OutputFormat::Jpeg)),
        max = largest_w,
        height = largest_h,
        alt = escape_attr(stem),
    )
}
