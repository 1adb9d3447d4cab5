//! Favicon set generation
//!
//! The source is center-cropped to a square and resampled to every size in
//! [`FAVICON_SIZES`]. The three smallest sizes are also packed into a
//! multi-resolution `favicon.ico`, and a `site.webmanifest` points at the
//! Android icons.

use anyhow::{Context, Result};
use image::codecs::ico::{IcoEncoder, IcoFrame};
use image::{DynamicImage, ExtendedColorType};
use serde::Serialize;

use super::encode::{encode_png, OutputFormat};
use super::resize::{crop_to_square, resize_image};
use super::RenderedFile;

/// Every edge length rendered as a standalone PNG
pub const FAVICON_SIZES: [u32; 6] = [16, 32, 48, 180, 192, 512];

/// Edge lengths packed into favicon.ico
pub const ICO_SIZES: [u32; 3] = [16, 32, 48];

pub const ICO_FILE_NAME: &str = "favicon.ico";
pub const MANIFEST_FILE_NAME: &str = "site.webmanifest";

/// Conventional file name for a favicon PNG of the given size
pub fn favicon_png_name(size: u32) -> String {
    match size {
        180 => "apple-touch-icon.png".to_string(),
        192 | 512 => format!("android-chrome-{size}x{size}.png"),
        _ => format!("favicon-{size}x{size}.png"),
    }
}

#[derive(Debug, Serialize)]
struct WebManifest {
    name: String,
    short_name: String,
    icons: Vec<ManifestIcon>,
    theme_color: &'static str,
    background_color: &'static str,
    display: &'static str,
}

#[derive(Debug, Serialize)]
struct ManifestIcon {
    src: String,
    sizes: String,
    #[serde(rename = "type")]
    mime_type: &'static str,
}

/// Render the complete favicon set for one image
pub fn generate_favicons(img: &DynamicImage, app_name: &str) -> Result<Vec<RenderedFile>> {
    let square = crop_to_square(img);
    let mut files = Vec::with_capacity(FAVICON_SIZES.len() + 2);
    let mut ico_sources = Vec::with_capacity(ICO_SIZES.len());

    for size in FAVICON_SIZES {
        let icon = resize_image(&square, size, size)
            .with_context(|| format!("Failed to resize favicon to {size}x{size}"))?;
        let bytes = encode_png(&icon)?;

        if ICO_SIZES.contains(&size) {
            ico_sources.push(icon.to_rgba8());
        }

        files.push(RenderedFile::new(
            favicon_png_name(size),
            OutputFormat::Png,
            bytes,
            Some(size),
        ));
    }

    files.push(RenderedFile::new(
        ICO_FILE_NAME,
        OutputFormat::Ico,
        encode_ico(&ico_sources)?,
        None,
    ));

    files.push(RenderedFile::new(
        MANIFEST_FILE_NAME,
        OutputFormat::Manifest,
        render_manifest(app_name)?.into_bytes(),
        None,
    ));

    Ok(files)
}

/// Pack square RGBA icons into one ICO, each frame PNG-compressed
fn encode_ico(icons: &[image::RgbaImage]) -> Result<Vec<u8>> {
    let frames = icons
        .iter()
        .map(|icon| {
            IcoFrame::as_png(
                icon.as_raw(),
                icon.width(),
                icon.height(),
                ExtendedColorType::Rgba8,
            )
        })
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to encode ICO frame")?;

    let mut buf = Vec::new();
    IcoEncoder::new(&mut buf)
        .encode_images(&frames)
        .context("Failed to encode favicon.ico")?;
    Ok(buf)
}

fn render_manifest(app_name: &str) -> Result<String> {
    let icons = [192u32, 512]
        .into_iter()
        .map(|size| ManifestIcon {
            src: format!("/{}", favicon_png_name(size)),
            sizes: format!("{size}x{size}"),
            mime_type: "image/png",
        })
        .collect();

    let manifest = WebManifest {
        name: app_name.to_string(),
        short_name: app_name.to_string(),
        icons,
        theme_color: "#ffffff",
        background_color: "#ffffff",
        display: "standalone",
    };

    let mut json = serde_json::to_string_pretty(&manifest).context("Failed to render web manifest")?;
    json.push('\n');
    Ok(json)
}
