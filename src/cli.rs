use clap::Parser;
use std::path::PathBuf;

/// Default output root when neither `--out-dir` nor `--public` is given
pub const DEFAULT_OUT_DIR: &str = "dist";

/// Output root used by `--public`
pub const PUBLIC_DIR: &str = "public";

/// Extensions picked up when scanning input directories
pub const DEFAULT_EXTENSIONS: &str = "jpg,jpeg,png,webp,gif,bmp,tiff,tif";

#[derive(Parser, Debug)]
#[command(
    name = "web-image-export",
    version,
    about = "Convert images into web-optimized PNG, JPEG, WebP, AVIF and SVG files",
    long_about = "
Web Image Export

Converts one or more source images into a fixed set of web-friendly formats and
bundles the results of each image into a ZIP archive.

Outputs per image:
• <name>.png   lossless PNG (alpha preserved)
• <name>.jpg   JPEG, quality 85 (alpha dropped)
• <name>.webp  WebP, quality 90 (alpha preserved)
• <name>.avif  AVIF, quality 85 (only when built with the `avif` feature)
• <name>.svg   SVG wrapper embedding the PNG as base64
• <name>_web_images.zip

Example Usage:
  # Single image into ./dist/<timestamp>/
  web-image-export photos/logo.png

  # Several images, fixed output directory without a timestamp folder
  web-image-export src/*.jpg --out-dir ./build --no-timestamp

  # Favicon set and responsive website variants
  web-image-export logo.png --favicon --website

  # Write straight into a web project's public/ folder
  web-image-export logo.png --favicon --public"
)]
pub struct Args {
    /// Source images or directories to scan
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<PathBuf>,

    /// Directory to place the converted files
    #[arg(
        short = 'o',
        long = "out-dir",
        value_name = "DIR",
        default_value = DEFAULT_OUT_DIR,
        conflicts_with = "public"
    )]
    pub out_dir: PathBuf,

    /// Generate favicon sizes (16-512 px), a multi-resolution favicon.ico and site.webmanifest
    #[arg(long = "favicon")]
    pub favicon: bool,

    /// Generate responsive website variants (480/960/1920 px WebP + JPEG) and an HTML snippet
    #[arg(long = "website")]
    pub website: bool,

    /// Write into ./public using a web-root layout (implies --no-timestamp, no ZIP archives)
    #[arg(long = "public")]
    pub public: bool,

    /// Write directly into the output directory instead of a timestamped subdirectory
    #[arg(long = "no-timestamp")]
    pub no_timestamp: bool,

    /// Skip bundling the outputs into ZIP archives
    #[arg(long = "no-zip")]
    pub no_zip: bool,

    /// Comma-separated list of image extensions picked up when scanning directories
    #[arg(long = "extensions", default_value = DEFAULT_EXTENSIONS)]
    pub extensions_str: String,

    /// JSON configuration file (command-line flags take precedence)
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Emit progress and results as JSON lines instead of human readable output
    #[arg(long = "json-progress")]
    pub json_progress: bool,

    /// Enable verbose output with detailed progress information
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Args {
    /// Parse the extensions string into a list of lowercase extensions
    pub fn parse_extensions(&self) -> Vec<String> {
        self.extensions_str
            .split(',')
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }

    /// Output root after applying `--public`
    pub fn output_root(&self) -> PathBuf {
        if self.public {
            PathBuf::from(PUBLIC_DIR)
        } else {
            self.out_dir.clone()
        }
    }

    /// Whether outputs go into a timestamped subdirectory
    pub fn use_timestamp(&self) -> bool {
        !(self.no_timestamp || self.public)
    }

    /// Whether ZIP archives are written
    pub fn write_archives(&self) -> bool {
        !(self.no_zip || self.public)
    }
}
