pub mod archive;
pub mod decode;
pub mod encode;
pub mod favicon;
pub mod resize;
pub mod svg;
pub mod web;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use strum_macros::Display;
use walkdir::WalkDir;

use crate::utils::{has_valid_extension, output_stem, verbose_println};
use archive::{ArchiveLayout, README_NAME};
use decode::ExifOrientation;
use encode::{OutputFormat, AVIF_QUALITY, JPEG_QUALITY, WEBP_QUALITY};

#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Root directory for all outputs
    pub output_root: PathBuf,
    /// Per-run subdirectory name, `None` writes into the root directly
    pub timestamp: Option<String>,
    pub favicon: bool,
    pub website: bool,
    /// Web-root layout: favicons at the root, written once per run
    pub public: bool,
    pub write_archives: bool,
    pub extensions: Vec<String>,
    pub verbose: bool,
}

impl ExportConfig {
    pub fn output_dir(&self) -> PathBuf {
        match &self.timestamp {
            Some(timestamp) => self.output_root.join(timestamp),
            None => self.output_root.clone(),
        }
    }
}

/// Which part of the output tree a file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputGroup {
    Standard,
    Web,
    Favicon,
    Archive,
}

impl OutputGroup {
    pub fn folder_name(&self) -> &'static str {
        match self {
            OutputGroup::Standard => "standard",
            OutputGroup::Web => "web",
            OutputGroup::Favicon => "favicon",
            OutputGroup::Archive => "archive",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OutputGroup::Standard => "Full-size conversions (PNG, JPEG, WebP, AVIF, SVG)",
            OutputGroup::Web => "Responsive WebP/JPEG variants and a <picture> HTML snippet",
            OutputGroup::Favicon => "Favicon PNGs, multi-resolution favicon.ico and site.webmanifest",
            OutputGroup::Archive => "ZIP bundle of all of the above",
        }
    }
}

/// An encoded file that has not been written yet
#[derive(Debug, Clone)]
pub struct RenderedFile {
    pub name: String,
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
    /// Pixel size for icons and responsive variants
    pub size: Option<u32>,
}

impl RenderedFile {
    pub fn new(
        name: impl Into<String>,
        format: OutputFormat,
        bytes: Vec<u8>,
        size: Option<u32>,
    ) -> Self {
        Self {
            name: name.into(),
            format,
            bytes,
            size,
        }
    }
}

/// A file written to disk
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub group: OutputGroup,
    pub quality: Option<u8>,
    pub size: Option<u32>,
    pub bytes: u64,
}

impl OutputFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SkipReason {
    #[strum(to_string = "codec not available in this build")]
    CodecUnavailable,
    #[strum(to_string = "favicon set already written for this run")]
    FaviconAlreadyWritten,
    #[strum(to_string = "source is narrower than this width")]
    UpscaleAvoided,
    #[strum(to_string = "name already taken by another output of this image")]
    NameClash,
}

#[derive(Debug, Clone)]
pub struct SkippedOutput {
    pub name: String,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub struct ExportResult {
    pub input_path: PathBuf,
    pub stem: String,
    pub width: u32,
    pub height: u32,
    pub has_alpha: bool,
    pub orientation: ExifOrientation,
    pub outputs: Vec<OutputFile>,
    pub skipped: Vec<SkippedOutput>,
    pub duration: Duration,
}

impl ExportResult {
    pub fn archive_path(&self) -> Option<&Path> {
        self.outputs
            .iter()
            .find(|o| o.group == OutputGroup::Archive)
            .map(|o| o.path.as_path())
    }

    pub fn total_bytes(&self) -> u64 {
        self.outputs.iter().map(|o| o.bytes).sum()
    }
}

pub struct ExportEngine {
    config: ExportConfig,
    output_dir: PathBuf,
    favicon_written: bool,
    progress: Option<ProgressBar>,
}

impl ExportEngine {
    pub fn new(config: ExportConfig) -> Self {
        let output_dir = config.output_dir();
        Self {
            config,
            output_dir,
            favicon_written: false,
            progress: None,
        }
    }

    /// Route verbose lines around this bar so they do not tear it
    pub fn set_progress_bar(&mut self, progress: ProgressBar) {
        self.progress = Some(progress);
    }

    fn verbose(&self, message: &str) {
        match &self.progress {
            Some(pb) => pb.suspend(|| verbose_println(self.config.verbose, message)),
            None => verbose_println(self.config.verbose, message),
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn prepare_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                self.output_dir.display()
            )
        })
    }

    /// Expand sources into a list of image files
    ///
    /// Files are taken as given; directories are scanned recursively for the
    /// configured extensions, skipping the output tree itself.
    pub fn discover_images(&self, sources: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let output_root = fs::canonicalize(&self.config.output_root).ok();
        let mut image_files = Vec::new();

        for source in sources {
            if !source.is_dir() {
                image_files.push(source.clone());
                continue;
            }

            self.verbose(&format!("Scanning directory: {}", source.display()));

            let mut found = Vec::new();
            let walker = WalkDir::new(source)
                .follow_links(false)
                .max_depth(10)
                .into_iter()
                .filter_entry(|entry| match &output_root {
                    Some(root) => fs::canonicalize(entry.path())
                        .map(|path| path != *root)
                        .unwrap_or(true),
                    None => true,
                });

            for entry in walker {
                let entry = entry.context("Failed to read directory entry")?;
                if entry.file_type().is_file()
                    && has_valid_extension(entry.path(), &self.config.extensions)
                {
                    found.push(entry.into_path());
                }
            }

            found.sort();
            image_files.extend(found);
        }

        let mut seen = HashSet::new();
        image_files.retain(|path| seen.insert(path.clone()));

        self.verbose(&format!("Found {} image files", image_files.len()));
        Ok(image_files)
    }

    /// Process images one after another; a failing image does not stop the batch
    pub fn process_batch<F>(&mut self, image_files: &[PathBuf], mut on_done: F) -> Vec<Result<ExportResult>>
    where
        F: FnMut(usize, &Path, &Result<ExportResult>),
    {
        let mut results = Vec::with_capacity(image_files.len());

        for (index, image_path) in image_files.iter().enumerate() {
            let result = self.process_image(image_path);
            on_done(index + 1, image_path, &result);
            results.push(result);
        }

        results
    }

    /// Convert one image into every configured output
    pub fn process_image(&mut self, image_path: &Path) -> Result<ExportResult> {
        let start = Instant::now();
        let source = decode::load_source(image_path)?;
        let stem = output_stem(image_path);
        let (width, height) = (source.width(), source.height());

        self.verbose(&format!(
            "Decoded {} ({}x{}, alpha: {}, orientation: {})",
            image_path.display(),
            width,
            height,
            source.has_alpha,
            source.orientation.description()
        ));

        let dir = self.output_dir.clone();
        let mut outputs = Vec::new();
        let mut skipped = Vec::new();
        let mut wrote_favicons = false;

        // PNG first: the SVG wrapper embeds exactly these bytes
        let png = encode::encode_png(&source.image)
            .with_context(|| format!("Failed to convert {}", image_path.display()))?;
        let svg = svg::render_svg(&png, width, height);
        outputs.push(self.write_rendered(
            &dir,
            RenderedFile::new(format!("{}.png", stem), OutputFormat::Png, png, None),
            OutputGroup::Standard,
            None,
        )?);

        for (format, quality) in [
            (OutputFormat::Jpeg, JPEG_QUALITY),
            (OutputFormat::WebP, WEBP_QUALITY),
            (OutputFormat::Avif, AVIF_QUALITY),
        ] {
            let name = format!("{}.{}", stem, format.extension());
            let encoded = encode::encode_raster(&source.image, format, Some(quality))
                .with_context(|| format!("Failed to convert {} to {}", image_path.display(), format))?;

            match encoded {
                Some(bytes) => outputs.push(self.write_rendered(
                    &dir,
                    RenderedFile::new(name, format, bytes, None),
                    OutputGroup::Standard,
                    Some(quality),
                )?),
                None => skipped.push(SkippedOutput {
                    name,
                    reason: SkipReason::CodecUnavailable,
                }),
            }
        }

        outputs.push(self.write_rendered(
            &dir,
            RenderedFile::new(
                format!("{}.svg", stem),
                OutputFormat::Svg,
                svg.into_bytes(),
                None,
            ),
            OutputGroup::Standard,
            None,
        )?);

        if self.config.favicon {
            if self.config.public && self.favicon_written {
                skipped.push(SkippedOutput {
                    name: favicon::ICO_FILE_NAME.to_string(),
                    reason: SkipReason::FaviconAlreadyWritten,
                });
            } else {
                let favicon_dir = self.favicon_dir(&stem);
                let files = favicon::generate_favicons(&source.image, &stem)
                    .with_context(|| format!("Failed to generate favicons for {}", image_path.display()))?;
                for file in files {
                    // Public mode shares one directory with the standard outputs
                    let path = favicon_dir.join(&file.name);
                    if outputs.iter().any(|o: &OutputFile| o.path == path) {
                        skipped.push(SkippedOutput {
                            name: file.name,
                            reason: SkipReason::NameClash,
                        });
                        continue;
                    }
                    outputs.push(self.write_rendered(&favicon_dir, file, OutputGroup::Favicon, None)?);
                }
                wrote_favicons = true;
            }
        }

        if self.config.website {
            let variants = web::generate_web_variants(&source.image, &stem)
                .with_context(|| format!("Failed to generate web variants for {}", image_path.display()))?;
            let web_dir = dir.join(OutputGroup::Web.folder_name());

            for file in variants.files {
                let quality = match file.format {
                    OutputFormat::Jpeg => Some(web::WEB_JPEG_QUALITY),
                    OutputFormat::WebP => Some(WEBP_QUALITY),
                    _ => None,
                };
                outputs.push(self.write_rendered(&web_dir, file, OutputGroup::Web, quality)?);
            }

            for width in variants.dropped_widths {
                skipped.push(SkippedOutput {
                    name: format!("{}-{}w", stem, width),
                    reason: SkipReason::UpscaleAvoided,
                });
            }
        }

        if self.config.write_archives {
            let source_name = image_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| stem.clone());
            let archive = self.write_archive(
                &dir,
                &stem,
                &source_name,
                (width, height),
                source.has_alpha,
                &outputs,
            )?;
            outputs.push(archive);
        }

        if wrote_favicons {
            self.favicon_written = true;
        }

        Ok(ExportResult {
            input_path: image_path.to_path_buf(),
            stem,
            width,
            height,
            has_alpha: source.has_alpha,
            orientation: source.orientation,
            outputs,
            skipped,
            duration: start.elapsed(),
        })
    }

    fn favicon_dir(&self, stem: &str) -> PathBuf {
        if self.config.public {
            self.output_dir.clone()
        } else {
            self.output_dir
                .join(OutputGroup::Favicon.folder_name())
                .join(stem)
        }
    }

    fn write_rendered(
        &self,
        dir: &Path,
        file: RenderedFile,
        group: OutputGroup,
        quality: Option<u8>,
    ) -> Result<OutputFile> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let path = dir.join(&file.name);
        fs::write(&path, &file.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        self.verbose(&format!("Wrote {}", path.display()));

        Ok(OutputFile {
            path,
            format: file.format,
            group,
            quality,
            size: file.size,
            bytes: file.bytes.len() as u64,
        })
    }

    fn write_archive(
        &self,
        dir: &Path,
        stem: &str,
        source_name: &str,
        dimensions: (u32, u32),
        has_alpha: bool,
        outputs: &[OutputFile],
    ) -> Result<OutputFile> {
        let layout = ArchiveLayout::for_outputs(outputs);
        let entries = archive::plan_entries(stem, outputs, layout);

        let extra = match layout {
            ArchiveLayout::Flat => Vec::new(),
            ArchiveLayout::Structured => vec![(
                format!("{}/{}", stem, README_NAME),
                archive::render_readme(stem, source_name, dimensions, has_alpha, &entries)
                    .into_bytes(),
            )],
        };

        let zip_path = dir.join(format!("{}_web_images.zip", stem));
        archive::write_archive(&zip_path, &entries, &extra)?;

        let bytes = fs::metadata(&zip_path)
            .with_context(|| format!("Failed to stat {}", zip_path.display()))?
            .len();
        self.verbose(&format!(
            "Bundled {} files into {}",
            entries.len() + extra.len(),
            zip_path.display()
        ));

        Ok(OutputFile {
            path: zip_path,
            format: OutputFormat::Zip,
            group: OutputGroup::Archive,
            quality: None,
            size: None,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::collections::{BTreeMap, BTreeSet};
    use std::fs::File;
    use walkdir::WalkDir;

    fn config(root: &Path) -> ExportConfig {
        ExportConfig {
            output_root: root.to_path_buf(),
            timestamp: None,
            favicon: false,
            website: false,
            public: false,
            write_archives: true,
            extensions: vec!["png".into(), "jpg".into()],
            verbose: false,
        }
    }

    fn write_rgba_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7) as u8, (y * 5) as u8, 120, if (x + y) % 3 == 0 { 0 } else { 255 }])
        })
        .save(&path)
        .unwrap();
        path
    }

    fn write_rgb_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_fn(width, height, |x, y| Rgb([(x * 3) as u8, (y * 2) as u8, 60]))
            .save(&path)
            .unwrap();
        path
    }

    fn zip_names(path: &Path) -> BTreeSet<String> {
        let archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    /// Relative path -> bytes for every file under `root`
    fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                let relative = entry.path().strip_prefix(root).unwrap().to_path_buf();
                (relative, fs::read(entry.path()).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_output_dir_with_timestamp() {
        let mut config = config(Path::new("dist"));
        assert_eq!(config.output_dir(), PathBuf::from("dist"));

        config.timestamp = Some("20240101-120000".into());
        assert_eq!(config.output_dir(), PathBuf::from("dist/20240101-120000"));
    }

    #[test]
    fn test_standard_outputs_exist_and_decode() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let source = write_rgba_png(input.path(), "logo.png", 40, 30);

        let mut engine = ExportEngine::new(config(output.path()));
        let result = engine.process_image(&source).unwrap();

        assert_eq!(result.stem, "logo");
        assert_eq!((result.width, result.height), (40, 30));
        assert!(result.has_alpha);

        for (name, format) in [
            ("logo.png", ImageFormat::Png),
            ("logo.jpg", ImageFormat::Jpeg),
            ("logo.webp", ImageFormat::WebP),
        ] {
            let bytes = fs::read(output.path().join(name)).unwrap();
            let decoded = image::load_from_memory_with_format(&bytes, format).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (40, 30), "{}", name);
        }

        let jpeg = image::open(output.path().join("logo.jpg")).unwrap();
        assert!(!jpeg.color().has_alpha());
        let png = image::open(output.path().join("logo.png")).unwrap();
        assert!(png.color().has_alpha());

        let svg = fs::read_to_string(output.path().join("logo.svg")).unwrap();
        assert!(svg.contains("width=\"40\" height=\"30\""));
        assert!(svg.contains("data:image/png;base64,"));

        let avif_written = output.path().join("logo.avif").exists();
        assert_eq!(avif_written, encode::avif_available());
        assert_eq!(
            result
                .skipped
                .iter()
                .any(|s| s.reason == SkipReason::CodecUnavailable),
            !encode::avif_available()
        );
    }

    #[test]
    fn test_flat_archive_matches_outputs() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let source = write_rgb_jpeg(input.path(), "photo.jpg", 32, 32);

        let mut engine = ExportEngine::new(config(output.path()));
        let result = engine.process_image(&source).unwrap();

        let archive = result.archive_path().unwrap();
        assert_eq!(archive, output.path().join("photo_web_images.zip"));

        let produced: BTreeSet<String> = result
            .outputs
            .iter()
            .filter(|o| o.group != OutputGroup::Archive)
            .map(OutputFile::file_name)
            .collect();
        assert_eq!(zip_names(archive), produced);
        assert!(!result.has_alpha);
    }

    #[test]
    fn test_structured_archive_with_favicon_and_website() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let source = write_rgba_png(input.path(), "brand.png", 600, 300);

        let mut cfg = config(output.path());
        cfg.favicon = true;
        cfg.website = true;
        let mut engine = ExportEngine::new(cfg);
        let result = engine.process_image(&source).unwrap();

        let favicon_dir = output.path().join("favicon").join("brand");
        assert!(favicon_dir.join("favicon.ico").is_file());
        assert!(favicon_dir.join("apple-touch-icon.png").is_file());
        assert!(favicon_dir.join("site.webmanifest").is_file());
        assert!(output.path().join("web").join("brand-480w.webp").is_file());
        assert!(output.path().join("web").join("brand-600w.jpg").is_file());
        assert!(output.path().join("web").join("brand.html").is_file());

        let mut expected: BTreeSet<String> = result
            .outputs
            .iter()
            .filter(|o| o.group != OutputGroup::Archive)
            .map(|o| format!("brand/{}/{}", o.group.folder_name(), o.file_name()))
            .collect();
        expected.insert("brand/README.txt".to_string());

        assert_eq!(zip_names(result.archive_path().unwrap()), expected);
        assert!(result
            .skipped
            .iter()
            .any(|s| s.reason == SkipReason::UpscaleAvoided && s.name == "brand-960w"));
    }

    #[test]
    fn test_repeated_runs_are_byte_identical() {
        let input = tempfile::tempdir().unwrap();
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let source = write_rgba_png(input.path(), "icon.png", 64, 48);

        for root in [first.path(), second.path()] {
            let mut cfg = config(root);
            cfg.favicon = true;
            cfg.website = true;
            ExportEngine::new(cfg).process_image(&source).unwrap();
        }

        let strip_avif = |files: BTreeMap<PathBuf, Vec<u8>>| {
            files
                .into_iter()
                .filter(|(path, _)| path.extension().map_or(true, |ext| ext != "avif"))
                .collect::<BTreeMap<_, _>>()
        };
        let a = strip_avif(snapshot(first.path()));
        let b = strip_avif(snapshot(second.path()));

        assert!(!a.is_empty());
        assert_eq!(a.keys().collect::<Vec<_>>(), b.keys().collect::<Vec<_>>());
        for (path, bytes) in &a {
            assert!(bytes == &b[path], "{} differs between runs", path.display());
        }
    }

    #[test]
    fn test_corrupt_input_fails_only_that_image() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let good = write_rgba_png(input.path(), "good.png", 8, 8);
        let bad = input.path().join("bad.png");
        fs::write(&bad, b"\x89PNG but not really").unwrap();
        let other = write_rgb_jpeg(input.path(), "other.jpg", 8, 8);

        let mut engine = ExportEngine::new(config(output.path()));
        let mut seen = Vec::new();
        let results = engine.process_batch(&[good, bad, other], |index, path, result| {
            seen.push((index, path.to_path_buf(), result.is_ok()));
        });

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
        assert_eq!(seen.iter().map(|s| s.0).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(output.path().join("other_web_images.zip").is_file());
        assert!(!output.path().join("bad.jpg").exists());
    }

    #[test]
    fn test_public_mode_writes_favicons_once() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let first = write_rgba_png(input.path(), "first.png", 64, 64);
        let second = write_rgba_png(input.path(), "second.png", 64, 64);

        let mut cfg = config(output.path());
        cfg.public = true;
        cfg.favicon = true;
        cfg.write_archives = false;
        let mut engine = ExportEngine::new(cfg);

        let first_result = engine.process_image(&first).unwrap();
        let second_result = engine.process_image(&second).unwrap();

        assert!(output.path().join("favicon.ico").is_file());
        assert!(output.path().join("android-chrome-512x512.png").is_file());
        assert!(first_result
            .outputs
            .iter()
            .any(|o| o.group == OutputGroup::Favicon));
        assert!(second_result
            .outputs
            .iter()
            .all(|o| o.group != OutputGroup::Favicon));
        assert!(second_result
            .skipped
            .iter()
            .any(|s| s.reason == SkipReason::FaviconAlreadyWritten));
        assert!(first_result.archive_path().is_none());
        assert!(!output.path().join("first_web_images.zip").exists());
    }

    #[test]
    fn test_public_favicons_come_from_first_successful_image() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let first = write_rgba_png(input.path(), "first.png", 64, 64);
        let second = write_rgba_png(input.path(), "second.png", 64, 64);

        // A directory where the first image's HTML snippet goes makes it fail late
        fs::create_dir_all(output.path().join("web").join("first.html")).unwrap();

        let mut cfg = config(output.path());
        cfg.public = true;
        cfg.favicon = true;
        cfg.website = true;
        cfg.write_archives = false;
        let mut engine = ExportEngine::new(cfg);

        assert!(engine.process_image(&first).is_err());
        let second_result = engine.process_image(&second).unwrap();

        assert!(second_result
            .outputs
            .iter()
            .any(|o| o.group == OutputGroup::Favicon));
        assert!(second_result
            .skipped
            .iter()
            .all(|s| s.reason != SkipReason::FaviconAlreadyWritten));
    }

    #[test]
    fn test_public_favicon_does_not_overwrite_standard_output() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let source = write_rgba_png(input.path(), "apple-touch-icon.png", 64, 64);

        let mut cfg = config(output.path());
        cfg.public = true;
        cfg.favicon = true;
        cfg.write_archives = false;
        let mut engine = ExportEngine::new(cfg);
        let result = engine.process_image(&source).unwrap();

        let full_size = image::open(output.path().join("apple-touch-icon.png")).unwrap();
        assert_eq!((full_size.width(), full_size.height()), (64, 64));

        assert!(result
            .skipped
            .iter()
            .any(|s| s.reason == SkipReason::NameClash && s.name == "apple-touch-icon.png"));
        let paths: HashSet<&PathBuf> = result.outputs.iter().map(|o| &o.path).collect();
        assert_eq!(paths.len(), result.outputs.len());
        assert!(output.path().join("favicon.ico").is_file());
    }

    #[test]
    fn test_missing_source_fails_only_that_image() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let good = write_rgba_png(input.path(), "good.png", 8, 8);
        let missing = input.path().join("missing.png");

        let mut engine = ExportEngine::new(config(output.path()));
        let files = engine.discover_images(&[missing.clone(), good]).unwrap();
        assert_eq!(files[0], missing);

        let results = engine.process_batch(&files, |_, _, _| {});
        let error = results[0].as_ref().unwrap_err();
        assert!(format!("{:#}", error).contains("missing.png"));
        assert!(results[1].is_ok());
    }

    #[test]
    fn test_verbose_output_with_progress_bar() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let source = write_rgba_png(input.path(), "logo.png", 16, 16);

        let mut cfg = config(output.path());
        cfg.verbose = true;
        let mut engine = ExportEngine::new(cfg);
        let pb = ProgressBar::hidden();
        pb.set_length(1);
        engine.set_progress_bar(pb.clone());

        engine.process_image(&source).unwrap();
        assert_eq!(pb.position(), 0);
        assert!(!pb.is_finished());
    }

    #[test]
    fn test_discover_images() {
        let input = tempfile::tempdir().unwrap();
        let nested = input.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        let b = write_rgba_png(input.path(), "b.png", 4, 4);
        let a = write_rgb_jpeg(&nested, "a.JPG", 4, 4);
        fs::write(input.path().join("notes.txt"), "skip me").unwrap();
        let explicit = input.path().join("explicit.gif");
        fs::write(&explicit, "taken as given").unwrap();

        // Output tree inside the scanned directory is not picked up again
        let output_root = input.path().join("dist");
        fs::create_dir_all(&output_root).unwrap();
        write_rgba_png(&output_root, "old.png", 4, 4);

        let engine = ExportEngine::new(config(&output_root));
        let found = engine
            .discover_images(&[explicit.clone(), input.path().to_path_buf(), b.clone()])
            .unwrap();

        assert_eq!(found, vec![explicit, b, a]);
    }

    #[test]
    fn test_exif_rotated_jpeg_is_upright() {
        use image::codecs::jpeg::JpegEncoder;
        use image::ImageEncoder;

        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        // 20x10 JPEG tagged "rotate 90° CW" must come out 10x20
        let pixels = RgbImage::from_pixel(20, 10, Rgb([200, 100, 50]));
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, 90)
            .write_image(pixels.as_raw(), 20, 10, image::ExtendedColorType::Rgb8)
            .unwrap();
        let tagged = insert_exif_orientation(&jpeg, 6);
        let source = input.path().join("rotated.jpg");
        fs::write(&source, tagged).unwrap();

        let mut engine = ExportEngine::new(config(output.path()));
        let result = engine.process_image(&source).unwrap();

        assert_eq!(result.orientation, ExifOrientation::RightTop);
        assert_eq!((result.width, result.height), (10, 20));
        let png = image::open(output.path().join("rotated.png")).unwrap();
        assert_eq!((png.width(), png.height()), (10, 20));
    }

    /// Insert a minimal APP1 EXIF segment with an Orientation tag after SOI
    fn insert_exif_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"MM\x00\x2a\x00\x00\x00\x08"); // big endian, IFD at 8
        tiff.extend_from_slice(&1u16.to_be_bytes()); // one entry
        tiff.extend_from_slice(&0x0112u16.to_be_bytes()); // Orientation
        tiff.extend_from_slice(&3u16.to_be_bytes()); // SHORT
        tiff.extend_from_slice(&1u32.to_be_bytes()); // count
        tiff.extend_from_slice(&orientation.to_be_bytes());
        tiff.extend_from_slice(&[0, 0]); // padding
        tiff.extend_from_slice(&0u32.to_be_bytes()); // no next IFD

        let mut payload = b"Exif\x00\x00".to_vec();
        payload.extend_from_slice(&tiff);

        let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
        out.extend_from_slice(&jpeg[..2]);
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(&jpeg[2..]);
        out
    }
}
