use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::{OutputFile, OutputGroup};

pub const README_NAME: &str = "README.txt";

/// How entries are arranged inside the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveLayout {
    /// Bare file names at the archive root
    Flat,
    /// `<stem>/standard/`, `<stem>/web/`, `<stem>/favicon/` and a README
    Structured,
}

impl ArchiveLayout {
    /// Structured whenever something beyond the standard outputs was produced
    pub fn for_outputs(outputs: &[OutputFile]) -> Self {
        if outputs
            .iter()
            .any(|o| matches!(o.group, OutputGroup::Web | OutputGroup::Favicon))
        {
            ArchiveLayout::Structured
        } else {
            ArchiveLayout::Flat
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub disk_path: PathBuf,
    pub archive_path: String,
}

/// Map produced files to archive entry names
pub fn plan_entries(stem: &str, outputs: &[OutputFile], layout: ArchiveLayout) -> Vec<ArchiveEntry> {
    outputs
        .iter()
        .filter(|o| o.group != OutputGroup::Archive)
        .map(|o| {
            let file_name = o.file_name();
            let archive_path = match layout {
                ArchiveLayout::Flat => file_name,
                ArchiveLayout::Structured => {
                    format!("{}/{}/{}", stem, o.group.folder_name(), file_name)
                }
            };
            ArchiveEntry {
                disk_path: o.path.clone(),
                archive_path,
            }
        })
        .collect()
}

/// Describe the archive contents for people unpacking it
pub fn render_readme(
    stem: &str,
    source_name: &str,
    dimensions: (u32, u32),
    has_alpha: bool,
    entries: &[ArchiveEntry],
) -> String {
    let prefix = format!("{}/", stem);
    let title = format!("{} - web image export", stem);

    let mut readme = String::new();
    readme.push_str(&title);
    readme.push('\n');
    readme.push_str(&"=".repeat(title.chars().count()));
    readme.push_str("\n\n");
    readme.push_str(&format!("Source:        {}\n", source_name));
    readme.push_str(&format!("Dimensions:    {}x{}\n", dimensions.0, dimensions.1));
    readme.push_str(&format!(
        "Alpha channel: {}\n\n",
        if has_alpha { "preserved" } else { "none" }
    ));

    for group in [OutputGroup::Standard, OutputGroup::Web, OutputGroup::Favicon] {
        let folder = format!("{}{}/", prefix, group.folder_name());
        if entries.iter().any(|e| e.archive_path.starts_with(&folder)) {
            readme.push_str(&format!(
                "{:<10} {}\n",
                format!("{}/", group.folder_name()),
                group.description()
            ));
        }
    }

    readme.push_str("\nFiles:\n");
    for entry in entries {
        let relative = entry
            .archive_path
            .strip_prefix(&prefix)
            .unwrap_or(&entry.archive_path);
        readme.push_str(&format!("  {}\n", relative));
    }

    readme.push_str(&format!(
        "\nGenerated by web-image-export {}\n",
        env!("CARGO_PKG_VERSION")
    ));
    readme
}

/// Write a ZIP archive from files on disk plus optional in-memory entries
///
/// Entries are deflated with a fixed timestamp so identical inputs give
/// identical archives.
pub fn write_archive(
    zip_path: &Path,
    entries: &[ArchiveEntry],
    extra: &[(String, Vec<u8>)],
) -> Result<()> {
    let file = File::create(zip_path)
        .with_context(|| format!("Failed to create archive: {}", zip_path.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    for entry in entries {
        let bytes = std::fs::read(&entry.disk_path)
            .with_context(|| format!("Failed to read {}", entry.disk_path.display()))?;
        zip.start_file(entry.archive_path.as_str(), options)?;
        zip.write_all(&bytes)?;
    }

    for (name, bytes) in extra {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(bytes)?;
    }

    let mut writer = zip
        .finish()
        .with_context(|| format!("Failed to finalize archive: {}", zip_path.display()))?;
    writer.flush()?;
    Ok(())
}
