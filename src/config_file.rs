use crate::cli::{Args, DEFAULT_EXTENSIONS, DEFAULT_OUT_DIR};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Saved export preset
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub name: Option<String>,
    pub config: ExportConfigJson,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfigJson {
    pub out_dir: Option<String>,
    pub favicon: Option<bool>,
    pub website: Option<bool>,
    pub public: Option<bool>,
    pub no_timestamp: Option<bool>,
    pub no_zip: Option<bool>,
    pub extensions: Option<String>,
    pub verbose: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

impl Args {
    /// Load configuration from a JSON file and merge with command-line arguments
    /// Command-line arguments take precedence over config file values
    pub fn load_and_merge_config(&mut self) -> Result<()> {
        if let Some(config_path) = self.config_file.clone() {
            let config = ConfigFile::load(&config_path)?;
            self.merge_from_config(config.config);

            if self.verbose && !self.json_progress {
                eprintln!("Loaded configuration from: {}", config_path.display());
            }
        }
        Ok(())
    }

    fn merge_from_config(&mut self, config: ExportConfigJson) {
        // Boolean flags - only apply if currently false (default)
        self.favicon |= config.favicon.unwrap_or(false);
        self.website |= config.website.unwrap_or(false);
        self.no_timestamp |= config.no_timestamp.unwrap_or(false);
        self.no_zip |= config.no_zip.unwrap_or(false);
        self.verbose |= config.verbose.unwrap_or(false);

        // String parameters - only apply if using defaults
        let out_dir_is_default = self.out_dir == Path::new(DEFAULT_OUT_DIR);
        if out_dir_is_default {
            if let Some(out_dir) = config.out_dir {
                self.out_dir = PathBuf::from(out_dir);
            }
        }

        // public conflicts with an explicit output directory from either source
        if !self.public && out_dir_is_default && self.out_dir == Path::new(DEFAULT_OUT_DIR) {
            self.public = config.public.unwrap_or(false);
        }

        if self.extensions_str == DEFAULT_EXTENSIONS {
            if let Some(ext) = config.extensions {
                self.extensions_str = ext;
            }
        }
    }
}
