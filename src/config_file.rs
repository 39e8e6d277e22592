use crate::cli::{Args, OutputFormat};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings file shared by the command line (`--config`) and the GUI
///
/// Every field is optional so a file only needs to name what it overrides.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsFile {
    pub output_format: Option<OutputFormat>,
    pub output_path: Option<String>,
    pub create_subfolder: Option<bool>,
    pub jpg_quality: Option<u8>,
    pub jobs: Option<usize>,
    pub recursive: Option<bool>,
    /// GUI only: open the output folder when a batch finishes
    pub open_output_folder: Option<bool>,
}

impl SettingsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json).with_context(|| format!("Failed to write config file: {:?}", path))
    }
}

impl Args {
    /// Load configuration from a JSON file and merge with command-line arguments
    /// Command-line arguments take precedence over config file values
    pub fn load_and_merge_config(&mut self) -> Result<()> {
        if let Some(config_path) = self.config_file.clone() {
            let settings = SettingsFile::load(&config_path)?;
            self.merge_from_config(settings);
            tracing::debug!(path = %config_path.display(), "loaded configuration");
        }
        Ok(())
    }

    fn merge_from_config(&mut self, config: SettingsFile) {
        if self.format.is_none() {
            self.format = config.output_format;
        }

        if self.quality.is_none() {
            self.quality = config.jpg_quality;
        }

        if self.jobs.is_none() {
            self.jobs = config.jobs;
        }

        // --output and --subfolder are exclusive on the command line, so the
        // file only fills in when neither was given
        if self.output_dir.is_none() && !self.subfolder {
            if let Some(output) = config.output_path.filter(|p| !p.is_empty()) {
                self.output_dir = Some(PathBuf::from(output));
            } else if config.create_subfolder.unwrap_or(false) {
                self.subfolder = true;
            }
        }

        if !self.no_recursive {
            self.no_recursive = !config.recursive.unwrap_or(true);
        }
    }
}
