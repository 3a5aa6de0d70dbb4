use anyhow::{Context, Result};
use conceptmap_graph::DEFAULT_HIT_RADIUS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Click distance, in canvas pixels, that still counts as hitting a node.
    pub hit_radius: f32,
    pub last_image_folder: Option<PathBuf>,
    pub last_output_file: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            hit_radius: DEFAULT_HIT_RADIUS,
            last_image_folder: None,
            last_output_file: None,
        }
    }
}

impl AppSettings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("conceptmap").join("settings.json"))
    }

    /// Load settings, falling back to defaults when the file is missing or unreadable.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|err| {
                tracing::warn!("Ignoring settings at {}: {err:#}", path.display());
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let settings = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        match Self::default_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Remember the paths of the run that just finished.
    pub fn remember(&mut self, image_folder: Option<&Path>, output_file: Option<&Path>) {
        if let Some(folder) = image_folder {
            self.last_image_folder = Some(folder.to_path_buf());
        }
        if let Some(output) = output_file {
            self.last_output_file = Some(output.to_path_buf());
        }
    }
}
