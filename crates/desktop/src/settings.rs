use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use acnescan_core::shared::constants::{
    DEFAULT_CAMERA_INDEX, DEFAULT_CONFIDENCE, DEFAULT_SKIP_INTERVAL,
};

pub const MAX_CAMERA_INDEX: u32 = 9;
pub const MAX_SKIP_INTERVAL: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    System,
    Dark,
    Light,
}

impl Appearance {
    pub const ALL: &[Appearance] = &[Appearance::System, Appearance::Dark, Appearance::Light];
}

impl std::fmt::Display for Appearance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Appearance::System => write!(f, "System"),
            Appearance::Dark => write!(f, "Dark"),
            Appearance::Light => write!(f, "Light"),
        }
    }
}

/// User preferences, persisted as JSON in the platform config directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub camera_index: u32,
    /// Detection confidence threshold in percent.
    pub confidence: u32,
    pub skip_interval: u32,
    /// Keep the latest boxes on frames that skip detection.
    pub hold_overlays: bool,
    /// Where results are written; `None` uses [`default_output_dir`].
    pub output_dir: Option<PathBuf>,
    pub appearance: Appearance,
    pub high_contrast: bool,
    pub font_scale: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera_index: DEFAULT_CAMERA_INDEX,
            confidence: (DEFAULT_CONFIDENCE * 100.0).round() as u32,
            skip_interval: DEFAULT_SKIP_INTERVAL as u32,
            hold_overlays: true,
            output_dir: None,
            appearance: Appearance::System,
            high_contrast: false,
            font_scale: 1.0,
        }
    }
}

/// `~/Documents/AcneScan`, or the working directory if there is no home.
pub fn default_output_dir() -> PathBuf {
    dirs::document_dir()
        .map(|d| d.join("AcneScan"))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("AcneScan").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            if let Err(e) = self.save_to(&path) {
                log::warn!("Could not save settings to {}: {e}", path.display());
            }
        }
    }

    fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str::<Settings>(&json).ok())
            .map(Settings::sanitized)
            .unwrap_or_default()
    }

    fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Clamps hand-edited values into the ranges the UI offers.
    fn sanitized(mut self) -> Self {
        self.camera_index = self.camera_index.min(MAX_CAMERA_INDEX);
        self.confidence = self.confidence.clamp(1, 100);
        self.skip_interval = self.skip_interval.clamp(1, MAX_SKIP_INTERVAL);
        self.font_scale = self.font_scale.clamp(0.8, 1.5);
        self
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence as f64 / 100.0
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(default_output_dir)
    }
}
