use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::annotation::{Color, PenStyle};

pub const DEFAULT_LOG_FILTER: &str = "info,compass_markup=debug";

/// One entry of the fixed background selection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackgroundEntry {
    pub label: String,
    pub path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backgrounds: Vec<BackgroundEntry>,
    pub default_kind: String,
    pub default_color: Color,
    pub default_size: f32,
    pub size_min: f32,
    pub size_max: f32,
    pub pen: PenStyle,
    pub export_scale: f32,
    pub font_path: Option<PathBuf>,
    pub log_filter: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backgrounds: Vec::new(),
            default_kind: "circle".to_string(),
            default_color: Color::RED,
            default_size: 20.0,
            size_min: 5.0,
            size_max: 100.0,
            pen: PenStyle::default(),
            export_scale: 2.0,
            font_path: None,
            log_filter: None,
        }
    }
}

impl AppConfig {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "compass-markup", "compass-markup")
    }

    pub fn file_path() -> Option<PathBuf> {
        Some(Self::project_dirs()?.config_dir().join("config.json"))
    }

    pub fn logs_dir() -> Option<PathBuf> {
        Some(Self::project_dirs()?.data_local_dir().join("logs"))
    }

    /// Loads the user config. `Ok(None)` when there is no config file yet.
    pub fn load_user() -> Result<Option<Self>> {
        let Some(path) = Self::file_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Slider range, ordered and kept positive.
    pub fn size_range(&self) -> (f32, f32) {
        let min = self.size_min.min(self.size_max).max(1.0);
        let max = self.size_min.max(self.size_max).max(min);
        (min, max)
    }

    pub fn export_scale(&self) -> f32 {
        if self.export_scale.is_finite() && self.export_scale > 0.0 {
            self.export_scale.min(8.0)
        } else {
            2.0
        }
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{AppConfig, BackgroundEntry, DEFAULT_LOG_FILTER};
    use crate::annotation::Color;

    #[test]
    fn empty_object_yields_defaults() {
        let config = AppConfig::parse("{}").expect("empty config parses");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
        assert_eq!(config.export_scale(), 2.0);
    }

    #[test]
    fn partial_config_overrides_only_named_fields() {
        let config = AppConfig::parse(
            r##"{
                "backgrounds": [{ "label": "Compass A", "path": "/tmp/compass-a.png" }],
                "default_color": "#00ff00",
                "pen": { "color": "#ffeb3b", "opacity": 0.5, "width": 10.0 }
            }"##,
        )
        .expect("config parses");

        assert_eq!(
            config.backgrounds,
            vec![BackgroundEntry {
                label: "Compass A".to_string(),
                path: PathBuf::from("/tmp/compass-a.png"),
            }]
        );
        assert_eq!(config.default_color, Color::rgba(0, 255, 0, 255));
        assert_eq!(config.pen.opacity, 0.5);
        assert_eq!(config.default_kind, "circle");
    }

    #[test]
    fn load_from_reports_the_file() {
        let path = std::env::temp_dir().join(format!(
            "compass-markup-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "{ not json").expect("temp file written");
        let message = format!("{:#}", AppConfig::load_from(&path).expect_err("invalid json"));
        let _ = std::fs::remove_file(&path);
        assert!(message.contains("invalid config"));
    }

    #[test]
    fn bad_color_is_an_error() {
        assert!(AppConfig::parse(r#"{ "default_color": "red" }"#).is_err());
    }

    #[test]
    fn size_range_and_scale_are_sanitized() {
        let config = AppConfig {
            size_min: 80.0,
            size_max: 10.0,
            export_scale: -1.0,
            ..AppConfig::default()
        };
        assert_eq!(config.size_range(), (10.0, 80.0));
        assert_eq!(config.export_scale(), 2.0);
    }
}
