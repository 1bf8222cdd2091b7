//! Application settings, optionally read from a TOML file.

use crate::error::ConfigError;

use serde::Deserialize;
use std::path::Path;

/// Settings for the window, the clear color and the label shown each frame.
///
/// Every field may be omitted from the file; missing fields keep their default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial inner width of the window, in logical pixels.
    pub width: u32,
    /// Initial inner height of the window, in logical pixels.
    pub height: u32,
    /// Color the framebuffer is cleared to before the GUI is drawn, as RGBA.
    pub clear_color: [f32; 4],
    /// Text of the static label.
    pub label: String,
    /// Font scale applied to the window holding the label.
    pub font_scale: f32,
    /// Whether buffer swaps wait for the vertical blank.
    pub vsync: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            title: "imgui OpenGL example".to_owned(),
            width: 1280,
            height: 720,
            clear_color: [0.8, 0.6, 0.6, 1.0],
            label: "Hello, world!".to_owned(),
            font_scale: 2.0,
            vsync: true,
        }
    }
}

impl AppConfig {
    /// Reads and validates the configuration stored at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !self.font_scale.is_finite() || self.font_scale <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "font_scale must be positive, got {}",
                self.font_scale
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.label, "Hello, world!");
        assert_eq!(config.clear_color, [0.8, 0.6, 0.6, 1.0]);
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let config = AppConfig::from_toml_str("label = \"Hi\"\nwidth = 800\n").unwrap();
        assert_eq!(config.label, "Hi");
        assert_eq!(config.width, 800);
        assert_eq!(config.height, 720);
        assert_eq!(config.font_scale, 2.0);
    }

    #[test]
    fn zero_size_is_rejected() {
        let err = AppConfig::from_toml_str("height = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn non_positive_font_scale_is_rejected() {
        let err = AppConfig::from_toml_str("font_scale = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_field_is_a_parse_error() {
        let err = AppConfig::from_toml_str("colour = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AppConfig::load(Path::new("/nonexistent/imgui-gl-example.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
