//! # Configuration
//!
//! Application settings loaded from an optional TOML file. Every section uses
//! `#[serde(default)]`, so a file that only overrides `[camera] damping` is valid and everything
//! else keeps its default value.
//!
//! ```toml
//! [window]
//! title = "Mip Orbit"
//! width = 1280
//! height = 720
//!
//! [camera]
//! sensitivity = 0.005
//! damping = 0.9
//!
//! [texture]
//! size = 512
//! cell_size = 32
//! ```
//!
//! The file is looked up at the path in the `MIP_ORBIT_CONFIG` environment variable, falling
//! back to `mip-orbit.toml` in the working directory. Web builds always use the defaults.
//! [`AppConfig::load_from`] performs the same lookup for explicit paths.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::CameraSettings;
use crate::error::{Error, Result};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "MIP_ORBIT_CONFIG";

/// Configuration file read when [`CONFIG_ENV_VAR`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "mip-orbit.toml";

/// Largest accepted `texture.size`, the default `max_texture_dimension_2d` of `wgpu`.
///
/// Devices with lower limits (WebGL2 guarantees 2048) are checked again when the texture is
/// created.
pub const MAX_TEXTURE_SIZE: u32 = 8192;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub camera: CameraSettings,
    pub texture: TextureConfig,
}

/// Initial window attributes (desktop only; the web canvas dictates its own size).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Mip Orbit".to_owned(),
            width: 1280,
            height: 720,
        }
    }
}

/// Procedural checkerboard used as the base mip level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureConfig {
    /// Width and height of the base level in texels.
    pub size: u32,
    /// Edge length of one checker cell in texels.
    pub cell_size: u32,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            size: 512,
            cell_size: 32,
        }
    }
}

impl AppConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads the configuration from [`CONFIG_ENV_VAR`] or [`DEFAULT_CONFIG_FILE`].
    ///
    /// A missing default file is not an error; an explicitly named file must exist.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_or_default() -> Result<Self> {
        let explicit = std::env::var_os(CONFIG_ENV_VAR).map(std::path::PathBuf::from);
        Self::load_from(explicit.as_deref(), Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Loads `explicit` if given, otherwise `default_path` if it is a file, otherwise the
    /// defaults.
    pub fn load_from(explicit: Option<&Path>, default_path: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            log::info!("Loading configuration from {}", path.display());
            return Self::load(path);
        }

        let path = default_path;
        if path.is_file() {
            log::info!("Loading configuration from {}", path.display());
            Self::load(path)
        } else {
            log::warn!(
                "No {} found, using default configuration",
                path.display()
            );
            Ok(Self::default())
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn load_or_default() -> Result<Self> {
        Ok(Self::default())
    }

    /// Serializes the configuration back to pretty-printed TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::InvalidConfig(format!(
                "window size {}x{} must be non-zero",
                self.window.width, self.window.height
            )));
        }
        if self.texture.size == 0 {
            return Err(Error::InvalidConfig(
                "texture.size must be non-zero".to_owned(),
            ));
        }
        if self.texture.size > MAX_TEXTURE_SIZE {
            return Err(Error::InvalidConfig(format!(
                "texture.size {} exceeds {MAX_TEXTURE_SIZE}",
                self.texture.size
            )));
        }
        self.camera.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let config = AppConfig::default();
        let content = config.to_toml_string().unwrap();
        assert_eq!(AppConfig::from_toml_str(&content).unwrap(), config);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = AppConfig::from_toml_str(
            r"
[camera]
damping = 0.5

[texture]
size = 64
",
        )
        .unwrap();
        assert_eq!(config.camera.damping, 0.5);
        assert_eq!(config.camera.sensitivity, 0.005);
        assert_eq!(config.texture.size, 64);
        assert_eq!(config.texture.cell_size, 32);
        assert_eq!(config.window, WindowConfig::default());
    }

    #[test]
    fn empty_document_is_the_default() {
        assert_eq!(AppConfig::from_toml_str("").unwrap(), AppConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let damping = AppConfig::from_toml_str("[camera]\ndamping = 1.5\n");
        assert!(matches!(damping, Err(Error::InvalidConfig(_))));

        let texture = AppConfig::from_toml_str("[texture]\nsize = 0\n");
        assert!(matches!(texture, Err(Error::InvalidConfig(_))));

        let window = AppConfig::from_toml_str("[window]\nwidth = 0\n");
        assert!(window.is_err());
    }

    #[test]
    fn texture_size_is_capped() {
        let at_limit = format!("[texture]\nsize = {MAX_TEXTURE_SIZE}\n");
        assert!(AppConfig::from_toml_str(&at_limit).is_ok());

        let oversized = AppConfig::from_toml_str("[texture]\nsize = 16384\n");
        assert!(
            matches!(oversized, Err(Error::InvalidConfig(message)) if message.contains("16384"))
        );
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let result = AppConfig::from_toml_str("[camera\nsensitivity = ");
        assert!(matches!(result, Err(Error::ConfigParse(_))));

        let result = AppConfig::from_toml_str("[camera]\nsensitivity = \"fast\"\n");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let path = Path::new("definitely/not/here/mip-orbit.toml");
        match AppConfig::load(path) {
            Err(Error::ConfigRead { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected ConfigRead, got {other:?}"),
        }
    }

    #[test]
    fn valid_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.toml");
        std::fs::write(&path, "[texture]\nsize = 128\ncell_size = 16\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.texture, TextureConfig { size: 128, cell_size: 16 });
        assert_eq!(config.camera, CameraSettings::default());
    }

    #[test]
    fn explicit_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join(DEFAULT_CONFIG_FILE);

        let malformed = dir.path().join("malformed.toml");
        std::fs::write(&malformed, "[window\n").unwrap();
        let result = AppConfig::load_from(Some(malformed.as_path()), &fallback);
        assert!(matches!(result, Err(Error::ConfigParse(_))));

        let invalid = dir.path().join("invalid.toml");
        std::fs::write(&invalid, "[camera]\ndamping = 2.0\n").unwrap();
        let result = AppConfig::load_from(Some(invalid.as_path()), &fallback);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let default_path = dir.path().join(DEFAULT_CONFIG_FILE);
        let result = AppConfig::load_from(Some(missing.as_path()), &default_path);
        assert!(matches!(result, Err(Error::ConfigRead { .. })));
    }

    #[test]
    fn explicit_file_takes_precedence_over_the_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let default_path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&default_path, "[window]\ntitle = \"default\"\n").unwrap();
        let explicit = dir.path().join("explicit.toml");
        std::fs::write(&explicit, "[window]\ntitle = \"explicit\"\n").unwrap();

        let config = AppConfig::load_from(Some(explicit.as_path()), &default_path).unwrap();
        assert_eq!(config.window.title, "explicit");
    }

    #[test]
    fn present_default_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let default_path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&default_path, "[camera]\ndamping = 0.75\n").unwrap();

        let config = AppConfig::load_from(None, &default_path).unwrap();
        assert_eq!(config.camera.damping, 0.75);
    }

    #[test]
    fn missing_default_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(None, &dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn invalid_default_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let default_path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&default_path, "[texture]\nsize = 0\n").unwrap();

        let result = AppConfig::load_from(None, &default_path);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
