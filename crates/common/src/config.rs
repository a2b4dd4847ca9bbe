use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors from loading sandbox configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Sandbox settings, read from an optional JSON file.
///
/// Every field has a default, so a partial file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Number of swapchain back buffers, and of in-flight frame slots.
    pub buffer_count: u32,
    pub vsync: bool,
    pub shader_dir: PathBuf,
    pub clear_color: [f32; 4],
}

impl SandboxConfig {
    pub const MIN_BUFFERS: u32 = 2;
    pub const MAX_BUFFERS: u32 = 16;

    /// Reads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        tracing::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(Self::MIN_BUFFERS..=Self::MAX_BUFFERS).contains(&self.buffer_count) {
            return Err(ConfigError::Invalid(format!(
                "buffer_count {} outside {}..={}",
                self.buffer_count,
                Self::MIN_BUFFERS,
                Self::MAX_BUFFERS
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            title: "Prism Sandbox".into(),
            width: 1920,
            height: 1080,
            buffer_count: 2,
            vsync: false,
            shader_dir: PathBuf::from("assets/shaders"),
            // cornflower blue
            clear_color: [100.0 / 255.0, 149.0 / 255.0, 237.0 / 255.0, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_is_valid() {
        let config = SandboxConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_count, 2);
        assert!(!config.vsync);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "buffer_count": 3, "title": "test" }}"#).unwrap();

        let config = SandboxConfig::load(file.path()).unwrap();
        assert_eq!(config.buffer_count, 3);
        assert_eq!(config.title, "test");
        assert_eq!(config.width, 1920);
    }

    #[test]
    fn rejects_single_buffer() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "buffer_count": 1 }}"#).unwrap();

        let err = SandboxConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SandboxConfig::load(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            SandboxConfig::load(file.path()),
            Err(ConfigError::Json(_))
        ));
    }
}
