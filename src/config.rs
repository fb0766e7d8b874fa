//! Configuration for termview.
//!
//! Settings are read from `~/.termview/config.toml`. Every field is
//! optional; a missing or unreadable file yields the defaults.
//!
//! ```toml
//! # Allow editing the buffer in selection mode
//! editable = false
//!
//! # Leave the remainder of the container below the last whole line unused
//! use_vpad = true
//!
//! # trace, debug, info, warn, error
//! log_level = "info"
//!
//! [font]
//! line_height_px = 16
//! char_width_px = 8
//!
//! [margins]
//! left_px = 0
//! right_px = 0
//!
//! [demo]
//! rows = 12
//! columns = 60
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, ViewerError};

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub editable: bool,
    pub use_vpad: bool,
    pub log_level: String,
    pub font: FontConfig,
    pub margins: MarginConfig,
    pub demo: DemoConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            editable: false,
            use_vpad: true,
            log_level: "info".to_string(),
            font: FontConfig::default(),
            margins: MarginConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

/// Font metrics used when no renderer measures them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub line_height_px: usize,
    pub char_width_px: usize,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            line_height_px: 16,
            char_width_px: 8,
        }
    }
}

/// Horizontal margins around the text area
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginConfig {
    pub left_px: usize,
    pub right_px: usize,
}

/// Settings for the demo binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub rows: usize,
    pub columns: usize,
    /// Container size; zero means derive it from rows and columns
    pub container_width_px: usize,
    pub container_height_px: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            rows: 12,
            columns: 60,
            container_width_px: 0,
            container_height_px: 0,
        }
    }
}

impl ViewerConfig {
    /// Load configuration from the default location
    pub fn load() -> Self {
        match Self::get_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Self::default(),
        }
    }

    /// Load configuration from `path`, falling back to the defaults
    pub fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                return Self::default();
            }
        };
        Self::parse(&content).unwrap_or_else(|e| {
            warn!("{}", e);
            Self::default()
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ViewerError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::get_config_path()
            .ok_or_else(|| ViewerError::Config("Could not determine config path".to_string()))?;
        let content = toml::to_string_pretty(self)
            .map_err(|e| ViewerError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(&path, content)
            .map_err(|e| ViewerError::Config(format!("Failed to write config: {}", e)))
    }

    /// Directory holding the config file and the log
    pub fn config_dir() -> Option<PathBuf> {
        let dir = home_dir()?.join(".termview");
        if !dir.exists() {
            let _ = fs::create_dir_all(&dir);
        }
        Some(dir)
    }

    fn get_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Demo container size in pixels
    pub fn container_size(&self) -> (usize, usize) {
        let width = match self.demo.container_width_px {
            0 => self.demo.columns * self.font.char_width_px + self.margins.left_px + self.margins.right_px,
            w => w,
        };
        let height = match self.demo.container_height_px {
            0 => self.demo.rows * self.font.line_height_px,
            h => h,
        };
        (width, height)
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}
