// ABOUTME: Application configuration handling.
// ABOUTME: Loads and saves layout, histogram and ratio policy from TOML config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How the pad grid grows as pads are added to a canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GridFlow {
    /// `ceil(sqrt(k))` columns, as many rows as needed - default
    #[default]
    Square,
    /// All pads side by side in one row
    Row,
    /// All pads stacked in one column
    Column,
}

impl GridFlow {
    pub fn label(&self) -> &'static str {
        match self {
            GridFlow::Square => "square",
            GridFlow::Row => "row",
            GridFlow::Column => "column",
        }
    }
}

/// Which of the two most recent histograms ends up in the numerator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RatioOrientation {
    /// latest / previous - default
    #[default]
    LatestOverPrevious,
    /// previous / latest
    PreviousOverLatest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Grid re-flow policy for pads on one canvas
    pub grid_flow: GridFlow,

    /// Text canvas dimensions in characters
    pub width: usize,
    pub height: usize,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            grid_flow: GridFlow::Square,
            width: 100,
            height: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramSettings {
    /// Bin count when `draw` gets no explicit binning
    pub default_bins: usize,

    /// Name for new histograms, `{0}` becomes a unique number
    pub name_pattern: String,

    /// Name for ratio histograms
    pub ratio_pattern: String,
}

impl Default for HistogramSettings {
    fn default() -> Self {
        Self {
            default_bins: 40,
            name_pattern: "myHist_{0}".to_string(),
            ratio_pattern: "ratio_{0}".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatioSettings {
    pub orientation: RatioOrientation,

    /// Weight both inputs to unit area before dividing
    pub normalised: bool,
}

impl Default for RatioSettings {
    fn default() -> Self {
        Self {
            orientation: RatioOrientation::LatestOverPrevious,
            normalised: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperSettings {
    /// File whose definitions are imported into the shell at startup
    pub file_name: String,

    /// Extra directories searched for the helper file after `LOOKAT_PATH`
    pub search_path: Vec<PathBuf>,
}

impl Default for HelperSettings {
    fn default() -> Self {
        Self {
            file_name: "lookat_helper.lk".to_string(),
            search_path: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellSettings {
    pub prompt: String,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            prompt: "lookat> ".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutSettings,
    pub histogram: HistogramSettings,
    pub ratio: RatioSettings,
    pub helper: HelperSettings,
    pub shell: ShellSettings,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

impl Config {
    /// Get the default config file path (~/.config/lookat/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lookat").join("config.toml"))
    }

    /// Load config from a path
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from default path, or return default config if not found
    pub fn load_or_default() -> Self {
        Self::default_path()
            .and_then(|path| Self::load(&path).ok())
            .unwrap_or_default()
    }

    /// Save config to a path
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
