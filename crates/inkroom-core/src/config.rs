//! Engine configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! overrides:
//!
//! ```json
//! { "eraserRadius": 24, "historyLimit": 100, "defaultColor": "#1e40af" }
//! ```

use crate::geometry::{HIT_TOLERANCE, HitTestOptions, TEXT_FALLBACK_SIZE};
use crate::shapes::{DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, SerializableColor};
use crate::tools::ToolKind;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tunables for the drawing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Pointer distance within which strokes and lines are hit.
    pub hit_tolerance: f64,
    /// Hit box for text elements without a wrapping box.
    pub text_fallback_size: Size,
    /// Radius of the eraser cursor preview.
    pub eraser_radius: f64,
    /// Box given to text created by a click without dragging.
    pub quick_text_size: Size,
    /// Drags smaller than this on both axes count as a click for the text tool.
    pub quick_text_threshold: f64,
    /// Lower bound for the font size derived from the stroke width.
    pub min_font_size: f64,
    /// Font size per unit of stroke width for new text boxes.
    pub font_size_per_width: f64,
    /// Maximum undo depth. `None` keeps everything.
    pub history_limit: Option<usize>,
    pub default_tool: ToolKind,
    pub default_color: SerializableColor,
    pub default_width: f64,
    pub default_font_size: f64,
    pub default_font_family: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hit_tolerance: HIT_TOLERANCE,
            text_fallback_size: TEXT_FALLBACK_SIZE,
            eraser_radius: 18.0,
            quick_text_size: Size::new(100.0, 50.0),
            quick_text_threshold: 3.0,
            min_font_size: 14.0,
            font_size_per_width: 5.0,
            history_limit: None,
            default_tool: ToolKind::Pen,
            default_color: SerializableColor::black(),
            default_width: 3.0,
            default_font_size: DEFAULT_FONT_SIZE,
            default_font_family: DEFAULT_FONT_FAMILY.to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Reject values that would make geometry meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("hitTolerance", self.hit_tolerance),
            ("eraserRadius", self.eraser_radius),
            ("defaultWidth", self.default_width),
            ("defaultFontSize", self.default_font_size),
            ("minFontSize", self.min_font_size),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("expected a positive number, got {value}"),
                });
            }
        }
        if !self.quick_text_threshold.is_finite() || self.quick_text_threshold < 0.0 {
            return Err(ConfigError::Invalid {
                field: "quickTextThreshold",
                reason: format!("expected a non-negative number, got {}", self.quick_text_threshold),
            });
        }
        if self.history_limit == Some(0) {
            return Err(ConfigError::Invalid {
                field: "historyLimit",
                reason: "must be at least 1 or omitted".to_string(),
            });
        }
        Ok(())
    }

    pub fn hit_test_options(&self) -> HitTestOptions {
        HitTestOptions {
            tolerance: self.hit_tolerance,
            text_fallback: self.text_fallback_size,
        }
    }
}
