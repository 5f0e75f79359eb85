//! Text elements.

use super::{ElementId, SerializableColor};
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Default font size in pixels.
pub const DEFAULT_FONT_SIZE: f64 = 18.0;

/// Default CSS font family list.
pub const DEFAULT_FONT_FAMILY: &str = "Arial, sans-serif";

/// Style flags applied to a whole text element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FontStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

/// A text element. When both `width` and `height` are set the text is
/// word-wrapped inside that box; otherwise it is drawn on a single line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Text {
    pub id: ElementId,
    /// Left edge of the first line.
    pub x: f64,
    /// Top edge of the first line.
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default)]
    pub text: String,
    #[serde(default = "SerializableColor::black")]
    pub color: SerializableColor,
    /// Font size in pixels. Accepts `18` or `"18px"` on input.
    #[serde(default = "default_font_size", deserialize_with = "font_size::deserialize")]
    pub font_size: f64,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default)]
    pub font_style: FontStyle,
}

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

fn default_font_family() -> String {
    DEFAULT_FONT_FAMILY.to_string()
}

impl Text {
    /// Create an unboxed text element at a position.
    pub fn new(position: Point, text: impl Into<String>, color: SerializableColor) -> Self {
        Self {
            id: ElementId::new(),
            x: position.x,
            y: position.y,
            width: None,
            height: None,
            text: text.into(),
            color,
            font_size: DEFAULT_FONT_SIZE,
            font_family: default_font_family(),
            font_style: FontStyle::default(),
        }
    }

    /// Create a text element that wraps inside `rect`.
    pub fn boxed(rect: Rect, text: impl Into<String>, color: SerializableColor) -> Self {
        let rect = rect.abs();
        Self {
            width: Some(rect.width()),
            height: Some(rect.height()),
            ..Self::new(rect.origin(), text, color)
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// The wrapping box, if both dimensions are present and non-zero.
    pub fn box_size(&self) -> Option<Size> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w != 0.0 && h != 0.0 => Some(Size::new(w, h)),
            _ => None,
        }
    }

    /// Line advance used when laying out wrapped text.
    pub fn line_height(&self) -> f64 {
        self.font_size + 2.0
    }
}

mod font_size {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawSize {
            Number(f64),
            Css(String),
        }

        match RawSize::deserialize(deserializer)? {
            RawSize::Number(size) => Ok(size),
            RawSize::Css(css) => {
                let trimmed = css.trim();
                trimmed
                    .strip_suffix("px")
                    .unwrap_or(trimmed)
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| D::Error::custom(format!("invalid font size: {css}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_font_size_accepted() {
        let json = r##"{"id":"t1","x":5,"y":6,"text":"hi","color":"#333","fontSize":"24px","fontFamily":"Georgia","fontStyle":{"bold":true}}"##;
        let text: Text = serde_json::from_str(json).unwrap();
        assert!((text.font_size - 24.0).abs() < f64::EPSILON);
        assert!(text.font_style.bold);
        assert!(!text.font_style.underline);
        assert!(text.box_size().is_none());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let text: Text = serde_json::from_str(r#"{"id":"t2","x":0,"y":0}"#).unwrap();
        assert_eq!(text.font_family, DEFAULT_FONT_FAMILY);
        assert!((text.font_size - DEFAULT_FONT_SIZE).abs() < f64::EPSILON);
        assert_eq!(text.color, SerializableColor::black());
    }

    #[test]
    fn test_boxed_text() {
        let text = Text::boxed(Rect::new(40.0, 30.0, 10.0, 10.0), "", SerializableColor::black());
        assert!((text.x - 10.0).abs() < f64::EPSILON);
        let size = text.box_size().unwrap();
        assert!((size.width - 30.0).abs() < f64::EPSILON);
        assert!((size.height - 20.0).abs() < f64::EPSILON);
        assert!((text.line_height() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_font_size_serializes_as_number() {
        let text = Text::new(Point::ZERO, "a", SerializableColor::black());
        let json = serde_json::to_string(&text).unwrap();
        assert!(json.contains(r#""fontSize":18.0"#));
        assert!(json.contains(r#""fontStyle":{"bold":false,"italic":false,"underline":false}"#));
    }
}
