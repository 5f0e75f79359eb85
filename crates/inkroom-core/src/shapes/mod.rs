//! Drawing primitives shared by every client in a room.
//!
//! Elements are plain data. Geometry, hit testing and rendering live in
//! [`crate::geometry`] and the render crate, both of which dispatch with an
//! exhaustive `match` over [`Element`].

mod circle;
mod erase;
mod line;
mod path;
mod rectangle;
mod text;

pub use circle::Circle;
pub use erase::EraseRect;
pub use line::Segment;
pub use path::Path;
pub use rectangle::Rectangle;
pub use text::{DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, FontStyle, Text};

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Color parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("Unsupported color syntax: {0}")]
    Unsupported(String),
    #[error("Invalid hex digits in color: {0}")]
    InvalidHex(String),
}

/// Serializable color representation (RGBA8).
///
/// On the wire a color is a CSS string: `#rgb`, `#rgba`, `#rrggbb`,
/// `#rrggbbaa` or `transparent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    pub const fn white() -> Self {
        Self::rgb(255, 255, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse a CSS color string.
    pub fn parse(input: &str) -> Result<Self, ColorError> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("transparent") {
            return Ok(Self::transparent());
        }

        let Some(hex) = input.strip_prefix('#') else {
            return Err(ColorError::Unsupported(input.to_string()));
        };
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::InvalidHex(input.to_string()));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ColorError::InvalidHex(input.to_string()))
        };
        // #rgb digits expand by repetition (0xf -> 0xff)
        let short = |i: usize| channel(i..i + 1).map(|v| v * 17);

        match hex.len() {
            3 => Ok(Self::rgb(short(0)?, short(1)?, short(2)?)),
            4 => Ok(Self::new(short(0)?, short(1)?, short(2)?, short(3)?)),
            6 => Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, channel(6..8)?)),
            _ => Err(ColorError::Unsupported(input.to_string())),
        }
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Default for SerializableColor {
    fn default() -> Self {
        Self::black()
    }
}

impl TryFrom<String> for SerializableColor {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SerializableColor> for String {
    fn from(color: SerializableColor) -> Self {
        color.to_hex()
    }
}

impl fmt::Display for SerializableColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Unique identifier for elements.
///
/// New ids are UUID v4 strings. Numeric ids written by older clients are
/// accepted and kept as their decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ElementId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ElementId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Number(number) => Self(number.to_string()),
        })
    }
}

/// A drawing element. The JSON tag field is `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Element {
    Path(Path),
    Rectangle(Rectangle),
    Circle(Circle),
    Line(Segment),
    Arrow(Segment),
    Text(Text),
    EraseRect(EraseRect),
}

impl Element {
    pub fn id(&self) -> &ElementId {
        match self {
            Element::Path(e) => &e.id,
            Element::Rectangle(e) => &e.id,
            Element::Circle(e) => &e.id,
            Element::Line(e) | Element::Arrow(e) => &e.id,
            Element::Text(e) => &e.id,
            Element::EraseRect(e) => &e.id,
        }
    }

    pub fn set_id(&mut self, id: ElementId) {
        match self {
            Element::Path(e) => e.id = id,
            Element::Rectangle(e) => e.id = id,
            Element::Circle(e) => e.id = id,
            Element::Line(e) | Element::Arrow(e) => e.id = id,
            Element::Text(e) => e.id = id,
            Element::EraseRect(e) => e.id = id,
        }
    }

    /// Identity comparison, as opposed to the structural `==`.
    pub fn same_id(&self, other: &Element) -> bool {
        self.id() == other.id()
    }

    /// The wire tag of this element.
    pub fn kind(&self) -> &'static str {
        match self {
            Element::Path(_) => "path",
            Element::Rectangle(_) => "rectangle",
            Element::Circle(_) => "circle",
            Element::Line(_) => "line",
            Element::Arrow(_) => "arrow",
            Element::Text(_) => "text",
            Element::EraseRect(_) => "erase-rect",
        }
    }

    /// Whether the paint tool can fill this element.
    pub fn is_fillable(&self) -> bool {
        matches!(self, Element::Rectangle(_) | Element::Circle(_))
    }

    /// Fill color, for elements that carry one.
    pub fn fill(&self) -> Option<SerializableColor> {
        match self {
            Element::Rectangle(e) => e.fill,
            Element::Circle(e) => e.fill,
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<Path> for Element {
    fn from(value: Path) -> Self {
        Element::Path(value)
    }
}

impl From<Rectangle> for Element {
    fn from(value: Rectangle) -> Self {
        Element::Rectangle(value)
    }
}

impl From<Circle> for Element {
    fn from(value: Circle) -> Self {
        Element::Circle(value)
    }
}

impl From<Text> for Element {
    fn from(value: Text) -> Self {
        Element::Text(value)
    }
}

impl From<EraseRect> for Element {
    fn from(value: EraseRect) -> Self {
        Element::EraseRect(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn test_color_parse() {
        assert_eq!(SerializableColor::parse("#ff0000").unwrap(), SerializableColor::rgb(255, 0, 0));
        assert_eq!(SerializableColor::parse("#0f0").unwrap(), SerializableColor::rgb(0, 255, 0));
        assert_eq!(
            SerializableColor::parse("#00000080").unwrap(),
            SerializableColor::new(0, 0, 0, 128)
        );
        assert_eq!(SerializableColor::parse("transparent").unwrap(), SerializableColor::transparent());
        assert!(matches!(SerializableColor::parse("red"), Err(ColorError::Unsupported(_))));
        assert!(matches!(SerializableColor::parse("#zzzzzz"), Err(ColorError::InvalidHex(_))));
    }

    #[test]
    fn test_color_hex_format() {
        assert_eq!(SerializableColor::rgb(255, 128, 0).to_hex(), "#ff8000");
        assert_eq!(SerializableColor::new(1, 2, 3, 4).to_hex(), "#01020304");
    }

    #[test]
    fn test_element_tags() {
        let rect = Element::from(Rectangle::new(Point::new(0.0, 0.0), 10.0, 10.0, SerializableColor::black(), 2.0));
        let json = rect.to_json().unwrap();
        assert!(json.contains(r#""type":"rectangle""#));
        assert!(json.contains(r#""lineWidth":2.0"#));

        let erase = Element::from(EraseRect::new(kurbo::Rect::new(0.0, 0.0, 5.0, 5.0)));
        assert_eq!(erase.kind(), "erase-rect");
        assert!(erase.to_json().unwrap().contains(r#""type":"erase-rect""#));
    }

    #[test]
    fn test_parse_wire_element() {
        let json = r##"{"id":1712345678901.25,"type":"line","x1":0,"y1":0,"x2":100,"y2":0,"color":"#000000","width":3}"##;
        let element = Element::from_json(json).unwrap();
        assert_eq!(element.id().as_str(), "1712345678901.25");
        match element {
            Element::Line(line) => {
                assert!((line.x2 - 100.0).abs() < f64::EPSILON);
                assert!((line.width - 3.0).abs() < f64::EPSILON);
            }
            other => panic!("Expected line, got {}", other.kind()),
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let json = r##"{"id":"a","type":"hexagon","x":0,"y":0}"##;
        assert!(Element::from_json(json).is_err());
    }

    #[test]
    fn test_same_id_vs_equality() {
        let a = Element::from(Rectangle::new(Point::new(0.0, 0.0), 10.0, 10.0, SerializableColor::black(), 2.0));
        let mut b = a.clone();
        if let Element::Rectangle(rect) = &mut b {
            rect.x = 50.0;
        }
        assert!(a.same_id(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_fillable() {
        let circle = Element::from(Circle::new(Point::new(0.0, 0.0), 5.0, SerializableColor::black(), 1.0));
        let path = Element::from(Path::new(vec![Point::ZERO], SerializableColor::black(), 1.0));
        assert!(circle.is_fillable());
        assert!(!path.is_fillable());
    }
}
