//! Rectangle shape.

use super::{ElementId, SerializableColor};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle with an optional fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rectangle {
    pub id: ElementId,
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: SerializableColor,
    pub line_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<SerializableColor>,
}

impl Rectangle {
    /// Create a new rectangle.
    pub fn new(origin: Point, width: f64, height: f64, color: SerializableColor, line_width: f64) -> Self {
        Self {
            id: ElementId::new(),
            x: origin.x,
            y: origin.y,
            width,
            height,
            color,
            line_width,
            fill: None,
        }
    }

    /// Create a rectangle from two opposite corners.
    pub fn from_corners(p1: Point, p2: Point, color: SerializableColor, line_width: f64) -> Self {
        let rect = Rect::from_points(p1, p2);
        Self::new(rect.origin(), rect.width(), rect.height(), color, line_width)
    }

    /// The rectangle as a kurbo `Rect`, normalized so that negative extents
    /// written by other clients still describe a proper box.
    pub fn as_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height).abs()
    }
}
