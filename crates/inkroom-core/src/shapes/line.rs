//! Straight segments, used by both the line and the arrow tools.

use super::{ElementId, SerializableColor};
use kurbo::{Line, Point};
use serde::{Deserialize, Serialize};

/// A straight segment from `(x1, y1)` to `(x2, y2)`.
///
/// Arrows share this layout; the head is drawn at the `(x2, y2)` end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: ElementId,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub color: SerializableColor,
    /// Stroke width.
    pub width: f64,
}

impl Segment {
    pub fn new(start: Point, end: Point, color: SerializableColor, width: f64) -> Self {
        Self {
            id: ElementId::new(),
            x1: start.x,
            y1: start.y,
            x2: end.x,
            y2: end.y,
            color,
            width,
        }
    }

    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    pub fn as_line(&self) -> Line {
        Line::new(self.start(), self.end())
    }
}
