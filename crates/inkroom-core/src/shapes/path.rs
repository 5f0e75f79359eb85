//! Freehand pen strokes.

use super::{ElementId, SerializableColor};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// A freehand polyline in drawing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub id: ElementId,
    pub points: Vec<Point>,
    pub color: SerializableColor,
    /// Stroke width.
    pub width: f64,
}

impl Path {
    pub fn new(points: Vec<Point>, color: SerializableColor, width: f64) -> Self {
        Self {
            id: ElementId::new(),
            points,
            color,
            width,
        }
    }

    /// A path needs two points to produce a visible stroke.
    pub fn is_drawable(&self) -> bool {
        self.points.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_serialize_as_objects() {
        let path = Path::new(
            vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)],
            SerializableColor::black(),
            3.0,
        );
        let json = serde_json::to_string(&path).unwrap();
        assert!(json.contains(r#""points":[{"x":1.0,"y":2.0},{"x":3.0,"y":4.0}]"#));
        assert!(path.is_drawable());
    }
}
