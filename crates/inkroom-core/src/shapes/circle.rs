//! Circle shape.

use super::{ElementId, SerializableColor};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// A circle given by its center and radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circle {
    pub id: ElementId,
    /// Center x.
    pub x: f64,
    /// Center y.
    pub y: f64,
    pub radius: f64,
    pub color: SerializableColor,
    pub line_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<SerializableColor>,
}

impl Circle {
    pub fn new(center: Point, radius: f64, color: SerializableColor, line_width: f64) -> Self {
        Self {
            id: ElementId::new(),
            x: center.x,
            y: center.y,
            radius,
            color,
            line_width,
            fill: None,
        }
    }

    /// Circle inscribed around the drag box from `anchor` to `far`: the box
    /// center becomes the center and half the box diagonal the radius.
    pub fn from_drag(anchor: Point, far: Point, color: SerializableColor, line_width: f64) -> Self {
        let radius = (far - anchor).hypot() / 2.0;
        Self::new(anchor.midpoint(far), radius, color, line_width)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_from_drag() {
        let circle = Circle::from_drag(Point::new(0.0, 0.0), Point::new(30.0, 40.0), SerializableColor::black(), 2.0);
        assert!((circle.x - 15.0).abs() < f64::EPSILON);
        assert!((circle.y - 20.0).abs() < f64::EPSILON);
        assert!((circle.radius - 25.0).abs() < f64::EPSILON);
    }
}
