//! Erase rectangles.

use super::ElementId;
use kurbo::Rect;
use serde::{Deserialize, Serialize};

/// A rectangle that clears everything drawn beneath it.
///
/// Erasing never removes elements from the document; later elements are
/// still drawn over the cleared area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraseRect {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl EraseRect {
    /// Create an erase rectangle from any rect, normalizing its extents.
    pub fn new(rect: Rect) -> Self {
        let rect = rect.abs();
        Self {
            id: ElementId::new(),
            x: rect.x0,
            y: rect.y0,
            width: rect.width(),
            height: rect.height(),
        }
    }

    pub fn as_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height).abs()
    }
}
