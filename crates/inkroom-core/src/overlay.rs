//! Transient visuals drawn above the committed elements.
//!
//! Nothing here is synchronized or recorded in history.

use crate::shapes::{Element, SerializableColor};
use kurbo::{Point, Rect};

/// A freehand stroke that has not been committed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokePreview {
    pub points: Vec<Point>,
    pub color: SerializableColor,
    pub width: f64,
}

impl StrokePreview {
    pub fn new(start: Point, color: SerializableColor, width: f64) -> Self {
        Self {
            points: vec![start],
            color,
            width,
        }
    }
}

/// Outline shown while dragging out a shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapePreview {
    /// Dashed box between the two drag points.
    Rectangle { anchor: Point, current: Point },
    /// Dashed circle around the drag box.
    Circle { anchor: Point, current: Point },
    /// Dashed box for a new text area.
    TextArea { anchor: Point, current: Point },
    /// Solid live line in the active style.
    Line {
        start: Point,
        end: Point,
        color: SerializableColor,
        width: f64,
    },
    /// Solid live arrow in the active style.
    Arrow {
        start: Point,
        end: Point,
        color: SerializableColor,
        width: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EraserPreview {
    /// Hover cursor.
    Cursor { center: Point, radius: f64 },
    /// Area being erased.
    Area(Rect),
}

/// An element being edited by a gesture, drawn instead of its committed
/// version.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingCopy {
    pub element: Element,
    /// Draw on top of everything, as it will be once committed.
    pub raised: bool,
}

/// Everything the renderer draws after the element sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub stroke: Option<StrokePreview>,
    pub remote_strokes: Vec<StrokePreview>,
    pub shape: Option<ShapePreview>,
    pub eraser: Option<EraserPreview>,
    pub working: Option<WorkingCopy>,
}

impl Overlay {
    pub fn is_empty(&self) -> bool {
        self.stroke.is_none()
            && self.remote_strokes.is_empty()
            && self.shape.is_none()
            && self.eraser.is_none()
            && self.working.is_none()
    }
}
