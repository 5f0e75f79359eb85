//! Tool system for the whiteboard.
//!
//! [`ToolManager`] interprets pointer gestures for the active tool. It never
//! touches the document itself: every gesture reports a list of
//! [`ToolAction`]s that the session applies (commits, live previews for peers,
//! stroke announcements, redraw requests).

mod text_edit;

pub use text_edit::{EditTarget, TextEdit, TextFormat};

use crate::config::EngineConfig;
use crate::geometry::{self, HitTestOptions};
use crate::overlay::{EraserPreview, Overlay, ShapePreview, StrokePreview, WorkingCopy};
use crate::shapes::{Circle, Element, ElementId, EraseRect, FontStyle, Path, Rectangle, Segment, SerializableColor, Text};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    #[default]
    Pen,
    Line,
    Arrow,
    Rectangle,
    Circle,
    Text,
    /// Fill a rectangle or circle with the active color.
    Paint,
    Eraser,
    /// Move an element.
    Drag,
}

impl ToolKind {
    pub const ALL: [ToolKind; 9] = [
        ToolKind::Pen,
        ToolKind::Line,
        ToolKind::Arrow,
        ToolKind::Rectangle,
        ToolKind::Circle,
        ToolKind::Text,
        ToolKind::Paint,
        ToolKind::Eraser,
        ToolKind::Drag,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Pen => "pen",
            ToolKind::Line => "line",
            ToolKind::Arrow => "arrow",
            ToolKind::Rectangle => "rectangle",
            ToolKind::Circle => "circle",
            ToolKind::Text => "text",
            ToolKind::Paint => "paint",
            ToolKind::Eraser => "eraser",
            ToolKind::Drag => "drag",
        }
    }
}

/// Outcome of a gesture step.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolAction {
    /// Only the overlay changed.
    Redraw,
    /// A pen stroke started.
    StrokeBegan {
        point: Point,
        color: SerializableColor,
        width: f64,
    },
    /// A pen stroke grew by one segment.
    StrokeExtended { from: Point, to: Point },
    StrokeEnded,
    /// Commit a new element on top of the sequence.
    Add(Element),
    /// Commit a new version of an existing element.
    Replace { element: Element, raise: bool },
    /// Show a working copy to peers without recording history.
    Preview(Element),
}

/// State of a pointer gesture.
#[derive(Debug, Clone, Default)]
enum Gesture {
    #[default]
    Idle,
    Stroke { points: Vec<Point> },
    Shape { tool: ToolKind, anchor: Point, current: Point },
    EraseArea { anchor: Point, current: Point },
    TextBox { anchor: Point, current: Point },
    Drag(DragState),
}

#[derive(Debug, Clone)]
struct DragState {
    /// Pointer position at pointer-down.
    origin: Point,
    /// The element as it was when the drag began.
    original: Element,
    /// `original` moved by the cumulative pointer delta.
    working: Element,
}

/// Manages the current tool and its state.
#[derive(Debug, Clone)]
pub struct ToolManager {
    /// Currently selected tool.
    pub current_tool: ToolKind,
    /// Stroke color for new elements and paint fill color.
    pub color: SerializableColor,
    /// Stroke width for new elements.
    pub width: f64,
    /// Formatting for new text.
    pub text_format: TextFormat,
    gesture: Gesture,
    eraser_cursor: Option<Point>,
    text_edit: Option<TextEdit>,
    hit_options: HitTestOptions,
    eraser_radius: f64,
    quick_text_size: kurbo::Size,
    quick_text_threshold: f64,
    min_font_size: f64,
    font_size_per_width: f64,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl ToolManager {
    /// Create a tool manager with the configured defaults.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            current_tool: config.default_tool,
            color: config.default_color,
            width: config.default_width,
            text_format: TextFormat {
                font_size: config.default_font_size,
                font_family: config.default_font_family.clone(),
                style: FontStyle::default(),
            },
            gesture: Gesture::Idle,
            eraser_cursor: None,
            text_edit: None,
            hit_options: config.hit_test_options(),
            eraser_radius: config.eraser_radius,
            quick_text_size: config.quick_text_size,
            quick_text_threshold: config.quick_text_threshold,
            min_font_size: config.min_font_size,
            font_size_per_width: config.font_size_per_width,
        }
    }

    /// Set the current tool. Any gesture in progress is dropped.
    pub fn set_tool(&mut self, tool: ToolKind) -> Vec<ToolAction> {
        let mut actions = self.cancel();
        self.current_tool = tool;
        if self.eraser_cursor.take().is_some() {
            actions.push(ToolAction::Redraw);
        }
        actions
    }

    /// Check if a pointer gesture is in progress.
    pub fn is_active(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    /// The element being dragged, if any.
    pub fn dragging(&self) -> Option<&ElementId> {
        match &self.gesture {
            Gesture::Drag(drag) => Some(drag.original.id()),
            _ => None,
        }
    }

    /// Begin a gesture at `point`. An open text edit is closed first.
    pub fn pointer_down(&mut self, point: Point, elements: &[Element]) -> Vec<ToolAction> {
        let mut actions = self.finish_text();
        actions.extend(self.cancel());

        match self.current_tool {
            ToolKind::Pen => {
                self.gesture = Gesture::Stroke { points: vec![point] };
                actions.push(ToolAction::StrokeBegan {
                    point,
                    color: self.color,
                    width: self.width,
                });
            }
            tool @ (ToolKind::Line | ToolKind::Arrow | ToolKind::Rectangle | ToolKind::Circle) => {
                self.gesture = Gesture::Shape {
                    tool,
                    anchor: point,
                    current: point,
                };
                actions.push(ToolAction::Redraw);
            }
            ToolKind::Text => {
                self.gesture = Gesture::TextBox {
                    anchor: point,
                    current: point,
                };
                actions.push(ToolAction::Redraw);
            }
            ToolKind::Eraser => {
                self.gesture = Gesture::EraseArea {
                    anchor: point,
                    current: point,
                };
                actions.push(ToolAction::Redraw);
            }
            ToolKind::Paint => {
                let target = geometry::hit_test_matching(elements, point, &self.hit_options, Element::is_fillable)
                    .and_then(|id| elements.iter().find(|e| e.id() == id));
                if let Some(filled) = target.and_then(|e| with_fill(e, self.color)) {
                    actions.push(ToolAction::Add(filled));
                }
            }
            ToolKind::Drag => {
                let target = geometry::hit_test(elements, point, &self.hit_options)
                    .and_then(|id| elements.iter().find(|e| e.id() == id));
                if let Some(element) = target {
                    self.gesture = Gesture::Drag(DragState {
                        origin: point,
                        original: element.clone(),
                        working: element.clone(),
                    });
                    actions.push(ToolAction::Redraw);
                }
            }
        }
        actions
    }

    /// Continue the current gesture, or track the eraser cursor when idle.
    pub fn pointer_move(&mut self, point: Point) -> Vec<ToolAction> {
        let mut actions = Vec::new();
        if self.current_tool == ToolKind::Eraser {
            self.eraser_cursor = Some(point);
            actions.push(ToolAction::Redraw);
        }

        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Stroke { points } => {
                if let Some(&from) = points.last() {
                    points.push(point);
                    actions.push(ToolAction::StrokeExtended { from, to: point });
                }
            }
            Gesture::Shape { current, .. } | Gesture::EraseArea { current, .. } | Gesture::TextBox { current, .. } => {
                *current = point;
                if actions.is_empty() {
                    actions.push(ToolAction::Redraw);
                }
            }
            Gesture::Drag(drag) => {
                drag.working = geometry::translate(&drag.original, point - drag.origin);
                actions.push(ToolAction::Preview(drag.working.clone()));
            }
        }
        actions
    }

    /// Finish the current gesture at `point`.
    pub fn pointer_up(&mut self, point: Point, elements: &[Element]) -> Vec<ToolAction> {
        let mut actions = Vec::new();
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => {}
            Gesture::Stroke { points } => {
                actions.push(ToolAction::StrokeEnded);
                if points.len() > 1 {
                    self.push_new(&mut actions, Path::new(points, self.color, self.width).into());
                } else {
                    actions.push(ToolAction::Redraw);
                }
            }
            Gesture::Shape { tool, anchor, .. } => {
                let element = match tool {
                    ToolKind::Rectangle => Rectangle::from_corners(anchor, point, self.color, self.width).into(),
                    ToolKind::Circle => Circle::from_drag(anchor, point, self.color, self.width).into(),
                    ToolKind::Arrow => Element::Arrow(Segment::new(anchor, point, self.color, self.width)),
                    _ => Element::Line(Segment::new(anchor, point, self.color, self.width)),
                };
                self.push_new(&mut actions, element);
            }
            Gesture::EraseArea { anchor, .. } => {
                self.push_new(&mut actions, EraseRect::new(geometry::normalized_rect(anchor, point)).into());
            }
            Gesture::TextBox { anchor, .. } => {
                actions.extend(self.open_text_box(anchor, point));
            }
            Gesture::Drag(mut drag) => {
                drag.working = geometry::translate(&drag.original, point - drag.origin);
                let on_top = elements.last().is_some_and(|e| e.same_id(&drag.original));
                if drag.working != drag.original || !on_top {
                    actions.push(ToolAction::Replace {
                        element: drag.working,
                        raise: true,
                    });
                } else {
                    actions.push(ToolAction::Redraw);
                }
            }
        }
        actions
    }

    /// The pointer left the surface: finish like pointer-up and hide the
    /// eraser cursor.
    pub fn pointer_leave(&mut self, point: Point, elements: &[Element]) -> Vec<ToolAction> {
        let mut actions = self.pointer_up(point, elements);
        if self.eraser_cursor.take().is_some() {
            actions.push(ToolAction::Redraw);
        }
        actions
    }

    /// Abort the current gesture without committing.
    pub fn cancel(&mut self) -> Vec<ToolAction> {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => Vec::new(),
            Gesture::Stroke { .. } => vec![ToolAction::StrokeEnded, ToolAction::Redraw],
            Gesture::Drag(drag) => {
                // Peers saw live positions; put them back
                if drag.working != drag.original {
                    vec![ToolAction::Preview(drag.original)]
                } else {
                    vec![ToolAction::Redraw]
                }
            }
            _ => vec![ToolAction::Redraw],
        }
    }

    fn push_new(&self, actions: &mut Vec<ToolAction>, element: Element) {
        if geometry::is_well_formed(&element) {
            actions.push(ToolAction::Add(element));
        } else {
            log::warn!("Discarding malformed {} from {} tool", element.kind(), self.current_tool.name());
            actions.push(ToolAction::Redraw);
        }
    }

    fn open_text_box(&mut self, anchor: Point, far: Point) -> Vec<ToolAction> {
        let area = geometry::normalized_rect(anchor, far);
        if area.width() < self.quick_text_threshold && area.height() < self.quick_text_threshold {
            let mut text = Text::boxed(Rect::from_origin_size(anchor, self.quick_text_size), "", self.color);
            self.text_format.apply_to(&mut text);
            self.text_edit = Some(TextEdit::pending(text));
            return vec![ToolAction::Redraw];
        }

        let mut text = Text::boxed(area, "", self.color);
        self.text_format.apply_to(&mut text);
        text.font_size = (self.width * self.font_size_per_width).max(self.min_font_size);
        if !geometry::is_well_formed(&Element::Text(text.clone())) {
            log::warn!("Discarding malformed text box");
            return vec![ToolAction::Redraw];
        }
        self.text_format = TextFormat::from_text(&text);
        self.text_edit = Some(TextEdit::existing(text.clone()));
        vec![ToolAction::Add(Element::Text(text))]
    }

    // --- Text editing ---

    pub fn text_edit(&self) -> Option<&TextEdit> {
        self.text_edit.as_ref()
    }

    pub fn is_editing_text(&self) -> bool {
        self.text_edit.is_some()
    }

    /// Start editing a text element that is already in the document.
    pub fn edit_text(&mut self, text: Text) -> Vec<ToolAction> {
        let mut actions = self.finish_text();
        self.text_format = TextFormat::from_text(&text);
        self.text_edit = Some(TextEdit::existing(text));
        actions.push(ToolAction::Redraw);
        actions
    }

    /// Replace the text being edited.
    pub fn set_text(&mut self, text: &str) -> Vec<ToolAction> {
        self.text_edit
            .as_mut()
            .map(|edit| edit.set_text(text))
            .unwrap_or_default()
    }

    /// Change the text formatting. Applies to the open edit, if any, and to
    /// text created afterwards.
    pub fn set_text_format(&mut self, format: TextFormat) -> Vec<ToolAction> {
        let actions = self
            .text_edit
            .as_mut()
            .map(|edit| edit.set_format(&format))
            .unwrap_or_default();
        self.text_format = format;
        actions
    }

    /// Close the edit session and commit what was typed ("Done").
    pub fn finish_text(&mut self) -> Vec<ToolAction> {
        self.text_edit.take().map(TextEdit::finish).unwrap_or_default()
    }

    /// Close the edit session from Escape.
    pub fn cancel_text(&mut self) -> Vec<ToolAction> {
        self.text_edit.take().map(TextEdit::cancel).unwrap_or_default()
    }

    /// Close the edit session without committing anything.
    pub fn discard_text(&mut self) -> bool {
        self.text_edit.take().is_some()
    }

    /// Drop a text edit whose element no longer exists.
    pub fn forget_missing_text(&mut self, elements: &[Element]) {
        let stale = self
            .text_edit
            .as_ref()
            .is_some_and(|edit| !edit.is_pending() && !elements.iter().any(|e| e.id() == edit.id()));
        if stale {
            log::debug!("Closing text edit for an element removed remotely");
            self.text_edit = None;
        }
    }

    /// Transient visuals for the current state.
    pub fn overlay(&self) -> Overlay {
        let mut overlay = Overlay::default();

        match &self.gesture {
            Gesture::Idle => {}
            Gesture::Stroke { points } => {
                overlay.stroke = Some(StrokePreview {
                    points: points.clone(),
                    color: self.color,
                    width: self.width,
                });
            }
            Gesture::Shape { tool, anchor, current } => {
                let (anchor, current) = (*anchor, *current);
                overlay.shape = Some(match tool {
                    ToolKind::Rectangle => ShapePreview::Rectangle { anchor, current },
                    ToolKind::Circle => ShapePreview::Circle { anchor, current },
                    ToolKind::Arrow => ShapePreview::Arrow {
                        start: anchor,
                        end: current,
                        color: self.color,
                        width: self.width,
                    },
                    _ => ShapePreview::Line {
                        start: anchor,
                        end: current,
                        color: self.color,
                        width: self.width,
                    },
                });
            }
            Gesture::TextBox { anchor, current } => {
                overlay.shape = Some(ShapePreview::TextArea {
                    anchor: *anchor,
                    current: *current,
                });
            }
            Gesture::EraseArea { anchor, current } => {
                overlay.eraser = Some(EraserPreview::Area(geometry::normalized_rect(*anchor, *current)));
            }
            Gesture::Drag(drag) => {
                overlay.working = Some(WorkingCopy {
                    element: drag.working.clone(),
                    raised: true,
                });
            }
        }

        if overlay.eraser.is_none() && self.current_tool == ToolKind::Eraser {
            overlay.eraser = self.eraser_cursor.map(|center| EraserPreview::Cursor {
                center,
                radius: self.eraser_radius,
            });
        }

        if overlay.working.is_none() {
            overlay.working = self.text_edit.as_ref().map(|edit| WorkingCopy {
                element: Element::Text(edit.working().clone()),
                raised: false,
            });
        }

        overlay
    }
}

/// A filled duplicate of a rectangle or circle under a fresh id.
fn with_fill(element: &Element, color: SerializableColor) -> Option<Element> {
    let mut filled = element.clone();
    match &mut filled {
        Element::Rectangle(rect) => rect.fill = Some(color),
        Element::Circle(circle) => circle.fill = Some(color),
        _ => return None,
    }
    filled.set_id(ElementId::new());
    Some(filled)
}
