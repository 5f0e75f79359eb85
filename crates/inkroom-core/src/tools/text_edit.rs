//! Text editing sessions.
//!
//! A session keeps a working copy of the text element. Keystrokes and
//! formatting changes update only the working copy; closing the session
//! yields at most one commit.

use super::ToolAction;
use crate::shapes::{Element, ElementId, FontStyle, Text};

/// Formatting applied to new and edited text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFormat {
    pub font_size: f64,
    pub font_family: String,
    pub style: FontStyle,
}

impl TextFormat {
    pub(crate) fn from_text(text: &Text) -> Self {
        Self {
            font_size: text.font_size,
            font_family: text.font_family.clone(),
            style: text.font_style,
        }
    }

    pub(crate) fn apply_to(&self, text: &mut Text) {
        text.font_size = self.font_size;
        text.font_family.clone_from(&self.font_family);
        text.font_style = self.style;
    }
}

/// What an edit session will commit into.
#[derive(Debug, Clone, PartialEq)]
pub enum EditTarget {
    /// A text element that is already in the document.
    Existing { original: Text },
    /// Quick text from a click; only added if it ends up non-blank.
    Pending,
}

/// An open text editing session.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEdit {
    target: EditTarget,
    working: Text,
}

impl TextEdit {
    pub(crate) fn existing(text: Text) -> Self {
        Self {
            working: text.clone(),
            target: EditTarget::Existing { original: text },
        }
    }

    pub(crate) fn pending(text: Text) -> Self {
        Self {
            target: EditTarget::Pending,
            working: text,
        }
    }

    pub fn target(&self) -> &EditTarget {
        &self.target
    }

    pub fn id(&self) -> &ElementId {
        &self.working.id
    }

    /// The text as currently typed.
    pub fn working(&self) -> &Text {
        &self.working
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.target, EditTarget::Pending)
    }

    /// Replace the buffered text. Existing elements are shared live with
    /// peers; pending quick text stays local until committed.
    pub(crate) fn set_text(&mut self, text: &str) -> Vec<ToolAction> {
        if self.working.text == text {
            return Vec::new();
        }
        self.working.text = text.to_string();
        self.live_update()
    }

    pub(crate) fn set_format(&mut self, format: &TextFormat) -> Vec<ToolAction> {
        format.apply_to(&mut self.working);
        self.live_update()
    }

    fn live_update(&self) -> Vec<ToolAction> {
        match self.target {
            EditTarget::Existing { .. } => vec![ToolAction::Preview(Element::Text(self.working.clone()))],
            EditTarget::Pending => vec![ToolAction::Redraw],
        }
    }

    /// Close the session, keeping what was typed.
    pub(crate) fn finish(self) -> Vec<ToolAction> {
        match self.target {
            EditTarget::Existing { original } if original != self.working => vec![ToolAction::Replace {
                element: Element::Text(self.working),
                raise: false,
            }],
            EditTarget::Existing { .. } => vec![ToolAction::Redraw],
            EditTarget::Pending if !self.working.text.trim().is_empty() => {
                vec![ToolAction::Add(Element::Text(self.working))]
            }
            EditTarget::Pending => vec![ToolAction::Redraw],
        }
    }

    /// Close the session from Escape. Typed text on existing elements has
    /// already been shown to peers and is kept; pending quick text is dropped.
    pub(crate) fn cancel(self) -> Vec<ToolAction> {
        if self.is_pending() {
            vec![ToolAction::Redraw]
        } else {
            self.finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::SerializableColor;
    use kurbo::{Point, Rect};

    fn boxed() -> Text {
        Text::boxed(Rect::new(0.0, 0.0, 100.0, 40.0), "", SerializableColor::black())
    }

    #[test]
    fn test_unchanged_existing_commits_nothing() {
        let edit = TextEdit::existing(boxed());
        assert_eq!(edit.finish(), vec![ToolAction::Redraw]);
    }

    #[test]
    fn test_existing_edit_commits_once() {
        let mut edit = TextEdit::existing(boxed());
        let actions = edit.set_text("h");
        assert!(matches!(actions.as_slice(), [ToolAction::Preview(Element::Text(t))] if t.text == "h"));
        edit.set_text("hi");

        let actions = edit.finish();
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            ToolAction::Replace { element: Element::Text(text), raise } => {
                assert_eq!(text.text, "hi");
                assert!(!raise);
            }
            other => panic!("Expected replace, got {other:?}"),
        }
    }

    #[test]
    fn test_pending_blank_is_dropped() {
        let mut edit = TextEdit::pending(Text::new(Point::ZERO, "", SerializableColor::black()));
        edit.set_text("   ");
        assert_eq!(edit.finish(), vec![ToolAction::Redraw]);
    }

    #[test]
    fn test_pending_cancel_discards() {
        let mut edit = TextEdit::pending(Text::new(Point::ZERO, "", SerializableColor::black()));
        edit.set_text("note");
        assert_eq!(edit.cancel(), vec![ToolAction::Redraw]);
    }

    #[test]
    fn test_format_change() {
        let mut edit = TextEdit::existing(boxed());
        let format = TextFormat {
            font_size: 32.0,
            font_family: "Georgia".to_string(),
            style: FontStyle {
                bold: true,
                ..FontStyle::default()
            },
        };
        edit.set_format(&format);
        assert!((edit.working().font_size - 32.0).abs() < f64::EPSILON);
        assert!(edit.working().font_style.bold);
        assert!(matches!(edit.finish().as_slice(), [ToolAction::Replace { .. }]));
    }
}
