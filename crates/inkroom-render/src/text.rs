//! Text layout: greedy word wrap inside a text box.

use crate::fonts::TextFace;
use inkroom_core::shapes::Text;
use kurbo::Point;

/// Offset of the underline above the bottom of its line.
const UNDERLINE_INSET: f64 = 2.0;

/// One laid-out line.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    /// Top-left corner of the line.
    pub origin: Point,
    pub width: f64,
}

/// Lines of a text element ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<TextLine>,
    pub line_height: f64,
}

impl TextLayout {
    /// Lay out `text`, wrapping to its box width when it has a box.
    pub fn new(text: &Text, face: &TextFace) -> Self {
        let line_height = text.line_height();
        let max_width = text.box_size().map(|size| size.width);
        let origin = text.position();

        let lines = text
            .text
            .split('\n')
            .flat_map(|paragraph| match max_width {
                Some(width) => wrap_words(paragraph, width, |s| face.measure(s)),
                None => vec![paragraph.to_string()],
            })
            .enumerate()
            .map(|(i, line)| TextLine {
                width: face.measure(&line),
                origin: Point::new(origin.x, origin.y + i as f64 * line_height),
                text: line,
            })
            .collect();

        Self { lines, line_height }
    }

    /// Underline segment for a line.
    pub fn underline(&self, line: &TextLine) -> (Point, Point) {
        let y = line.origin.y + self.line_height - UNDERLINE_INSET;
        (Point::new(line.origin.x, y), Point::new(line.origin.x + line.width, y))
    }
}

/// Greedy word wrap.
///
/// Words are appended with a trailing space while the candidate line fits in
/// `max_width`. A word that does not fit starts a new line, except the first
/// word, which always stays on the first line.
pub fn wrap_words(paragraph: &str, max_width: f64, measure: impl Fn(&str) -> f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for (n, word) in paragraph.split(' ').enumerate() {
        let candidate = format!("{line}{word} ");
        if measure(&candidate) > max_width && n > 0 {
            lines.push(std::mem::replace(&mut line, format!("{word} ")));
        } else {
            line = candidate;
        }
    }
    lines.push(line);
    lines
}
